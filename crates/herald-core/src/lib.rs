//! # herald-core - Core Domain Types
//!
//! Foundation crate for Herald. Provides the in-app message model, resolution
//! types, reporting event payloads, and error handling.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Message Model (`message`)
//! - [`InAppMessage`] - Immutable in-app message value, built via [`InAppMessage::builder`]
//! - [`DisplayContent`] - Tagged union over display-content variants
//! - [`DisplayType`] - Discriminant of [`DisplayContent`], used for adapter registry keys
//! - [`Source`] - Where a message definition came from
//! - [`DisplayBehavior`] - Default (coordinated) vs. immediate display
//!
//! ### Resolutions (`resolution`)
//! - [`ResolutionInfo`] - Terminal user interaction outcome for a displayed message
//! - [`ButtonInfo`] - Button identity carried by button-click resolutions
//!
//! ### Reporting (`events`)
//! - [`ReportingEvent`] - Display / resolution / interrupted analytics payloads
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context

pub mod error;
pub mod events;
pub mod logging;
pub mod message;
pub mod prelude;
pub mod resolution;

pub use error::{Error, Result, ResultExt};
pub use events::ReportingEvent;
pub use message::{DisplayBehavior, DisplayContent, DisplayType, InAppMessage, Source};
pub use resolution::{ButtonInfo, ResolutionInfo, ResolutionType};
