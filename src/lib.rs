//! # herald - In-App Message Automation SDK
//!
//! Facade crate re-exporting the public surface of the herald workspace:
//!
//! - [`herald_core`]: message model, resolutions, reporting events, errors
//! - [`herald_automation`]: the automation core (prepare pipeline, display
//!   coordination, driver contract, facade)
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use herald::automation::{InAppAutomation, InAppMessageManager};
//!
//! # fn wire(
//! #     assets: Arc<dyn herald::automation::AssetManager>,
//! #     analytics: Arc<dyn herald::automation::Analytics>,
//! #     remote: Arc<dyn herald::automation::RemoteDataSource>,
//! #     engine: Arc<dyn herald::automation::AutomationEngine>,
//! #     audience: Arc<dyn herald::automation::AudienceConfigSink>,
//! # ) {
//! let manager = InAppMessageManager::new(assets, analytics, remote);
//! let automation = InAppAutomation::new(engine, manager, audience);
//! let driver = automation.driver();
//! // hand `driver` to the automation engine, then:
//! automation.on_ready();
//! # }
//! ```

pub use herald_automation as automation;
pub use herald_core as core;

pub use herald_core::{
    ButtonInfo, DisplayBehavior, DisplayContent, DisplayType, Error, InAppMessage,
    ReportingEvent, ResolutionInfo, ResolutionType, Result, Source,
};

pub use herald_automation::{
    AdapterFactory, AutomationDriver, DisplayCoordinator, DisplayHandle, InAppAutomation,
    InAppMessageAdapter, InAppMessageDriver, InAppMessageManager, PrepareResult,
    PrepareScheduleResult, ReadyResult, Schedule, DEFAULT_DISPLAY_INTERVAL,
};
