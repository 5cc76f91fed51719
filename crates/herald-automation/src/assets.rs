//! Asset manager collaborator contract
//!
//! The asset manager caches remote resources (images, fonts, HTML bundles)
//! for scheduled messages so they are available offline by the time a
//! message displays. The automation core only depends on its lifecycle
//! notifications and three-way prepare result; the implementation lives
//! outside this crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use herald_core::{InAppMessage, Result};

use crate::adapter::PrepareResult;

/// Supplies the message for a schedule on demand, so the extender transform
/// is applied when assets are actually requested rather than eagerly.
pub type MessageSupplier = Box<dyn Fn() -> InAppMessage + Send + Sync>;

/// Opaque handle to the cached assets of one schedule, passed through to
/// the adapter during prepare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assets {
    files: HashMap<String, PathBuf>,
}

impl Assets {
    pub fn new(files: HashMap<String, PathBuf>) -> Self {
        Self { files }
    }

    /// Cached file for a remote resource key (typically its URL).
    pub fn file(&self, key: &str) -> Option<&Path> {
        self.files.get(key).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Lifecycle contract the automation core drives.
///
/// `Err` from `on_prepare` is treated as a transient failure and retried.
#[async_trait]
pub trait AssetManager: Send + Sync {
    /// A schedule now exists; assets may be fetched eagerly.
    async fn on_schedule(&self, schedule_id: &str, message: MessageSupplier);

    /// Prepare assets ahead of an imminent display.
    async fn on_prepare(&self, schedule_id: &str, message: &InAppMessage)
        -> Result<PrepareResult>;

    /// The schedule's display finished; per-display assets may be released.
    async fn on_display_finished(&self, schedule_id: &str, message: &InAppMessage);

    /// The schedule is done for good; release everything.
    async fn on_finish(&self, schedule_id: &str);

    /// Cached assets for a schedule, if any.
    async fn get_assets(&self, schedule_id: &str) -> Option<Assets>;
}
