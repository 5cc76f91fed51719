//! # herald-automation - In-App Message Automation Core
//!
//! Turns "a schedule became eligible" events from an external automation
//! engine into guaranteed-exclusive, asset-ready, analytics-reported message
//! displays.
//!
//! Organized into modules:
//! - `executor`: [`RetryingExecutor`] - ordered task chains with retry/backoff
//! - `coordinator`: display mutual exclusion with a configurable cooldown
//! - `adapter`: per-message-type renderer contract and the display handle
//! - `assets`: asset manager collaborator contract
//! - `wrapper`: [`AdapterWrapper`] - fail-safe adapter + coordinator pairing
//! - `manager`: [`InAppMessageManager`] - the orchestrator
//! - `driver`: scheduler-facing three-phase driver contract
//! - `automation`: [`InAppAutomation`] - top-level facade
//! - `remote`: remote-data staleness contract and remote config parsing
//! - `analytics`: fire-and-forget analytics contract
//!
//! ## Lifecycle
//!
//! ```text
//! engine -> driver.on_prepare_schedule -> manager.on_prepare
//!   (assets then adapter, via RetryingExecutor)
//! engine -> driver.on_check_execution_readiness -> manager.on_check_execution_readiness
//! engine -> driver.on_execute_triggered_schedule -> manager.on_execute
//!   -> AdapterWrapper.display -> adapter renders, UI resolves
//! UI -> DisplayHandle.finished -> manager.on_display_finished
//!   -> coordinator unlock, reporting event, execution callback
//! ```

pub mod adapter;
pub mod analytics;
pub mod assets;
pub mod automation;
pub mod coordinator;
pub mod driver;
pub mod executor;
pub mod manager;
pub mod remote;
pub mod wrapper;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use adapter::{AdapterFactory, DisplayHandle, InAppMessageAdapter, PrepareResult};
pub use analytics::Analytics;
pub use assets::{AssetManager, Assets};
pub use automation::{AudienceConfigSink, AutomationEngine, InAppAutomation};
pub use coordinator::{
    DefaultDisplayCoordinator, DisplayCoordinator, ImmediateDisplayCoordinator,
    DEFAULT_DISPLAY_INTERVAL,
};
pub use driver::{
    AutomationDriver, ExecutionCallback, InAppMessageDriver, PrepareCallback,
    PrepareScheduleResult, ReadyResult, Schedule, TriggerContext,
};
pub use executor::{Backoff, ChainHandle, OperationResult, RetryingExecutor};
pub use manager::{
    ActionRunner, CoordinatorRequestCallback, DisplayDelegate, InAppMessageListener,
    InAppMessageManager, MessageExtender, ReadinessDelegate,
};
pub use remote::{InAppRemoteConfig, RemoteDataSource, TagGroupConfig};
pub use wrapper::{AdapterWrapper, DisplayError};
