//! Adapter wrapper
//!
//! Binds one adapter instance, one display coordinator, and one message
//! together so the manager can drive the display lifecycle through a single
//! fail-safe unit: collaborator faults are mapped to retry / not-ready /
//! display-failure signals instead of propagating.

use std::sync::Arc;

use herald_core::prelude::*;
use herald_core::InAppMessage;
use thiserror::Error;

use crate::adapter::{DisplayHandle, InAppMessageAdapter, PrepareResult};
use crate::assets::Assets;
use crate::coordinator::DisplayCoordinator;

/// A display attempt failed before the message made it on screen.
///
/// Recoverable from the manager's point of view: the schedule is treated as
/// finished without a display, never retried.
#[derive(Debug, Error)]
#[error("Display failed for schedule {schedule_id}: {reason}")]
pub struct DisplayError {
    pub schedule_id: String,
    pub reason: String,
}

/// One in-flight schedule's adapter + coordinator pairing.
pub struct AdapterWrapper {
    pub schedule_id: String,
    pub message: InAppMessage,
    adapter: Box<dyn InAppMessageAdapter>,
    coordinator: Arc<dyn DisplayCoordinator>,
    displayed: bool,
    finish_reported: bool,
}

impl AdapterWrapper {
    pub fn new(
        schedule_id: impl Into<String>,
        message: InAppMessage,
        adapter: Box<dyn InAppMessageAdapter>,
        coordinator: Arc<dyn DisplayCoordinator>,
    ) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            message,
            adapter,
            coordinator,
            displayed: false,
            finish_reported: false,
        }
    }

    /// Run the adapter's prepare step. Faults are assumed transient
    /// (rendering resources may not be fetchable yet) and mapped to retry.
    pub async fn prepare(&mut self, assets: Option<Assets>) -> PrepareResult {
        match self.adapter.on_prepare(assets).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    schedule_id = %self.schedule_id,
                    error = %err,
                    "Adapter prepare failed, will retry"
                );
                PrepareResult::Retry
            }
        }
    }

    /// Adapter and coordinator both ready. Fails closed: a faulting adapter
    /// is reported as not ready.
    pub fn is_ready(&self) -> bool {
        let adapter_ready = self.adapter.is_ready().unwrap_or_else(|err| {
            warn!(
                schedule_id = %self.schedule_id,
                error = %err,
                "Adapter readiness check failed, treating as not ready"
            );
            false
        });
        adapter_ready && self.coordinator.is_ready()
    }

    /// Start the display: coordinator first, then the adapter.
    ///
    /// If the adapter refuses, the coordinator is released again so a failed
    /// attempt cannot wedge the display gate.
    pub fn display(&mut self, handle: DisplayHandle) -> std::result::Result<(), DisplayError> {
        self.coordinator.on_display_started(&self.message);
        self.displayed = true;

        if let Err(err) = self.adapter.on_display(handle) {
            self.display_finished();
            return Err(DisplayError {
                schedule_id: self.schedule_id.clone(),
                reason: err.to_string(),
            });
        }

        Ok(())
    }

    /// Release the coordinator lock. Idempotent: only the first call after
    /// a display reaches the coordinator.
    pub fn display_finished(&mut self) {
        if self.displayed && !self.finish_reported {
            self.finish_reported = true;
            self.coordinator.on_display_finished(&self.message);
        }
    }

    /// Let the adapter release its rendering resources.
    pub fn adapter_finished(&mut self) {
        self.adapter.on_finish();
    }
}

impl std::fmt::Debug for AdapterWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterWrapper")
            .field("schedule_id", &self.schedule_id)
            .field("displayed", &self.displayed)
            .field("finish_reported", &self.finish_reported)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::DefaultDisplayCoordinator;
    use crate::test_support::{RecordingCoordinator, TestAdapter};
    use herald_core::{DisplayContent, Error};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn message() -> InAppMessage {
        InAppMessage::builder(DisplayContent::Banner(json!({})))
            .build()
            .unwrap()
    }

    fn handle() -> DisplayHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        DisplayHandle::new("schedule", tx)
    }

    #[tokio::test]
    async fn test_prepare_maps_adapter_fault_to_retry() {
        let adapter = TestAdapter::new().with_prepare_error(Error::adapter("font fetch failed"));
        let mut wrapper = AdapterWrapper::new(
            "schedule",
            message(),
            Box::new(adapter),
            Arc::new(DefaultDisplayCoordinator::default()),
        );

        assert_eq!(wrapper.prepare(None).await, PrepareResult::Retry);
    }

    #[tokio::test]
    async fn test_is_ready_fails_closed_on_adapter_fault() {
        let adapter = TestAdapter::new().with_ready_error(Error::adapter("view torn down"));
        let wrapper = AdapterWrapper::new(
            "schedule",
            message(),
            Box::new(adapter),
            Arc::new(DefaultDisplayCoordinator::default()),
        );

        assert!(!wrapper.is_ready());
    }

    #[tokio::test]
    async fn test_is_ready_requires_coordinator() {
        let coordinator = Arc::new(DefaultDisplayCoordinator::new(Duration::from_secs(1)));
        let wrapper_message = message();
        coordinator.on_display_started(&wrapper_message);

        let wrapper = AdapterWrapper::new(
            "schedule",
            wrapper_message,
            Box::new(TestAdapter::new()),
            coordinator,
        );

        assert!(!wrapper.is_ready());
    }

    #[tokio::test]
    async fn test_display_failure_releases_coordinator() {
        let coordinator = Arc::new(RecordingCoordinator::new());
        let adapter = TestAdapter::new().with_display_error(Error::display("no activity"));
        let mut wrapper =
            AdapterWrapper::new("schedule", message(), Box::new(adapter), coordinator.clone());

        assert!(wrapper.display(handle()).is_err());
        assert_eq!(coordinator.calls(), vec!["started", "finished"]);
    }

    #[tokio::test]
    async fn test_display_finished_is_idempotent() {
        let coordinator = Arc::new(RecordingCoordinator::new());
        let mut wrapper = AdapterWrapper::new(
            "schedule",
            message(),
            Box::new(TestAdapter::new()),
            coordinator.clone(),
        );

        wrapper.display(handle()).unwrap();
        wrapper.display_finished();
        wrapper.display_finished();

        assert_eq!(coordinator.calls(), vec!["started", "finished"]);
    }

    #[tokio::test]
    async fn test_display_finished_without_display_is_a_no_op() {
        let coordinator = Arc::new(RecordingCoordinator::new());
        let mut wrapper = AdapterWrapper::new(
            "schedule",
            message(),
            Box::new(TestAdapter::new()),
            coordinator.clone(),
        );

        wrapper.display_finished();
        assert!(coordinator.calls().is_empty());
    }
}
