//! Message adapter contract
//!
//! An adapter knows how to render one message type. The automation core
//! treats adapters as an opaque capability with a prepare / is-ready /
//! display / finish lifecycle; concrete renderers live outside this crate
//! and are registered per display type through an [`AdapterFactory`].

use std::time::Duration;

use async_trait::async_trait;
use herald_core::{InAppMessage, ResolutionInfo, Result};
use tokio::sync::mpsc;

use crate::assets::Assets;

/// Outcome of an adapter or asset prepare step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareResult {
    /// Prepared, continue the pipeline.
    Ok,
    /// Transient failure, run the same step again after backoff.
    Retry,
    /// Permanent failure for this attempt, drop the schedule.
    Cancel,
}

/// Per-message-type renderer.
///
/// Returning `Err` from `on_prepare` is treated as a transient failure
/// (mapped to [`PrepareResult::Retry`]); returning `Err` from `is_ready`
/// fails closed to not-ready.
#[async_trait]
pub trait InAppMessageAdapter: Send + Sync {
    /// Prepare to display. May fetch rendering resources; called off the
    /// display context and retried on transient failure.
    async fn on_prepare(&mut self, assets: Option<Assets>) -> Result<PrepareResult>;

    /// Whether the adapter can display right now.
    fn is_ready(&self) -> Result<bool>;

    /// Render the message. The adapter signals completion through the
    /// supplied [`DisplayHandle`], possibly synchronously from within this
    /// call.
    fn on_display(&mut self, handle: DisplayHandle) -> Result<()>;

    /// Display fully resolved; release rendering resources.
    fn on_finish(&mut self);
}

/// Produces an adapter instance for a message. Registered per
/// [`DisplayType`](herald_core::DisplayType) on the manager.
pub trait AdapterFactory: Send + Sync {
    fn create_adapter(&self, message: &InAppMessage) -> Result<Box<dyn InAppMessageAdapter>>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&InAppMessage) -> Result<Box<dyn InAppMessageAdapter>> + Send + Sync,
{
    fn create_adapter(&self, message: &InAppMessage) -> Result<Box<dyn InAppMessageAdapter>> {
        self(message)
    }
}

/// Events posted from the display side back to the manager.
///
/// Routed through a single queue so that a display-finished signal is always
/// processed after the display-started handling that issued it, even when
/// the adapter finishes synchronously inside its own display call.
#[derive(Debug)]
pub(crate) enum DisplayEvent {
    Finished {
        schedule_id: String,
        resolution: ResolutionInfo,
        display_time: Duration,
    },
}

/// Handle given to an adapter when a display starts. The UI layer calls
/// [`finished`](Self::finished) exactly once when the message resolves.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    schedule_id: String,
    events_tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl DisplayHandle {
    pub(crate) fn new(
        schedule_id: impl Into<String>,
        events_tx: mpsc::UnboundedSender<DisplayEvent>,
    ) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            events_tx,
        }
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    /// Signal that the display resolved. Safe to call from within the
    /// adapter's own display call; the signal is posted, never handled
    /// inline.
    pub fn finished(&self, resolution: ResolutionInfo, display_time: Duration) {
        let _ = self.events_tx.send(DisplayEvent::Finished {
            schedule_id: self.schedule_id.clone(),
            resolution,
            display_time,
        });
    }
}
