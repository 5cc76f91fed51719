//! Analytics collaborator contract

use herald_core::ReportingEvent;

/// Fire-and-forget event sink. The core only constructs payloads; delivery,
/// batching, and retry are the analytics pipeline's concern.
pub trait Analytics: Send + Sync {
    fn add_event(&self, event: ReportingEvent);
}
