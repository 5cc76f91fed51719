//! Display coordination
//!
//! A display coordinator is the mutual-exclusion gate for message display.
//! Exclusivity is scoped to a coordinator instance: schedules that share an
//! instance never display at the same time, and the default policy also
//! enforces a cooldown between consecutive displays.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use herald_core::prelude::*;
use herald_core::InAppMessage;

/// Default cooldown between consecutive displays on the default coordinator.
pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_secs(30);

/// Invoked when a coordinator becomes ready again, so the owner can ask the
/// scheduler to re-poll readiness.
pub type DisplayReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// Mutual-exclusion/cooldown gate for message display.
///
/// Callers must check [`is_ready`](Self::is_ready) immediately before
/// [`on_display_started`](Self::on_display_started); starting a display on a
/// coordinator that is not ready is a contract violation.
pub trait DisplayCoordinator: Send + Sync {
    /// Whether a message display may start right now.
    fn is_ready(&self) -> bool;

    /// A message display has started. Valid only while ready.
    fn on_display_started(&self, message: &InAppMessage);

    /// The message display has finished. Valid only while displaying.
    fn on_display_finished(&self, message: &InAppMessage);

    /// Register the ready-again notification hook.
    fn set_display_ready_callback(&self, callback: Option<DisplayReadyCallback>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayState {
    Ready,
    Displaying,
    Locked,
}

struct DefaultInner {
    state: Mutex<DisplayState>,
    interval: Mutex<Duration>,
    ready_callback: Mutex<Option<DisplayReadyCallback>>,
}

/// Default display coordinator: one message at a time, with a shared
/// cooldown interval after each display.
///
/// State machine: `Ready -> Displaying -> Locked(cooldown) -> Ready`. The
/// unlock timer runs on the tokio runtime and fires the ready callback once
/// the cooldown elapses.
pub struct DefaultDisplayCoordinator {
    inner: Arc<DefaultInner>,
}

impl DefaultDisplayCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(DefaultInner {
                state: Mutex::new(DisplayState::Ready),
                interval: Mutex::new(interval),
                ready_callback: Mutex::new(None),
            }),
        }
    }

    /// Update the cooldown interval. Applies to the next display.
    pub fn set_display_interval(&self, interval: Duration) {
        *self.inner.interval.lock().unwrap() = interval;
    }

    pub fn display_interval(&self) -> Duration {
        *self.inner.interval.lock().unwrap()
    }
}

impl Default for DefaultDisplayCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_INTERVAL)
    }
}

impl DisplayCoordinator for DefaultDisplayCoordinator {
    fn is_ready(&self) -> bool {
        *self.inner.state.lock().unwrap() == DisplayState::Ready
    }

    fn on_display_started(&self, message: &InAppMessage) {
        let mut state = self.inner.state.lock().unwrap();
        if *state != DisplayState::Ready {
            warn!(?message.name, "Display started while coordinator was not ready");
        }
        *state = DisplayState::Displaying;
    }

    fn on_display_finished(&self, _message: &InAppMessage) {
        let interval = *self.inner.interval.lock().unwrap();
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != DisplayState::Displaying {
                warn!("Display finished while coordinator was not displaying");
            }
            *state = DisplayState::Locked;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let unlocked = {
                let mut state = inner.state.lock().unwrap();
                if *state == DisplayState::Locked {
                    *state = DisplayState::Ready;
                    true
                } else {
                    false
                }
            };
            if unlocked {
                trace!("Display cooldown elapsed, coordinator ready");
                let callback = inner.ready_callback.lock().unwrap().clone();
                if let Some(callback) = callback {
                    callback();
                }
            }
        });
    }

    fn set_display_ready_callback(&self, callback: Option<DisplayReadyCallback>) {
        *self.inner.ready_callback.lock().unwrap() = callback;
    }
}

/// Coordinator that never gates display. Used for messages that request
/// immediate display behavior.
#[derive(Default)]
pub struct ImmediateDisplayCoordinator {
    ready_callback: Mutex<Option<DisplayReadyCallback>>,
}

impl ImmediateDisplayCoordinator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplayCoordinator for ImmediateDisplayCoordinator {
    fn is_ready(&self) -> bool {
        true
    }

    fn on_display_started(&self, _message: &InAppMessage) {}

    fn on_display_finished(&self, _message: &InAppMessage) {
        let callback = self.ready_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn set_display_ready_callback(&self, callback: Option<DisplayReadyCallback>) {
        *self.ready_callback.lock().unwrap() = callback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::DisplayContent;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message() -> InAppMessage {
        InAppMessage::builder(DisplayContent::Banner(json!({})))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_coordinator_lifecycle() {
        let coordinator = DefaultDisplayCoordinator::new(Duration::from_secs(5));
        let message = message();

        assert!(coordinator.is_ready());

        coordinator.on_display_started(&message);
        assert!(!coordinator.is_ready());

        coordinator.on_display_finished(&message);
        // Still locked: the cooldown has not elapsed.
        assert!(!coordinator.is_ready());

        tokio::time::sleep(Duration::from_secs(5) + Duration::from_millis(1)).await;
        assert!(coordinator.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_callback_fires_after_cooldown() {
        let coordinator = DefaultDisplayCoordinator::new(Duration::from_secs(3));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        coordinator.set_display_ready_callback(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let message = message();
        coordinator.on_display_started(&message);
        coordinator.on_display_finished(&message);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_round_trips_through_locked() {
        let coordinator = DefaultDisplayCoordinator::new(Duration::ZERO);
        let message = message();

        coordinator.on_display_started(&message);
        coordinator.on_display_finished(&message);
        // Unlock is posted, not inline.
        assert!(!coordinator.is_ready());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(coordinator.is_ready());
    }

    #[tokio::test]
    async fn test_immediate_coordinator_is_always_ready() {
        let coordinator = ImmediateDisplayCoordinator::new();
        let message = message();

        assert!(coordinator.is_ready());
        coordinator.on_display_started(&message);
        assert!(coordinator.is_ready());
        coordinator.on_display_finished(&message);
        assert!(coordinator.is_ready());
    }
}
