//! In-app automation facade
//!
//! The component-level surface: owns the enable/pause switches, forwards
//! engine schedule-lifecycle notifications into the manager, and applies
//! remote configuration to the audience (tag-group) cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use herald_core::prelude::*;
use serde_json::Value;

use crate::driver::{InAppMessageDriver, Schedule};
use crate::manager::InAppMessageManager;
use crate::remote::InAppRemoteConfig;

/// The subset of the automation engine the facade drives.
///
/// The engine persists schedules, evaluates triggers, and calls back into
/// the [`AutomationDriver`](crate::driver::AutomationDriver); it lives
/// outside this crate.
#[cfg_attr(test, mockall::automock)]
pub trait AutomationEngine: Send + Sync {
    /// Stop or resume trigger processing entirely.
    fn set_paused(&self, paused: bool);

    /// Re-evaluate schedules whose execution was deferred.
    fn check_pending_schedules(&self);
}

/// Receives tag-group cache tuning from remote config.
#[cfg_attr(test, mockall::automock)]
pub trait AudienceConfigSink: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn set_cache_max_age(&self, max_age: Duration);
    fn set_cache_stale_read_age(&self, age: Duration);
    fn set_prefer_local_until(&self, window: Duration);
}

/// Top-level in-app automation component.
///
/// Two independent switches gate the engine: the feature-level enabled flag
/// and the component enable state. The engine runs only when both are on.
/// Pausing is softer: triggers still fire and schedules still prepare, but
/// displays are held until unpaused.
pub struct InAppAutomation {
    engine: Arc<dyn AutomationEngine>,
    manager: InAppMessageManager,
    audience: Arc<dyn AudienceConfigSink>,
    enabled: AtomicBool,
    component_enabled: AtomicBool,
    paused: AtomicBool,
}

impl InAppAutomation {
    pub fn new(
        engine: Arc<dyn AutomationEngine>,
        manager: InAppMessageManager,
        audience: Arc<dyn AudienceConfigSink>,
    ) -> Self {
        let automation = Self {
            engine,
            manager,
            audience,
            enabled: AtomicBool::new(true),
            component_enabled: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        };
        automation.update_engine_pause_state();
        automation
    }

    /// The message manager, for adapter/listener/delegate registration.
    pub fn manager(&self) -> &InAppMessageManager {
        &self.manager
    }

    /// Build the driver the engine should route in-app schedules through.
    pub fn driver(&self) -> InAppMessageDriver {
        InAppMessageDriver::new(self.manager.clone())
    }

    /// The owning SDK finished initializing; release held work.
    pub fn on_ready(&self) {
        self.manager.on_ready();
        self.engine.check_pending_schedules();
    }

    /// Pause or resume message display. Unpausing prods the engine so
    /// anything that became displayable while paused is re-evaluated.
    pub fn set_paused(&self, paused: bool) {
        let was_paused = self.paused.swap(paused, Ordering::SeqCst);
        self.manager.set_paused(paused);
        if was_paused && !paused {
            debug!("In-app automation unpaused, checking pending schedules");
            self.engine.check_pending_schedules();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Feature-level enable switch.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.update_engine_pause_state();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Component enable state, driven by the owning SDK's privacy settings.
    pub fn on_component_enable_change(&self, enabled: bool) {
        self.component_enabled.store(enabled, Ordering::SeqCst);
        self.update_engine_pause_state();
    }

    fn update_engine_pause_state(&self) {
        let run = self.enabled.load(Ordering::SeqCst) && self.component_enabled.load(Ordering::SeqCst);
        self.engine.set_paused(!run);
    }

    /// Apply a new remote config map. Absent or malformed sections fall
    /// back to defaults, so a config rollback also rolls back tuning.
    pub fn on_new_config(&self, config: Option<&Value>) {
        let config = InAppRemoteConfig::from_config(config);
        debug!(?config, "Applying in-app remote config");
        self.audience.set_enabled(config.tag_groups.enabled);
        self.audience.set_cache_max_age(config.tag_groups.cache_max_age);
        self.audience
            .set_cache_stale_read_age(config.tag_groups.cache_stale_read_age);
        self.audience
            .set_prefer_local_until(config.tag_groups.cache_prefer_local_until);
    }

    // ─────────────────────────────────────────────────────────
    // Engine schedule-lifecycle notifications
    // ─────────────────────────────────────────────────────────

    pub async fn on_schedule_created(&self, schedule: &Schedule) {
        self.manager
            .on_new_message_schedule(&schedule.id, schedule.message.clone())
            .await;
    }

    pub async fn on_schedule_cancelled(&self, schedule: &Schedule) {
        self.manager.on_message_schedule_finished(&schedule.id).await;
    }

    pub async fn on_schedule_expired(&self, schedule: &Schedule) {
        self.manager.on_message_schedule_finished(&schedule.id).await;
    }

    pub async fn on_schedule_limit_reached(&self, schedule: &Schedule) {
        self.manager.on_message_schedule_finished(&schedule.id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingAnalytics, StubAssetManager, StubRemoteData};
    use mockall::predicate::eq;
    use serde_json::json;

    fn manager() -> InAppMessageManager {
        InAppMessageManager::new(
            Arc::new(StubAssetManager::new()),
            Arc::new(RecordingAnalytics::new()),
            Arc::new(StubRemoteData::new(true)),
        )
    }

    fn audience() -> MockAudienceConfigSink {
        MockAudienceConfigSink::new()
    }

    #[tokio::test]
    async fn test_engine_runs_when_enabled_and_component_enabled() {
        let mut engine = MockAutomationEngine::new();
        engine
            .expect_set_paused()
            .with(eq(false))
            .times(1)
            .return_const(());

        InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience()));
    }

    #[tokio::test]
    async fn test_disabling_pauses_the_engine() {
        let mut engine = MockAutomationEngine::new();
        engine
            .expect_set_paused()
            .with(eq(false))
            .times(1)
            .return_const(());
        engine
            .expect_set_paused()
            .with(eq(true))
            .times(1)
            .return_const(());

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience()));
        automation.set_enabled(false);
        assert!(!automation.is_enabled());
    }

    #[tokio::test]
    async fn test_component_disable_pauses_even_while_enabled() {
        let mut engine = MockAutomationEngine::new();
        engine
            .expect_set_paused()
            .with(eq(false))
            .times(1)
            .return_const(());
        engine
            .expect_set_paused()
            .with(eq(true))
            .times(1)
            .return_const(());

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience()));
        automation.on_component_enable_change(false);
    }

    #[tokio::test]
    async fn test_unpausing_checks_pending_schedules() {
        let mut engine = MockAutomationEngine::new();
        engine.expect_set_paused().return_const(());
        engine.expect_check_pending_schedules().times(1).return_const(());

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience()));
        automation.set_paused(true);
        assert!(automation.is_paused());
        automation.set_paused(false);
        assert!(!automation.is_paused());
    }

    #[tokio::test]
    async fn test_pausing_twice_does_not_check_pending_schedules() {
        let mut engine = MockAutomationEngine::new();
        engine.expect_set_paused().return_const(());
        engine.expect_check_pending_schedules().times(0);

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience()));
        automation.set_paused(true);
        automation.set_paused(true);
    }

    #[tokio::test]
    async fn test_new_config_applies_tag_group_tuning() {
        let mut engine = MockAutomationEngine::new();
        engine.expect_set_paused().return_const(());

        let mut audience = audience();
        audience
            .expect_set_enabled()
            .with(eq(false))
            .times(1)
            .return_const(());
        audience
            .expect_set_cache_max_age()
            .with(eq(Duration::from_secs(100)))
            .times(1)
            .return_const(());
        audience
            .expect_set_cache_stale_read_age()
            .with(eq(Duration::from_secs(200)))
            .times(1)
            .return_const(());
        audience
            .expect_set_prefer_local_until()
            .with(eq(Duration::from_secs(300)))
            .times(1)
            .return_const(());

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience));
        automation.on_new_config(Some(&json!({
            "tag_groups": {
                "enabled": false,
                "cache_max_age_seconds": 100,
                "cache_stale_read_age_seconds": 200,
                "cache_prefer_local_until_seconds": 300,
            }
        })));
    }

    #[tokio::test]
    async fn test_absent_config_resets_tag_group_tuning() {
        let mut engine = MockAutomationEngine::new();
        engine.expect_set_paused().return_const(());

        let mut audience = audience();
        audience
            .expect_set_enabled()
            .with(eq(true))
            .times(1)
            .return_const(());
        audience
            .expect_set_cache_max_age()
            .with(eq(Duration::from_secs(600)))
            .times(1)
            .return_const(());
        audience
            .expect_set_cache_stale_read_age()
            .with(eq(Duration::from_secs(3600)))
            .times(1)
            .return_const(());
        audience
            .expect_set_prefer_local_until()
            .with(eq(Duration::from_secs(600)))
            .times(1)
            .return_const(());

        let automation = InAppAutomation::new(Arc::new(engine), manager(), Arc::new(audience));
        automation.on_new_config(None);
    }
}
