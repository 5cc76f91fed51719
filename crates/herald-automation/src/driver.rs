//! Scheduler-facing driver contract
//!
//! The external automation engine persists schedules, evaluates triggers,
//! and drives every schedule type through the same three-phase lifecycle:
//! prepare, readiness polling, execute. [`InAppMessageDriver`] is the
//! in-app-message implementation, delegating into the manager.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use herald_core::InAppMessage;

use crate::manager::InAppMessageManager;

/// Final outcome of the prepare phase, reported to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareScheduleResult {
    /// Prepared; the engine may poll readiness and execute.
    Continue,
    /// Drop the schedule for this trigger; no display.
    Cancel,
    /// Count the trigger against schedule limits but skip the display.
    Penalize,
    /// Skip the trigger without counting it.
    Skip,
    /// The schedule definition itself is obsolete and should be replaced.
    Invalidate,
}

/// Outcome of a readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyResult {
    /// Ready; the engine may execute.
    Continue,
    /// Not ready yet; the engine is expected to re-poll.
    NotReady,
    /// The schedule definition is obsolete.
    Invalidate,
}

/// One-shot completion for the prepare phase.
pub type PrepareCallback = oneshot::Sender<PrepareScheduleResult>;

/// One-shot completion for the execute phase, sent once the display fully
/// resolves.
pub type ExecutionCallback = oneshot::Sender<()>;

/// The engine's unit of automation, as far as this core is concerned.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Opaque schedule id, unique per scheduled message.
    pub id: String,
    /// Remote-data metadata snapshot the schedule was created from.
    pub metadata: Option<Value>,
    /// Session tag for the trigger that made this schedule eligible.
    pub trigger_session_id: Option<String>,
    /// The message to display.
    pub message: InAppMessage,
}

/// What made a schedule eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub trigger_name: String,
    pub event: Value,
}

/// Three-phase schedule lifecycle every schedule type implements.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    async fn on_prepare_schedule(
        &self,
        schedule: &Schedule,
        trigger_context: Option<&TriggerContext>,
        callback: PrepareCallback,
    );

    async fn on_check_execution_readiness(&self, schedule: &Schedule) -> ReadyResult;

    async fn on_execute_triggered_schedule(&self, schedule: &Schedule, callback: ExecutionCallback);
}

/// In-app message driver: the engine's entry point into the manager.
pub struct InAppMessageDriver {
    manager: InAppMessageManager,
}

impl InAppMessageDriver {
    pub fn new(manager: InAppMessageManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl AutomationDriver for InAppMessageDriver {
    async fn on_prepare_schedule(
        &self,
        schedule: &Schedule,
        trigger_context: Option<&TriggerContext>,
        callback: PrepareCallback,
    ) {
        self.manager
            .on_prepare(
                &schedule.id,
                schedule.metadata.clone(),
                trigger_context.cloned(),
                schedule.trigger_session_id.clone(),
                schedule.message.clone(),
                callback,
            )
            .await;
    }

    async fn on_check_execution_readiness(&self, schedule: &Schedule) -> ReadyResult {
        self.manager.on_check_execution_readiness(&schedule.id).await
    }

    async fn on_execute_triggered_schedule(
        &self,
        schedule: &Schedule,
        callback: ExecutionCallback,
    ) {
        self.manager.on_execute(&schedule.id, callback).await;
    }
}
