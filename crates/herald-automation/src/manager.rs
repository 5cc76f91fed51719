//! In-app message manager
//!
//! The orchestrator: tracks one schedule-data record per in-flight schedule
//! id, drives the two-stage prepare pipeline (assets, then adapter) through
//! the [`RetryingExecutor`], gates execution on adapter + coordinator +
//! display-delegate readiness, runs the display, and emits reporting events
//! and listener callbacks around the full lifecycle.
//!
//! Display-finished signals arrive through a single serialized event queue
//! (see [`DisplayHandle`](crate::adapter::DisplayHandle)), which is what
//! guarantees started-before-finished ordering even when an adapter
//! finishes synchronously inside its own display call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use herald_core::prelude::*;
use herald_core::{
    DisplayBehavior, DisplayType, InAppMessage, ReportingEvent, ResolutionInfo, Source,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::adapter::{AdapterFactory, DisplayEvent, DisplayHandle, InAppMessageAdapter, PrepareResult};
use crate::analytics::Analytics;
use crate::assets::{AssetManager, MessageSupplier};
use crate::coordinator::{
    DefaultDisplayCoordinator, DisplayCoordinator, DisplayReadyCallback,
    ImmediateDisplayCoordinator,
};
use crate::driver::{ExecutionCallback, PrepareCallback, PrepareScheduleResult, ReadyResult, TriggerContext};
use crate::executor::{self, OperationResult, RetryingExecutor};
use crate::remote::RemoteDataSource;
use crate::wrapper::AdapterWrapper;

/// Transforms a message once before preparation begins.
pub type MessageExtender = Arc<dyn Fn(InAppMessage) -> InAppMessage + Send + Sync>;

/// Supplies a display coordinator for a message. Returning `None` falls
/// back to the stock coordinator matching the message's display behavior.
pub type CoordinatorRequestCallback =
    Arc<dyn Fn(&InAppMessage) -> Option<Arc<dyn DisplayCoordinator>> + Send + Sync>;

/// Additional accept/reject condition checked during readiness, beyond
/// coordinator and adapter readiness.
pub type DisplayDelegate = Arc<dyn Fn(&InAppMessage) -> bool + Send + Sync>;

/// Observes the message display lifecycle.
pub trait InAppMessageListener: Send + Sync {
    fn on_message_displayed(&self, schedule_id: &str, message: &InAppMessage);

    fn on_message_finished(
        &self,
        schedule_id: &str,
        message: &InAppMessage,
        resolution: &ResolutionInfo,
    );
}

/// Notified when display conditions may have changed, so the owner can ask
/// the automation engine to re-poll readiness.
pub trait ReadinessDelegate: Send + Sync {
    fn on_readiness_changed(&self);
}

/// Runs a message's named actions once its display finishes. The action
/// framework itself is external to this core.
pub trait ActionRunner: Send + Sync {
    fn run_actions(&self, actions: &HashMap<String, Value>);
}

/// Lifecycle tag of an in-flight schedule. Only advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ScheduleState {
    AssetsPreparing,
    AssetsPrepared,
    AdapterPreparing,
    Prepared,
    Displaying,
}

/// One in-flight schedule's state. At most one per schedule id; the entry
/// is removed once the display resolves, so a repeating schedule can go
/// through prepare again on its next trigger.
struct ScheduleData {
    state: ScheduleState,
    message: InAppMessage,
    metadata: Option<Value>,
    trigger_session_id: Option<String>,
    wrapper: Option<Arc<AsyncMutex<AdapterWrapper>>>,
    // Dropping the handle cancels any in-flight retry chain.
    chain: Option<executor::ChainHandle>,
}

type SharedPrepareCallback = Arc<Mutex<Option<PrepareCallback>>>;

fn finish_prepare(callback: &SharedPrepareCallback, result: PrepareScheduleResult) {
    if let Some(callback) = callback.lock().unwrap().take() {
        let _ = callback.send(result);
    }
}

/// In-app message orchestrator. Cheap to clone; clones share state.
///
/// Must be created inside a tokio runtime: the manager spawns its display
/// event loop at construction.
#[derive(Clone)]
pub struct InAppMessageManager {
    inner: Arc<Inner>,
}

struct Inner {
    self_weak: Weak<Inner>,
    executor: RetryingExecutor,
    assets: Arc<dyn AssetManager>,
    analytics: Arc<dyn Analytics>,
    remote_data: Arc<dyn RemoteDataSource>,
    schedules: Mutex<HashMap<String, ScheduleData>>,
    execution_callbacks: Mutex<HashMap<String, ExecutionCallback>>,
    listeners: Mutex<Vec<Arc<dyn InAppMessageListener>>>,
    factories: Mutex<HashMap<DisplayType, Arc<dyn AdapterFactory>>>,
    extender: Mutex<Option<MessageExtender>>,
    coordinator_callback: Mutex<Option<CoordinatorRequestCallback>>,
    display_delegate: Mutex<Option<DisplayDelegate>>,
    readiness_delegate: Mutex<Option<Arc<dyn ReadinessDelegate>>>,
    action_runner: Mutex<Option<Arc<dyn ActionRunner>>>,
    paused: AtomicBool,
    default_coordinator: Arc<DefaultDisplayCoordinator>,
    immediate_coordinator: Arc<ImmediateDisplayCoordinator>,
    events_tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl InAppMessageManager {
    pub fn new(
        assets: Arc<dyn AssetManager>,
        analytics: Arc<dyn Analytics>,
        remote_data: Arc<dyn RemoteDataSource>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let executor = RetryingExecutor::default();
        // Held until the owning SDK signals readiness.
        executor.set_paused(true);

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let default_coordinator = Arc::new(DefaultDisplayCoordinator::default());
            let immediate_coordinator = Arc::new(ImmediateDisplayCoordinator::new());

            let ready_weak = weak.clone();
            let ready_callback: DisplayReadyCallback = Arc::new(move || {
                if let Some(inner) = ready_weak.upgrade() {
                    inner.notify_readiness_changed();
                }
            });
            default_coordinator.set_display_ready_callback(Some(ready_callback.clone()));
            immediate_coordinator.set_display_ready_callback(Some(ready_callback));

            Inner {
                self_weak: weak.clone(),
                executor,
                assets,
                analytics,
                remote_data,
                schedules: Mutex::new(HashMap::new()),
                execution_callbacks: Mutex::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                factories: Mutex::new(HashMap::new()),
                extender: Mutex::new(None),
                coordinator_callback: Mutex::new(None),
                display_delegate: Mutex::new(None),
                readiness_delegate: Mutex::new(None),
                action_runner: Mutex::new(None),
                paused: AtomicBool::new(false),
                default_coordinator,
                immediate_coordinator,
                events_tx,
            }
        });

        Self::spawn_event_loop(Arc::downgrade(&inner), events_rx);
        Self { inner }
    }

    fn spawn_event_loop(weak: Weak<Inner>, mut events_rx: mpsc::UnboundedReceiver<DisplayEvent>) {
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                match event {
                    DisplayEvent::Finished {
                        schedule_id,
                        resolution,
                        display_time,
                    } => {
                        inner.await_display_settled(&schedule_id).await;
                        inner
                            .handle_resolution(&schedule_id, &resolution, display_time)
                            .await;
                        inner.handle_display_finished(&schedule_id, resolution).await;
                    }
                }
            }
        });
    }

    // ─────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────

    /// The owning SDK is ready; release held prepare chains.
    pub fn on_ready(&self) {
        self.inner.executor.set_paused(false);
    }

    /// Register (or clear) the adapter factory for a display type.
    pub fn set_adapter_factory(
        &self,
        display_type: DisplayType,
        factory: Option<Arc<dyn AdapterFactory>>,
    ) {
        let mut factories = self.inner.factories.lock().unwrap();
        match factory {
            Some(factory) => {
                factories.insert(display_type, factory);
            }
            None => {
                factories.remove(&display_type);
            }
        }
    }

    /// Set the message extender, applied once before asset caching or
    /// preparation.
    pub fn set_message_extender(&self, extender: Option<MessageExtender>) {
        *self.inner.extender.lock().unwrap() = extender;
    }

    /// Set the callback for requesting per-message display coordinators.
    pub fn set_coordinator_request_callback(&self, callback: Option<CoordinatorRequestCallback>) {
        *self.inner.coordinator_callback.lock().unwrap() = callback;
    }

    /// Set the additional display accept/reject predicate.
    pub fn set_display_delegate(&self, delegate: Option<DisplayDelegate>) {
        *self.inner.display_delegate.lock().unwrap() = delegate;
    }

    pub fn set_readiness_delegate(&self, delegate: Option<Arc<dyn ReadinessDelegate>>) {
        *self.inner.readiness_delegate.lock().unwrap() = delegate;
    }

    pub fn set_action_runner(&self, runner: Option<Arc<dyn ActionRunner>>) {
        *self.inner.action_runner.lock().unwrap() = runner;
    }

    pub fn add_listener(&self, listener: Arc<dyn InAppMessageListener>) {
        self.inner.listeners.lock().unwrap().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn InAppMessageListener>) {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    /// Set the default coordinator's display interval. Applies to the next
    /// display.
    pub fn set_display_interval(&self, interval: Duration) {
        self.inner.default_coordinator.set_display_interval(interval);
    }

    pub fn display_interval(&self) -> Duration {
        self.inner.default_coordinator.display_interval()
    }

    /// Pause or resume display. Paused schedules report not-ready.
    pub fn set_paused(&self, paused: bool) {
        self.inner.paused.store(paused, Ordering::SeqCst);
        if !paused {
            self.inner.notify_readiness_changed();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Ask the engine to re-poll readiness (e.g. after an app-level display
    /// condition changed).
    pub fn notify_display_conditions_changed(&self) {
        self.inner.notify_readiness_changed();
    }

    // ─────────────────────────────────────────────────────────
    // Schedule lifecycle (driven by the automation engine)
    // ─────────────────────────────────────────────────────────

    /// A schedule now exists; let the asset manager fetch eagerly. The
    /// message is captured lazily so the extender applies at request time.
    pub async fn on_new_message_schedule(&self, schedule_id: &str, message: InAppMessage) {
        self.inner.new_message_schedule(schedule_id, message).await;
    }

    /// Run the two-stage prepare pipeline for a schedule.
    pub async fn on_prepare(
        &self,
        schedule_id: &str,
        metadata: Option<Value>,
        trigger_context: Option<TriggerContext>,
        trigger_session_id: Option<String>,
        message: InAppMessage,
        callback: PrepareCallback,
    ) {
        self.inner
            .prepare(
                schedule_id,
                metadata,
                trigger_context,
                trigger_session_id,
                message,
                callback,
            )
            .await;
    }

    pub async fn on_check_execution_readiness(&self, schedule_id: &str) -> ReadyResult {
        self.inner.check_readiness(schedule_id).await
    }

    /// Display the schedule's message. The execution callback is deferred
    /// until the display finishes.
    pub async fn on_execute(&self, schedule_id: &str, callback: ExecutionCallback) {
        self.inner.execute(schedule_id, callback).await;
    }

    /// Record the final resolution and report it if the message has
    /// reporting enabled.
    pub async fn on_resolution(
        &self,
        schedule_id: &str,
        resolution: &ResolutionInfo,
        display_time: Duration,
    ) {
        self.inner
            .handle_resolution(schedule_id, resolution, display_time)
            .await;
    }

    /// The display is done: release the coordinator, clean up the adapter,
    /// notify listeners, and complete the deferred execution callback.
    pub async fn on_display_finished(&self, schedule_id: &str, resolution: ResolutionInfo) {
        self.inner
            .handle_display_finished(schedule_id, resolution)
            .await;
    }

    /// The engine decided an execution is no longer valid; drop in-flight
    /// state for the schedule.
    pub async fn on_execution_invalidated(&self, schedule_id: &str) {
        self.inner.execution_invalidated(schedule_id).await;
    }

    /// The process is going away while a display is in flight; report the
    /// interruption.
    pub async fn on_execution_interrupted(
        &self,
        schedule_id: &str,
        message: Option<&InAppMessage>,
    ) {
        self.inner.execution_interrupted(schedule_id, message).await;
    }

    /// Final cleanup once the engine is done with a schedule.
    pub async fn on_message_schedule_finished(&self, schedule_id: &str) {
        self.inner.schedule_finished(schedule_id).await;
    }
}

impl Inner {
    fn notify_readiness_changed(&self) {
        let delegate = self.readiness_delegate.lock().unwrap().clone();
        if let Some(delegate) = delegate {
            delegate.on_readiness_changed();
        }
    }

    fn extend(&self, message: InAppMessage) -> InAppMessage {
        let extender = self.extender.lock().unwrap().clone();
        match extender {
            Some(extender) => extender(message),
            None => message,
        }
    }

    fn create_adapter(&self, message: &InAppMessage) -> Option<Box<dyn InAppMessageAdapter>> {
        let factory = self
            .factories
            .lock()
            .unwrap()
            .get(&message.display_type())
            .cloned();
        let Some(factory) = factory else {
            debug!(
                display_type = ?message.display_type(),
                "No adapter factory registered for message type"
            );
            return None;
        };
        match factory.create_adapter(message) {
            Ok(adapter) => Some(adapter),
            Err(err) => {
                error!(error = %err, "Failed to create message adapter");
                None
            }
        }
    }

    fn resolve_coordinator(&self, message: &InAppMessage) -> Arc<dyn DisplayCoordinator> {
        let callback = self.coordinator_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            if let Some(coordinator) = callback(message) {
                let weak = self.self_weak.clone();
                coordinator.set_display_ready_callback(Some(Arc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.notify_readiness_changed();
                    }
                })));
                return coordinator;
            }
        }
        match message.display_behavior {
            DisplayBehavior::Immediate => self.immediate_coordinator.clone(),
            DisplayBehavior::Default => self.default_coordinator.clone(),
        }
    }

    fn schedule_exists(&self, schedule_id: &str) -> bool {
        self.schedules.lock().unwrap().contains_key(schedule_id)
    }

    fn advance_state(&self, schedule_id: &str, state: ScheduleState) {
        if let Some(data) = self.schedules.lock().unwrap().get_mut(schedule_id) {
            data.state = data.state.max(state);
        }
    }

    fn store_prepared(&self, schedule_id: &str, wrapper: Arc<AsyncMutex<AdapterWrapper>>) {
        if let Some(data) = self.schedules.lock().unwrap().get_mut(schedule_id) {
            data.wrapper = Some(wrapper);
            data.state = ScheduleState::Prepared;
        }
    }

    /// Wait until the execute path has released the wrapper lock. It holds
    /// the lock across its display fan-out, so taking and dropping it here
    /// orders finished handling after the display event and listener calls
    /// even when the adapter resolved synchronously.
    async fn await_display_settled(&self, schedule_id: &str) {
        let wrapper = {
            let schedules = self.schedules.lock().unwrap();
            schedules
                .get(schedule_id)
                .and_then(|data| data.wrapper.clone())
        };
        if let Some(wrapper) = wrapper {
            drop(wrapper.lock().await);
        }
    }

    fn call_execution_finished(&self, schedule_id: &str) {
        if let Some(callback) = self.execution_callbacks.lock().unwrap().remove(schedule_id) {
            let _ = callback.send(());
        }
    }

    fn event_context(&self, schedule_id: &str) -> Option<Value> {
        let schedules = self.schedules.lock().unwrap();
        let trigger_session_id = schedules.get(schedule_id)?.trigger_session_id.clone()?;
        Some(json!({ "trigger_session_id": trigger_session_id }))
    }

    async fn new_message_schedule(self: &Arc<Self>, schedule_id: &str, message: InAppMessage) {
        let weak = self.self_weak.clone();
        let supplier: MessageSupplier = Box::new(move || match weak.upgrade() {
            Some(inner) => inner.extend(message.clone()),
            None => message.clone(),
        });
        self.assets.on_schedule(schedule_id, supplier).await;
    }

    async fn prepare(
        self: &Arc<Self>,
        schedule_id: &str,
        metadata: Option<Value>,
        trigger_context: Option<TriggerContext>,
        trigger_session_id: Option<String>,
        message: InAppMessage,
        callback: PrepareCallback,
    ) {
        debug!(schedule_id, ?trigger_context, "Preparing schedule");

        {
            let schedules = self.schedules.lock().unwrap();
            if let Some(data) = schedules.get(schedule_id) {
                warn!(
                    schedule_id,
                    state = ?data.state,
                    "Ignoring prepare for schedule already in flight"
                );
                return;
            }
        }

        // An out-of-date schedule must never be displayed.
        if !self.remote_data.is_metadata_current(metadata.as_ref()) {
            debug!(schedule_id, "Schedule metadata is stale, invalidating");
            let _ = callback.send(PrepareScheduleResult::Invalidate);
            return;
        }

        let message = self.extend(message);

        let Some(adapter) = self.create_adapter(&message) else {
            let _ = callback.send(PrepareScheduleResult::Penalize);
            return;
        };
        let coordinator = self.resolve_coordinator(&message);
        let wrapper = Arc::new(AsyncMutex::new(AdapterWrapper::new(
            schedule_id,
            message.clone(),
            adapter,
            coordinator,
        )));

        self.schedules.lock().unwrap().insert(
            schedule_id.to_string(),
            ScheduleData {
                state: ScheduleState::AssetsPreparing,
                message: message.clone(),
                metadata,
                trigger_session_id,
                wrapper: None,
                chain: None,
            },
        );

        let callback: SharedPrepareCallback = Arc::new(Mutex::new(Some(callback)));

        // Operations hold the manager weakly: a chain parked in retry or
        // pause must not keep a dropped manager alive.
        let prepare_assets = {
            let weak = self.self_weak.clone();
            let schedule_id = schedule_id.to_string();
            let message = message.clone();
            let callback = callback.clone();
            executor::operation(move || {
                let weak = weak.clone();
                let schedule_id = schedule_id.clone();
                let message = message.clone();
                let callback = callback.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return OperationResult::Cancel;
                    };
                    if !inner.schedule_exists(&schedule_id) {
                        return OperationResult::Cancel;
                    }
                    match inner.assets.on_prepare(&schedule_id, &message).await {
                        Ok(PrepareResult::Ok) => {
                            debug!(schedule_id, "Assets prepared");
                            inner.advance_state(&schedule_id, ScheduleState::AssetsPrepared);
                            OperationResult::Finished
                        }
                        Ok(PrepareResult::Retry) => {
                            debug!(schedule_id, "Assets failed to prepare, will retry");
                            OperationResult::Retry
                        }
                        Ok(PrepareResult::Cancel) => {
                            debug!(schedule_id, "Assets failed to prepare, cancelling display");
                            inner.assets.on_display_finished(&schedule_id, &message).await;
                            finish_prepare(&callback, PrepareScheduleResult::Cancel);
                            OperationResult::Cancel
                        }
                        Err(err) => {
                            warn!(schedule_id, error = %err, "Asset prepare failed, will retry");
                            OperationResult::Retry
                        }
                    }
                }
            })
        };

        let prepare_adapter = {
            let weak = self.self_weak.clone();
            let schedule_id = schedule_id.to_string();
            let wrapper = wrapper.clone();
            let callback = callback.clone();
            executor::operation(move || {
                let weak = weak.clone();
                let schedule_id = schedule_id.clone();
                let wrapper = wrapper.clone();
                let callback = callback.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return OperationResult::Cancel;
                    };
                    if !inner.schedule_exists(&schedule_id) {
                        return OperationResult::Cancel;
                    }
                    inner.advance_state(&schedule_id, ScheduleState::AdapterPreparing);
                    let assets = inner.assets.get_assets(&schedule_id).await;
                    match wrapper.lock().await.prepare(assets).await {
                        PrepareResult::Ok => {
                            debug!(schedule_id, "Adapter prepared");
                            inner.store_prepared(&schedule_id, wrapper.clone());
                            finish_prepare(&callback, PrepareScheduleResult::Continue);
                            OperationResult::Finished
                        }
                        PrepareResult::Retry => {
                            debug!(schedule_id, "Adapter failed to prepare, will retry");
                            OperationResult::Retry
                        }
                        PrepareResult::Cancel => {
                            debug!(schedule_id, "Adapter failed to prepare, cancelling display");
                            finish_prepare(&callback, PrepareScheduleResult::Cancel);
                            OperationResult::Cancel
                        }
                    }
                }
            })
        };

        let chain = self.executor.execute(vec![prepare_assets, prepare_adapter]);
        if let Some(data) = self.schedules.lock().unwrap().get_mut(schedule_id) {
            data.chain = Some(chain);
        }
    }

    async fn check_readiness(&self, schedule_id: &str) -> ReadyResult {
        let (wrapper, message) = {
            let schedules = self.schedules.lock().unwrap();
            let Some(data) = schedules.get(schedule_id) else {
                error!(schedule_id, "No schedule data for readiness check");
                return ReadyResult::Invalidate;
            };
            if !self.remote_data.is_metadata_current(data.metadata.as_ref()) {
                debug!(schedule_id, "Schedule metadata is stale, invalidating");
                return ReadyResult::Invalidate;
            }
            if data.state < ScheduleState::Prepared {
                return ReadyResult::NotReady;
            }
            let Some(wrapper) = data.wrapper.clone() else {
                return ReadyResult::NotReady;
            };
            (wrapper, data.message.clone())
        };

        if self.paused.load(Ordering::SeqCst) {
            return ReadyResult::NotReady;
        }

        let delegate = self.display_delegate.lock().unwrap().clone();
        if let Some(delegate) = delegate {
            if !delegate(&message) {
                debug!(schedule_id, "Display delegate rejected the message");
                return ReadyResult::NotReady;
            }
        }

        if wrapper.lock().await.is_ready() {
            ReadyResult::Continue
        } else {
            ReadyResult::NotReady
        }
    }

    async fn execute(&self, schedule_id: &str, callback: ExecutionCallback) {
        let wrapper = {
            let mut schedules = self.schedules.lock().unwrap();
            match schedules.get_mut(schedule_id) {
                Some(data) => match data.wrapper.clone() {
                    Some(wrapper) => {
                        data.state = ScheduleState::Displaying;
                        Some(wrapper)
                    }
                    None => None,
                },
                None => None,
            }
        };
        let Some(wrapper) = wrapper else {
            error!(schedule_id, "No prepared schedule to execute");
            let _ = callback.send(());
            return;
        };

        self.execution_callbacks
            .lock()
            .unwrap()
            .insert(schedule_id.to_string(), callback);

        let handle = DisplayHandle::new(schedule_id, self.events_tx.clone());
        let mut wrapper_guard = wrapper.lock().await;
        if let Err(err) = wrapper_guard.display(handle) {
            error!(schedule_id, error = %err, "Failed to display message");
            self.call_execution_finished(schedule_id);
            wrapper_guard.adapter_finished();
            return;
        }

        // The guard is held through the display-side fan-out; the finished
        // path takes the same lock before it reports anything, so a
        // synchronous finish cannot overtake the display event.
        if wrapper_guard.message.reporting_enabled {
            let mut event = ReportingEvent::display(schedule_id, &wrapper_guard.message);
            if let Some(context) = self.event_context(schedule_id) {
                event = event.with_context(context);
            }
            self.analytics.add_event(event);
        }

        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_message_displayed(schedule_id, &wrapper_guard.message);
        }
        debug!(schedule_id, "Message displayed");
    }

    async fn handle_resolution(
        &self,
        schedule_id: &str,
        resolution: &ResolutionInfo,
        display_time: Duration,
    ) {
        debug!(schedule_id, ?resolution, "Message resolved");

        let message = {
            let schedules = self.schedules.lock().unwrap();
            let Some(data) = schedules.get(schedule_id) else { return };
            data.message.clone()
        };

        if message.reporting_enabled {
            let mut event =
                ReportingEvent::resolution(schedule_id, &message, display_time, resolution);
            if let Some(context) = self.event_context(schedule_id) {
                event = event.with_context(context);
            }
            self.analytics.add_event(event);
        }
    }

    async fn handle_display_finished(&self, schedule_id: &str, resolution: ResolutionInfo) {
        debug!(schedule_id, "Message finished");

        // Drop the in-flight record so the next trigger of this schedule
        // can prepare from scratch.
        let (wrapper, message) = {
            let mut schedules = self.schedules.lock().unwrap();
            let Some(data) = schedules.get(schedule_id) else { return };
            let Some(wrapper) = data.wrapper.clone() else { return };
            let message = data.message.clone();
            schedules.remove(schedule_id);
            (wrapper, message)
        };

        {
            let mut wrapper = wrapper.lock().await;
            wrapper.display_finished();
            wrapper.adapter_finished();
        }

        let runner = self.action_runner.lock().unwrap().clone();
        if let Some(runner) = runner {
            if !message.actions.is_empty() {
                runner.run_actions(&message.actions);
            }
        }

        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_message_finished(schedule_id, &message, &resolution);
        }

        self.assets.on_display_finished(schedule_id, &message).await;
        self.call_execution_finished(schedule_id);
    }

    async fn execution_invalidated(&self, schedule_id: &str) {
        let removed = self.schedules.lock().unwrap().remove(schedule_id);
        let Some(data) = removed else { return };
        if let Some(chain) = &data.chain {
            chain.cancel();
        }
        self.assets
            .on_display_finished(schedule_id, &data.message)
            .await;
    }

    async fn execution_interrupted(&self, schedule_id: &str, message: Option<&InAppMessage>) {
        let should_report = message.map(|m| m.reporting_enabled).unwrap_or(true);
        if should_report {
            let source = message.map(|m| m.source).unwrap_or(Source::RemoteData);
            self.analytics
                .add_event(ReportingEvent::interrupted(schedule_id, source));
        }
    }

    async fn schedule_finished(&self, schedule_id: &str) {
        if let Some(data) = self.schedules.lock().unwrap().remove(schedule_id) {
            if let Some(chain) = &data.chain {
                chain.cancel();
            }
        }
        self.assets.on_finish(schedule_id).await;
    }
}
