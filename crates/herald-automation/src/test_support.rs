//! Configurable collaborator doubles shared by unit and integration tests.
//!
//! Available to downstream crates through the `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use herald_core::{
    DisplayContent, Error, InAppMessage, ReportingEvent, ResolutionInfo, Result,
};

use crate::adapter::{AdapterFactory, DisplayHandle, InAppMessageAdapter, PrepareResult};
use crate::analytics::Analytics;
use crate::assets::{AssetManager, Assets, MessageSupplier};
use crate::coordinator::{DisplayCoordinator, DisplayReadyCallback};
use crate::manager::{ActionRunner, InAppMessageListener};
use crate::remote::RemoteDataSource;

/// A banner message with no frills.
pub fn banner_message() -> InAppMessage {
    InAppMessage::builder(DisplayContent::Banner(json!({ "body": "hi" })))
        .build()
        .unwrap()
}

// ─────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────

/// Scriptable adapter. Prepare outcomes are consumed from a queue (empty
/// queue means `Ok`); readiness and display behavior are toggled through
/// shared handles so tests keep control after the adapter is boxed.
pub struct TestAdapter {
    prepare_outcomes: Arc<Mutex<VecDeque<Result<PrepareResult>>>>,
    prepare_calls: Arc<AtomicUsize>,
    ready: Arc<AtomicBool>,
    ready_error: Option<Error>,
    display_error: Option<Error>,
    display_calls: Arc<AtomicUsize>,
    finish_calls: Arc<AtomicUsize>,
    finish_on_display: Option<(ResolutionInfo, Duration)>,
    last_handle: Arc<Mutex<Option<DisplayHandle>>>,
}

impl TestAdapter {
    pub fn new() -> Self {
        Self {
            prepare_outcomes: Arc::new(Mutex::new(VecDeque::new())),
            prepare_calls: Arc::new(AtomicUsize::new(0)),
            ready: Arc::new(AtomicBool::new(true)),
            ready_error: None,
            display_error: None,
            display_calls: Arc::new(AtomicUsize::new(0)),
            finish_calls: Arc::new(AtomicUsize::new(0)),
            finish_on_display: None,
            last_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue prepare results, consumed in order. Once drained, further
    /// prepares succeed.
    pub fn with_prepare_results(self, results: impl IntoIterator<Item = PrepareResult>) -> Self {
        self.prepare_outcomes
            .lock()
            .unwrap()
            .extend(results.into_iter().map(Ok));
        self
    }

    pub fn with_prepare_error(self, error: Error) -> Self {
        self.prepare_outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_ready(self, ready: bool) -> Self {
        self.ready.store(ready, Ordering::SeqCst);
        self
    }

    pub fn with_ready_error(mut self, error: Error) -> Self {
        self.ready_error = Some(error);
        self
    }

    pub fn with_display_error(mut self, error: Error) -> Self {
        self.display_error = Some(error);
        self
    }

    /// Resolve the display synchronously from within `on_display`.
    pub fn with_synchronous_finish(
        mut self,
        resolution: ResolutionInfo,
        display_time: Duration,
    ) -> Self {
        self.finish_on_display = Some((resolution, display_time));
        self
    }

    /// Shared readiness toggle, usable after the adapter is boxed.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    pub fn prepare_count(&self) -> Arc<AtomicUsize> {
        self.prepare_calls.clone()
    }

    pub fn display_count(&self) -> Arc<AtomicUsize> {
        self.display_calls.clone()
    }

    pub fn finish_count(&self) -> Arc<AtomicUsize> {
        self.finish_calls.clone()
    }

    /// The handle from the most recent display, for resolving it later.
    pub fn display_handle(&self) -> Arc<Mutex<Option<DisplayHandle>>> {
        self.last_handle.clone()
    }
}

impl Default for TestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InAppMessageAdapter for TestAdapter {
    async fn on_prepare(&mut self, _assets: Option<Assets>) -> Result<PrepareResult> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        match self.prepare_outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(PrepareResult::Ok),
        }
    }

    fn is_ready(&self) -> Result<bool> {
        if let Some(error) = &self.ready_error {
            return Err(Error::adapter(error.to_string()));
        }
        Ok(self.ready.load(Ordering::SeqCst))
    }

    fn on_display(&mut self, handle: DisplayHandle) -> Result<()> {
        if let Some(error) = &self.display_error {
            return Err(Error::display(error.to_string()));
        }
        self.display_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((resolution, display_time)) = &self.finish_on_display {
            handle.finished(resolution.clone(), *display_time);
        }
        *self.last_handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn on_finish(&mut self) {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory that hands out one prebuilt adapter, then errors.
pub struct SingleUseFactory {
    adapter: Mutex<Option<Box<dyn InAppMessageAdapter>>>,
}

impl SingleUseFactory {
    pub fn new(adapter: TestAdapter) -> Arc<Self> {
        Arc::new(Self {
            adapter: Mutex::new(Some(Box::new(adapter))),
        })
    }
}

impl AdapterFactory for SingleUseFactory {
    fn create_adapter(&self, _message: &InAppMessage) -> Result<Box<dyn InAppMessageAdapter>> {
        self.adapter
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::adapter("factory already used"))
    }
}

// ─────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────

/// Coordinator that records lifecycle calls in order.
pub struct RecordingCoordinator {
    calls: Mutex<Vec<&'static str>>,
    ready: AtomicBool,
}

impl RecordingCoordinator {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for RecordingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayCoordinator for RecordingCoordinator {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn on_display_started(&self, _message: &InAppMessage) {
        self.calls.lock().unwrap().push("started");
    }

    fn on_display_finished(&self, _message: &InAppMessage) {
        self.calls.lock().unwrap().push("finished");
    }

    fn set_display_ready_callback(&self, _callback: Option<DisplayReadyCallback>) {}
}

// ─────────────────────────────────────────────────────────
// Collaborator stubs
// ─────────────────────────────────────────────────────────

/// Asset manager with scriptable prepare outcomes and full call recording.
pub struct StubAssetManager {
    prepare_outcomes: Mutex<VecDeque<Result<PrepareResult>>>,
    prepare_calls: AtomicUsize,
    scheduled: Mutex<Vec<String>>,
    display_finished: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    assets: Mutex<HashMap<String, Assets>>,
}

impl StubAssetManager {
    pub fn new() -> Self {
        Self {
            prepare_outcomes: Mutex::new(VecDeque::new()),
            prepare_calls: AtomicUsize::new(0),
            scheduled: Mutex::new(Vec::new()),
            display_finished: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            assets: Mutex::new(HashMap::new()),
        }
    }

    /// Queue prepare results, consumed in order; once drained, prepares
    /// succeed.
    pub fn with_prepare_results(self, results: impl IntoIterator<Item = PrepareResult>) -> Self {
        self.prepare_outcomes
            .lock()
            .unwrap()
            .extend(results.into_iter().map(Ok));
        self
    }

    pub fn insert_assets(&self, schedule_id: &str, assets: Assets) {
        self.assets
            .lock()
            .unwrap()
            .insert(schedule_id.to_string(), assets);
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn display_finished_ids(&self) -> Vec<String> {
        self.display_finished.lock().unwrap().clone()
    }

    pub fn finished_ids(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl Default for StubAssetManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetManager for StubAssetManager {
    async fn on_schedule(&self, schedule_id: &str, _message: MessageSupplier) {
        self.scheduled.lock().unwrap().push(schedule_id.to_string());
    }

    async fn on_prepare(
        &self,
        schedule_id: &str,
        _message: &InAppMessage,
    ) -> Result<PrepareResult> {
        let _ = schedule_id;
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        match self.prepare_outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(PrepareResult::Ok),
        }
    }

    async fn on_display_finished(&self, schedule_id: &str, _message: &InAppMessage) {
        self.display_finished
            .lock()
            .unwrap()
            .push(schedule_id.to_string());
    }

    async fn on_finish(&self, schedule_id: &str) {
        self.finished.lock().unwrap().push(schedule_id.to_string());
    }

    async fn get_assets(&self, schedule_id: &str) -> Option<Assets> {
        self.assets.lock().unwrap().get(schedule_id).cloned()
    }
}

/// Analytics sink that records every event.
pub struct RecordingAnalytics {
    events: Mutex<Vec<ReportingEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<ReportingEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for RecordingAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Analytics for RecordingAnalytics {
    fn add_event(&self, event: ReportingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Remote-data source with a toggleable staleness verdict.
pub struct StubRemoteData {
    current: AtomicBool,
}

impl StubRemoteData {
    pub fn new(current: bool) -> Self {
        Self {
            current: AtomicBool::new(current),
        }
    }

    pub fn set_current(&self, current: bool) {
        self.current.store(current, Ordering::SeqCst);
    }
}

impl RemoteDataSource for StubRemoteData {
    fn is_metadata_current(&self, _metadata: Option<&Value>) -> bool {
        self.current.load(Ordering::SeqCst)
    }
}

/// Listener that records displayed and finished notifications.
pub struct RecordingListener {
    displayed: Mutex<Vec<String>>,
    finished: Mutex<Vec<(String, ResolutionInfo)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            displayed: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn displayed_ids(&self) -> Vec<String> {
        self.displayed.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<(String, ResolutionInfo)> {
        self.finished.lock().unwrap().clone()
    }
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl InAppMessageListener for RecordingListener {
    fn on_message_displayed(&self, schedule_id: &str, _message: &InAppMessage) {
        self.displayed.lock().unwrap().push(schedule_id.to_string());
    }

    fn on_message_finished(
        &self,
        schedule_id: &str,
        _message: &InAppMessage,
        resolution: &ResolutionInfo,
    ) {
        self.finished
            .lock()
            .unwrap()
            .push((schedule_id.to_string(), resolution.clone()));
    }
}

/// Action runner that records every action batch it is handed.
pub struct RecordingActionRunner {
    runs: Mutex<Vec<HashMap<String, Value>>>,
}

impl RecordingActionRunner {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<HashMap<String, Value>> {
        self.runs.lock().unwrap().clone()
    }
}

impl Default for RecordingActionRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRunner for RecordingActionRunner {
    fn run_actions(&self, actions: &HashMap<String, Value>) {
        self.runs.lock().unwrap().push(actions.clone());
    }
}
