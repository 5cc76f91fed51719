//! End-to-end lifecycle tests through the driver contract, the way an
//! automation engine would drive the core.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use herald::automation::test_support::{
    banner_message, RecordingActionRunner, RecordingAnalytics, RecordingListener,
    SingleUseFactory, StubAssetManager, StubRemoteData, TestAdapter,
};
use herald::automation::{
    AdapterFactory, AutomationDriver, InAppMessageDriver, InAppMessageManager,
    PrepareScheduleResult, ReadyResult, Schedule,
};
use herald::{DisplayType, ResolutionInfo, ResolutionType};

struct World {
    manager: InAppMessageManager,
    driver: InAppMessageDriver,
    assets: Arc<StubAssetManager>,
    analytics: Arc<RecordingAnalytics>,
    remote: Arc<StubRemoteData>,
}

fn world() -> World {
    let assets = Arc::new(StubAssetManager::new());
    let analytics = Arc::new(RecordingAnalytics::new());
    let remote = Arc::new(StubRemoteData::new(true));
    let manager = InAppMessageManager::new(assets.clone(), analytics.clone(), remote.clone());
    manager.on_ready();
    let driver = InAppMessageDriver::new(manager.clone());
    World {
        manager,
        driver,
        assets,
        analytics,
        remote,
    }
}

fn factory(adapter: TestAdapter) -> Arc<dyn AdapterFactory> {
    SingleUseFactory::new(adapter)
}

fn schedule(id: &str) -> Schedule {
    Schedule {
        id: id.to_string(),
        metadata: None,
        trigger_session_id: Some("session-1".to_string()),
        message: banner_message(),
    }
}

async fn prepare(world: &World, schedule: &Schedule) -> PrepareScheduleResult {
    let (tx, rx) = oneshot::channel();
    world.driver.on_prepare_schedule(schedule, None, tx).await;
    rx.await.unwrap()
}

async fn execute(world: &World, schedule: &Schedule) {
    let (tx, done) = oneshot::channel();
    world.driver.on_execute_triggered_schedule(schedule, tx).await;
    done.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle_reports_display_and_resolution_once() {
    let world = world();
    let adapter = TestAdapter::new()
        .with_synchronous_finish(ResolutionInfo::dismissed(), Duration::from_millis(100));
    let finishes = adapter.finish_count();
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(adapter)));
    let listener = Arc::new(RecordingListener::new());
    world.manager.add_listener(listener.clone());

    let schedule = schedule("s1");
    assert_eq!(
        prepare(&world, &schedule).await,
        PrepareScheduleResult::Continue
    );
    assert_eq!(
        world.driver.on_check_execution_readiness(&schedule).await,
        ReadyResult::Continue
    );

    execute(&world, &schedule).await;

    // Display before resolution, exactly once each, even though the adapter
    // resolved synchronously inside its display call.
    assert_eq!(listener.displayed_ids(), vec!["s1"]);
    let finished = listener.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(
        finished[0].1.resolution_type,
        ResolutionType::UserDismissed
    );

    let events = world.analytics.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type(), "in_app_display");
    assert_eq!(events[1].event_type(), "in_app_resolution");

    let resolution = &events[1].payload()["body"]["resolution"];
    assert_eq!(resolution["type"], "user_dismissed");
    assert_eq!(resolution["display_time"], "0.100");
    assert_eq!(
        events[1].payload()["context"]["trigger_session_id"],
        "session-1"
    );

    // The adapter and asset manager were both released.
    assert_eq!(finishes.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(world.assets.display_finished_ids(), vec!["s1"]);

    world
        .manager
        .on_message_schedule_finished(&schedule.id)
        .await;
    assert_eq!(world.assets.finished_ids(), vec!["s1"]);
}

#[tokio::test(start_paused = true)]
async fn test_reporting_disabled_suppresses_events_but_not_cleanup() {
    let world = world();
    let adapter = TestAdapter::new()
        .with_synchronous_finish(ResolutionInfo::message_clicked(), Duration::from_secs(1));
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(adapter)));
    let listener = Arc::new(RecordingListener::new());
    world.manager.add_listener(listener.clone());

    let mut schedule = schedule("s1");
    schedule.message.reporting_enabled = false;

    assert_eq!(
        prepare(&world, &schedule).await,
        PrepareScheduleResult::Continue
    );
    execute(&world, &schedule).await;

    assert!(world.analytics.events().is_empty());
    // Everything else still ran.
    assert_eq!(listener.finished().len(), 1);
    assert_eq!(world.assets.display_finished_ids(), vec!["s1"]);
}

#[tokio::test(start_paused = true)]
async fn test_deferred_resolution_via_display_handle() {
    let world = world();
    let adapter = TestAdapter::new();
    let handle = adapter.display_handle();
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(adapter)));

    let schedule = schedule("s1");
    prepare(&world, &schedule).await;

    let (tx, mut done) = oneshot::channel();
    world
        .driver
        .on_execute_triggered_schedule(&schedule, tx)
        .await;

    // On screen: execution is held open until the UI resolves it.
    assert!(done.try_recv().is_err());

    let handle = handle.lock().unwrap().take().unwrap();
    handle.finished(
        ResolutionInfo::button_pressed(herald::ButtonInfo {
            id: "ok".to_string(),
            description: None,
        }),
        Duration::from_secs(3),
    );
    done.await.unwrap();

    let events = world.analytics.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1].payload()["body"]["resolution"]["type"],
        "button_click"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_synchronous_finish_never_overtakes_display_reporting() {
    // The finish signal is queued while the display call is still on the
    // stack; the ordering must hold even when the event loop runs on
    // another worker thread. Repeated to give a regression a chance to
    // interleave.
    for attempt in 0..25 {
        let world = world();
        let adapter = TestAdapter::new()
            .with_synchronous_finish(ResolutionInfo::dismissed(), Duration::from_millis(50));
        world
            .manager
            .set_adapter_factory(DisplayType::Banner, Some(factory(adapter)));
        let listener = Arc::new(RecordingListener::new());
        world.manager.add_listener(listener.clone());

        let schedule = schedule(&format!("s{attempt}"));
        assert_eq!(
            prepare(&world, &schedule).await,
            PrepareScheduleResult::Continue
        );
        execute(&world, &schedule).await;

        let kinds: Vec<_> = world
            .analytics
            .events()
            .iter()
            .map(|event| event.event_type())
            .collect();
        assert_eq!(
            kinds,
            vec!["in_app_display", "in_app_resolution"],
            "attempt {attempt}"
        );
        assert_eq!(listener.displayed_ids().len(), 1);
        assert_eq!(listener.finished().len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_display_interval_gates_the_next_message() {
    let world = world();
    world.manager.set_display_interval(Duration::from_secs(30));

    let first = TestAdapter::new()
        .with_synchronous_finish(ResolutionInfo::dismissed(), Duration::from_secs(1));
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(first)));

    let first_schedule = schedule("s1");
    prepare(&world, &first_schedule).await;
    execute(&world, &first_schedule).await;
    world
        .manager
        .on_message_schedule_finished(&first_schedule.id)
        .await;

    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(TestAdapter::new())));
    let second_schedule = schedule("s2");
    assert_eq!(
        prepare(&world, &second_schedule).await,
        PrepareScheduleResult::Continue
    );

    // Cooldown in effect.
    assert_eq!(
        world
            .driver
            .on_check_execution_readiness(&second_schedule)
            .await,
        ReadyResult::NotReady
    );

    tokio::time::sleep(Duration::from_secs(30) + Duration::from_millis(1)).await;
    assert_eq!(
        world
            .driver
            .on_check_execution_readiness(&second_schedule)
            .await,
        ReadyResult::Continue
    );
}

#[tokio::test(start_paused = true)]
async fn test_stale_metadata_invalidates_before_and_after_prepare() {
    let world = world();
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(TestAdapter::new())));

    let schedule = schedule("s1");
    assert_eq!(
        prepare(&world, &schedule).await,
        PrepareScheduleResult::Continue
    );

    world.remote.set_current(false);
    assert_eq!(
        world.driver.on_check_execution_readiness(&schedule).await,
        ReadyResult::Invalidate
    );
}

#[tokio::test(start_paused = true)]
async fn test_actions_run_after_display_finishes() {
    let world = world();
    let adapter = TestAdapter::new()
        .with_synchronous_finish(ResolutionInfo::dismissed(), Duration::from_secs(1));
    world
        .manager
        .set_adapter_factory(DisplayType::Banner, Some(factory(adapter)));
    let runner = Arc::new(RecordingActionRunner::new());
    world.manager.set_action_runner(Some(runner.clone()));

    let mut schedule = schedule("s1");
    schedule.message.actions.insert(
        "deep_link_action".to_string(),
        serde_json::json!("app://inbox"),
    );

    prepare(&world, &schedule).await;
    execute(&world, &schedule).await;

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["deep_link_action"], serde_json::json!("app://inbox"));
}
