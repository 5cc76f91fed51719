//! Retrying executor
//!
//! Runs an ordered chain of operations where each operation reports whether
//! the chain should continue, re-run the same operation after a backoff
//! delay, or abort entirely. The executor can be paused as a whole; paused
//! chains hold before the next operation run until unpaused.

use std::time::Duration;

use futures_util::future::BoxFuture;
use herald_core::prelude::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Initial delay before the first retry of an operation.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(30);

/// Ceiling for the doubling backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// What an operation wants the chain to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation done, continue with the next one in the chain.
    Finished,
    /// Re-run the same operation after the current backoff delay.
    Retry,
    /// Re-run the same operation after a specific delay, leaving the
    /// backoff progression untouched.
    RetryAfter(Duration),
    /// Abort the whole chain. Remaining operations never run.
    Cancel,
}

/// A unit of work in a chain. Invoked repeatedly until it reports a
/// terminal result; never invoked concurrently with itself.
pub type Operation = Box<dyn FnMut() -> BoxFuture<'static, OperationResult> + Send>;

/// Build an [`Operation`] from an async closure.
pub fn operation<F, Fut>(mut f: F) -> Operation
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = OperationResult> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// Backoff policy for retried operations: starts at `initial` and doubles
/// up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: INITIAL_BACKOFF,
            max: MAX_BACKOFF,
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Handle to a running chain. Dropping the handle cancels the chain.
#[derive(Debug)]
pub struct ChainHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChainHandle {
    /// Cancel the chain. A pending delayed retry is cancelled cleanly and
    /// the operation is not invoked again.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Whether the chain task has finished (completed, cancelled, or aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the chain task to wind down. Test helper.
    pub async fn wait(mut self) {
        // Await by reference: Drop prevents moving the handle out.
        let _ = (&mut self.task).await;
    }
}

impl Drop for ChainHandle {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Executor for retryable operation chains.
#[derive(Debug)]
pub struct RetryingExecutor {
    backoff: Backoff,
    paused_tx: watch::Sender<bool>,
}

impl RetryingExecutor {
    pub fn new(backoff: Backoff) -> Self {
        let (paused_tx, _) = watch::channel(false);
        Self { backoff, paused_tx }
    }

    /// Pause or resume the executor. Chains hold before each operation run
    /// while paused; a resume releases all held chains.
    pub fn set_paused(&self, paused: bool) {
        let _ = self.paused_tx.send(paused);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused_tx.borrow()
    }

    /// Run the operations strictly in order on the tokio runtime.
    pub fn execute(&self, operations: Vec<Operation>) -> ChainHandle {
        let paused_rx = self.paused_tx.subscribe();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let backoff = self.backoff.clone();
        let task = tokio::spawn(run_chain(operations, backoff, paused_rx, cancel_rx));
        ChainHandle { cancel_tx, task }
    }
}

impl Default for RetryingExecutor {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

async fn run_chain(
    operations: Vec<Operation>,
    backoff: Backoff,
    mut paused_rx: watch::Receiver<bool>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    for mut op in operations {
        let mut delay = backoff.initial;
        loop {
            if wait_until_runnable(&mut paused_rx, &mut cancel_rx)
                .await
                .is_err()
            {
                return;
            }

            match op().await {
                OperationResult::Finished => break,
                OperationResult::Cancel => {
                    trace!("Operation cancelled its chain");
                    return;
                }
                OperationResult::Retry => {
                    trace!(?delay, "Operation requested retry");
                    if sleep_unless_cancelled(delay, &mut cancel_rx).await.is_err() {
                        return;
                    }
                    delay = backoff.next(delay);
                }
                OperationResult::RetryAfter(requested) => {
                    trace!(?requested, "Operation requested retry with explicit delay");
                    if sleep_unless_cancelled(requested, &mut cancel_rx)
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
    }
}

/// Wait until the executor is unpaused, bailing out if cancelled.
async fn wait_until_runnable(
    paused_rx: &mut watch::Receiver<bool>,
    cancel_rx: &mut watch::Receiver<bool>,
) -> std::result::Result<(), ()> {
    loop {
        if *cancel_rx.borrow() {
            return Err(());
        }
        if !*paused_rx.borrow() {
            return Ok(());
        }
        tokio::select! {
            changed = paused_rx.changed() => {
                if changed.is_err() {
                    // Executor dropped while paused: the chain can never resume.
                    return Err(());
                }
            }
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    return Err(());
                }
            }
        }
    }
}

async fn sleep_unless_cancelled(
    delay: Duration,
    cancel_rx: &mut watch::Receiver<bool>,
) -> std::result::Result<(), ()> {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return Ok(()),
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    return Err(());
                }
            }
        }
    }
}
