//! Background loop driving reconciliation cycles.
//!
//! The supervisor owns at most one loop worker. Cycles from the loop and
//! from manual triggers share a gate, so two cycles never run at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::reconciler::{CancellationToken, CycleOutcome, Reconciler};
use crate::state::{DaemonStatus, StateRegister};

struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Starts, stops and reschedules the reconciliation loop.
pub struct Supervisor {
    reconciler: Arc<Reconciler>,
    state: Arc<StateRegister>,
    /// Held for the duration of every cycle.
    gate: Arc<Mutex<()>>,
    worker: Mutex<Option<LoopHandle>>,
    loop_active: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        let state = Arc::clone(reconciler.state());
        Self {
            reconciler,
            state,
            gate: Arc::new(Mutex::new(())),
            worker: Mutex::new(None),
            loop_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> &Arc<StateRegister> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.loop_active.load(Ordering::SeqCst)
    }

    /// Run a cycle now, then one every `interval`. Returns false when the
    /// loop is already running.
    pub async fn start(&self, interval: Duration) -> bool {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return false;
        }
        info!(interval_secs = interval.as_secs(), "Starting reconciliation loop");
        *worker = Some(self.spawn_loop(interval, Duration::ZERO));
        true
    }

    /// Cancel the loop and wait for it to wind down. Returns false when it
    /// was not running.
    pub async fn stop(&self) -> bool {
        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            return false;
        };
        info!("Stopping reconciliation loop");
        self.shutdown(handle).await;
        self.state.set_status(DaemonStatus::Stopped);
        true
    }

    /// Cancel the current loop and schedule the next cycle `interval` after
    /// the previous one has finished, repeating every `interval`.
    pub async fn reset(&self, interval: Duration) {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            self.shutdown(handle).await;
        }
        info!(interval_secs = interval.as_secs(), "Rescheduling reconciliation loop");
        *worker = Some(self.spawn_loop(interval, interval));
    }

    /// Run one cycle on a background task without blocking the caller.
    ///
    /// Waits for any cycle in flight; afterwards the status reflects the
    /// loop again (running or stopped).
    pub fn trigger_check(&self) -> JoinHandle<CycleOutcome> {
        let reconciler = Arc::clone(&self.reconciler);
        let state = Arc::clone(&self.state);
        let gate = Arc::clone(&self.gate);
        let loop_active = Arc::clone(&self.loop_active);

        tokio::spawn(async move {
            let _guard = gate.lock().await;
            debug!("Manual check started");
            state.set_status(DaemonStatus::Checking);
            let outcome = reconciler.run_once(&CancellationToken::new()).await;
            state.set_status(if loop_active.load(Ordering::SeqCst) {
                DaemonStatus::Running
            } else {
                DaemonStatus::Stopped
            });
            outcome
        })
    }

    fn spawn_loop(&self, interval: Duration, first_delay: Duration) -> LoopHandle {
        let cancel = CancellationToken::new();
        self.loop_active.store(true, Ordering::SeqCst);
        self.state.set_status(DaemonStatus::Running);

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.reconciler),
            Arc::clone(&self.state),
            Arc::clone(&self.gate),
            cancel.clone(),
            interval,
            first_delay,
        ));
        LoopHandle { cancel, task }
    }

    async fn shutdown(&self, handle: LoopHandle) {
        handle.cancel.cancel();
        self.loop_active.store(false, Ordering::SeqCst);
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Reconciliation loop ended abnormally");
        }
    }
}

async fn run_loop(
    reconciler: Arc<Reconciler>,
    state: Arc<StateRegister>,
    gate: Arc<Mutex<()>>,
    cancel: CancellationToken,
    interval: Duration,
    first_delay: Duration,
) {
    let mut delay = first_delay;
    loop {
        if !delay.is_zero() {
            state.set_status(DaemonStatus::Running);
            if cancel
                .run_until_cancelled(tokio::time::sleep(delay))
                .await
                .is_none()
            {
                break;
            }
        }

        let Some(_guard) = cancel.run_until_cancelled(gate.lock()).await else {
            break;
        };
        state.set_status(DaemonStatus::Checking);
        let outcome = reconciler.run_once(&cancel).await;
        if matches!(outcome, CycleOutcome::Cancelled) || cancel.is_cancelled() {
            break;
        }
        delay = interval;
    }
    debug!("Reconciliation loop exited");
}
