//! Recurring batch schedule.
//!
//! Runs one batch immediately, then one every `interval` on a background
//! thread. Batches never overlap. A fatal batch error stops the schedule;
//! file-level errors are only logged.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::runner::{BatchError, BatchRunner};

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(200);

/// Handle for the schedule thread.
///
/// Dropping the handle requests shutdown and waits for the running batch.
pub struct BatchScheduleHandle {
    shutdown: Arc<AtomicBool>,
    batches: Arc<AtomicUsize>,
    handle: Option<JoinHandle<Result<(), BatchError>>>,
}

impl BatchScheduleHandle {
    /// Request graceful shutdown. A batch in progress completes, no new batch starts.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Batches completed so far, successful or not.
    pub fn batches_run(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    /// Wait for the thread to exit. Returns the fatal error that stopped it, if any.
    pub fn join(mut self) -> Result<(), BatchError> {
        match self.handle.take() {
            Some(h) => h.join().unwrap_or_else(|_| {
                tracing::error!("Batch schedule thread panicked");
                Ok(())
            }),
            None => Ok(()),
        }
    }
}

impl Drop for BatchScheduleHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the schedule on its own thread.
pub fn start_schedule(runner: BatchRunner, interval: Duration) -> BatchScheduleHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let batches = Arc::new(AtomicUsize::new(0));
    let flag = shutdown.clone();
    let counter = batches.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "Batch schedule started");
        let result = schedule_loop(&runner, interval, &flag, &counter);
        tracing::info!("Batch schedule shutting down");
        result
    });

    BatchScheduleHandle {
        shutdown,
        batches,
        handle: Some(handle),
    }
}

fn schedule_loop(
    runner: &BatchRunner,
    interval: Duration,
    shutdown: &AtomicBool,
    batches: &AtomicUsize,
) -> Result<(), BatchError> {
    while !shutdown.load(Ordering::Relaxed) {
        let result = runner.run_batch();
        batches.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(summary) if !summary.errors.is_empty() => {
                tracing::warn!(
                    errors = summary.errors.len(),
                    "Batch finished with screenshots left pending"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Batch aborted, stopping schedule");
                return Err(e);
            }
        }

        sleep_until_next(interval, shutdown);
    }
    Ok(())
}

fn sleep_until_next(interval: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(SLEEP_GRANULARITY.min(deadline - now));
    }
}
