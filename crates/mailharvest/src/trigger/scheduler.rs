//! Periodic and on-demand reconciliation runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Interval;

use super::reconciler::Reconciler;

const TRIGGER_CAPACITY: usize = 16;

/// Runs the manual reconciliation on a fixed interval and on demand.
///
/// A zero interval disables the timer; runs then happen only through
/// [`ReconcileScheduler::trigger`].
pub struct ReconcileScheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    trigger_tx: broadcast::Sender<()>,
    completed_runs: Arc<AtomicUsize>,
}

enum Wake {
    Tick,
    Trigger,
    Closed,
}

impl ReconcileScheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        let (trigger_tx, _) = broadcast::channel(TRIGGER_CAPACITY);
        Self {
            reconciler,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            trigger_tx,
            completed_runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sender for "process all now" requests.
    pub fn trigger_sender(&self) -> broadcast::Sender<()> {
        self.trigger_tx.clone()
    }

    /// Requests an immediate run. Returns false if the loop is not running.
    pub fn trigger(&self) -> bool {
        self.trigger_tx.send(()).is_ok()
    }

    pub fn completed_runs(&self) -> usize {
        self.completed_runs.load(Ordering::Acquire)
    }

    /// Start the loop in a background thread.
    pub fn start(&self) -> JoinHandle<()> {
        let mut trigger_rx = self.trigger_tx.subscribe();
        let reconciler = Arc::clone(&self.reconciler);
        let shutdown = Arc::clone(&self.shutdown);
        let completed_runs = Arc::clone(&self.completed_runs);
        let interval = self.interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to build scheduler runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut timer = (!interval.is_zero()).then(|| tokio::time::interval(interval));
                if let Some(timer) = timer.as_mut() {
                    timer.tick().await; // skip immediate first tick
                }

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    let wake = tokio::select! {
                        _ = tick(&mut timer) => Wake::Tick,
                        received = trigger_rx.recv() => match received {
                            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => Wake::Trigger,
                            Err(broadcast::error::RecvError::Closed) => Wake::Closed,
                        },
                    };

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    match wake {
                        Wake::Closed => break,
                        Wake::Trigger => log::info!("Manual reconciliation triggered"),
                        Wake::Tick => log::debug!("Scheduled reconciliation"),
                    }

                    match reconciler.run_manual() {
                        Ok(report) if report.processed > 0 => {
                            log::info!("Reconciliation processed {} messages", report.processed);
                        }
                        Err(e) => log::error!("Scheduled reconciliation failed: {}", e),
                        _ => {}
                    }
                    completed_runs.fetch_add(1, Ordering::AcqRel);
                }
            });
        })
    }

    /// Signals the scheduler to stop and wakes the loop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.trigger_tx.send(());
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
