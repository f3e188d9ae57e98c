use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::error::{HarvestError, Result};

use super::notification::Notification;
use super::reconciler::Reconciler;

/// Fans notification deliveries out to a fixed set of worker threads.
pub struct NotificationDispatcher {
    sender: Sender<Notification>,
    receiver: Receiver<Notification>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl NotificationDispatcher {
    /// Starts `worker_count` workers reading from a queue of `queue_capacity`.
    pub fn new(
        reconciler: Arc<Reconciler>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self> {
        if worker_count == 0 {
            return Err(HarvestError::Worker(
                "worker_count must be > 0".to_string(),
            ));
        }

        let (sender, receiver) = bounded::<Notification>(queue_capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let rx = receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_reconciler = Arc::clone(&reconciler);

            let handle = thread::Builder::new()
                .name(format!("notify-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, rx, shutdown_flag, worker_reconciler))
                .map_err(|e| HarvestError::Worker(format!("failed to spawn worker: {}", e)))?;

            workers.push(handle);
        }

        info!("Started {} notification workers", worker_count);

        Ok(Self {
            sender,
            receiver,
            workers,
            shutdown,
        })
    }

    /// Queues a delivery. Blocks while the queue is full.
    pub fn submit(&self, notification: Notification) -> Result<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(HarvestError::Worker("dispatcher is shut down".to_string()));
        }

        self.sender
            .send(notification)
            .map_err(|_| HarvestError::Worker("notification channel closed".to_string()))
    }

    pub fn shutdown(&self) {
        info!("Shutting down notification dispatcher...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Joins the workers, then acks every delivery still queued without
    /// running it. The next trigger picks up whatever they announced.
    pub fn wait(self) {
        drop(self.sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Notification worker {} panicked: {:?}", i, e);
            } else {
                debug!("Notification worker {} finished", i);
            }
        }

        let mut leftover = 0;
        for notification in self.receiver.try_iter() {
            notification.ack.ack();
            leftover += 1;
        }
        if leftover > 0 {
            warn!("Acked {} queued notifications without processing", leftover);
        }

        info!("All notification workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    receiver: Receiver<Notification>,
    shutdown: Arc<AtomicBool>,
    reconciler: Arc<Reconciler>,
) {
    debug!("Notification worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Notification worker {} received shutdown signal", worker_id);
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(notification) => {
                let outcome = reconciler.handle(notification);
                debug!(
                    "Notification worker {} finished run (success: {})",
                    worker_id,
                    outcome.succeeded()
                );
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Notification worker {} channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Notification worker {} stopped", worker_id);
}
