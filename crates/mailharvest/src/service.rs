//! Wires every component from a [`Config`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::harvester::Harvester;
use crate::index::ProcessedIndex;
use crate::pipeline::Pipeline;
use crate::processor::{BatchReport, EmailProcessor};
use crate::provider::{MailProvider, SearchCriteria, WatchRegistration};
use crate::storage::{ensure_directory, RecordFileNaming, RotatingRecordStore};
use crate::trigger::{
    Notification, NotificationDispatcher, ReconcileScheduler, Reconciler, WatchManager,
};

/// Fully assembled ingestion service.
pub struct HarvestService {
    config: Config,
    provider: Arc<dyn MailProvider>,
    index: Arc<ProcessedIndex>,
    processor: Arc<EmailProcessor>,
    reconciler: Arc<Reconciler>,
}

impl HarvestService {
    /// Builds the service. Fails if the storage directory cannot be created.
    pub fn new(config: Config, provider: Arc<dyn MailProvider>) -> Result<Self> {
        let storage = config.storage_path();
        ensure_directory(&storage)?;

        let index = Arc::new(ProcessedIndex::new(&storage));
        let sink = Arc::new(RotatingRecordStore::new(
            &storage,
            RecordFileNaming::new(
                config.storage.record_file_prefix.clone(),
                config.storage.record_file_extension.clone(),
            ),
        ));

        let pipeline = Pipeline::standard(
            index.clone(),
            sink,
            Arc::clone(&provider),
            &config.user_id,
        );

        let criteria = SearchCriteria::builder()
            .user_id(config.user_id.clone())
            .label_ids(config.label_ids.clone())
            .max_results(config.max_results)
            .query(config.query.clone())
            .build();

        let processor = Arc::new(EmailProcessor::new(
            Harvester::new(Arc::clone(&provider), config.progress_log_interval),
            Arc::new(pipeline),
            criteria,
        ));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&processor),
            Arc::clone(&provider),
            config.user_id.clone(),
        ));

        info!(
            "Harvest service ready (provider: {}, storage: {})",
            provider.name(),
            storage.display()
        );

        Ok(Self {
            config,
            provider,
            index,
            processor,
            reconciler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn MailProvider> {
        &self.provider
    }

    pub fn index(&self) -> &Arc<ProcessedIndex> {
        &self.index
    }

    pub fn processor(&self) -> &Arc<EmailProcessor> {
        &self.processor
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Manual "process all now".
    pub fn process_all(&self) -> Result<BatchReport> {
        self.reconciler.run_manual()
    }

    /// Registers the push watch if a topic is configured.
    pub fn start_watch(&self) -> Result<Option<WatchRegistration>> {
        WatchManager::new(
            Arc::clone(&self.provider),
            self.config.user_id.clone(),
            self.config.watch_topic.clone(),
        )
        .start()
    }

    pub fn dispatcher(&self) -> Result<NotificationDispatcher> {
        NotificationDispatcher::new(
            Arc::clone(&self.reconciler),
            self.config.notification.workers,
            self.config.notification.effective_queue_capacity(),
        )
    }

    pub fn scheduler(&self) -> ReconcileScheduler {
        ReconcileScheduler::new(
            Arc::clone(&self.reconciler),
            Duration::from_secs(self.config.reconcile_interval_secs),
        )
    }

    /// Registers the watch, then starts the dispatcher and scheduler.
    pub fn start(&self) -> Result<RunningService> {
        let watch = self.start_watch()?;
        let dispatcher = self.dispatcher()?;
        let scheduler = self.scheduler();
        let scheduler_handle = scheduler.start();

        Ok(RunningService {
            watch,
            dispatcher,
            scheduler,
            scheduler_handle,
        })
    }
}

/// Background parts of a started service.
pub struct RunningService {
    watch: Option<WatchRegistration>,
    dispatcher: NotificationDispatcher,
    scheduler: ReconcileScheduler,
    scheduler_handle: JoinHandle<()>,
}

impl RunningService {
    pub fn watch(&self) -> Option<&WatchRegistration> {
        self.watch.as_ref()
    }

    /// Feeds one transport delivery to the dispatcher.
    pub fn deliver(&self, notification: Notification) -> Result<()> {
        self.dispatcher.submit(notification)
    }

    /// Requests an immediate reconciliation on the scheduler thread.
    pub fn trigger(&self) -> bool {
        self.scheduler.trigger()
    }

    pub fn completed_scheduled_runs(&self) -> usize {
        self.scheduler.completed_runs()
    }

    /// Stops the scheduler and dispatcher and waits for both.
    pub fn shutdown(self) {
        self.scheduler.stop();
        self.dispatcher.shutdown();

        if self.scheduler_handle.join().is_err() {
            error!("Reconcile scheduler thread panicked");
        }
        self.dispatcher.wait();
    }
}
