pub mod config;
pub mod error;
pub mod harvester;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod provider;
pub mod service;
pub mod storage;
pub mod trigger;

pub use config::{load_config, Config, LogFormat};
pub use error::{
    ConfigError, HarvestError, ProcessError, ProviderError, Result, StorageError,
};
pub use harvester::{HarvestStats, Harvester, MessageStream};
pub use index::{ProcessedIndex, ProcessedRecord, ProcessedStore};
pub use pipeline::{Pipeline, PipelineError, ProcessingContext, ProcessingStep, StepOutcome};
pub use processor::{BatchReport, EmailProcessor};
pub use provider::{
    ChangeCursor, ChangeRecord, InMemoryMailbox, MailProvider, Message, SearchCriteria,
};
pub use service::{HarvestService, RunningService};
pub use storage::{RecordSink, RotatingRecordStore};
pub use trigger::{
    AckHandle, Notification, NotificationDispatcher, ReconcileOutcome, ReconcileScheduler,
    Reconciler, WatchManager,
};
