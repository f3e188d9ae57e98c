//! Entry points that start reconciliation runs: manual calls, push
//! notifications, and the periodic scheduler.

pub mod dispatcher;
pub mod notification;
pub mod reconciler;
pub mod scheduler;
pub mod watch;

pub use crate::provider::ChangeCursor;
pub use dispatcher::NotificationDispatcher;
pub use notification::{parse_change_cursor, AckGuard, AckHandle, Notification};
pub use reconciler::{ChangeSignal, ReconcileOutcome, Reconciler};
pub use scheduler::ReconcileScheduler;
pub use watch::WatchManager;
