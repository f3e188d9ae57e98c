//! Manual and notification-driven reconciliation runs.
//!
//! Every entry point ends in the same full harvest. A notification's change
//! history is resolved only as a signal for logging; it never narrows or
//! gates the run. The index makes repeated runs cheap.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::processor::{BatchReport, EmailProcessor};
use crate::provider::{ChangeCursor, ChangeRecord, MailProvider};

use super::notification::{parse_change_cursor, AckGuard, AckHandle, Notification};

/// Best-effort change detail. `None` (resolution failed) and an empty list
/// are handled the same way.
pub type ChangeSignal = Option<Vec<ChangeRecord>>;

/// What a notification-triggered run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Cursor parsed from the payload, if any.
    pub cursor: Option<ChangeCursor>,
    /// Message ids named by the change signal. Informational.
    pub signalled_changes: usize,
    pub report: Option<BatchReport>,
    pub error: Option<String>,
}

impl ReconcileOutcome {
    pub fn succeeded(&self) -> bool {
        self.report.is_some()
    }
}

pub struct Reconciler {
    processor: Arc<EmailProcessor>,
    provider: Arc<dyn MailProvider>,
    user_id: String,
}

impl Reconciler {
    pub fn new(
        processor: Arc<EmailProcessor>,
        provider: Arc<dyn MailProvider>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            provider,
            user_id: user_id.into(),
        }
    }

    pub fn processor(&self) -> &Arc<EmailProcessor> {
        &self.processor
    }

    /// Harvests the inbox with the default criteria and processes everything
    /// not yet in the index. Blocks until done.
    pub fn run_manual(&self) -> Result<BatchReport> {
        let run_id = Uuid::new_v4();
        let _span = info_span!("reconcile", run_id = %run_id, source = "manual").entered();
        info!("Manual reconciliation started");
        self.processor.process_all()
    }

    pub fn handle(&self, notification: Notification) -> ReconcileOutcome {
        self.handle_notification(&notification.payload, notification.ack)
    }

    /// Handles one notification delivery.
    ///
    /// The delivery is acked when this returns or unwinds, whatever the run
    /// outcome. It is never nacked.
    pub fn handle_notification(&self, payload: &[u8], ack: Box<dyn AckHandle>) -> ReconcileOutcome {
        let _ack = AckGuard::new(ack);
        let run_id = Uuid::new_v4();
        let _span =
            info_span!("reconcile", run_id = %run_id, source = "notification").entered();

        debug!("Notification received: {}", String::from_utf8_lossy(payload));

        let cursor = parse_change_cursor(payload);
        let signal = match cursor {
            Some(cursor) => self.resolve_signal(cursor),
            None => {
                warn!("Notification carried no usable cursor, running safety re-scan");
                None
            }
        };

        self.reconcile(cursor, signal)
    }

    /// Resolves changes since `cursor`. Failures are logged and folded into
    /// `None`.
    pub fn resolve_signal(&self, cursor: ChangeCursor) -> ChangeSignal {
        match self.provider.resolve_changes(&self.user_id, cursor) {
            Ok(changes) => Some(changes),
            Err(e) => {
                warn!("Could not resolve changes since {}: {}", cursor, e);
                None
            }
        }
    }

    /// Runs the full harvest. `signal` only feeds the log line.
    pub fn reconcile(&self, cursor: Option<ChangeCursor>, signal: ChangeSignal) -> ReconcileOutcome {
        let changes = signal.unwrap_or_default();
        let signalled_changes: usize = changes.iter().map(|c| c.message_ids.len()).sum();

        if signalled_changes == 0 {
            info!("No change detail available, re-scanning inbox");
        } else {
            info!(
                "{} changed messages signalled, re-scanning inbox",
                signalled_changes
            );
        }

        match self.processor.process_all() {
            Ok(report) => ReconcileOutcome {
                cursor,
                signalled_changes,
                report: Some(report),
                error: None,
            },
            Err(e) => {
                error!("Reconciliation run failed: {}", e);
                ReconcileOutcome {
                    cursor,
                    signalled_changes,
                    report: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
