//! The standard processing steps, in pipeline order.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ProcessError;
use crate::index::ProcessedStore;
use crate::provider::{MailProvider, Message};
use crate::storage::RecordSink;

use super::context::ProcessingContext;
use super::convert::EmailConverter;
use super::step::{ProcessingStep, StepOutcome};

/// Stops the chain for messages the index already knows.
pub struct CheckProcessedStep {
    index: Arc<dyn ProcessedStore>,
}

impl CheckProcessedStep {
    pub fn new(index: Arc<dyn ProcessedStore>) -> Self {
        Self { index }
    }
}

impl ProcessingStep for CheckProcessedStep {
    fn name(&self) -> &'static str {
        "check_processed"
    }

    fn apply(
        &self,
        message: &Message,
        ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError> {
        ctx.already_processed = self.index.contains(&message.id)?;

        if ctx.already_processed {
            debug!("Message {} already processed, skipping", message.id);
            Ok(StepOutcome::Stop)
        } else {
            Ok(StepOutcome::Continue)
        }
    }
}

/// Converts the message into its JSON record and keeps it on the context
/// for the persist step.
pub struct ConvertStep {
    converter: EmailConverter,
}

impl ConvertStep {
    pub fn new(converter: EmailConverter) -> Self {
        Self { converter }
    }
}

impl ProcessingStep for ConvertStep {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn apply(
        &self,
        message: &Message,
        ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError> {
        ctx.converted = Some(self.converter.convert_to_json(message)?);
        Ok(StepOutcome::Continue)
    }
}

/// Appends the converted record, if any, to the record sink.
pub struct PersistStep {
    sink: Arc<dyn RecordSink>,
}

impl PersistStep {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }
}

impl ProcessingStep for PersistStep {
    fn name(&self) -> &'static str {
        "persist"
    }

    fn apply(
        &self,
        _message: &Message,
        ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError> {
        if let Some(record) = ctx.converted.as_deref() {
            let path = self.sink.append(record)?;
            info!("Message {} stored in {}", ctx.message_id, path.display());
            ctx.stored_path = Some(path);
        }
        Ok(StepOutcome::Continue)
    }
}

/// Records the id in the dedup index. Idempotent.
pub struct MarkProcessedStep {
    index: Arc<dyn ProcessedStore>,
}

impl MarkProcessedStep {
    pub fn new(index: Arc<dyn ProcessedStore>) -> Self {
        Self { index }
    }
}

impl ProcessingStep for MarkProcessedStep {
    fn name(&self) -> &'static str {
        "mark_processed"
    }

    fn apply(
        &self,
        message: &Message,
        ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError> {
        ctx.newly_recorded = self.index.mark_processed(&message.id)?;
        Ok(StepOutcome::Continue)
    }
}

/// Clears the remote unread flag. Runs last so earlier failures leave the
/// message unread and eligible for the next harvest.
pub struct MarkReadStep {
    provider: Arc<dyn MailProvider>,
    user_id: String,
}

impl MarkReadStep {
    pub fn new(provider: Arc<dyn MailProvider>, user_id: impl Into<String>) -> Self {
        Self {
            provider,
            user_id: user_id.into(),
        }
    }
}

impl ProcessingStep for MarkReadStep {
    fn name(&self) -> &'static str {
        "mark_read"
    }

    fn apply(
        &self,
        message: &Message,
        _ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError> {
        self.provider.mark_read(&self.user_id, &message.id)?;
        debug!("Message {} marked as read", message.id);
        Ok(StepOutcome::Continue)
    }
}
