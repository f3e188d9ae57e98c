use crate::error::ProcessError;
use crate::provider::Message;

use super::context::ProcessingContext;

/// What the pipeline should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Stop,
}

/// One unit of work applied to each message.
pub trait ProcessingStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        message: &Message,
        ctx: &mut ProcessingContext,
    ) -> Result<StepOutcome, ProcessError>;
}
