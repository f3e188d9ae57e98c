use std::sync::Arc;

use tracing::{debug, info_span};

use crate::error::ConfigError;
use crate::index::ProcessedStore;
use crate::provider::{MailProvider, Message};
use crate::storage::RecordSink;

use super::context::ProcessingContext;
use super::convert::EmailConverter;
use super::error::PipelineError;
use super::step::{ProcessingStep, StepOutcome};
use super::steps::{CheckProcessedStep, ConvertStep, MarkProcessedStep, MarkReadStep, PersistStep};

/// Ordered list of steps driven by a single loop.
pub struct Pipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl Pipeline {
    /// Builds a pipeline from explicit steps. At least one step is required.
    pub fn new(steps: Vec<Box<dyn ProcessingStep>>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::Validation {
                message: "pipeline requires at least one step".to_string(),
            });
        }
        Ok(Self { steps })
    }

    /// Production composition: check, convert, persist, mark processed, mark read.
    pub fn standard(
        index: Arc<dyn ProcessedStore>,
        sink: Arc<dyn RecordSink>,
        provider: Arc<dyn MailProvider>,
        user_id: &str,
    ) -> Self {
        Self {
            steps: vec![
                Box::new(CheckProcessedStep::new(Arc::clone(&index))),
                Box::new(ConvertStep::new(EmailConverter::new())),
                Box::new(PersistStep::new(sink)),
                Box::new(MarkProcessedStep::new(index)),
                Box::new(MarkReadStep::new(provider, user_id)),
            ],
        }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step for one message, stopping early on `Stop`.
    ///
    /// A step error aborts the remaining steps for this message only.
    pub fn run(&self, message: &Message) -> Result<ProcessingContext, PipelineError> {
        let _pipeline_span = info_span!("pipeline", message_id = %message.id).entered();
        let mut ctx = ProcessingContext::new(&message.id);

        for step in &self.steps {
            let _step = info_span!("step", step = step.name()).entered();

            match step.apply(message, &mut ctx) {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Stop) => {
                    debug!("Step '{}' stopped the pipeline", step.name());
                    break;
                }
                Err(source) => {
                    return Err(PipelineError {
                        message_id: message.id.clone(),
                        step: step.name(),
                        source,
                    });
                }
            }
        }

        Ok(ctx)
    }
}
