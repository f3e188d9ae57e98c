use thiserror::Error;

use crate::error::ProcessError;

/// A step failure, tagged with the message and step it happened in.
#[derive(Error, Debug)]
#[error("Failed to process message '{message_id}' in step '{step}': {source}")]
pub struct PipelineError {
    pub message_id: String,
    pub step: &'static str,
    #[source]
    pub source: ProcessError,
}
