use std::path::PathBuf;

/// Per-message state threaded through the pipeline steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingContext {
    // Input
    pub message_id: String,

    // Dedup check result
    pub already_processed: bool,

    // Convert result; None until ConvertStep runs
    pub converted: Option<String>,

    // Persist result
    pub stored_path: Option<PathBuf>,

    // Mark processed result: true if this run recorded the id first
    pub newly_recorded: bool,
}

impl ProcessingContext {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            already_processed: false,
            converted: None,
            stored_path: None,
            newly_recorded: false,
        }
    }
}
