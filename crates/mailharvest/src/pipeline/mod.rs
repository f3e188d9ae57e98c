pub mod context;
pub mod convert;
pub mod error;
pub mod runner;
pub mod step;
pub mod steps;

pub use context::ProcessingContext;
pub use convert::{format_date, ConvertedEmail, EmailConverter};
pub use error::PipelineError;
pub use runner::Pipeline;
pub use step::{ProcessingStep, StepOutcome};
pub use steps::{CheckProcessedStep, ConvertStep, MarkProcessedStep, MarkReadStep, PersistStep};
