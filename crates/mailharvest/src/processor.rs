//! Drives harvested messages through the pipeline.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{HarvestError, Result};
use crate::harvester::Harvester;
use crate::pipeline::{Pipeline, PipelineError, ProcessingContext};
use crate::provider::{Message, SearchCriteria};

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Messages harvested and handed to the pipeline.
    pub listed: usize,
    /// Messages that went through every step.
    pub processed: usize,
    /// Messages the index already knew.
    pub skipped: usize,
    /// One entry per message whose pipeline run failed.
    pub failed: Vec<String>,
    /// A page listing failed after the first page; later pages were not seen.
    pub truncated: bool,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.truncated
    }
}

/// Harvester plus pipeline, run with fixed default criteria.
pub struct EmailProcessor {
    harvester: Harvester,
    pipeline: Arc<Pipeline>,
    criteria: SearchCriteria,
}

impl EmailProcessor {
    pub fn new(harvester: Harvester, pipeline: Arc<Pipeline>, criteria: SearchCriteria) -> Self {
        Self {
            harvester,
            pipeline,
            criteria,
        }
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn harvester(&self) -> &Harvester {
        &self.harvester
    }

    /// Harvests with the default criteria and processes every message.
    pub fn process_all(&self) -> Result<BatchReport> {
        self.process_matching(self.criteria.clone())
    }

    /// Harvests with `criteria` and processes every message.
    ///
    /// Fails only when nothing can be harvested: the provider is unavailable
    /// or the first page cannot be listed. Per-message failures are collected
    /// in the report.
    pub fn process_matching(&self, criteria: SearchCriteria) -> Result<BatchReport> {
        if !self.harvester.is_available() {
            return Err(HarvestError::Unavailable(
                self.harvester.provider().name().to_string(),
            ));
        }

        let mut report = BatchReport::default();
        let mut stream = self.harvester.stream(criteria);

        while let Some(item) = stream.next() {
            let message = match item {
                Ok(message) => message,
                Err(e) if stream.stats().pages == 0 => return Err(e),
                Err(e) => {
                    warn!("Harvest ended early, processing what was listed: {}", e);
                    report.truncated = true;
                    continue;
                }
            };

            report.listed += 1;
            match self.process_message(&message) {
                Ok(ctx) if ctx.already_processed => report.skipped += 1,
                Ok(_) => report.processed += 1,
                Err(e) => {
                    error!("{}", e);
                    report.failed.push(e.to_string());
                }
            }
        }

        info!(
            "Batch finished: {} listed, {} processed, {} skipped, {} failed{}",
            report.listed,
            report.processed,
            report.skipped,
            report.failed.len(),
            if report.truncated { " (truncated)" } else { "" }
        );

        Ok(report)
    }

    pub fn process_message(
        &self,
        message: &Message,
    ) -> std::result::Result<ProcessingContext, PipelineError> {
        self.pipeline.run(message)
    }
}
