use chrono::{Local, NaiveDate};

/// Source of "today" for daily file rotation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Builds daily record file names such as `emails-2024-01-15.json`.
#[derive(Debug, Clone)]
pub struct RecordFileNaming {
    prefix: String,
    extension: String,
}

impl RecordFileNaming {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn file_name_for(&self, date: NaiveDate) -> String {
        format!("{}{}{}", self.prefix, date.format("%Y-%m-%d"), self.extension)
    }
}

impl Default for RecordFileNaming {
    fn default() -> Self {
        Self::new("emails-", ".json")
    }
}
