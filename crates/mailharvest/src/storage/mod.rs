pub mod filesystem;
pub mod naming;

pub use filesystem::{append_line, ensure_directory, RecordSink, RotatingRecordStore};
pub use naming::{Clock, FixedClock, RecordFileNaming, SystemClock};
