mod config;
mod error;
mod sink;
mod writer;

pub use config::{Destination, FlushPolicy, OutputConfig, RecordFormat, open};
pub use error::{Error, Result};
pub use sink::OutputSink;
pub use writer::WriterSink;
