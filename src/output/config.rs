use std::io;
use std::path::PathBuf;

use crate::fsutil;

use super::{Error, OutputSink, WriterSink};

/// When buffered output reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// After every record.
    #[default]
    Immediate,
    /// When the buffer fills up and at shutdown.
    Batched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RecordFormat {
    /// Comma-delimited `key:value` pairs.
    #[default]
    Kv,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Console,
    File(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub destination: Destination,
    pub format: RecordFormat,
    pub flush: FlushPolicy,
}

/// Opens the sink described by `config`.
///
/// A file that cannot be created is reported and replaced by the console.
pub fn open(config: &OutputConfig) -> Box<dyn OutputSink> {
    if let Destination::File(path) = &config.destination {
        match fsutil::create_file_writer(path) {
            Ok(file) => {
                log::info!("Writing stats to `{}`", path.display());
                return Box::new(WriterSink::new(file, config.format, config.flush));
            }
            Err(err) => log::error!("{}, falling back to console", Error::from(err)),
        }
    }
    Box::new(WriterSink::new(io::stdout(), config.format, config.flush))
}
