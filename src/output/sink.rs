use crate::record::MetricRecord;

/// Destination of emitted records and notices.
///
/// Sinks are best-effort: a failing write is logged and counted, never returned
/// to the sampler.
pub trait OutputSink {
    /// Writes one record.
    fn emit(&mut self, record: &MetricRecord);

    /// Writes a free-form diagnostic line, e.g. a pipeline error.
    fn notice(&mut self, message: &str);

    fn flush(&mut self);

    /// Number of writes that failed so far.
    fn failures(&self) -> u64;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn emit(&mut self, record: &MetricRecord) {
        (**self).emit(record)
    }

    fn notice(&mut self, message: &str) {
        (**self).notice(message)
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn failures(&self) -> u64 {
        (**self).failures()
    }
}
