use std::io::{BufWriter, Write};

use crate::error::ResultOkLogExt;
use crate::record::MetricRecord;

use super::{Error, FlushPolicy, OutputSink, RecordFormat, Result};

/// An [`OutputSink`] writing one line per record to any [`Write`] target.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
    format: RecordFormat,
    policy: FlushPolicy,
    failures: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: RecordFormat, policy: FlushPolicy) -> Self {
        Self {
            writer: BufWriter::new(writer),
            format,
            policy,
            failures: 0,
        }
    }

    /// Returns the underlying writer. Buffered output not yet flushed is not visible there.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    fn write_record(&mut self, record: &MetricRecord) -> Result<()> {
        match self.format {
            RecordFormat::Kv => writeln!(self.writer, "{record}").map_err(Error::Write)?,
            RecordFormat::Json => {
                serde_json::to_writer(&mut self.writer, record).map_err(Error::Serialize)?;
                self.writer.write_all(b"\n").map_err(Error::Write)?;
            }
        }
        self.flush_if_immediate()
    }

    fn write_notice(&mut self, message: &str) -> Result<()> {
        match self.format {
            RecordFormat::Kv => writeln!(self.writer, "{message}").map_err(Error::Write)?,
            RecordFormat::Json => {
                let notice = serde_json::json!({ "notice": message });
                serde_json::to_writer(&mut self.writer, &notice).map_err(Error::Serialize)?;
                self.writer.write_all(b"\n").map_err(Error::Write)?;
            }
        }
        self.flush_if_immediate()
    }

    fn flush_if_immediate(&mut self) -> Result<()> {
        match self.policy {
            FlushPolicy::Immediate => self.writer.flush().map_err(Error::Flush),
            FlushPolicy::Batched => Ok(()),
        }
    }

    fn count(&mut self, outcome: Result<()>) {
        if outcome.ok_log().is_none() {
            self.failures += 1;
        }
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, record: &MetricRecord) {
        let outcome = self.write_record(record);
        self.count(outcome);
    }

    fn notice(&mut self, message: &str) {
        let outcome = self.write_notice(message);
        self.count(outcome);
    }

    fn flush(&mut self) {
        let outcome = self.writer.flush().map_err(Error::Flush);
        self.count(outcome);
    }

    fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use std::io;

    fn record() -> MetricRecord {
        let mut record = MetricRecord::new(100);
        record.push("FPS", FieldValue::Number(60.0));
        record.push("RTX-count", FieldValue::Count(2));
        record
    }

    fn written(sink: &WriterSink<Vec<u8>>) -> &str {
        std::str::from_utf8(sink.get_ref()).unwrap()
    }

    #[test]
    fn test_kv_lines_flushed_immediately() {
        let mut sink = WriterSink::new(Vec::new(), RecordFormat::Kv, FlushPolicy::Immediate);

        sink.emit(&record());
        sink.notice("ERROR udpsrc0: boom");

        assert_eq!(
            written(&sink),
            "ts:100,FPS:60,RTX-count:2\nERROR udpsrc0: boom\n"
        );
        assert_eq!(sink.failures(), 0);
    }

    #[test]
    fn test_json_lines() {
        let mut sink = WriterSink::new(Vec::new(), RecordFormat::Json, FlushPolicy::Immediate);

        sink.emit(&record());
        sink.notice("hello");

        assert_eq!(
            written(&sink),
            "{\"ts\":100,\"FPS\":60.0,\"RTX-count\":2}\n{\"notice\":\"hello\"}\n"
        );
    }

    #[test]
    fn test_batched_output_waits_for_flush() {
        let mut sink = WriterSink::new(Vec::new(), RecordFormat::Kv, FlushPolicy::Batched);

        sink.emit(&record());
        assert_eq!(written(&sink), "");

        sink.flush();
        assert_eq!(written(&sink), "ts:100,FPS:60,RTX-count:2\n");
    }

    #[derive(Debug)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_failures_are_counted_not_propagated() {
        let mut sink = WriterSink::new(BrokenPipe, RecordFormat::Kv, FlushPolicy::Immediate);

        sink.emit(&record());
        sink.notice("still running");
        sink.flush();

        assert_eq!(sink.failures(), 3);
    }
}
