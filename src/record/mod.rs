//! The structured record emitted once per sampling period.

use std::fmt;
use std::time::Duration;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::delta::{DeltaValue, MetricDelta};
use crate::snapshot::caps::Geometry;
use crate::snapshot::schema::{self, Presentation};

/// Label of the timestamp field.
pub const TIMESTAMP_LABEL: &str = "ts";

/// Label of the frame geometry field.
pub const GEOMETRY_LABEL: &str = "geometry";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Count(u64),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Count(v) => write!(f, "{v}"),
            FieldValue::Number(v) => f.write_str(&format_number(*v)),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Count(v) => serializer.serialize_u64(*v),
            FieldValue::Number(v) => serializer.serialize_f64(*v),
            FieldValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

/// Formats whole numbers without a fractional part and others with two decimals.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// One sampling period's telemetry: a timestamp and labelled fields in emission order.
///
/// The `kv` rendering is the record's [`Display`](fmt::Display) form:
///
/// ```
/// use stream_probe::record::{FieldValue, MetricRecord};
///
/// let mut record = MetricRecord::new(1_700_000_000);
/// record.push("FPS", FieldValue::Number(60.0));
/// record.push("DropPS", FieldValue::Number(0.5));
/// assert_eq!(record.to_string(), "ts:1700000000,FPS:60,DropPS:0.50");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    timestamp: u64,
    fields: Vec<(&'static str, FieldValue)>,
}

impl MetricRecord {
    /// Creates an empty record stamped with `timestamp` (seconds since the UNIX epoch).
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            fields: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn push(&mut self, label: &'static str, value: FieldValue) {
        self.fields.push((label, value));
    }

    /// Appends the fields of a role's delta in declaration order.
    ///
    /// Per-second fields are divided by `period`; bitrates are rendered in kbps.
    pub fn push_delta(&mut self, delta: &MetricDelta, period: Duration) {
        let seconds = period.as_secs_f64();
        for spec in schema::specs(delta.role()) {
            let Some(value) = delta.get(spec.key) else {
                continue;
            };
            let field = match (spec.presentation, value) {
                (Presentation::PerSecond, DeltaValue::Counter(n)) => {
                    FieldValue::Number(n as f64 / seconds)
                }
                (Presentation::Kilobits, DeltaValue::Gauge(bps)) => {
                    FieldValue::Text(format!("{}kbps", format_number(bps / 1000.0)))
                }
                (_, DeltaValue::Counter(n)) => FieldValue::Count(n),
                (_, DeltaValue::Gauge(v)) => FieldValue::Number(v),
            };
            self.fields.push((spec.label, field));
        }
    }

    pub fn push_geometry(&mut self, geometry: Geometry) {
        self.push(GEOMETRY_LABEL, FieldValue::Text(geometry.to_string()));
    }

    /// Returns the value of the first field labelled `label`.
    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TIMESTAMP_LABEL}:{}", self.timestamp)?;
        for (label, value) in &self.fields {
            write!(f, ",{label}:{value}")?;
        }
        Ok(())
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(TIMESTAMP_LABEL, &self.timestamp)?;
        for (label, value) in &self.fields {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DeltaTracker;
    use crate::role::Role;
    use crate::snapshot::{MetricValue, Snapshot};

    fn video_sink(rendered: u64, dropped: u64) -> Snapshot {
        Snapshot::new(Role::VideoSink)
            .with("frames-rendered", MetricValue::Counter(rendered))
            .with("frames-dropped", MetricValue::Counter(dropped))
            .with("min-fps", MetricValue::Gauge(59.0))
            .with("max-fps", MetricValue::Gauge(60.5))
    }

    #[test]
    fn test_rendered_frames_become_fps() {
        let mut tracker = DeltaTracker::default();
        tracker.update(&video_sink(100, 2));
        let delta = tracker.update(&video_sink(160, 2));

        let mut record = MetricRecord::new(42);
        record.push_delta(&delta, Duration::from_secs(1));

        assert_eq!(record.get("FPS"), Some(&FieldValue::Number(60.0)));
        assert_eq!(record.get("DropPS"), Some(&FieldValue::Number(0.0)));
        assert_eq!(record.to_string(), "ts:42,FPS:60,DropPS:0,MIN:59,MAX:60.50");
    }

    #[test]
    fn test_rates_are_divided_by_period() {
        let mut tracker = DeltaTracker::default();
        tracker.update(&video_sink(0, 0));
        let delta = tracker.update(&video_sink(150, 5));

        let mut record = MetricRecord::new(0);
        record.push_delta(&delta, Duration::from_secs(5));

        assert_eq!(record.get("FPS"), Some(&FieldValue::Number(30.0)));
        assert_eq!(record.get("DropPS"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn test_session_fields_and_geometry() {
        let snapshot = Snapshot::new(Role::RtpSession)
            .with("jitter", MetricValue::Gauge(3.0))
            .with("bitrate", MetricValue::Gauge(1_536_000.0))
            .with("packets-received", MetricValue::Counter(12))
            .with("packets-lost", MetricValue::Counter(1));
        let delta = DeltaTracker::default().update(&snapshot);

        let mut record = MetricRecord::new(7);
        record.push_delta(&delta, Duration::from_secs(5));
        record.push_geometry(Geometry {
            width: 320,
            height: 240,
        });

        assert_eq!(
            record.to_string(),
            "ts:7,jitter:3,bitrate:1536kbps,packets-received:12,packets-lost:1,geometry:320x240"
        );
    }

    #[test]
    fn test_json_rendering_keeps_field_order() {
        let mut record = MetricRecord::new(1);
        record.push("num-lost", FieldValue::Count(3));
        record.push("Buffer", FieldValue::Number(12.5));
        record.push(GEOMETRY_LABEL, FieldValue::Text("640x480".to_owned()));

        let json = serde_json::to_string(&record).unwrap();

        assert_eq!(
            json,
            r#"{"ts":1,"num-lost":3,"Buffer":12.5,"geometry":"640x480"}"#
        );
    }

    #[test]
    fn test_empty_record() {
        let record = MetricRecord::new(9);
        assert!(record.fields().is_empty());
        assert_eq!(record.timestamp(), 9);
        assert_eq!(record.to_string(), "ts:9");
    }
}
