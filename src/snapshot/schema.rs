//! The declared metric set of every role.
//!
//! Each [`MetricSpec`] says where a metric is read from (a property, or a field
//! of a structure property), whether it is a counter or a gauge, and how it is
//! presented in the emitted record.

use crate::role::Role;

use super::MetricKind;

/// How a metric appears in the emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// The counter delta over the period.
    Delta,
    /// The counter delta divided by the period length in seconds.
    PerSecond,
    /// The raw value.
    Raw,
    /// A bits-per-second gauge rendered as kilobits per second, e.g. `1500kbps`.
    Kilobits,
}

/// Declaration of one sampled metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// Key of the metric inside a snapshot.
    pub key: &'static str,
    /// Element property holding the value.
    pub property: &'static str,
    /// Field of the property, if the property is a structure.
    pub field: Option<&'static str>,
    pub kind: MetricKind,
    /// Field label in the emitted record.
    pub label: &'static str,
    pub presentation: Presentation,
}

impl MetricSpec {
    const fn property(
        key: &'static str,
        kind: MetricKind,
        label: &'static str,
        presentation: Presentation,
    ) -> Self {
        Self {
            key,
            property: key,
            field: None,
            kind,
            label,
            presentation,
        }
    }

    const fn stats_field(
        key: &'static str,
        kind: MetricKind,
        label: &'static str,
        presentation: Presentation,
    ) -> Self {
        Self {
            key,
            property: STATS_PROPERTY,
            field: Some(key),
            kind,
            label,
            presentation,
        }
    }
}

/// Name of the structure property carrying jitter-buffer and RTP source stats.
pub const STATS_PROPERTY: &str = "stats";

/// Name of the video sink property carrying the negotiated media format.
pub const CAPS_PROPERTY: &str = "caps";

const VIDEO_SINK: [MetricSpec; 4] = [
    MetricSpec::property("frames-rendered", MetricKind::Counter, "FPS", Presentation::PerSecond),
    MetricSpec::property("frames-dropped", MetricKind::Counter, "DropPS", Presentation::PerSecond),
    MetricSpec::property("min-fps", MetricKind::Gauge, "MIN", Presentation::Raw),
    MetricSpec::property("max-fps", MetricKind::Gauge, "MAX", Presentation::Raw),
];

const JITTER_BUFFER: [MetricSpec; 6] = [
    MetricSpec::stats_field("num-lost", MetricKind::Counter, "num-lost", Presentation::Delta),
    MetricSpec::stats_field("num-late", MetricKind::Counter, "num-late", Presentation::Delta),
    MetricSpec::stats_field(
        "num-duplicates",
        MetricKind::Counter,
        "num-duplicates",
        Presentation::Delta,
    ),
    MetricSpec::stats_field("rtx-count", MetricKind::Counter, "RTX-count", Presentation::Delta),
    MetricSpec::stats_field(
        "rtx-success-count",
        MetricKind::Counter,
        "rtx-success-count",
        Presentation::Delta,
    ),
    MetricSpec::property("percent", MetricKind::Gauge, "Buffer", Presentation::Raw),
];

const RTP_SESSION: [MetricSpec; 4] = [
    MetricSpec::stats_field("jitter", MetricKind::Gauge, "jitter", Presentation::Raw),
    MetricSpec::stats_field("bitrate", MetricKind::Gauge, "bitrate", Presentation::Kilobits),
    MetricSpec::stats_field(
        "packets-received",
        MetricKind::Counter,
        "packets-received",
        Presentation::Delta,
    ),
    MetricSpec::stats_field(
        "packets-lost",
        MetricKind::Counter,
        "packets-lost",
        Presentation::Delta,
    ),
];

/// Returns the declared metrics of `role`, in record order.
pub fn specs(role: Role) -> &'static [MetricSpec] {
    match role {
        Role::VideoSink => &VIDEO_SINK,
        Role::JitterBuffer => &JITTER_BUFFER,
        Role::RtpSession => &RTP_SESSION,
    }
}

/// Looks up the declaration of `key` for `role`.
pub fn spec(role: Role, key: &str) -> Option<&'static MetricSpec> {
    specs(role).iter().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_and_labels_are_unique_across_roles() {
        let mut labels = HashSet::new();
        for role in [Role::VideoSink, Role::JitterBuffer, Role::RtpSession] {
            let mut keys = HashSet::new();
            for spec in specs(role) {
                assert!(keys.insert(spec.key), "duplicate key {}", spec.key);
                assert!(labels.insert(spec.label), "duplicate label {}", spec.label);
            }
        }
    }

    #[test]
    fn test_rate_presentations_apply_to_counters() {
        for role in [Role::VideoSink, Role::JitterBuffer, Role::RtpSession] {
            for spec in specs(role) {
                match spec.presentation {
                    Presentation::Delta | Presentation::PerSecond => {
                        assert_eq!(spec.kind, MetricKind::Counter, "{}", spec.key)
                    }
                    Presentation::Kilobits => assert_eq!(spec.kind, MetricKind::Gauge),
                    Presentation::Raw => {}
                }
            }
        }
    }

    #[test]
    fn test_jitter_buffer_stats_fields() {
        let spec = spec(Role::JitterBuffer, "rtx-count").unwrap();
        assert_eq!(spec.property, STATS_PROPERTY);
        assert_eq!(spec.field, Some("rtx-count"));
        assert_eq!(spec.label, "RTX-count");

        let spec = super::spec(Role::JitterBuffer, "percent").unwrap();
        assert_eq!(spec.field, None);
        assert_eq!(spec.kind, MetricKind::Gauge);
    }
}
