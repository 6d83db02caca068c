//! Point-in-time readings of a role's declared metrics.
//!
//! A [`Snapshot`] maps metric keys to values tagged as counters (monotonic
//! within one session, differenced by the delta tracker) or gauges
//! (instantaneous, passed through). Snapshots are captured from the pipeline
//! with [`capture`], or built from an event payload with [`Snapshot::from_stats`]
//! for roles whose stats only arrive with events.
//!
//! # Key Components
//!
//! - [`schema`]: the declared metric set of every role.
//! - [`caps`]: parsing of the negotiated media format into a frame geometry.
//! - [`CaptureError`]: why a role could not be read this period.
pub mod caps;
mod error;
pub mod schema;

pub use error::CaptureError;

use std::collections::BTreeMap;

use crate::pipeline::{MediaPipeline, PropertyValue};
use crate::role::Role;

use schema::MetricSpec;

/// Whether a metric is differenced between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic within one session lifetime; a decrease signals a session swap.
    Counter,
    /// Instantaneous; never differenced.
    Gauge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }
}

/// Metric values of one role read at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    role: Role,
    values: BTreeMap<&'static str, MetricValue>,
}

impl Snapshot {
    /// Creates an empty snapshot for `role`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            values: BTreeMap::new(),
        }
    }

    /// Returns the snapshot with `key` set to `value`.
    pub fn with(mut self, key: &'static str, value: MetricValue) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Builds a snapshot of an event-fed role from its `stats` structure.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] if a declared field is missing or not numeric.
    pub fn from_stats(role: Role, stats: &PropertyValue) -> Result<Self, CaptureError> {
        collect(role, |spec| {
            if spec.property == schema::STATS_PROPERTY {
                Ok(stats.clone())
            } else {
                Err(CaptureError::MissingField {
                    role,
                    property: schema::STATS_PROPERTY,
                    field: spec.property,
                })
            }
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.values.get(key).copied()
    }

    /// Iterates over the values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricValue)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reads the declared metric set of `role` from the pipeline.
///
/// Structure properties shared by several metrics (e.g. the jitter buffer's
/// `stats`) are read once per capture.
///
/// # Errors
///
/// Returns [`CaptureError::UnavailableRole`] if no element backs `role`; the
/// caller treats this as "no data this period". Other variants signal an element
/// that does not expose the declared metrics.
///
/// # Examples
///
/// ```
/// use stream_probe::pipeline::{ReplayFrame, ReplayPipeline, Trace};
/// use stream_probe::role::Role;
/// use stream_probe::snapshot::{capture, CaptureError};
///
/// let pipeline = ReplayPipeline::manual(Trace { frames: vec![ReplayFrame::default()] });
/// let err = capture(&pipeline, Role::JitterBuffer).unwrap_err();
/// assert!(matches!(err, CaptureError::UnavailableRole(Role::JitterBuffer)));
/// ```
pub fn capture<P>(pipeline: &P, role: Role) -> Result<Snapshot, CaptureError>
where
    P: MediaPipeline + ?Sized,
{
    let mut cache: Vec<(&'static str, PropertyValue)> = Vec::with_capacity(2);
    collect(role, |spec| {
        if let Some((_, value)) = cache.iter().find(|(name, _)| *name == spec.property) {
            return Ok(value.clone());
        }
        let value = pipeline
            .property(role, spec.property)
            .map_err(|err| CaptureError::from_pipeline(role, spec.property, err))?;
        cache.push((spec.property, value.clone()));
        Ok(value)
    })
}

fn collect(
    role: Role,
    mut read_property: impl FnMut(&MetricSpec) -> Result<PropertyValue, CaptureError>,
) -> Result<Snapshot, CaptureError> {
    let mut snapshot = Snapshot::new(role);
    for spec in schema::specs(role) {
        let property = read_property(spec)?;
        let raw = match spec.field {
            Some(field) => property
                .field(field)
                .ok_or(CaptureError::MissingField {
                    role,
                    property: spec.property,
                    field,
                })?,
            None => &property,
        };
        let value = convert(role, spec, raw)?;
        snapshot.values.insert(spec.key, value);
    }
    Ok(snapshot)
}

fn convert(role: Role, spec: &MetricSpec, raw: &PropertyValue) -> Result<MetricValue, CaptureError> {
    let value = match (spec.kind, raw) {
        (MetricKind::Counter, PropertyValue::UInt(v)) => MetricValue::Counter(*v),
        // Signed counters (e.g. RTP `packets-lost`) can dip below zero on duplicates.
        (MetricKind::Counter, PropertyValue::Int(v)) => MetricValue::Counter((*v).max(0) as u64),
        (MetricKind::Counter, PropertyValue::Double(v)) if *v >= 0.0 => {
            MetricValue::Counter(*v as u64)
        }
        (MetricKind::Counter, PropertyValue::Double(_)) => MetricValue::Counter(0),
        (MetricKind::Gauge, PropertyValue::UInt(v)) => MetricValue::Gauge(*v as f64),
        (MetricKind::Gauge, PropertyValue::Int(v)) => MetricValue::Gauge(*v as f64),
        (MetricKind::Gauge, PropertyValue::Double(v)) => MetricValue::Gauge(*v),
        (_, other) => {
            return Err(CaptureError::NotNumeric {
                role,
                key: spec.key,
                found: other.type_name(),
            });
        }
    };
    Ok(value)
}
