//! Per-period differences of counter metrics.
//!
//! The [`DeltaTracker`] keeps one rolling baseline per role. Counters are
//! differenced against the baseline and floored at zero; gauges pass through.
//! After every update the baseline is the snapshot just seen.

use std::collections::{BTreeMap, HashMap};

use crate::role::Role;
use crate::snapshot::{MetricValue, Snapshot};

/// Value of a metric over one sampling period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaValue {
    /// Increase of a counter since the previous period.
    Counter(u64),
    /// Current value of a gauge.
    Gauge(f64),
}

/// The per-period view of one role's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDelta {
    role: Role,
    values: BTreeMap<&'static str, DeltaValue>,
}

impl MetricDelta {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn get(&self, key: &str) -> Option<DeltaValue> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, DeltaValue)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default)]
struct Baseline {
    counters: HashMap<&'static str, u64>,
    pending_rebaseline: bool,
}

#[derive(Debug, Default)]
pub struct DeltaTracker {
    baselines: HashMap<Role, Baseline>,
}

impl DeltaTracker {
    /// Differences `snapshot` against the baseline of its role and advances the baseline.
    ///
    /// A counter without a baseline is differenced against zero. A counter that
    /// went down is reported as zero. If the role was rebaselined since the last
    /// update, every counter is reported as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_probe::delta::{DeltaTracker, DeltaValue};
    /// use stream_probe::role::Role;
    /// use stream_probe::snapshot::{MetricValue, Snapshot};
    ///
    /// let mut tracker = DeltaTracker::default();
    /// let reading = |n| Snapshot::new(Role::JitterBuffer).with("num-lost", MetricValue::Counter(n));
    ///
    /// tracker.update(&reading(10));
    /// let delta = tracker.update(&reading(14));
    /// assert_eq!(delta.get("num-lost"), Some(DeltaValue::Counter(4)));
    /// ```
    pub fn update(&mut self, snapshot: &Snapshot) -> MetricDelta {
        let role = snapshot.role();
        let baseline = self.baselines.entry(role).or_default();
        let reset = std::mem::take(&mut baseline.pending_rebaseline);
        if reset {
            baseline.counters.clear();
        }

        let mut values = BTreeMap::new();
        for (key, value) in snapshot.iter() {
            let delta = match value {
                MetricValue::Gauge(v) => DeltaValue::Gauge(v),
                MetricValue::Counter(current) => {
                    let previous = baseline.counters.insert(key, current);
                    if reset {
                        DeltaValue::Counter(0)
                    } else {
                        DeltaValue::Counter(difference(role, key, previous.unwrap_or(0), current))
                    }
                }
            };
            values.insert(key, delta);
        }
        MetricDelta { role, values }
    }

    /// Makes the next update of `role` start a fresh baseline and report zero for every counter.
    ///
    /// Calling this more than once before the next update has no further effect.
    pub fn rebaseline(&mut self, role: Role) {
        let baseline = self.baselines.entry(role).or_default();
        if !baseline.pending_rebaseline {
            log::debug!(target: "delta tracker", "rebaseline requested: role={role}");
            baseline.pending_rebaseline = true;
        }
    }

    /// Returns the current baseline of a counter.
    pub fn baseline(&self, role: Role, key: &str) -> Option<u64> {
        self.baselines.get(&role)?.counters.get(key).copied()
    }
}

fn difference(role: Role, key: &str, previous: u64, current: u64) -> u64 {
    current.checked_sub(previous).unwrap_or_else(|| {
        log::debug!(
            target: "delta tracker",
            "counter decreased without a session swap, reporting zero: role={}, key={}, previous={}, current={}",
            role,
            key,
            previous,
            current
        );
        0
    })
}
