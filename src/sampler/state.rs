use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::time::SystemTime;

use crate::delta::{DeltaTracker, MetricDelta};
use crate::role::Role;
use crate::session::{SessionToken, SessionTracker, Transition};
use crate::snapshot::Snapshot;

/// Why sampling ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of samples was emitted.
    Completed,
    /// The pipeline reported the end of the stream.
    EndOfStream,
    /// A termination signal was received.
    Interrupted,
}

impl StopReason {
    /// Process exit code for the reason.
    pub fn exit_code(&self) -> u8 {
        match self {
            StopReason::Completed => 0,
            StopReason::EndOfStream | StopReason::Interrupted => 1,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::Completed => "sample count reached",
            StopReason::EndOfStream => "end of stream",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(reason)
    }
}

/// Everything the sampling loop mutates.
///
/// Both the periodic tick and the event handler work on this value; they run
/// on the same task and never interleave.
#[derive(Debug, Default)]
pub struct SamplerState {
    sessions: SessionTracker,
    deltas: DeltaTracker,
    readings: HashMap<Role, Snapshot>,
    remaining: Option<u64>,
    stop: Option<StopReason>,
}

impl SamplerState {
    /// Creates the state for a run of `samples` periods, or an unbounded run if `None`.
    pub fn new(samples: Option<NonZeroU64>) -> Self {
        Self {
            remaining: samples.map(NonZeroU64::get),
            ..Self::default()
        }
    }

    /// Records an identity observation and rebaselines the role if its session was swapped.
    ///
    /// A swap also drops the reading of an event-fed role: it belongs to the
    /// previous session, and the role stays out of records until the new one reports.
    pub fn observe(&mut self, role: Role, token: SessionToken, now: SystemTime) -> Transition {
        let transition = self.sessions.observe(role, token, now);
        if matches!(transition, Transition::Swapped { .. }) {
            self.deltas.rebaseline(role);
            if role.is_event_fed() {
                self.readings.remove(&role);
            }
        }
        transition
    }

    /// Stores the latest reading of an event-fed role.
    pub fn set_reading(&mut self, snapshot: Snapshot) {
        self.readings.insert(snapshot.role(), snapshot);
    }

    pub fn reading(&self, role: Role) -> Option<&Snapshot> {
        self.readings.get(&role)
    }

    /// Differences `snapshot` against its role's baseline.
    pub fn update(&mut self, snapshot: &Snapshot) -> MetricDelta {
        self.sessions.record_snapshot(snapshot.role(), snapshot);
        self.deltas.update(snapshot)
    }

    /// Requests the loop to stop. Only the first request is kept.
    pub fn request_stop(&mut self, reason: StopReason) {
        if self.stop.is_none() {
            log::debug!(target: "sampler", "stop requested: reason={reason}");
            self.stop = Some(reason);
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Number of samples still to be emitted, `None` if unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Accounts for one emitted sample; requests a stop once the countdown is exhausted.
    pub fn count_sample(&mut self) {
        let Some(remaining) = self.remaining.as_mut() else {
            return;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.request_stop(StopReason::Completed);
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }
}
