//! The periodic sampling loop.
//!
//! A [`Sampler`] owns the running pipeline, the output sink and the
//! [`SamplerState`]. [`Sampler::run`] multiplexes the sampling timer, the
//! pipeline's event stream and a termination signal on the current task. A stop
//! request (countdown exhausted, end of stream, termination) is checked once per
//! loop iteration; afterwards no further tick runs, the sink is flushed and the
//! pipeline is released.
mod state;

pub use state::{SamplerState, StopReason};

use std::future::Future;
use std::num::NonZeroU64;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{Instant, MissedTickBehavior};

use crate::bus;
use crate::output::OutputSink;
use crate::pipeline::{EventStream, MediaPipeline, PipelineEvent, PipelineGuard};
use crate::record::MetricRecord;
use crate::role::Role;
use crate::snapshot::{self, CaptureError, Snapshot, caps};

pub struct Sampler<P: MediaPipeline, S: OutputSink> {
    pipeline: PipelineGuard<P>,
    sink: S,
    state: SamplerState,
    roles: Vec<Role>,
    period: Duration,
}

impl<P: MediaPipeline, S: OutputSink> Sampler<P, S> {
    /// Creates a sampler reading `roles`, in that order, every `period`.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - The started pipeline.
    /// * `sink` - Destination of records and notices.
    /// * `roles` - Roles to sample; their fields appear in records in this order.
    /// * `period` - Sampling period. Must not be zero.
    /// * `samples` - Number of records to emit before stopping, `None` for no limit.
    pub fn new(
        pipeline: PipelineGuard<P>,
        sink: S,
        roles: &[Role],
        period: Duration,
        samples: Option<NonZeroU64>,
    ) -> Self {
        Self {
            pipeline,
            sink,
            state: SamplerState::new(samples),
            roles: roles.to_vec(),
            period,
        }
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn pipeline(&self) -> &PipelineGuard<P> {
        &self.pipeline
    }

    /// Samples every role, emits the record and advances the countdown.
    ///
    /// Roles without a backing element, or whose metrics cannot be read, are
    /// left out of the record.
    pub fn tick(&mut self, timestamp: u64) -> MetricRecord {
        let mut record = MetricRecord::new(timestamp);
        for &role in &self.roles {
            let Some(snapshot) = self.read(role) else {
                continue;
            };
            let delta = self.state.update(&snapshot);
            record.push_delta(&delta, self.period);
            if role == Role::VideoSink {
                if let Some(geometry) = caps::capture_geometry(self.pipeline.pipeline()) {
                    record.push_geometry(geometry);
                }
            }
        }
        log::trace!(target: "sampler", "sample: {record}");
        self.sink.emit(&record);
        self.state.count_sample();
        record
    }

    fn read(&self, role: Role) -> Option<Snapshot> {
        if role.is_event_fed() {
            let reading = self.state.reading(role).cloned();
            if reading.is_none() {
                log::trace!(target: "sampler", "no reading yet: role={role}");
            }
            return reading;
        }
        match snapshot::capture(self.pipeline.pipeline(), role) {
            Ok(snapshot) => Some(snapshot),
            Err(CaptureError::UnavailableRole(role)) => {
                log::trace!(target: "sampler", "role unavailable this period: role={role}");
                None
            }
            Err(err) => {
                log::warn!(target: "sampler", "failed capturing snapshot: {err}");
                None
            }
        }
    }

    pub fn handle_event(&mut self, event: PipelineEvent) {
        bus::handle(&mut self.state, &mut self.sink, event, SystemTime::now());
    }

    /// Runs the sampling loop until a stop is requested, then shuts down.
    ///
    /// The first sample is taken one period after the call. `shutdown` resolving
    /// counts as an interrupt.
    pub async fn run<F>(&mut self, mut events: EventStream, shutdown: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        let reason = loop {
            if let Some(reason) = self.state.stop_reason() {
                break reason;
            }
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    log::info!(target: "sampler", "Caught termination signal.");
                    self.state.request_stop(StopReason::Interrupted);
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        log::debug!(target: "sampler", "pipeline event stream closed");
                        events_open = false;
                    }
                },
                _ = interval.tick() => {
                    self.tick(unix_timestamp());
                }
            }
        };

        self.shutdown();
        log::info!(target: "sampler", "Exiting: {reason}.");
        reason
    }

    /// Flushes the sink and releases the pipeline.
    pub fn shutdown(&mut self) {
        self.sink.flush();
        let failures = self.sink.failures();
        if failures > 0 {
            log::warn!(target: "sampler", "{failures} output writes failed");
        }
        self.pipeline.release();
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
