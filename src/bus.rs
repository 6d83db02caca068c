//! Handling of discrete pipeline events.
//!
//! Events either change what the sampler tracks (identity observations, the
//! latest RTP source stats), request a stop, or are only reported.
use std::time::SystemTime;

use crate::output::OutputSink;
use crate::pipeline::PipelineEvent;
use crate::role::Role;
use crate::sampler::{SamplerState, StopReason};
use crate::session::{SessionToken, Transition};
use crate::snapshot::Snapshot;

/// Applies one pipeline event to the sampler state.
///
/// Never blocks beyond writing notices to `sink`.
pub fn handle<S>(state: &mut SamplerState, sink: &mut S, event: PipelineEvent, now: SystemTime)
where
    S: OutputSink + ?Sized,
{
    match event {
        PipelineEvent::Error {
            source,
            message,
            debug,
        } => {
            log::error!(
                target: "bus listener",
                "pipeline error: source={}, message={}, debug={}",
                source,
                message,
                debug.as_deref().unwrap_or("none")
            );
            sink.notice(&format!("ERROR {source}: {message}"));
            if let Some(debug) = debug {
                sink.notice(&format!("DEBUG {debug}"));
            }
        }
        PipelineEvent::EndOfStream => {
            log::info!(target: "bus listener", "End of stream reached.");
            state.request_stop(StopReason::EndOfStream);
        }
        PipelineEvent::StateChanged {
            source,
            top_level,
            old,
            new,
        } => {
            if top_level {
                log::info!(target: "bus listener", "Pipeline state changed from {old} to {new}.");
            } else {
                log::trace!(target: "bus listener", "{source} state changed from {old} to {new}");
            }
        }
        PipelineEvent::StreamStatus {
            owner,
            instance,
            status,
        } => {
            let Some(role) = Role::from_element_name(&owner) else {
                return;
            };
            if role.is_event_fed() || !status.announces_owner() {
                log::trace!(target: "bus listener", "ignoring stream status: owner={owner}, status={status:?}");
                return;
            }
            let token = SessionToken::from_element(&owner, instance);
            report(role, state.observe(role, token, now));
        }
        PipelineEvent::SessionActivity {
            session_id,
            ssrc,
            stats,
        } => {
            let role = Role::RtpSession;
            let token = SessionToken::from_source(session_id, ssrc);
            report(role, state.observe(role, token, now));
            let Some(stats) = stats else {
                log::debug!(target: "bus listener", "session activity without stats: session={session_id}, ssrc={ssrc}");
                return;
            };
            match Snapshot::from_stats(role, &stats) {
                Ok(snapshot) => state.set_reading(snapshot),
                Err(err) => log::warn!(target: "bus listener", "ignoring source stats: {err}"),
            }
        }
    }
}

fn report(role: Role, transition: Transition) {
    match transition {
        Transition::Activated => log::info!(target: "bus listener", "Tracking {role}."),
        Transition::Swapped { previous } => {
            log::info!(target: "bus listener", "New {role} detected, replacing {previous}.")
        }
        Transition::Unchanged => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineState, PropertyValue, StreamStatusKind};
    use crate::record::MetricRecord;
    use crate::snapshot::MetricValue;

    #[derive(Debug, Default)]
    struct Notices(Vec<String>);

    impl OutputSink for Notices {
        fn emit(&mut self, _record: &MetricRecord) {}

        fn notice(&mut self, message: &str) {
            self.0.push(message.to_owned());
        }

        fn flush(&mut self) {}

        fn failures(&self) -> u64 {
            0
        }
    }

    fn status(owner: &str, instance: u64, status: StreamStatusKind) -> PipelineEvent {
        PipelineEvent::StreamStatus {
            owner: owner.to_owned(),
            instance,
            status,
        }
    }

    fn dispatch(state: &mut SamplerState, sink: &mut Notices, event: PipelineEvent) {
        handle(state, sink, event, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_error_is_reported_and_sampling_continues() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();

        dispatch(
            &mut state,
            &mut sink,
            PipelineEvent::Error {
                source: "udpsrc0".to_owned(),
                message: "Could not bind socket".to_owned(),
                debug: Some("gstudpsrc.c(1460)".to_owned()),
            },
        );

        assert_eq!(
            sink.0,
            vec!["ERROR udpsrc0: Could not bind socket", "DEBUG gstudpsrc.c(1460)"]
        );
        assert_eq!(state.stop_reason(), None);
    }

    #[test]
    fn test_end_of_stream_requests_stop() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();

        dispatch(&mut state, &mut sink, PipelineEvent::EndOfStream);

        assert_eq!(state.stop_reason(), Some(StopReason::EndOfStream));
    }

    #[test]
    fn test_state_changes_only_log() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();

        dispatch(
            &mut state,
            &mut sink,
            PipelineEvent::StateChanged {
                source: "pipeline0".to_owned(),
                top_level: true,
                old: PipelineState::Paused,
                new: PipelineState::Playing,
            },
        );

        assert!(sink.0.is_empty());
        assert!(state.sessions().is_empty());
        assert_eq!(state.stop_reason(), None);
    }

    #[test]
    fn test_stream_status_tracks_jitter_buffer_instances() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();

        dispatch(&mut state, &mut sink, status("rtpjitterbuffer0", 1, StreamStatusKind::Enter));
        dispatch(&mut state, &mut sink, status("udpsrc0", 9, StreamStatusKind::Enter));
        let first = state.sessions().session(Role::JitterBuffer).unwrap().token().clone();

        dispatch(&mut state, &mut sink, status("rtpjitterbuffer0", 2, StreamStatusKind::Enter));
        // teardown of the replaced instance arrives late
        dispatch(&mut state, &mut sink, status("rtpjitterbuffer0", 1, StreamStatusKind::Leave));

        let current = state.sessions().session(Role::JitterBuffer).unwrap().token();
        assert_eq!(first.as_ref(), "rtpjitterbuffer0#1");
        assert_eq!(current.as_ref(), "rtpjitterbuffer0#2");
        assert_eq!(state.sessions().len(), 1);
    }

    #[test]
    fn test_session_activity_sets_reading() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();
        let stats = PropertyValue::Structure(
            [
                ("jitter", PropertyValue::UInt(4)),
                ("bitrate", PropertyValue::UInt(2_000_000)),
                ("packets-received", PropertyValue::UInt(300)),
                ("packets-lost", PropertyValue::Int(3)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect(),
        );

        dispatch(
            &mut state,
            &mut sink,
            PipelineEvent::SessionActivity {
                session_id: 0,
                ssrc: 0xdeadbeef,
                stats: Some(stats),
            },
        );

        let session = state.sessions().session(Role::RtpSession).unwrap();
        assert_eq!(session.token().as_ref(), "session-0/ssrc-deadbeef");
        let reading = state.reading(Role::RtpSession).unwrap();
        assert_eq!(reading.get("packets-received"), Some(MetricValue::Counter(300)));
        assert_eq!(reading.get("bitrate"), Some(MetricValue::Gauge(2_000_000.0)));
    }

    #[test]
    fn test_session_activity_without_stats_keeps_previous_reading() {
        let mut state = SamplerState::default();
        let mut sink = Notices::default();
        state.set_reading(Snapshot::new(Role::RtpSession).with("jitter", MetricValue::Gauge(1.0)));

        dispatch(
            &mut state,
            &mut sink,
            PipelineEvent::SessionActivity {
                session_id: 1,
                ssrc: 7,
                stats: None,
            },
        );

        assert!(state.sessions().session(Role::RtpSession).is_some());
        assert_eq!(
            state.reading(Role::RtpSession).unwrap().get("jitter"),
            Some(MetricValue::Gauge(1.0))
        );
    }
}
