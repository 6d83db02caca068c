//! Tracking of the resource currently backing each role.
//!
//! Roles such as the jitter buffer are backed by pipeline elements that can be
//! replaced while the stream runs. The [`SessionTracker`] keeps one [`Session`]
//! per role and reports a [`Transition`] for every identity observation, so the
//! caller can rebaseline counters when the backing resource is swapped.
//!
//! Per role the tracker is a two-state machine:
//!
//! - `NoSession → Active` on the first observation ([`Transition::Activated`]).
//! - `Active → Active` on an observation with a different token ([`Transition::Swapped`]).
//!
//! There is no terminal state; sessions live as long as the tracker.
mod token;

pub use token::SessionToken;

use std::collections::HashMap;
use std::time::SystemTime;

use crate::role::Role;
use crate::snapshot::Snapshot;

/// One logical sub-stream resource backing a role.
#[derive(Debug, Clone)]
pub struct Session {
    token: SessionToken,
    created_at: SystemTime,
    last_snapshot: Option<Snapshot>,
}

impl Session {
    fn new(token: SessionToken, created_at: SystemTime) -> Self {
        Self {
            token,
            created_at,
            last_snapshot: None,
        }
    }

    /// Returns the identity token of the session.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Returns the time the session was first observed.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns the most recent snapshot captured while this session was active.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }
}

/// Outcome of an identity observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// First session for the role.
    Activated,
    /// The observed token matches the active session.
    Unchanged,
    /// A different resource now backs the role.
    Swapped { previous: SessionToken },
}

/// Indexed table of the active session per role.
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: HashMap<Role, Session>,
}

impl SessionTracker {
    /// Records an identity observation for `role`.
    ///
    /// # Arguments
    ///
    /// * `role` - The role the observed resource owns.
    /// * `token` - Identity of the observed resource.
    /// * `now` - Observation time, used as creation time of new sessions.
    ///
    /// # Returns
    ///
    /// The [`Transition`] the observation caused. On [`Transition::Swapped`] the
    /// previous session has already been replaced.
    pub fn observe(&mut self, role: Role, token: SessionToken, now: SystemTime) -> Transition {
        match self.sessions.get_mut(&role) {
            None => {
                log::debug!(target: "session tracker", "session activated: role={role}, token={token}");
                self.sessions.insert(role, Session::new(token, now));
                Transition::Activated
            }
            Some(session) if session.token == token => Transition::Unchanged,
            Some(session) => {
                log::debug!(
                    target: "session tracker",
                    "session swapped: role={}, previous={}, current={}",
                    role,
                    session.token,
                    token
                );
                let previous = std::mem::replace(session, Session::new(token, now));
                Transition::Swapped {
                    previous: previous.token,
                }
            }
        }
    }

    /// Stores `snapshot` as the last reading of the role's active session, if any.
    pub fn record_snapshot(&mut self, role: Role, snapshot: &Snapshot) {
        if let Some(session) = self.sessions.get_mut(&role) {
            session.last_snapshot = Some(snapshot.clone());
        }
    }

    /// Returns the active session of `role`.
    pub fn session(&self, role: Role) -> Option<&Session> {
        self.sessions.get(&role)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MetricValue;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_first_observation_activates() {
        let mut tracker = SessionTracker::default();
        assert!(tracker.session(Role::JitterBuffer).is_none());

        let transition = tracker.observe(Role::JitterBuffer, SessionToken::new("A"), at(1));

        assert_eq!(transition, Transition::Activated);
        let session = tracker.session(Role::JitterBuffer).unwrap();
        assert_eq!(session.token().as_ref(), "A");
        assert_eq!(session.created_at(), at(1));
        assert!(session.last_snapshot().is_none());
    }

    #[test]
    fn test_same_token_is_unchanged() {
        let mut tracker = SessionTracker::default();
        tracker.observe(Role::JitterBuffer, SessionToken::new("A"), at(1));

        let transition = tracker.observe(Role::JitterBuffer, SessionToken::new("A"), at(2));

        assert_eq!(transition, Transition::Unchanged);
        assert_eq!(tracker.session(Role::JitterBuffer).unwrap().created_at(), at(1));
    }

    #[test]
    fn test_different_token_swaps_and_resets_session() {
        let mut tracker = SessionTracker::default();
        tracker.observe(Role::JitterBuffer, SessionToken::new("A"), at(1));
        let snapshot = Snapshot::new(Role::JitterBuffer).with("num-lost", MetricValue::Counter(40));
        tracker.record_snapshot(Role::JitterBuffer, &snapshot);

        let transition = tracker.observe(Role::JitterBuffer, SessionToken::new("B"), at(5));

        assert_eq!(
            transition,
            Transition::Swapped {
                previous: SessionToken::new("A")
            }
        );
        let session = tracker.session(Role::JitterBuffer).unwrap();
        assert_eq!(session.token().as_ref(), "B");
        assert_eq!(session.created_at(), at(5));
        assert!(session.last_snapshot().is_none());
    }

    #[test]
    fn test_roles_are_tracked_independently() {
        let mut tracker = SessionTracker::default();
        tracker.observe(Role::JitterBuffer, SessionToken::new("A"), at(1));

        let transition = tracker.observe(Role::RtpSession, SessionToken::new("B"), at(1));

        assert_eq!(transition, Transition::Activated);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_record_snapshot_without_session_is_ignored() {
        let mut tracker = SessionTracker::default();
        let snapshot = Snapshot::new(Role::VideoSink);

        tracker.record_snapshot(Role::VideoSink, &snapshot);

        assert!(tracker.is_empty());
    }
}
