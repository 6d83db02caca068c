//! Interface to the media pipeline being measured.
//!
//! Building the pipeline (element graph, codecs, sockets, RTSP negotiation) is
//! not this crate's business. The sampler only needs to read properties of the
//! elements backing each [`Role`], receive the pipeline's events, and drive its
//! lifecycle. [`MediaPipeline`] captures exactly that surface.
//!
//! [`ReplayPipeline`] is the implementation shipped with the crate: it plays a
//! recorded [`Trace`] of property values and events.
mod error;
mod guard;
mod replay;

pub use error::{Error, Result};
pub use guard::PipelineGuard;
pub use replay::{ReplayFrame, ReplayPipeline, Trace};

use std::collections::BTreeMap;
use std::fmt;

use crate::role::Role;

/// Receiving half of a pipeline event subscription.
pub type EventStream = tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>;

/// A property value as exposed by a pipeline element.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    UInt(u64),
    Int(i64),
    Double(f64),
    Str(String),
    /// A named-field structure, e.g. the jitter buffer's `stats`.
    Structure(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Returns the named field of a structure value.
    pub fn field(&self, name: &str) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Structure(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::UInt(_) => "uint",
            PropertyValue::Int(_) => "int",
            PropertyValue::Double(_) => "double",
            PropertyValue::Str(_) => "string",
            PropertyValue::Structure(_) => "structure",
        }
    }
}

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Null => "null",
            PipelineState::Ready => "ready",
            PipelineState::Paused => "paused",
            PipelineState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// Streaming-thread status reported by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatusKind {
    Create,
    Enter,
    Start,
    Pause,
    Stop,
    Leave,
    Destroy,
}

impl StreamStatusKind {
    /// Returns `true` if the status announces a live owner.
    ///
    /// Teardown statuses of a replaced element may arrive after its successor
    /// announced itself and must not be taken as an identity observation.
    pub fn announces_owner(&self) -> bool {
        matches!(
            self,
            StreamStatusKind::Create | StreamStatusKind::Enter | StreamStatusKind::Start
        )
    }
}

/// A discrete event delivered on the pipeline's bus.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineEvent {
    /// An element reported an error.
    Error {
        source: String,
        message: String,
        #[serde(default)]
        debug: Option<String>,
    },
    /// The stream ended.
    EndOfStream,
    /// An element (or the pipeline itself) changed state.
    StateChanged {
        source: String,
        #[serde(default)]
        top_level: bool,
        old: PipelineState,
        new: PipelineState,
    },
    /// An element's streaming thread changed status.
    StreamStatus {
        owner: String,
        instance: u64,
        status: StreamStatusKind,
    },
    /// The RTP session manager saw activity from a source.
    SessionActivity {
        session_id: u32,
        ssrc: u32,
        /// The source's `stats` structure, if it could be read.
        #[serde(default)]
        stats: Option<PropertyValue>,
    },
}

/// The operations the sampler needs from a media pipeline.
pub trait MediaPipeline {
    /// Reads a property of the element currently backing `role`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnavailableRole`] if no element backs `role` right now,
    /// and [`Error::UnknownProperty`] if the element lacks the property.
    fn property(&self, role: Role, name: &str) -> Result<PropertyValue>;

    /// Subscribes to the pipeline's event stream.
    fn subscribe(&mut self) -> Result<EventStream>;

    /// Requests a lifecycle state change.
    fn set_state(&mut self, state: PipelineState) -> Result<()>;

    /// Releases everything the pipeline holds. Called once, after `set_state(Null)`.
    fn teardown(&mut self);
}
