use std::fmt;

/// A logical sampling target.
///
/// A role names *what* is sampled (the rendering sink, the jitter buffer, the
/// active RTP source) independently of *which* pipeline element currently
/// backs it. The backing element may change while the stream runs, e.g. when
/// an RTSP client reconnects and a new jitter buffer is instantiated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// The rendering sink (`fpsdisplaysink`), counting rendered and dropped frames.
    VideoSink,
    /// The RTP jitter buffer (`rtpjitterbuffer`).
    JitterBuffer,
    /// The active peer source inside the RTP session manager.
    ///
    /// Its stats are not element properties; they arrive with session-activity events.
    RtpSession,
}

/// Element name prefixes identifying the role an element plays.
const ELEMENT_PREFIXES: [(&str, Role); 3] = [
    ("fpsdisplaysink", Role::VideoSink),
    ("rtpjitterbuffer", Role::JitterBuffer),
    ("rtpsession", Role::RtpSession),
];

impl Role {
    /// Returns the kebab-case name of the role, as used in replay traces and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::VideoSink => "video-sink",
            Role::JitterBuffer => "jitter-buffer",
            Role::RtpSession => "rtp-session",
        }
    }

    /// Maps a pipeline element name (e.g. `rtpjitterbuffer0`) to the role it owns.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stream_probe::role::Role;
    /// assert_eq!(Role::from_element_name("rtpjitterbuffer3"), Some(Role::JitterBuffer));
    /// assert_eq!(Role::from_element_name("udpsrc0"), None);
    /// ```
    pub fn from_element_name(name: &str) -> Option<Role> {
        ELEMENT_PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, role)| *role)
    }

    /// Returns `true` if the role is fed by pipeline events rather than property reads.
    pub fn is_event_fed(&self) -> bool {
        matches!(self, Role::RtpSession)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
