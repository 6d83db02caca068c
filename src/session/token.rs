use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Opaque identity of the resource currently backing a role.
///
/// Two observations refer to the same session if and only if their tokens are equal.
///
/// # Examples
///
/// ```
/// # use stream_probe::session::SessionToken;
/// let a = SessionToken::from_element("rtpjitterbuffer0", 7);
/// let b = SessionToken::from_element("rtpjitterbuffer0", 8);
/// assert_ne!(a, b);
/// assert_eq!(a.as_ref(), "rtpjitterbuffer0#7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(Arc<str>);

impl SessionToken {
    /// Creates a token from a raw, source-provided identity.
    pub fn new(src: impl AsRef<str>) -> Self {
        Self(src.as_ref().into())
    }

    /// Identity of a pipeline element instance.
    ///
    /// Element names are reused across instances, so the instance id is part of the token.
    pub fn from_element(name: &str, instance: u64) -> Self {
        Self::new(format!("{name}#{instance}"))
    }

    /// Identity of an RTP source inside a session manager.
    pub fn from_source(session_id: u32, ssrc: u32) -> Self {
        Self::new(format!("session-{session_id}/ssrc-{ssrc:08x}"))
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
