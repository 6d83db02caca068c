//! Frame geometry from the video sink's negotiated media format.
//!
//! The format is a caps string such as
//! `video/x-raw, format=(string)I420, width=(int)1280, height=(int)720`.

use std::fmt;

use crate::pipeline::MediaPipeline;
use crate::role::Role;

use super::schema::CAPS_PROPERTY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Extracts width and height from a caps string.
///
/// Returns `None` unless both fields are present and numeric.
///
/// # Examples
///
/// ```
/// use stream_probe::snapshot::caps::{parse_geometry, Geometry};
///
/// let caps = "video/x-raw, width=(int)1280, height=(int)720, framerate=(fraction)60/1";
/// assert_eq!(parse_geometry(caps), Some(Geometry { width: 1280, height: 720 }));
/// ```
pub fn parse_geometry(caps: &str) -> Option<Geometry> {
    let mut width = None;
    let mut height = None;
    for field in caps.split(',').skip(1) {
        let Some((name, value)) = field.split_once('=') else {
            continue;
        };
        let slot = match name.trim() {
            "width" => &mut width,
            "height" => &mut height,
            _ => continue,
        };
        *slot = strip_type(value).parse::<u32>().ok();
    }
    Some(Geometry {
        width: width?,
        height: height?,
    })
}

fn strip_type(value: &str) -> &str {
    let value = value.trim();
    match value.strip_prefix('(').and_then(|rest| rest.split_once(')')) {
        Some((_, rest)) => rest.trim(),
        None => value,
    }
}

/// Reads the geometry the video sink negotiated, if it is known yet.
pub fn capture_geometry<P>(pipeline: &P) -> Option<Geometry>
where
    P: MediaPipeline + ?Sized,
{
    let caps = pipeline.property(Role::VideoSink, CAPS_PROPERTY).ok()?;
    parse_geometry(caps.as_str()?)
}
