use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::output::OutputConfig;
use crate::role::Role;

/// How the test stream is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportMode {
    /// Raw RTP over UDP into a jitter buffer.
    Rtp,
    /// RTSP-negotiated RTP session.
    Rtsp,
    /// DASH manifest over HTTP.
    Dash,
}

impl TransportMode {
    /// Roles sampled for this transport, in record order.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            TransportMode::Rtp => &[Role::VideoSink, Role::JitterBuffer],
            TransportMode::Rtsp => &[Role::VideoSink, Role::JitterBuffer, Role::RtpSession],
            TransportMode::Dash => &[Role::VideoSink],
        }
    }

    pub fn default_period(&self) -> Duration {
        match self {
            TransportMode::Rtp | TransportMode::Dash => Duration::from_secs(1),
            TransportMode::Rtsp => Duration::from_secs(5),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Rtp => "rtp",
            TransportMode::Rtsp => "rtsp",
            TransportMode::Dash => "dash",
        };
        f.write_str(name)
    }
}

/// The stream a client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub host: String,
    pub port: u16,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl StreamTarget {
    /// Human-readable description of the stream source for `transport`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_probe::config::{StreamTarget, TransportMode};
    ///
    /// let target = StreamTarget {
    ///     host: "10.0.0.2".to_owned(),
    ///     port: 8554,
    ///     width: 320,
    ///     height: 240,
    ///     framerate: 60,
    /// };
    /// assert_eq!(target.describe(TransportMode::Rtsp), "rtsp://10.0.0.2:8554/video");
    /// ```
    pub fn describe(&self, transport: TransportMode) -> String {
        match transport {
            TransportMode::Rtp => format!(
                "udp://0.0.0.0:{} (application/x-rtp, encoding-name=H264, width={}, height={}, framerate={}/1)",
                self.port, self.width, self.height, self.framerate
            ),
            TransportMode::Rtsp => format!("rtsp://{}:{}/video", self.host, self.port),
            TransportMode::Dash => format!("http://{}:{}/all.mpd", self.host, self.port),
        }
    }
}

/// Shortest sampling period. Record timestamps have a resolution of one second.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportMode,
    pub period: Duration,
    /// Number of records to emit, `None` for an unbounded run.
    pub samples: Option<NonZeroU64>,
    pub output: OutputConfig,
    pub target: StreamTarget,
}

impl Config {
    /// Builds a configuration.
    ///
    /// # Arguments
    ///
    /// * `period` - Sampling period; the transport's default if `None`.
    /// * `timeout` - Number of samples to take; `0` means no limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a period shorter than [`MIN_PERIOD`] or an
    /// empty frame geometry.
    pub fn new(
        transport: TransportMode,
        period: Option<Duration>,
        timeout: u64,
        output: OutputConfig,
        target: StreamTarget,
    ) -> Result<Self> {
        let period = period.unwrap_or_else(|| transport.default_period());
        if period < MIN_PERIOD {
            return Err(Error::Config(format!(
                "sampling period must be at least {}, got {}",
                humantime::format_duration(MIN_PERIOD),
                humantime::format_duration(period)
            )));
        }
        if target.width == 0 || target.height == 0 {
            return Err(Error::Config(format!(
                "invalid frame geometry {}x{}",
                target.width, target.height
            )));
        }
        Ok(Self {
            transport,
            period,
            samples: NonZeroU64::new(timeout),
            output,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> StreamTarget {
        StreamTarget {
            host: "localhost".to_owned(),
            port: 5000,
            width: 320,
            height: 240,
            framerate: 60,
        }
    }

    #[test]
    fn test_transport_defaults() {
        let config =
            Config::new(TransportMode::Rtsp, None, 60, OutputConfig::default(), target()).unwrap();

        assert_eq!(config.period, Duration::from_secs(5));
        assert_eq!(config.samples, NonZeroU64::new(60));
        assert_eq!(config.transport.roles().len(), 3);
        assert_eq!(TransportMode::Dash.roles(), &[Role::VideoSink]);
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let config = Config::new(
            TransportMode::Rtp,
            Some(Duration::from_secs(2)),
            0,
            OutputConfig::default(),
            target(),
        )
        .unwrap();

        assert_eq!(config.samples, None);
        assert_eq!(config.period, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_setup_is_rejected() {
        let err = Config::new(
            TransportMode::Rtp,
            Some(Duration::ZERO),
            1,
            OutputConfig::default(),
            target(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut flat = target();
        flat.height = 0;
        let err = Config::new(TransportMode::Dash, None, 1, OutputConfig::default(), flat)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_sub_second_period_is_rejected() {
        let err = Config::new(
            TransportMode::Rtp,
            Some(Duration::from_millis(500)),
            10,
            OutputConfig::default(),
            target(),
        )
        .unwrap_err();

        match err {
            Error::Config(reason) => assert!(reason.contains("500ms"), "{reason}"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(
            Config::new(TransportMode::Rtp, Some(MIN_PERIOD), 10, OutputConfig::default(), target())
                .is_ok()
        );
    }

    #[test]
    fn test_describe_targets() {
        let target = target();
        assert_eq!(
            target.describe(TransportMode::Dash),
            "http://localhost:5000/all.mpd"
        );
        assert!(target.describe(TransportMode::Rtp).starts_with("udp://0.0.0.0:5000"));
    }
}
