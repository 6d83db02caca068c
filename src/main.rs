use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use stream_probe::config::{Config, StreamTarget, TransportMode};
use stream_probe::error::Error;
use stream_probe::output::{Destination, FlushPolicy, OutputConfig, RecordFormat};
use stream_probe::pipeline::{ReplayPipeline, Trace};

/// Exit code for a pipeline that could not be started or an invalid setup.
const SETUP_FAILURE: u8 = 2;

/// Client for RTP, RTSP and DASH test streams reporting delivery-quality telemetry.
#[derive(Debug, Parser)]
#[command(name = "stream-probe")]
#[command(version)]
struct Cli {
    /// Stream transport
    #[arg(short = 'm', long, value_enum, default_value_t = TransportMode::Rtp)]
    transport: TransportMode,

    /// Server port (local UDP port for RTP)
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Server host for RTSP and DASH
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Frame width
    #[arg(short = 'W', long, default_value_t = 320)]
    width: u32,

    /// Frame height
    #[arg(short = 'H', long, default_value_t = 240)]
    height: u32,

    /// Frames per second
    #[arg(short = 'f', long, default_value_t = 60)]
    framerate: u32,

    /// Number of samples to take before exiting, 0 to run until stopped
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,

    /// Sampling period of at least one second (e.g. "1s", "2500ms"), defaults to the transport's period
    #[arg(long, value_parser = humantime::parse_duration)]
    period: Option<Duration>,

    /// File to log stats to instead of the console
    #[arg(short, long, env = "STREAM_PROBE_STATS_FILE")]
    statsfile: Option<PathBuf>,

    /// Only flush output when the buffer is full and at exit
    #[arg(short, long)]
    lazy_printing: bool,

    /// Record format
    #[arg(long, value_enum, default_value_t = RecordFormat::Kv)]
    format: RecordFormat,

    /// Pipeline trace to replay (JSON)
    #[arg(short, long, env = "STREAM_PROBE_REPLAY")]
    replay: PathBuf,
}

impl Cli {
    fn into_config(self) -> Result<(Config, PathBuf), Error> {
        let output = OutputConfig {
            destination: self
                .statsfile
                .map_or(Destination::Console, Destination::File),
            format: self.format,
            flush: if self.lazy_printing {
                FlushPolicy::Batched
            } else {
                FlushPolicy::Immediate
            },
        };
        let target = StreamTarget {
            host: self.host,
            port: self.port,
            width: self.width,
            height: self.height,
            framerate: self.framerate,
        };
        let config = Config::new(self.transport, self.period, self.timeout, output, target)?;
        Ok((config, self.replay))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::debug!("{cli:?}");

    let (config, replay) = match cli.into_config() {
        Ok(parts) => parts,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(SETUP_FAILURE);
        }
    };
    let trace = match Trace::load(&replay) {
        Ok(trace) => trace,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(SETUP_FAILURE);
        }
    };
    let pipeline = ReplayPipeline::new(trace, Some(config.period));

    match stream_probe::run(config, pipeline).await {
        Ok(reason) => ExitCode::from(reason.exit_code()),
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(SETUP_FAILURE)
        }
    }
}
