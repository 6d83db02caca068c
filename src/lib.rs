//! Stream Probe: delivery-quality telemetry for RTP, RTSP and DASH test streams.
//!
//! The library periodically samples counters and gauges of a running media
//! pipeline, turns them into per-period deltas and rates, follows the pipeline
//! elements backing each sampled role as they are replaced, and emits one
//! record per period to the console or a file.
pub mod bus;
pub mod config;
pub mod delta;
pub mod error;
pub mod fsutil;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod role;
pub mod sampler;
pub mod session;
pub mod snapshot;

use config::Config;
use error::{Error, Result};
use pipeline::{MediaPipeline, PipelineGuard};
use sampler::{Sampler, StopReason};

/// Runs a sampling session against `pipeline`.
///
/// Starts the pipeline, samples it every configured period until the sample
/// count is reached, the stream ends or a termination signal (SIGINT, SIGTERM)
/// arrives, then flushes the output and releases the pipeline.
///
/// # Errors
///
/// Returns [`Error::PipelineStart`] if the pipeline cannot be set to playing.
/// Nothing fails once sampling has started.
pub async fn run<P: MediaPipeline>(config: Config, pipeline: P) -> Result<StopReason> {
    log::info!(
        "Connecting to {} ({} transport, sampling every {})",
        config.target.describe(config.transport),
        config.transport,
        humantime::format_duration(config.period)
    );
    let sink = output::open(&config.output);
    let (guard, events) = PipelineGuard::start(pipeline).map_err(Error::PipelineStart)?;

    let mut sampler = Sampler::new(
        guard,
        sink,
        config.transport.roles(),
        config.period,
        config.samples,
    );
    Ok(sampler.run(events, termination_signal()).await)
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A signal that cannot be listened for is logged and never fires.
async fn termination_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for SIGINT: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
