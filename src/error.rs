use crate::pipeline;

/// Errors that abort a run before sampling starts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to set the pipeline to playing: {0}")]
    PipelineStart(#[source] pipeline::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}
