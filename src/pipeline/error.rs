use std::path::PathBuf;

use crate::fsutil;
use crate::role::Role;

use super::PipelineState;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no element currently backs role `{0}`")]
    UnavailableRole(Role),
    #[error("element for role `{role}` has no property `{property}`")]
    UnknownProperty { role: Role, property: String },
    #[error("unable to set the pipeline to `{state}`: {reason}")]
    StateChange {
        state: PipelineState,
        reason: String,
    },
    #[error("pipeline events are already subscribed")]
    AlreadySubscribed,
    #[error(transparent)]
    TraceOpen(#[from] fsutil::FileOpenError),
    #[error("failed to parse replay trace `{path}`: {source}")]
    TraceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
