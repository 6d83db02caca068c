//! Errors raised while capturing a snapshot.
//!
//! [`CaptureError::UnavailableRole`] is the expected "no data this period"
//! outcome for roles whose element does not exist yet; callers skip the role
//! instead of failing. The remaining variants indicate a pipeline that does not
//! expose the declared metric set and are logged.

use crate::pipeline;
use crate::role::Role;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no element currently backs role `{0}`")]
    UnavailableRole(Role),

    #[error("failed to read property `{property}` of role `{role}`: {source}")]
    Property {
        role: Role,
        property: &'static str,
        #[source]
        source: pipeline::Error,
    },

    #[error("property `{property}` of role `{role}` has no field `{field}`")]
    MissingField {
        role: Role,
        property: &'static str,
        field: &'static str,
    },

    #[error("metric `{key}` of role `{role}` holds a {found}, expected a number")]
    NotNumeric {
        role: Role,
        key: &'static str,
        found: &'static str,
    },
}

impl CaptureError {
    pub(super) fn from_pipeline(role: Role, property: &'static str, err: pipeline::Error) -> Self {
        match err {
            pipeline::Error::UnavailableRole(role) => CaptureError::UnavailableRole(role),
            source => CaptureError::Property {
                role,
                property,
                source,
            },
        }
    }
}
