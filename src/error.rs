use crate::core::{credential_format::ClaimFormatDesignation, sd_jwt::DisclosureError};

/// Request-level evaluation failure.
///
/// These abort an evaluation call before any result is produced. Per-pair
/// failures (a filter mismatch, a format mismatch, ...) are never reported
/// through this type; they are rows of the evaluation log.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A selectively disclosable credential was supplied without a hasher.
    #[error("credential at index {index} uses selective disclosure but no hasher was supplied")]
    MissingHasher { index: usize },

    /// The credential format has no claim view.
    #[error("unsupported credential format `{0}`")]
    UnsupportedFormat(ClaimFormatDesignation),

    /// The issuer of a credential is needed but cannot be determined.
    #[error("issuer of credential at index {index} cannot be determined")]
    IssuerUndeterminable { index: usize },

    /// A submission requirement breaks the rule tree invariants.
    #[error("malformed submission requirement: {0}")]
    MalformedRequirement(String),

    /// The presentation definition is structurally invalid.
    #[error("invalid presentation definition: {0}")]
    InvalidDefinition(String),

    /// A JSONPath expression cannot be parsed.
    #[error("invalid JSONPath expression `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A credential cannot be wrapped.
    #[error("invalid credential at index {index}: {reason}")]
    InvalidCredential { index: usize, reason: String },

    /// Selective disclosure processing failed.
    #[error(transparent)]
    Disclosure(#[from] DisclosureError),

    /// The supplied credentials cannot satisfy the presentation definition.
    #[error("presentation definition cannot be satisfied: {0}")]
    Unsatisfied(String),
}

impl EvaluationError {
    pub(crate) fn invalid_path(path: &str, reason: impl ToString) -> Self {
        Self::InvalidPath {
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_credential(index: usize, reason: impl ToString) -> Self {
        Self::InvalidCredential {
            index,
            reason: reason.to_string(),
        }
    }
}
