use serde::{Deserialize, Serialize};

use crate::core::credential_format::ClaimFormatDesignation;

/// Evaluator configuration.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Only credentials in one of these formats are eligible, on top of the
    /// format restrictions of the presentation definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_to_formats: Option<Vec<ClaimFormatDesignation>>,

    /// Issuer DID methods accepted, e.g. `did:key` or `key`. Empty accepts any.
    pub restrict_to_did_methods: Vec<String>,

    /// Where submitted credentials are located relative to the presentation
    /// submission, which decides the descriptor map paths.
    pub submission_location: SubmissionLocation,
}

impl EvaluationOptions {
    /// Return whether `method` (e.g. `did:web` or `web`) is accepted.
    pub(crate) fn allows_did_method(&self, method: &str) -> bool {
        let method = method.strip_prefix("did:").unwrap_or(method);
        self.restrict_to_did_methods
            .iter()
            .any(|allowed| allowed.strip_prefix("did:").unwrap_or(allowed) == method)
    }
}

/// Location of the submitted credentials.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionLocation {
    /// Credentials are embedded in a verifiable presentation, under
    /// `verifiableCredential`.
    #[default]
    Presentation,
    /// Credentials are sent next to the presentation submission, as a JSON array,
    /// or as a single value when only one SD-JWT is submitted.
    External,
}
