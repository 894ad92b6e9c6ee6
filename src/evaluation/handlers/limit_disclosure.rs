use crate::{
    core::{input_descriptor::ConstraintsLimitDisclosure, wrapped_credential::CredentialKind},
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Checks that credentials can withhold claims when an input descriptor sets
/// `limit_disclosure`.
///
/// SD-JWT and mdoc credentials disclose per claim. Linked data credentials can
/// only when they carry a proof from one of the selective disclosure suites
/// supplied by the caller. JWT credentials cannot.
#[derive(Debug, Clone, Copy)]
pub struct LimitDisclosureEvaluation;

impl LimitDisclosureEvaluation {
    pub const NAME: &'static str = "LimitDisclosureEvaluation";
}

impl EvaluationHandler for LimitDisclosureEvaluation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        ctx: &EvaluationContext<'_>,
        _log: &EvaluationLog,
    ) -> Result<Vec<HandlerCheckResult>, EvaluationError> {
        Ok(ctx
            .pairs()
            .map(|(pair, descriptor, credential)| {
                let Some(limit_disclosure) = descriptor.constraints().limit_disclosure() else {
                    return HandlerCheckResult::info(Self::NAME, pair, "limit_disclosure not requested");
                };

                let capable = match credential.kind() {
                    CredentialKind::SdJwt(_) | CredentialKind::Mdoc { .. } => true,
                    CredentialKind::LinkedData { proof_types, .. } => proof_types
                        .iter()
                        .any(|proof_type| ctx.disclosure_suites.contains(proof_type)),
                    CredentialKind::Jwt { .. } => false,
                };

                if capable {
                    return HandlerCheckResult::info(Self::NAME, pair, "credential supports selective disclosure");
                }

                let status = match limit_disclosure {
                    ConstraintsLimitDisclosure::Required => Status::Error,
                    ConstraintsLimitDisclosure::Preferred => Status::Warn,
                };
                HandlerCheckResult::new(
                    Self::NAME,
                    status,
                    pair,
                    format!(
                        "credential format `{}` cannot limit disclosure",
                        credential.format()
                    ),
                )
            })
            .collect())
    }
}
