use crate::{
    core::{
        credential_format::ClaimFormatMap, input_descriptor::InputDescriptor,
        wrapped_credential::{CredentialKind, WrappedCredential},
    },
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Checks the credential format against the formats allowed by the input
/// descriptor, or by the presentation definition when the descriptor names
/// none, and against the configured format restriction.
///
/// See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object>
#[derive(Debug, Clone, Copy)]
pub struct FormatRestrictionEvaluation;

impl FormatRestrictionEvaluation {
    pub const NAME: &'static str = "FormatRestrictionEvaluation";
}

impl EvaluationHandler for FormatRestrictionEvaluation {
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
                let allowed = allowed_formats(descriptor, ctx.definition.format());

                let failure = allowed
                    .and_then(|formats| check_definition_formats(formats, credential))
                    .or_else(|| {
                        let restricted = ctx.options.restrict_to_formats.as_ref()?;
                        (!restricted.contains(credential.format())).then(|| {
                            format!(
                                "credential format `{}` is excluded by configuration",
                                credential.format()
                            )
                        })
                    });

                match failure {
                    Some(message) => HandlerCheckResult::new(Self::NAME, Status::Error, pair, message),
                    None => HandlerCheckResult::info(
                        Self::NAME,
                        pair,
                        format!("credential format `{}` is allowed", credential.format()),
                    ),
                }
            })
            .collect())
    }
}

/// The descriptor's own formats take precedence over the definition's.
fn allowed_formats<'a>(
    descriptor: &'a InputDescriptor,
    definition_formats: Option<&'a ClaimFormatMap>,
) -> Option<&'a ClaimFormatMap> {
    Some(descriptor.format())
        .filter(|formats| !formats.is_empty())
        .or(definition_formats)
        .filter(|formats| !formats.is_empty())
}

fn check_definition_formats(
    allowed: &ClaimFormatMap,
    credential: &WrappedCredential,
) -> Option<String> {
    let Some(payload) = allowed.get(credential.format()) else {
        return Some(format!(
            "credential format `{}` is not requested",
            credential.format()
        ));
    };

    match credential.kind() {
        CredentialKind::Jwt { alg: Some(alg), .. } => {
            let algorithms = payload.algorithms()?;
            (!algorithms.contains(alg)).then(|| format!("signing algorithm `{alg}` is not requested"))
        }
        CredentialKind::LinkedData { proof_types, .. } => {
            let requested = payload.proof_types()?;
            (!proof_types.iter().any(|proof_type| requested.contains(proof_type))).then(|| {
                format!(
                    "none of the proof types [{}] is requested",
                    proof_types.join(", ")
                )
            })
        }
        _ => None,
    }
}
