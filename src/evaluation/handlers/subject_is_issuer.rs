use crate::{
    core::input_descriptor::Optionality,
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Checks the `subject_is_issuer` relational constraint: the issuer must be
/// one of the subjects of the credential, i.e. the credential is self-issued.
///
/// See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#relational-constraint-feature>
#[derive(Debug, Clone, Copy)]
pub struct SubjectIsIssuerEvaluation;

impl SubjectIsIssuerEvaluation {
    pub const NAME: &'static str = "SubjectIsIssuerEvaluation";
}

impl EvaluationHandler for SubjectIsIssuerEvaluation {
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
                let Some(directive) = descriptor.constraints().subject_is_issuer() else {
                    return HandlerCheckResult::info(Self::NAME, pair, "subject_is_issuer not requested");
                };

                let self_issued = credential
                    .issuer_id()
                    .is_some_and(|issuer| credential.subject_ids().contains(issuer));

                if self_issued {
                    return HandlerCheckResult::info(Self::NAME, pair, "subject is the issuer");
                }

                let status = match directive {
                    Optionality::Required => Status::Error,
                    Optionality::Preferred => Status::Warn,
                };
                HandlerCheckResult::new(Self::NAME, status, pair, "subject is not the issuer")
            })
            .collect())
    }
}
