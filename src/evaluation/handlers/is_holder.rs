use crate::{
    core::input_descriptor::Optionality,
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Checks the `is_holder` relational constraint: a subject of the credential
/// must be one of the holder identifiers supplied by the caller.
///
/// See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#relational-constraint-feature>
#[derive(Debug, Clone, Copy)]
pub struct IsHolderEvaluation;

impl IsHolderEvaluation {
    pub const NAME: &'static str = "IsHolderEvaluation";
}

impl EvaluationHandler for IsHolderEvaluation {
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
                let directives = descriptor.constraints().is_holder();
                if directives.is_empty() {
                    return HandlerCheckResult::info(Self::NAME, pair, "is_holder not requested");
                }

                let held = credential
                    .subject_ids()
                    .iter()
                    .any(|subject| ctx.holder_dids.contains(subject));

                if held {
                    return HandlerCheckResult::info(Self::NAME, pair, "subject is the holder");
                }

                let status = if directives
                    .iter()
                    .any(|subject| subject.directive() == Optionality::Required)
                {
                    Status::Error
                } else {
                    Status::Warn
                };

                let field_ids: Vec<&str> = directives
                    .iter()
                    .flat_map(|subject| subject.field_id().iter())
                    .map(String::as_str)
                    .collect();

                HandlerCheckResult::new(
                    Self::NAME,
                    status,
                    pair,
                    format!("subject of [{}] is not the holder", field_ids.join(", ")),
                )
            })
            .collect())
    }
}
