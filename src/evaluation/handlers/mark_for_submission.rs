use crate::{
    error::EvaluationError,
    evaluation::result::{CheckPayload, EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Marks each pair as eligible for submission, unless an earlier stage wrote
/// an error row for it.
#[derive(Debug, Clone, Copy)]
pub struct MarkForSubmissionEvaluation;

impl MarkForSubmissionEvaluation {
    pub const NAME: &'static str = "MarkForSubmissionEvaluation";
}

impl EvaluationHandler for MarkForSubmissionEvaluation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        ctx: &EvaluationContext<'_>,
        log: &EvaluationLog,
    ) -> Result<Vec<HandlerCheckResult>, EvaluationError> {
        Ok(ctx
            .pairs()
            .map(|(pair, descriptor, _)| {
                match log.for_pair(pair.0, pair.1).find(|row| row.status.is_error()) {
                    Some(failure) => HandlerCheckResult::new(
                        Self::NAME,
                        Status::Error,
                        pair,
                        format!("not eligible for submission: {}", failure.message),
                    )
                    .with_payload(CheckPayload::Ineligible {
                        evaluator: failure.evaluator,
                    }),
                    None => HandlerCheckResult::info(Self::NAME, pair, "eligible for submission")
                        .with_payload(CheckPayload::Eligible {
                            groups: descriptor.groups().clone(),
                        }),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::EvaluationOptions,
        evaluation::handlers::{
            tests::{definition, ldp, run_stage},
            FilterEvaluation, SubjectIsIssuerEvaluation,
        },
    };

    #[test]
    fn first_failing_stage_is_named() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "d",
                "group": ["A"],
                "constraints": {
                    "subject_is_issuer": "required",
                    "fields": [{ "path": ["$.name"] }]
                }
            }]
        }));
        let credentials = [
            ldp(0, json!({ "name": "Alice", "issuer": "did:example:a", "credentialSubject": { "id": "did:example:a" } })),
            ldp(1, json!({ "issuer": "did:example:a" })),
        ];
        let options = EvaluationOptions::default();

        let mut log = EvaluationLog::default();
        for handler in [
            &FilterEvaluation as &dyn EvaluationHandler,
            &SubjectIsIssuerEvaluation,
        ] {
            log.extend(run_stage(handler, &definition, &credentials, &options, &log).unwrap());
        }

        let rows = run_stage(&MarkForSubmissionEvaluation, &definition, &credentials, &options, &log)
            .unwrap();

        assert_eq!(
            rows[0].payload,
            CheckPayload::Eligible { groups: vec!["A".into()] }
        );
        assert_eq!(rows[1].status, Status::Error);
        assert_eq!(
            rows[1].payload,
            CheckPayload::Ineligible { evaluator: FilterEvaluation::NAME }
        );
    }
}
