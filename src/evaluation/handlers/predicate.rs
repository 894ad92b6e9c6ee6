use crate::{
    core::input_descriptor::Predicate,
    error::EvaluationError,
    evaluation::result::{
        CheckPayload, EvaluationLog, HandlerCheckResult, PredicateOutcome, Status,
    },
};

use super::{EvaluationContext, EvaluationHandler, FilterEvaluation};

/// Reports the boolean outcome of predicate fields in place of their values.
///
/// See: <https://identity.foundation/presentation-exchange/#predicate-feature>
#[derive(Debug, Clone, Copy)]
pub struct PredicateRelatedField;

impl PredicateRelatedField {
    pub const NAME: &'static str = "PredicateRelatedField";
}

impl EvaluationHandler for PredicateRelatedField {
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
            .map(|(pair, _, _)| {
                let outcomes: Vec<PredicateOutcome> = log
                    .for_pair(pair.0, pair.1)
                    .filter(|row| row.evaluator == FilterEvaluation::NAME)
                    .flat_map(|row| match &row.payload {
                        CheckPayload::Fields { matches } => matches.as_slice(),
                        _ => &[],
                    })
                    .filter_map(|field| {
                        Some(PredicateOutcome {
                            field_index: field.field_index,
                            field_id: field.field_id.clone(),
                            predicate: field.predicate?,
                            satisfied: field.predicate_satisfied?,
                        })
                    })
                    .collect();

                if outcomes.is_empty() {
                    return HandlerCheckResult::info(Self::NAME, pair, "no predicate fields");
                }

                let status = outcomes
                    .iter()
                    .filter(|outcome| !outcome.satisfied)
                    .map(|outcome| match outcome.predicate {
                        Predicate::Required => Status::Error,
                        Predicate::Preferred => Status::Warn,
                    })
                    .max()
                    .unwrap_or_default();

                let message = match status {
                    Status::Info => "predicates satisfied".to_owned(),
                    _ => {
                        let unsatisfied: Vec<_> = outcomes
                            .iter()
                            .filter(|outcome| !outcome.satisfied)
                            .map(|outcome| match &outcome.field_id {
                                Some(id) => id.clone(),
                                None => format!("fields[{}]", outcome.field_index),
                            })
                            .collect();
                        format!("predicate not satisfied for {}", unsatisfied.join(", "))
                    }
                };

                HandlerCheckResult::new(Self::NAME, status, pair, message)
                    .with_payload(CheckPayload::Predicates { outcomes })
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
        evaluation::handlers::tests::{definition, ldp, run_stage},
    };

    #[test]
    fn predicate_outcomes_replace_values() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "d",
                "constraints": {
                    "fields": [
                        {
                            "id": "age",
                            "path": ["$.age"],
                            "filter": { "type": "number", "minimum": 18 },
                            "predicate": "required"
                        },
                        {
                            "id": "country",
                            "path": ["$.country"],
                            "filter": { "const": "NL" },
                            "predicate": "preferred"
                        }
                    ]
                }
            }]
        }));
        let credentials = [
            ldp(0, json!({ "age": 30, "country": "NL" })),
            ldp(1, json!({ "age": 30, "country": "BE" })),
            ldp(2, json!({ "age": 12, "country": "NL" })),
        ];
        let options = EvaluationOptions::default();

        let mut log = EvaluationLog::default();
        log.extend(
            run_stage(&FilterEvaluation, &definition, &credentials, &options, &log).unwrap(),
        );
        let rows = run_stage(&PredicateRelatedField, &definition, &credentials, &options, &log).unwrap();

        let statuses: Vec<_> = rows.iter().map(|row| row.status).collect();
        assert_eq!(statuses, [Status::Info, Status::Warn, Status::Error]);
        assert_eq!(rows[2].message, "predicate not satisfied for age");

        let CheckPayload::Predicates { outcomes } = &rows[1].payload else {
            panic!("expected predicate outcomes");
        };
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].satisfied);
        assert!(!outcomes[1].satisfied);
    }
}
