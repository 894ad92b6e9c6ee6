use crate::{
    error::EvaluationError,
    evaluation::result::{CheckPayload, EvaluationLog, FieldMatch, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Resolves the constraint fields of each input descriptor against each
/// credential and applies their filters.
///
/// The path alternatives of a field are tried in order and the first one that
/// resolves is used. A filter failing on a predicate field does not fail the
/// pair here: the outcome is recorded for [PredicateRelatedField](super::PredicateRelatedField).
/// Optional fields that are missing or fail their filter are left out.
#[derive(Debug, Clone, Copy)]
pub struct FilterEvaluation;

impl FilterEvaluation {
    pub const NAME: &'static str = "FilterEvaluation";
}

impl EvaluationHandler for FilterEvaluation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        ctx: &EvaluationContext<'_>,
        _log: &EvaluationLog,
    ) -> Result<Vec<HandlerCheckResult>, EvaluationError> {
        let mut rows = Vec::new();

        'pairs: for (pair, descriptor, credential) in ctx.pairs() {
            let mut matches = Vec::new();

            for (field_index, field) in descriptor.constraints().fields().iter().enumerate() {
                let Some(resolved) = ctx.accessor.resolve(credential.claims(), field.path())? else {
                    if field.is_optional() {
                        continue;
                    }
                    rows.push(HandlerCheckResult::new(
                        Self::NAME,
                        Status::Error,
                        pair,
                        format!("no claim found at [{}]", field.path().join(", ")),
                    ));
                    continue 'pairs;
                };

                let passed = field
                    .filter()
                    .map_or(true, |filter| ctx.filter.evaluate(&resolved.value, filter));

                let field_match = FieldMatch {
                    field_index,
                    field_id: field.id().cloned(),
                    path: resolved.path,
                    value: None,
                    predicate: field.predicate().copied(),
                    predicate_satisfied: None,
                };

                if field.predicate().is_some() {
                    matches.push(FieldMatch {
                        predicate_satisfied: Some(passed),
                        ..field_match
                    });
                } else if passed {
                    matches.push(FieldMatch {
                        value: Some(resolved.value),
                        ..field_match
                    });
                } else if field.is_optional() {
                    tracing::debug!(
                        "optional field {} of input descriptor `{}` does not pass its filter",
                        field_match.path,
                        descriptor.id()
                    );
                } else {
                    rows.push(HandlerCheckResult::new(
                        Self::NAME,
                        Status::Error,
                        pair,
                        format!("claim at {} does not pass the filter", field_match.path),
                    ));
                    continue 'pairs;
                }
            }

            rows.push(
                HandlerCheckResult::info(
                    Self::NAME,
                    pair,
                    format!("{} fields matched", matches.len()),
                )
                .with_payload(CheckPayload::Fields { matches }),
            );
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::EvaluationOptions,
        core::accessor::ClaimPath,
        evaluation::handlers::tests::{definition, ldp, run_stage},
    };

    fn person_definition() -> crate::core::presentation_definition::PresentationDefinition {
        definition(json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "person",
                "constraints": {
                    "fields": [
                        {
                            "path": ["$.credentialSubject.givenName", "$.credentialSubject.name"],
                            "filter": { "type": "string" }
                        },
                        {
                            "id": "adult",
                            "path": ["$.credentialSubject.birthDate"],
                            "filter": { "type": "string", "formatMaximum": "2006-01-01" },
                            "predicate": "required"
                        },
                        { "path": ["$.credentialSubject.nickname"], "optional": true }
                    ]
                }
            }]
        }))
    }

    #[test]
    fn fields_resolve_through_alternatives() {
        let credentials = [ldp(0, json!({
            "credentialSubject": { "name": "Alice", "birthDate": "2010-03-01" }
        }))];

        let rows = run_stage(
            &FilterEvaluation,
            &person_definition(),
            &credentials,
            &EvaluationOptions::default(),
            &EvaluationLog::default(),
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Status::Info);

        let CheckPayload::Fields { matches } = &rows[0].payload else {
            panic!("expected matched fields");
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(
            matches[0].path,
            ClaimPath::root().key("credentialSubject").key("name")
        );
        assert_eq!(matches[0].value, Some(json!("Alice")));

        // The predicate field keeps its outcome but not its value.
        assert_eq!(matches[1].field_id.as_deref(), Some("adult"));
        assert_eq!(matches[1].value, None);
        assert_eq!(matches[1].predicate_satisfied, Some(false));
    }

    #[test]
    fn missing_or_mismatching_fields_fail_the_pair() {
        let credentials = [
            ldp(0, json!({ "credentialSubject": { "birthDate": "1990-01-01" } })),
            ldp(1, json!({ "credentialSubject": { "name": 42, "birthDate": "1990-01-01" } })),
        ];

        let rows = run_stage(
            &FilterEvaluation,
            &person_definition(),
            &credentials,
            &EvaluationOptions::default(),
            &EvaluationLog::default(),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.status == Status::Error));
        assert!(rows[0].message.starts_with("no claim found"));
        assert!(rows[1].message.contains("does not pass the filter"));
    }

    #[test]
    fn invalid_paths_abort() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{ "id": "d", "constraints": { "fields": [{ "path": ["credentialSubject"] }] } }]
        }));

        assert!(matches!(
            run_stage(
                &FilterEvaluation,
                &definition,
                &[ldp(0, json!({}))],
                &EvaluationOptions::default(),
                &EvaluationLog::default(),
            ),
            Err(EvaluationError::InvalidPath { .. })
        ));
    }
}
