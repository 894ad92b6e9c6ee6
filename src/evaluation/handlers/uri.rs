use std::collections::BTreeSet;

use serde_json::Value as Json;

use crate::{
    core::wrapped_credential::{CredentialKind, WrappedCredential},
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Checks the `schema` entries of Presentation Exchange v1 input descriptors.
///
/// A credential exposes the URIs of its contexts, types, credential schemas,
/// `vct` or mdoc doc type, and `<context>#<type>` combinations.
///
/// See: <https://identity.foundation/presentation-exchange/spec/v1.0.0/#input-descriptor-object>
#[derive(Debug, Clone, Copy)]
pub struct UriEvaluation;

impl UriEvaluation {
    pub const NAME: &'static str = "UriEvaluation";
}

impl EvaluationHandler for UriEvaluation {
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
                let schema = descriptor.schema();
                if schema.is_empty() {
                    return HandlerCheckResult::info(Self::NAME, pair, "no schema requested");
                }

                let uris = credential_uris(credential);
                let (required, optional): (Vec<_>, Vec<_>) =
                    schema.iter().partition(|entry| entry.is_required());

                let satisfied = if required.is_empty() {
                    optional.iter().any(|entry| uris.contains(entry.uri()))
                } else {
                    required.iter().all(|entry| uris.contains(entry.uri()))
                };

                if satisfied {
                    HandlerCheckResult::info(Self::NAME, pair, "credential matches the requested schema")
                } else {
                    let requested: Vec<_> = schema.iter().map(|entry| entry.uri()).collect();
                    HandlerCheckResult::new(
                        Self::NAME,
                        Status::Error,
                        pair,
                        format!(
                            "credential does not match the requested schema [{}]",
                            requested.join(", ")
                        ),
                    )
                }
            })
            .collect())
    }
}

fn strings(value: Option<&Json>) -> Vec<&str> {
    match value {
        Some(Json::String(s)) => vec![s.as_str()],
        Some(Json::Array(values)) => values.iter().filter_map(Json::as_str).collect(),
        _ => Vec::new(),
    }
}

fn credential_uris(credential: &WrappedCredential) -> BTreeSet<String> {
    let mut uris = BTreeSet::new();

    if let CredentialKind::Mdoc { doc_type, .. } = credential.kind() {
        uris.insert(doc_type.clone());
        return uris;
    }

    let claims = credential.claims();
    // JWT VCs nest the credential under `vc`.
    for document in [Some(claims), claims.get("vc")].into_iter().flatten() {
        let contexts = strings(document.get("@context"));
        let types = strings(document.get("type"));

        for context in &contexts {
            for credential_type in &types {
                uris.insert(format!("{context}#{credential_type}"));
            }
        }
        uris.extend(contexts.into_iter().map(ToOwned::to_owned));
        uris.extend(types.into_iter().map(ToOwned::to_owned));

        let schemas = match document.get("credentialSchema") {
            Some(Json::Array(schemas)) => schemas.iter().collect(),
            Some(schema) => vec![schema],
            None => Vec::new(),
        };
        uris.extend(
            schemas
                .into_iter()
                .filter_map(|schema| schema.get("id")?.as_str())
                .map(ToOwned::to_owned),
        );

        if let Some(vct) = document.get("vct").and_then(Json::as_str) {
            uris.insert(vct.to_owned());
        }
    }

    uris
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::EvaluationOptions,
        evaluation::handlers::tests::{definition, ldp, run_stage},
    };

    fn statuses(definition_json: Json, credentials: &[WrappedCredential]) -> Vec<Status> {
        run_stage(
            &UriEvaluation,
            &definition(definition_json),
            credentials,
            &EvaluationOptions::default(),
            &EvaluationLog::default(),
        )
        .unwrap()
        .into_iter()
        .map(|row| row.status)
        .collect()
    }

    #[test]
    fn any_schema_entry_matches() {
        let credentials = [
            ldp(0, json!({
                "@context": ["https://www.w3.org/2018/credentials/v1", "https://schema.org"],
                "type": ["VerifiableCredential", "Person"]
            })),
            ldp(1, json!({
                "type": "VerifiableCredential",
                "credentialSchema": { "id": "https://example.org/schemas/degree.json" }
            })),
        ];

        let definition = json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "d",
                "schema": [
                    { "uri": "https://schema.org#Person" },
                    { "uri": "https://example.org/schemas/degree.json" }
                ],
                "constraints": {}
            }]
        });

        assert_eq!(statuses(definition, &credentials), [Status::Info, Status::Info]);
    }

    #[test]
    fn required_entries_must_all_match() {
        let credentials = [ldp(0, json!({ "type": ["VerifiableCredential", "Person"] }))];

        let definition = json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "d",
                "schema": [
                    { "uri": "Person", "required": true },
                    { "uri": "UniversityDegreeCredential", "required": true }
                ],
                "constraints": {}
            }]
        });

        assert_eq!(statuses(definition, &credentials), [Status::Error]);
    }

    #[test]
    fn descriptors_without_schema_are_not_checked() {
        let definition = json!({ "id": "pd", "input_descriptors": [{ "id": "d", "constraints": {} }] });
        assert_eq!(statuses(definition, &[ldp(0, json!({}))]), [Status::Info]);
    }
}
