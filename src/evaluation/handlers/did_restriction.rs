use crate::{
    core::wrapped_credential::CredentialKind,
    error::EvaluationError,
    evaluation::result::{EvaluationLog, HandlerCheckResult, Status},
};

use super::{EvaluationContext, EvaluationHandler};

/// Restricts issuers to the DID methods accepted by the configuration.
///
/// Issuers that are not DIDs are not subject to the restriction. An mdoc whose
/// issuer cannot be determined aborts the evaluation.
#[derive(Debug, Clone, Copy)]
pub struct DIDRestrictionEvaluation;

impl DIDRestrictionEvaluation {
    pub const NAME: &'static str = "DIDRestrictionEvaluation";
}

impl EvaluationHandler for DIDRestrictionEvaluation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        ctx: &EvaluationContext<'_>,
        _log: &EvaluationLog,
    ) -> Result<Vec<HandlerCheckResult>, EvaluationError> {
        let mut rows = Vec::new();

        for (pair, _, credential) in ctx.pairs() {
            if ctx.options.restrict_to_did_methods.is_empty() {
                rows.push(HandlerCheckResult::info(Self::NAME, pair, "no DID method restriction"));
                continue;
            }

            let Some(issuer) = credential.issuer_id() else {
                if let CredentialKind::Mdoc { .. } = credential.kind() {
                    return Err(EvaluationError::IssuerUndeterminable {
                        index: credential.original_index(),
                    });
                }
                rows.push(HandlerCheckResult::info(Self::NAME, pair, "issuer is unknown"));
                continue;
            };

            // The scheme is case-insensitive.
            let Some(method) = issuer
                .split_once(':')
                .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("did"))
                .and_then(|(_, did)| did.split(':').next())
            else {
                rows.push(HandlerCheckResult::info(Self::NAME, pair, "issuer is not a DID"));
                continue;
            };

            rows.push(if ctx.options.allows_did_method(method) {
                HandlerCheckResult::info(Self::NAME, pair, format!("DID method `{method}` is allowed"))
            } else {
                HandlerCheckResult::new(
                    Self::NAME,
                    Status::Error,
                    pair,
                    format!("issuer DID method `{method}` is not allowed"),
                )
            });
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
        core::{credential_format::ClaimFormatDesignation, wrapped_credential::WrappedCredential},
        evaluation::handlers::tests::{definition, ldp, run_stage},
    };

    fn options() -> EvaluationOptions {
        EvaluationOptions {
            restrict_to_did_methods: vec!["did:key".into(), "web".into()],
            ..Default::default()
        }
    }

    #[test]
    fn issuer_did_methods() {
        let definition = definition(json!({ "id": "pd", "input_descriptors": [{ "id": "d", "constraints": {} }] }));
        let credentials = [
            ldp(0, json!({ "issuer": "did:key:z6Mk" })),
            ldp(1, json!({ "issuer": { "id": "did:web:example.com" } })),
            ldp(2, json!({ "issuer": "did:ion:EiD" })),
            ldp(3, json!({ "issuer": "https://issuer.example" })),
            ldp(4, json!({})),
            ldp(5, json!({ "issuer": "DID:ion:EiD" })),
            ldp(6, json!({ "issuer": "Did:key:z6Mk" })),
        ];

        let rows = run_stage(
            &DIDRestrictionEvaluation,
            &definition,
            &credentials,
            &options(),
            &EvaluationLog::default(),
        )
        .unwrap();

        let statuses: Vec<_> = rows.iter().map(|row| row.status).collect();
        assert_eq!(
            statuses,
            [
                Status::Info,
                Status::Info,
                Status::Error,
                Status::Info,
                Status::Info,
                Status::Error,
                Status::Info
            ]
        );
        assert!(rows[5].message.contains("`ion`"));
    }

    #[test]
    fn mdoc_without_issuer_is_fatal() {
        let definition = definition(json!({ "id": "pd", "input_descriptors": [{ "id": "d", "constraints": {} }] }));
        let mdoc = WrappedCredential::new(
            7,
            ClaimFormatDesignation::MsoMDoc,
            CredentialKind::Mdoc {
                doc_type: "org.iso.18013.5.1.mDL".into(),
                claims: json!({}),
            },
        );

        assert!(matches!(
            run_stage(
                &DIDRestrictionEvaluation,
                &definition,
                &[mdoc.clone()],
                &options(),
                &EvaluationLog::default(),
            ),
            Err(EvaluationError::IssuerUndeterminable { index: 7 })
        ));

        // Without a restriction the issuer is never needed.
        assert!(run_stage(
            &DIDRestrictionEvaluation,
            &definition,
            &[mdoc],
            &EvaluationOptions::default(),
            &EvaluationLog::default(),
        )
        .is_ok());
    }
}
