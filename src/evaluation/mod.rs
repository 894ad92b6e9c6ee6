//! Evaluation of presentation definitions against held credentials.
//!
//! An [Evaluator] runs the check pipeline over every (input descriptor,
//! credential) pair, resolves the submission requirements against the
//! eligible pairs, and reports the outcome. [Evaluator::select] additionally
//! returns the selected credentials with their disclosures minimized, and
//! [Evaluator::build_submission] describes a selection as a
//! [PresentationSubmission].

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use serde_json_path::JsonPath;

use crate::{
    config::{EvaluationOptions, SubmissionLocation},
    core::{
        accessor::{ClaimAccessor, JsonPathAccessor},
        filter::{FilterEvaluator, JsonSchemaFilter},
        presentation_definition::PresentationDefinition,
        presentation_submission::{DescriptorMap, PresentationSubmission},
        wrapped_credential::{CredentialKind, WrappedCredential},
    },
    error::EvaluationError,
};

use aggregate::aggregate;
use handlers::{run_pipeline, EvaluationContext};
use resolver::{resolve, Resolution};

pub mod aggregate;
pub mod handlers;
mod minimizer;
pub mod resolver;
pub mod result;

pub use resolver::{MatchSource, SubmissionRequirementMatch};
pub use result::{
    CheckPayload, Checked, EvaluationLog, FieldMatch, HandlerCheckResult, PredicateOutcome, Status,
};

/// Outcome of [Evaluator::evaluate].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub status: Status,
    pub errors: Vec<Checked>,
    pub warnings: Vec<Checked>,
    pub matches: Vec<SubmissionRequirementMatch>,
    /// `original_index` of the selected credentials, ascending.
    pub selected_indices: Vec<usize>,
    pub log: EvaluationLog,
}

/// Outcome of [Evaluator::select].
#[derive(Debug, Clone)]
pub struct SelectResult {
    pub status: Status,
    pub errors: Vec<Checked>,
    pub warnings: Vec<Checked>,
    pub matches: Vec<SubmissionRequirementMatch>,
    /// The selected credentials in caller order, minimized where the
    /// selecting input descriptors limit disclosure.
    pub selected_credentials: Vec<WrappedCredential>,
}

/// Evaluates presentation definitions against wrapped credentials.
///
/// Calls share no state, so an evaluator can be used from several threads.
#[derive(Debug, Clone)]
pub struct Evaluator {
    accessor: Arc<dyn ClaimAccessor + Send + Sync>,
    filter: Arc<dyn FilterEvaluator + Send + Sync>,
    options: EvaluationOptions,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Evaluator {
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::default()
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Evaluate `credentials` against `definition`.
    ///
    /// `holder_dids` identify the holder for `is_holder` constraints, and
    /// `limit_disclosure_signature_suites` are the linked data proof types able
    /// to disclose selectively.
    ///
    /// # Errors
    ///
    /// Fails on invalid definitions, credentials that cannot be evaluated
    /// (see [EvaluationError]) and SD-JWT credentials without a hasher.
    /// Unsatisfied definitions are not errors: they are reported through the
    /// result status.
    pub fn evaluate(
        &self,
        definition: &PresentationDefinition,
        credentials: &[WrappedCredential],
        holder_dids: &[String],
        limit_disclosure_signature_suites: &[String],
    ) -> Result<EvaluationResult, EvaluationError> {
        let (log, resolution) = self.run(
            definition,
            credentials,
            holder_dids,
            limit_disclosure_signature_suites,
        )?;
        let aggregate = aggregate(&log, &resolution);

        Ok(EvaluationResult {
            status: aggregate.status,
            errors: aggregate.errors,
            warnings: aggregate.warnings,
            selected_indices: resolution.selected_indices(),
            matches: resolution.matches,
            log,
        })
    }

    /// Evaluate `credentials` against `definition` and return the selected
    /// credentials.
    ///
    /// SD-JWT credentials selected only by input descriptors that set
    /// `limit_disclosure` keep just the disclosures needed for the matched
    /// fields.
    pub fn select(
        &self,
        definition: &PresentationDefinition,
        credentials: &[WrappedCredential],
        holder_dids: &[String],
        limit_disclosure_signature_suites: &[String],
    ) -> Result<SelectResult, EvaluationError> {
        let (log, resolution) = self.run(
            definition,
            credentials,
            holder_dids,
            limit_disclosure_signature_suites,
        )?;
        let aggregate = aggregate(&log, &resolution);

        let selected = resolution.selected_indices();
        let mut selected_credentials = credentials
            .iter()
            .filter(|credential| selected.contains(&credential.original_index()))
            .map(|credential| {
                minimizer::minimize(definition, &log, &resolution.selected, credential)
            })
            .collect::<Result<Vec<_>, _>>()?;
        selected_credentials.sort_by_key(WrappedCredential::original_index);

        Ok(SelectResult {
            status: aggregate.status,
            errors: aggregate.errors,
            warnings: aggregate.warnings,
            matches: resolution.matches,
            selected_credentials,
        })
    }

    /// Describe how `selected` credentials satisfy `definition`.
    ///
    /// Descriptor map paths point into the submitted credentials, in the order
    /// given, according to the configured [SubmissionLocation].
    ///
    /// # Errors
    ///
    /// Fails with [EvaluationError::Unsatisfied] when the credentials do not
    /// satisfy the definition.
    pub fn build_submission(
        &self,
        definition: &PresentationDefinition,
        selected: &[WrappedCredential],
    ) -> Result<PresentationSubmission, EvaluationError> {
        // The submitter is the holder of what it submits, and a selection has
        // already been through disclosure limitation.
        let holder_dids: Vec<String> = selected
            .iter()
            .flat_map(|credential| credential.subject_ids().iter().cloned())
            .collect();
        let suites: Vec<String> = selected
            .iter()
            .filter_map(|credential| match credential.kind() {
                CredentialKind::LinkedData { proof_types, .. } => Some(proof_types.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();

        let (log, resolution) = self.run(definition, selected, &holder_dids, &suites)?;
        let aggregate = aggregate(&log, &resolution);

        if aggregate.status.is_error() {
            let reasons: Vec<&str> = aggregate
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect();
            return Err(EvaluationError::Unsatisfied(reasons.join("; ")));
        }

        let mut pairs: Vec<(usize, usize)> = resolution
            .selected
            .iter()
            .filter_map(|(descriptor, original_index)| {
                let position = selected
                    .iter()
                    .position(|credential| credential.original_index() == *original_index)?;
                Some((*descriptor, position))
            })
            .collect();
        pairs.sort_unstable();

        let lone_sd_jwt = selected.len() == 1 && selected[0].as_sd_jwt().is_some();

        let descriptor_map = pairs
            .into_iter()
            .map(|(descriptor, position)| {
                let path = match self.options.submission_location {
                    SubmissionLocation::Presentation => format!("$.verifiableCredential[{position}]"),
                    SubmissionLocation::External if lone_sd_jwt => "$".to_owned(),
                    SubmissionLocation::External => format!("$[{position}]"),
                };
                let path = JsonPath::parse(&path)
                    .map_err(|e| EvaluationError::invalid_path(&path, e))?;

                Ok(DescriptorMap::new(
                    definition.input_descriptors()[descriptor].id(),
                    selected[position].format().clone(),
                    path,
                ))
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        Ok(PresentationSubmission::new(
            uuid::Uuid::new_v4(),
            definition.id().clone(),
            descriptor_map,
        ))
    }

    fn run(
        &self,
        definition: &PresentationDefinition,
        credentials: &[WrappedCredential],
        holder_dids: &[String],
        disclosure_suites: &[String],
    ) -> Result<(EvaluationLog, Resolution), EvaluationError> {
        definition.validate()?;
        for credential in credentials {
            credential.ensure_supported()?;
        }
        minimizer::ensure_hashers(credentials)?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = credentials
            .iter()
            .find(|credential| !seen.insert(credential.original_index()))
        {
            return Err(EvaluationError::invalid_credential(
                duplicate.original_index(),
                "original index is used by more than one credential",
            ));
        }

        let ctx = EvaluationContext {
            definition,
            credentials,
            options: &self.options,
            holder_dids,
            disclosure_suites,
            accessor: self.accessor.as_ref(),
            filter: self.filter.as_ref(),
        };

        let log = run_pipeline(&ctx)?;
        let resolution = resolve(definition, &log)?;

        tracing::debug!(
            "evaluated `{}`: {} credentials, {} log rows, status {}",
            definition.id(),
            credentials.len(),
            log.len(),
            resolution.status
        );

        Ok((log, resolution))
    }
}

/// Builder struct for [Evaluator].
#[derive(Debug, Clone, Default)]
pub struct EvaluatorBuilder {
    accessor: Option<Arc<dyn ClaimAccessor + Send + Sync>>,
    filter: Option<Arc<dyn FilterEvaluator + Send + Sync>>,
    options: EvaluationOptions,
}

impl EvaluatorBuilder {
    /// Build the evaluator. Collaborators that were not set default to
    /// [JsonPathAccessor] and [JsonSchemaFilter].
    pub fn build(self) -> Evaluator {
        Evaluator {
            accessor: self.accessor.unwrap_or_else(|| Arc::new(JsonPathAccessor)),
            filter: self.filter.unwrap_or_else(|| Arc::new(JsonSchemaFilter)),
            options: self.options,
        }
    }

    /// Set the claim accessor resolving field paths.
    pub fn with_accessor(mut self, accessor: Arc<dyn ClaimAccessor + Send + Sync>) -> Self {
        self.accessor = Some(accessor);
        self
    }

    /// Set the evaluator of field filters.
    pub fn with_filter(mut self, filter: Arc<dyn FilterEvaluator + Send + Sync>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        core::credential_format::ClaimFormatDesignation,
        evaluation::handlers::tests::{definition, jwt, ldp},
    };

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn evaluator_is_shareable() {
        assert_send_sync::<Evaluator>();
    }

    #[test]
    fn evaluate_without_submission_requirements() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "degree",
                "constraints": {
                    "fields": [{
                        "path": ["$.credentialSubject.degree.type"],
                        "filter": { "const": "BachelorDegree" }
                    }]
                }
            }]
        }));
        let credentials = [
            ldp(0, json!({ "credentialSubject": { "degree": { "type": "MasterDegree" } } })),
            jwt(1, json!({ "credentialSubject": { "degree": { "type": "BachelorDegree" } } })),
        ];

        let result = Evaluator::default()
            .evaluate(&definition, &credentials, &[], &[])
            .unwrap();

        assert_eq!(result.status, Status::Info);
        assert!(result.errors.is_empty());
        assert_eq!(result.selected_indices, [1]);
        assert_eq!(result.matches[0].credentials, [1]);
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let definition = definition(json!({ "id": "pd", "input_descriptors": [{ "id": "d" }] }));
        let credentials = [ldp(0, json!({})), ldp(0, json!({}))];

        assert!(matches!(
            Evaluator::default().evaluate(&definition, &credentials, &[], &[]),
            Err(EvaluationError::InvalidCredential { index: 0, .. })
        ));
    }

    #[test]
    fn credentials_in_unsupported_formats_are_rejected() {
        let definition = definition(json!({ "id": "pd", "input_descriptors": [{ "id": "d" }] }));
        let anoncreds = WrappedCredential::new(
            0,
            ClaimFormatDesignation::AcVc,
            CredentialKind::LinkedData {
                claims: json!({}),
                proof_types: vec![],
            },
        );

        assert!(matches!(
            Evaluator::default().evaluate(&definition, &[anoncreds], &[], &[]),
            Err(EvaluationError::UnsupportedFormat(ClaimFormatDesignation::AcVc))
        ));

        let mislabeled = WrappedCredential::new(
            1,
            ClaimFormatDesignation::VcSdJwt,
            CredentialKind::Jwt {
                claims: json!({}),
                alg: None,
            },
        );
        assert!(matches!(
            Evaluator::default().select(&definition, &[ldp(0, json!({})), mislabeled], &[], &[]),
            Err(EvaluationError::InvalidCredential { index: 1, .. })
        ));
    }

    #[test]
    fn submission_paths_follow_the_location() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{ "id": "a" }, { "id": "b" }]
        }));
        let credentials = [jwt(3, json!({})), ldp(8, json!({}))];

        let submission = Evaluator::default()
            .build_submission(&definition, &credentials)
            .unwrap();
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["definition_id"], json!("pd"));
        assert_eq!(value["descriptor_map"].as_array().unwrap().len(), 4);
        assert_eq!(value["descriptor_map"][1]["id"], json!("a"));
        assert_eq!(value["descriptor_map"][1]["format"], json!("ldp_vc"));
        assert_eq!(
            value["descriptor_map"][1]["path"],
            json!(JsonPath::parse("$.verifiableCredential[1]").unwrap().to_string())
        );

        let external = Evaluator::builder()
            .with_options(EvaluationOptions {
                submission_location: SubmissionLocation::External,
                ..Default::default()
            })
            .build();
        let submission = external.build_submission(&definition, &credentials).unwrap();
        assert_eq!(
            submission.descriptor_map()[3].path,
            JsonPath::parse("$[1]").unwrap()
        );
    }

    #[test]
    fn unsatisfiable_submission() {
        let definition = definition(json!({
            "id": "pd",
            "input_descriptors": [{
                "id": "d",
                "constraints": { "fields": [{ "path": ["$.missing"] }] }
            }]
        }));

        assert!(matches!(
            Evaluator::default().build_submission(&definition, &[ldp(0, json!({}))]),
            Err(EvaluationError::Unsatisfied(_))
        ));
    }
}
