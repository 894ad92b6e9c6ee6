//! The evaluation pipeline.
//!
//! Every stage checks each (input descriptor, credential) pair and writes one
//! row per pair. Stages run in a fixed order and only read rows written by
//! earlier stages.

use crate::{
    config::EvaluationOptions,
    core::{
        accessor::ClaimAccessor, filter::FilterEvaluator, input_descriptor::InputDescriptor,
        presentation_definition::PresentationDefinition, wrapped_credential::WrappedCredential,
    },
    error::EvaluationError,
};

use super::result::{EvaluationLog, HandlerCheckResult};

mod did_restriction;
mod filter;
mod format;
mod is_holder;
mod limit_disclosure;
mod mark_for_submission;
mod predicate;
mod subject_is_issuer;
mod uri;

pub use did_restriction::DIDRestrictionEvaluation;
pub use filter::FilterEvaluation;
pub use format::FormatRestrictionEvaluation;
pub use is_holder::IsHolderEvaluation;
pub use limit_disclosure::LimitDisclosureEvaluation;
pub use mark_for_submission::MarkForSubmissionEvaluation;
pub use predicate::PredicateRelatedField;
pub use subject_is_issuer::SubjectIsIssuerEvaluation;
pub use uri::UriEvaluation;

/// Everything a stage may read.
pub(crate) struct EvaluationContext<'a> {
    pub definition: &'a PresentationDefinition,
    pub credentials: &'a [WrappedCredential],
    pub options: &'a EvaluationOptions,
    pub holder_dids: &'a [String],
    pub disclosure_suites: &'a [String],
    pub accessor: &'a dyn ClaimAccessor,
    pub filter: &'a dyn FilterEvaluator,
}

impl<'a> EvaluationContext<'a> {
    /// Every (input descriptor, credential) pair, descriptor-major, with the
    /// pair key used in log rows.
    pub fn pairs(
        &self,
    ) -> impl Iterator<Item = ((usize, usize), &'a InputDescriptor, &'a WrappedCredential)> + 'a
    {
        let credentials = self.credentials;
        self.definition
            .input_descriptors()
            .iter()
            .enumerate()
            .flat_map(move |(descriptor_index, descriptor)| {
                credentials.iter().map(move |credential| {
                    (
                        (descriptor_index, credential.original_index()),
                        descriptor,
                        credential,
                    )
                })
            })
    }
}

/// One stage of the pipeline.
pub(crate) trait EvaluationHandler: Sync {
    /// Stage name, used as the `evaluator` of the rows it writes.
    fn name(&self) -> &'static str;

    fn handle(
        &self,
        ctx: &EvaluationContext<'_>,
        log: &EvaluationLog,
    ) -> Result<Vec<HandlerCheckResult>, EvaluationError>;
}

const PIPELINE: &[&dyn EvaluationHandler] = &[
    &FormatRestrictionEvaluation,
    &UriEvaluation,
    &FilterEvaluation,
    &PredicateRelatedField,
    &LimitDisclosureEvaluation,
    &SubjectIsIssuerEvaluation,
    &IsHolderEvaluation,
    &DIDRestrictionEvaluation,
    &MarkForSubmissionEvaluation,
];

/// Run every stage in order and return the resulting log.
pub(crate) fn run_pipeline(ctx: &EvaluationContext<'_>) -> Result<EvaluationLog, EvaluationError> {
    PIPELINE
        .iter()
        .try_fold(EvaluationLog::default(), |mut log, handler| {
            let rows = handler.handle(ctx, &log)?;
            tracing::debug!(
                "{}: {} rows, {} errors",
                handler.name(),
                rows.len(),
                rows.iter().filter(|row| row.status.is_error()).count()
            );
            log.extend(rows);
            Ok(log)
        })
}
