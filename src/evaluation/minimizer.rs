//! Selective disclosure minimization of selected SD-JWT credentials.

use std::collections::HashSet;

use crate::{
    core::{
        accessor::ClaimPath, presentation_definition::PresentationDefinition,
        wrapped_credential::WrappedCredential,
    },
    error::EvaluationError,
};

use super::{
    handlers::FilterEvaluation,
    result::{CheckPayload, EvaluationLog},
};

/// Check that every SD-JWT credential can be hashed.
pub(crate) fn ensure_hashers(credentials: &[WrappedCredential]) -> Result<(), EvaluationError> {
    match credentials
        .iter()
        .find(|credential| credential.as_sd_jwt().is_some_and(|sd_jwt| sd_jwt.hasher().is_none()))
    {
        Some(credential) => Err(EvaluationError::MissingHasher {
            index: credential.original_index(),
        }),
        None => Ok(()),
    }
}

/// Minimize `credential` if it is an SD-JWT selected only by input
/// descriptors that set `limit_disclosure`.
///
/// `selected` lists the selected (input descriptor, credential) pairs. Other
/// credentials are returned unchanged.
pub(crate) fn minimize(
    definition: &PresentationDefinition,
    log: &EvaluationLog,
    selected: &[(usize, usize)],
    credential: &WrappedCredential,
) -> Result<WrappedCredential, EvaluationError> {
    let Some(sd_jwt) = credential.as_sd_jwt() else {
        return Ok(credential.clone());
    };

    let index = credential.original_index();
    let descriptors: Vec<usize> = selected
        .iter()
        .filter(|(_, credential_index)| *credential_index == index)
        .map(|(descriptor_index, _)| *descriptor_index)
        .collect();

    let limited = !descriptors.is_empty()
        && descriptors.iter().all(|descriptor_index| {
            definition
                .input_descriptors()
                .get(*descriptor_index)
                .is_some_and(|descriptor| descriptor.constraints().limit_disclosure().is_some())
        });

    if !limited {
        tracing::debug!("credential {index} is not minimized, limit_disclosure is not requested by every selecting descriptor");
        return Ok(credential.clone());
    }

    let hasher = sd_jwt
        .hasher()
        .ok_or(EvaluationError::MissingHasher { index })?;
    sd_jwt.verify_disclosures(&**hasher)?;

    let paths: Vec<&ClaimPath> = descriptors
        .iter()
        .flat_map(|descriptor_index| log.for_pair(*descriptor_index, index))
        .filter(|row| row.evaluator == FilterEvaluation::NAME)
        .flat_map(|row| match &row.payload {
            CheckPayload::Fields { matches } => matches.as_slice(),
            _ => &[],
        })
        .map(|field| &field.path)
        .collect();

    let keep: HashSet<&str> = paths
        .iter()
        .flat_map(|path| sd_jwt.digests_for_path(path))
        .collect();

    let minimized = sd_jwt.retain_disclosures(&keep);
    tracing::debug!(
        "credential {index}: kept {} of {} disclosures for {} paths",
        minimized.disclosures().len(),
        sd_jwt.disclosures().len(),
        paths.len()
    );

    Ok(credential.with_sd_jwt(minimized))
}
