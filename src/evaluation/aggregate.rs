use super::{
    resolver::Resolution,
    result::{Checked, EvaluationLog, Status},
};

/// Tag of the entries reported for unsatisfied submission requirements.
pub const SUBMISSION_REQUIREMENT_EVALUATION: &str = "SubmissionRequirementEvaluation";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Aggregate {
    pub status: Status,
    pub errors: Vec<Checked>,
    pub warnings: Vec<Checked>,
}

/// Fold the log and the resolution into the reported status and messages.
///
/// The status is the worst of the resolution and of every row of the selected
/// pairs, so preferred constraints the selection misses surface as warnings.
pub(crate) fn aggregate(log: &EvaluationLog, resolution: &Resolution) -> Aggregate {
    let status = resolution
        .selected
        .iter()
        .flat_map(|(descriptor, credential)| log.for_pair(*descriptor, *credential))
        .map(|row| row.status)
        .fold(resolution.status, Status::worst);

    let mut errors: Vec<Checked> = log
        .rows()
        .iter()
        .filter(|row| row.status == Status::Error)
        .map(Checked::from)
        .collect();

    errors.extend(
        resolution
            .matches
            .iter()
            .flat_map(|root| root.iter())
            .filter(|node| !node.is_satisfied())
            .map(|node| Checked {
                tag: SUBMISSION_REQUIREMENT_EVALUATION.to_owned(),
                status: Status::Error,
                message: match &node.name {
                    Some(name) => format!("{}: {name}", node.message),
                    None => node.message.clone(),
                },
            }),
    );

    let warnings = log
        .rows()
        .iter()
        .filter(|row| row.status == Status::Warn)
        .map(Checked::from)
        .collect();

    if status == Status::Info {
        errors.clear();
    }

    Aggregate {
        status,
        errors,
        warnings,
    }
}
