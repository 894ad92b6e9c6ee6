//! Resolution of submission requirements against the eligible pairs.
//!
//! See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#submission-requirement-rules>

use serde::Serialize;

use crate::{
    core::{
        input_descriptor::GroupId,
        presentation_definition::{
            PresentationDefinition, RequirementSource, Rule, SubmissionRequirement,
        },
    },
    error::EvaluationError,
    utils::extend_unique,
};

use super::{
    handlers::MarkForSubmissionEvaluation,
    result::{CheckPayload, EvaluationLog, Status},
};

/// What a [SubmissionRequirementMatch] was resolved from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// The implicit requirement of a definition without submission
    /// requirements: the input descriptor must be satisfied.
    InputDescriptor { id: String },
    /// A `from` requirement. `unmet` lists the descriptors of the group with
    /// no eligible credential.
    Group {
        from: GroupId,
        input_descriptors: Vec<String>,
        unmet: Vec<String>,
    },
    /// A `from_nested` requirement and the matches of its children.
    Nested(Vec<SubmissionRequirementMatch>),
}

/// The resolution of one submission requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequirementMatch {
    pub name: Option<String>,
    pub rule: Rule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    pub source: MatchSource,
    pub status: Status,
    /// `original_index` of the selected credentials, in selection order.
    pub credentials: Vec<usize>,
    pub message: String,
}

impl SubmissionRequirementMatch {
    pub fn is_satisfied(&self) -> bool {
        !self.status.is_error()
    }

    /// This match and every nested match, depth first.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &SubmissionRequirementMatch> + '_> {
        match &self.source {
            MatchSource::Nested(children) => Box::new(
                std::iter::once(self).chain(children.iter().flat_map(|child| child.iter())),
            ),
            _ => Box::new(std::iter::once(self)),
        }
    }
}

/// Outcome of resolving every root requirement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Resolution {
    pub matches: Vec<SubmissionRequirementMatch>,
    pub status: Status,
    /// Selected (input descriptor index, credential `original_index`) pairs.
    pub selected: Vec<(usize, usize)>,
}

impl Resolution {
    /// `original_index` of every selected credential, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.selected.iter().map(|(_, index)| *index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Eligible credentials of each input descriptor, as marked in the log.
fn eligibility(definition: &PresentationDefinition, log: &EvaluationLog) -> Vec<Vec<usize>> {
    let mut eligible = vec![Vec::new(); definition.input_descriptors().len()];
    for row in log.by_evaluator(MarkForSubmissionEvaluation::NAME) {
        if let CheckPayload::Eligible { .. } = row.payload {
            if let Some(credentials) = eligible.get_mut(row.input_descriptor_index) {
                credentials.push(row.credential_index);
            }
        }
    }
    for credentials in &mut eligible {
        credentials.sort_unstable();
        credentials.dedup();
    }
    eligible
}

/// Resolve the submission requirements of `definition` against the eligible
/// pairs recorded in `log`.
pub(crate) fn resolve(
    definition: &PresentationDefinition,
    log: &EvaluationLog,
) -> Result<Resolution, EvaluationError> {
    let resolver = Resolver {
        definition,
        eligible: eligibility(definition, log),
    };

    let resolved = match definition.submission_requirements() {
        Some(requirements) if !requirements.is_empty() => requirements
            .iter()
            .map(|requirement| resolver.resolve(requirement))
            .collect::<Result<Vec<_>, _>>()?,
        _ => resolver.implicit(),
    };

    let status = resolved
        .iter()
        .map(|resolved| resolved.node.status)
        .max()
        .unwrap_or_default();

    let mut selected = Vec::new();
    let mut matches = Vec::with_capacity(resolved.len());
    for resolved in resolved {
        extend_unique(&mut selected, &resolved.pairs);
        matches.push(resolved.node);
    }

    tracing::debug!(
        "resolved {} requirements: {status}, {} pairs selected",
        matches.len(),
        selected.len()
    );

    Ok(Resolution {
        matches,
        status,
        selected,
    })
}

struct Resolved {
    node: SubmissionRequirementMatch,
    pairs: Vec<(usize, usize)>,
}

struct Resolver<'a> {
    definition: &'a PresentationDefinition,
    eligible: Vec<Vec<usize>>,
}

impl Resolver<'_> {
    /// One `all` requirement per input descriptor.
    fn implicit(&self) -> Vec<Resolved> {
        self.definition
            .input_descriptors()
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let credentials = self.eligible[index].clone();
                let (status, message) = if credentials.is_empty() {
                    (
                        Status::Error,
                        format!(
                            "no eligible credential for input descriptor `{}`",
                            descriptor.id()
                        ),
                    )
                } else {
                    (Status::Info, format!("input descriptor `{}` is satisfied", descriptor.id()))
                };

                Resolved {
                    pairs: credentials.iter().map(|credential| (index, *credential)).collect(),
                    node: SubmissionRequirementMatch {
                        name: descriptor.name().cloned(),
                        rule: Rule::All,
                        count: None,
                        min: None,
                        max: None,
                        source: MatchSource::InputDescriptor {
                            id: descriptor.id().to_owned(),
                        },
                        status,
                        credentials,
                        message,
                    },
                }
            })
            .collect()
    }

    fn resolve(&self, requirement: &SubmissionRequirement) -> Result<Resolved, EvaluationError> {
        requirement.validate()?;

        let resolved = match requirement.source()? {
            RequirementSource::Group(group) => self.resolve_group(requirement, group),
            RequirementSource::Nested(nested) => self.resolve_nested(requirement, nested)?,
        };

        tracing::debug!(
            "submission requirement {:?} ({:?}): {}",
            requirement.name(),
            requirement.rule(),
            resolved.node.status
        );

        Ok(resolved)
    }

    fn resolve_group(&self, requirement: &SubmissionRequirement, group: &GroupId) -> Resolved {
        let members: Vec<(usize, &str)> = self
            .definition
            .input_descriptors()
            .iter()
            .enumerate()
            .filter(|(_, descriptor)| descriptor.is_in_group(group))
            .map(|(index, descriptor)| (index, descriptor.id()))
            .collect();

        let (available, unmet): (Vec<_>, Vec<_>) = members
            .iter()
            .partition(|(index, _)| !self.eligible[*index].is_empty());

        let unmet_ids: Vec<String> = unmet.iter().map(|(_, id)| (*id).to_owned()).collect();

        let (status, take, mut message) = match requirement.rule() {
            Rule::All if members.is_empty() => (
                Status::Error,
                0,
                format!("group `{group}` has no input descriptors"),
            ),
            Rule::All if !unmet.is_empty() => (
                Status::Error,
                available.len(),
                String::new(),
            ),
            Rule::All => (
                Status::Info,
                available.len(),
                format!("all {} input descriptors of group `{group}` are satisfied", members.len()),
            ),
            Rule::Pick => pick(requirement, available.len(), "input descriptors"),
        };

        if status.is_error() && !unmet_ids.is_empty() {
            message = format!(
                "no eligible credential for input descriptors of group `{group}`: {}",
                unmet_ids.join(", ")
            );
        }

        let mut pairs = Vec::new();
        let mut credentials = Vec::new();
        for (index, _) in available.iter().take(take) {
            let eligible = &self.eligible[*index];
            extend_unique(&mut credentials, eligible);
            pairs.extend(eligible.iter().map(|credential| (*index, *credential)));
        }

        Resolved {
            node: self.node(
                requirement,
                MatchSource::Group {
                    from: group.clone(),
                    input_descriptors: members.iter().map(|(_, id)| (*id).to_owned()).collect(),
                    unmet: unmet_ids,
                },
                status,
                credentials,
                message,
            ),
            pairs,
        }
    }

    fn resolve_nested(
        &self,
        requirement: &SubmissionRequirement,
        nested: &[SubmissionRequirement],
    ) -> Result<Resolved, EvaluationError> {
        let children = nested
            .iter()
            .map(|child| self.resolve(child))
            .collect::<Result<Vec<_>, _>>()?;

        let satisfied: Vec<&Resolved> = children
            .iter()
            .filter(|child| child.node.is_satisfied())
            .collect();

        let (status, take, message) = match requirement.rule() {
            Rule::All if children.is_empty() => {
                (Status::Error, 0, "no nested requirements".to_owned())
            }
            Rule::All if satisfied.len() < children.len() => (
                Status::Error,
                satisfied.len(),
                format!(
                    "{} of {} nested requirements are not satisfied",
                    children.len() - satisfied.len(),
                    children.len()
                ),
            ),
            Rule::All => (
                Status::Info,
                satisfied.len(),
                format!("all {} nested requirements are satisfied", children.len()),
            ),
            Rule::Pick => pick(requirement, satisfied.len(), "nested requirements"),
        };

        let selected = &satisfied[..take];

        // A satisfied node is only as good as the children it selected.
        let status = if status.is_error() {
            status
        } else {
            selected
                .iter()
                .map(|child| child.node.status)
                .fold(status, Status::worst)
        };

        let mut pairs = Vec::new();
        let mut credentials = Vec::new();
        for child in selected {
            extend_unique(&mut pairs, &child.pairs);
            extend_unique(&mut credentials, &child.node.credentials);
        }

        Ok(Resolved {
            node: self.node(
                requirement,
                MatchSource::Nested(children.into_iter().map(|child| child.node).collect()),
                status,
                credentials,
                message,
            ),
            pairs,
        })
    }

    fn node(
        &self,
        requirement: &SubmissionRequirement,
        source: MatchSource,
        status: Status,
        credentials: Vec<usize>,
        message: String,
    ) -> SubmissionRequirementMatch {
        SubmissionRequirementMatch {
            name: requirement.name().cloned(),
            rule: requirement.rule(),
            count: requirement.count(),
            min: requirement.min(),
            max: requirement.max(),
            source,
            status,
            credentials,
            message,
        }
    }
}

/// Apply the bounds of a `pick` requirement to `available` satisfied
/// candidates. Returns the status, how many candidates to select (in
/// declaration order) and a message.
fn pick(requirement: &SubmissionRequirement, available: usize, what: &str) -> (Status, usize, String) {
    let as_usize = |bound: u64| usize::try_from(bound).unwrap_or(usize::MAX);

    if let Some(count) = requirement.count().map(as_usize) {
        return match available.cmp(&count) {
            std::cmp::Ordering::Less => (
                Status::Error,
                available,
                format!("expected {count} {what}, found {available}"),
            ),
            std::cmp::Ordering::Equal => (Status::Info, count, format!("picked {count} {what}")),
            std::cmp::Ordering::Greater => (
                Status::Warn,
                count,
                format!("{available} {what} available, picked the first {count}"),
            ),
        };
    }

    let min = requirement.min().map(as_usize);
    let max = requirement.max().map(as_usize);

    if let Some(min) = min.filter(|min| available < *min) {
        return (
            Status::Error,
            available,
            format!("expected at least {min} {what}, found {available}"),
        );
    }

    if let Some(max) = max.filter(|max| available > *max) {
        return (
            Status::Warn,
            max,
            format!("{available} {what} available, picked the first {max}"),
        );
    }

    let take = min.unwrap_or(available);
    (Status::Info, take, format!("picked {take} {what}"))
}
