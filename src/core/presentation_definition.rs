use super::credential_format::*;
use super::input_descriptor::*;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::EvaluationError;

/// A presentation definition is a JSON object that describes the information a [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) requires of a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// > Presentation Definitions are objects that articulate what proofs a [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) requires.
/// > These help the [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) to decide how or whether to interact with a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// Presentation Definitions are composed of inputs, which describe the forms and details of the
/// proofs they require, and optional sets of selection rules, to allow [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder)s flexibility
/// in cases where different types of proofs may satisfy an input requirement.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition)
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
pub struct PresentationDefinition {
    id: String,
    input_descriptors: Vec<InputDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission_requirements: Option<Vec<SubmissionRequirement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<ClaimFormatMap>,
}

impl PresentationDefinition {
    /// The Presentation Definition MUST contain an id property. The value of this property MUST be a string.
    /// The string SHOULD provide a unique ID for the desired context.
    ///
    /// The Presentation Definition MUST contain an input_descriptors property. Its value MUST be an array of Input Descriptor Objects,
    /// the composition of which are found [InputDescriptor] type.
    pub fn new(id: String, input_descriptor: InputDescriptor) -> Self {
        Self {
            id,
            input_descriptors: vec![input_descriptor],
            ..Default::default()
        }
    }

    /// Return the id of the presentation definition.
    pub fn id(&self) -> &String {
        &self.id
    }

    /// Add a new input descriptor to the presentation definition.
    pub fn add_input_descriptors(mut self, input_descriptor: InputDescriptor) -> Self {
        self.input_descriptors.push(input_descriptor);
        self
    }

    /// Return the input descriptors of the presentation definition.
    pub fn input_descriptors(&self) -> &Vec<InputDescriptor> {
        &self.input_descriptors
    }

    /// Return the input descriptor with the given id, with its declaration index.
    pub fn input_descriptor_by_id(&self, id: &str) -> Option<(usize, &InputDescriptor)> {
        self.input_descriptors
            .iter()
            .enumerate()
            .find(|(_, descriptor)| descriptor.id() == id)
    }

    /// Set the name of the presentation definition.
    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Return the name of the presentation definition.
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Set the purpose of the presentation definition.
    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    /// Return the purpose of the presentation definition.
    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// Attach a format to the presentation definition.
    ///
    /// The properties inform the [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder) of the Claim format configurations the [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) can process.
    /// Input descriptors declaring their own format override it.
    pub fn set_format(mut self, format: ClaimFormatMap) -> Self {
        self.format = Some(format);
        self
    }

    /// Add a new format to the presentation definition.
    pub fn add_format(mut self, format: ClaimFormatDesignation, value: ClaimFormatPayload) -> Self {
        self.format
            .get_or_insert_with(HashMap::new)
            .insert(format, value);
        self
    }

    /// Return the format of the presentation definition.
    pub fn format(&self) -> Option<&ClaimFormatMap> {
        self.format.as_ref()
    }

    /// Add a root submission requirement.
    pub fn add_submission_requirement(mut self, requirement: SubmissionRequirement) -> Self {
        self.submission_requirements
            .get_or_insert_with(Vec::new)
            .push(requirement);
        self
    }

    /// Return the root submission requirements, if any.
    pub fn submission_requirements(&self) -> Option<&[SubmissionRequirement]> {
        self.submission_requirements.as_deref()
    }

    /// Check the presentation definition is usable for evaluation.
    ///
    /// Descriptor ids must be present and unique, every descriptor must be valid
    /// (see [InputDescriptor::validate]) and every submission requirement well formed.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.input_descriptors.is_empty() {
            return Err(EvaluationError::InvalidDefinition(format!(
                "presentation definition `{}` has no input descriptors",
                self.id
            )));
        }

        let mut ids = HashSet::new();
        for descriptor in &self.input_descriptors {
            if !ids.insert(descriptor.id()) {
                return Err(EvaluationError::InvalidDefinition(format!(
                    "duplicate input descriptor id `{}`",
                    descriptor.id()
                )));
            }
            descriptor.validate()?;
        }

        for requirement in self.submission_requirements().unwrap_or_default() {
            requirement.validate()?;
        }

        Ok(())
    }
}

impl TryFrom<Json> for PresentationDefinition {
    type Error = anyhow::Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Properties shared by both submission requirement rules.
///
/// Exactly one of `from` and `from_nested` must be present, see
/// [SubmissionRequirement::source].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SubmissionRequirementBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_nested: Option<Vec<SubmissionRequirement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl SubmissionRequirementBase {
    /// A requirement drawing from the input descriptors of `group`.
    pub fn from_group(group: impl Into<GroupId>) -> Self {
        Self {
            from: Some(group.into()),
            ..Default::default()
        }
    }

    /// A requirement drawing from nested requirements.
    pub fn from_nested(nested: Vec<SubmissionRequirement>) -> Self {
        Self {
            from_nested: Some(nested),
            ..Default::default()
        }
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
}

/// Submission Requirements specify which combinations of input descriptors
/// must be satisfied.
///
/// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#submission-requirements](https://identity.foundation/presentation-exchange/spec/v2.0.0/#submission-requirements)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SubmissionRequirement {
    All(SubmissionRequirementBase),
    Pick(SubmissionRequirementPick),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SubmissionRequirementPick {
    #[serde(flatten)]
    pub submission_requirement: SubmissionRequirementBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// The rule of a submission requirement.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    All,
    Pick,
}

/// What a submission requirement draws from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RequirementSource<'a> {
    /// Every input descriptor tagged with the group.
    Group(&'a GroupId),
    /// Nested requirements.
    Nested(&'a [SubmissionRequirement]),
}

impl SubmissionRequirement {
    pub fn base(&self) -> &SubmissionRequirementBase {
        match self {
            Self::All(base) => base,
            Self::Pick(pick) => &pick.submission_requirement,
        }
    }

    pub fn rule(&self) -> Rule {
        match self {
            Self::All(_) => Rule::All,
            Self::Pick(_) => Rule::Pick,
        }
    }

    pub fn name(&self) -> Option<&String> {
        self.base().name.as_ref()
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Self::All(_) => None,
            Self::Pick(pick) => pick.count,
        }
    }

    pub fn min(&self) -> Option<u64> {
        match self {
            Self::All(_) => None,
            Self::Pick(pick) => pick.min,
        }
    }

    pub fn max(&self) -> Option<u64> {
        match self {
            Self::All(_) => None,
            Self::Pick(pick) => pick.max,
        }
    }

    /// Return what the requirement draws from.
    ///
    /// # Errors
    ///
    /// Fails if both or neither of `from` and `from_nested` are present.
    pub fn source(&self) -> Result<RequirementSource<'_>, EvaluationError> {
        let base = self.base();
        match (&base.from, &base.from_nested) {
            (Some(group), None) => Ok(RequirementSource::Group(group)),
            (None, Some(nested)) => Ok(RequirementSource::Nested(nested)),
            (Some(_), Some(_)) => Err(EvaluationError::MalformedRequirement(format!(
                "{} declares both `from` and `from_nested`",
                self.display_name()
            ))),
            (None, None) => Err(EvaluationError::MalformedRequirement(format!(
                "{} declares neither `from` nor `from_nested`",
                self.display_name()
            ))),
        }
    }

    /// Check the requirement and its nested requirements are well formed.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if let Self::Pick(pick) = self {
            if pick.count.is_some() && (pick.min.is_some() || pick.max.is_some()) {
                return Err(EvaluationError::MalformedRequirement(format!(
                    "{} combines `count` with `min`/`max`",
                    self.display_name()
                )));
            }

            if let (Some(min), Some(max)) = (pick.min, pick.max) {
                if min > max {
                    return Err(EvaluationError::MalformedRequirement(format!(
                        "{} has `min` ({min}) greater than `max` ({max})",
                        self.display_name()
                    )));
                }
            }
        }

        if let RequirementSource::Nested(nested) = self.source()? {
            for requirement in nested {
                requirement.validate()?;
            }
        }

        Ok(())
    }

    fn display_name(&self) -> String {
        match self.name() {
            Some(name) => format!("submission requirement `{name}`"),
            None => "submission requirement".to_string(),
        }
    }
}
