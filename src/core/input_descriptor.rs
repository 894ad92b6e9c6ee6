use std::collections::HashSet;

use super::credential_format::*;
use crate::{error::EvaluationError, utils::NonEmptyVec};

use serde::{Deserialize, Serialize};

/// A GroupId represents a unique identifier for a group of Input Descriptors.
///
/// This type is also used by the submission requirements to group input descriptors.
pub type GroupId = String;

/// A JSONPath is a string that represents a path to a specific value within a JSON object.
///
/// For syntax details, see [https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition)
pub type JsonPath = String;

/// The predicate Feature introduces properties enabling Verifier to request that Holder apply a predicate and return the result.
///
/// The value of predicate **MUST** be one of the following strings: `required` or `preferred`.
///
/// If the predicate property is not present, a Conformant Consumer **MUST NOT** return derived predicate values.
///
/// See: [https://identity.foundation/presentation-exchange/#predicate-feature](https://identity.foundation/presentation-exchange/#predicate-feature)
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Predicate {
    /// required - This indicates that the returned value **MUST** be the boolean result of
    /// applying the value of the filter property to the result of evaluating the path property.
    #[serde(rename = "required")]
    Required,
    /// preferred - This indicates that the returned value **SHOULD** be the boolean result of
    /// applying the value of the filter property to the result of evaluating the path property.
    #[serde(rename = "preferred")]
    Preferred,
}

/// Strength of a relational constraint such as `subject_is_issuer` or an
/// `is_holder` directive.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Optionality {
    Required,
    Preferred,
}

/// Input Descriptors are objects used to describe the information a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) requires of a
/// [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// All Input Descriptors MUST be satisfied, unless otherwise specified by a
/// [Feature](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:feature).
///
/// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputDescriptor {
    id: String,
    #[serde(default)]
    constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(default, skip_serializing_if = "ClaimFormatMap::is_empty")]
    format: ClaimFormatMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    group: Vec<GroupId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    schema: Vec<DescriptorSchema>,
}

impl InputDescriptor {
    /// Create a new instance of the input descriptor with the given id and constraints.
    ///
    /// The Input Descriptor Object MUST contain an id property. The value of the id
    /// property MUST be a string that does not conflict with the id of another
    /// Input Descriptor Object in the same Presentation Definition.
    pub fn new(id: String, constraints: Constraints) -> Self {
        Self {
            id,
            constraints,
            ..Default::default()
        }
    }

    /// Return the id of the input descriptor.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Return the constraints of the input descriptor.
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Set the name of the input descriptor.
    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Return the name of the input descriptor.
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Set the purpose of the input descriptor.
    ///
    /// If present, the purpose MUST be a string that describes the purpose for which the
    /// [Claim](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:claim)'s
    /// data is being requested.
    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    /// Return the purpose of the input descriptor.
    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// Set the format of the input descriptor.
    ///
    /// This format property is identical in value signature to the top-level format object,
    /// but can be used to specifically constrain submission of a single input to a subset of formats or algorithms.
    pub fn set_format(mut self, format: ClaimFormatMap) -> Self {
        self.format = format;
        self
    }

    /// Return the format of the input descriptor.
    pub fn format(&self) -> &ClaimFormatMap {
        &self.format
    }

    /// Return the format designations of the input descriptor as a hash set.
    pub fn format_designations(&self) -> HashSet<&ClaimFormatDesignation> {
        self.format.keys().collect()
    }

    /// Set the groups of the input descriptor.
    pub fn set_group(mut self, group: Vec<GroupId>) -> Self {
        self.group = group;
        self
    }

    /// Return the groups of the input descriptor.
    pub fn groups(&self) -> &Vec<GroupId> {
        self.group.as_ref()
    }

    /// Add the input descriptor to a group.
    pub fn add_to_group(mut self, member: GroupId) -> Self {
        self.group.push(member);
        self
    }

    /// Return whether the input descriptor is tagged with `group`.
    pub fn is_in_group(&self, group: &str) -> bool {
        self.group.iter().any(|g| g == group)
    }

    /// Set the schema restriction of the input descriptor.
    ///
    /// Schemas come from Presentation Exchange v1 definitions. A credential
    /// satisfies them if it exposes one of the listed URIs, and every URI
    /// marked `required`.
    pub fn set_schema(mut self, schema: Vec<DescriptorSchema>) -> Self {
        self.schema = schema;
        self
    }

    /// Return the schema restriction of the input descriptor.
    pub fn schema(&self) -> &[DescriptorSchema] {
        &self.schema
    }

    /// Check the input descriptor is usable for evaluation.
    ///
    /// Every JSONPath must parse, every predicate needs a filter and every
    /// `is_holder` directive must reference fields of this descriptor.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        for field in self.constraints.fields() {
            for path in field.path().iter() {
                serde_json_path::JsonPath::parse(path)
                    .map_err(|e| EvaluationError::invalid_path(path, e))?;
            }

            if field.predicate().is_some() && field.filter().is_none() {
                return Err(EvaluationError::InvalidDefinition(format!(
                    "input descriptor `{}` declares a predicate without a filter",
                    self.id
                )));
            }
        }

        for subject in self.constraints.is_holder() {
            for field_id in subject.field_id().iter() {
                if self.constraints.field_by_id(field_id).is_none() {
                    return Err(EvaluationError::InvalidDefinition(format!(
                        "input descriptor `{}` references unknown field `{field_id}` in is_holder",
                        self.id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A schema URI an input descriptor restricts candidates to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorSchema {
    uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
}

impl DescriptorSchema {
    pub fn new(uri: String) -> Self {
        Self {
            uri,
            required: None,
        }
    }

    pub fn set_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

/// Constraints are objects used to describe the constraints that a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder) must satisfy to fulfill an Input Descriptor.
///
/// A constraint object MAY be empty, or it may include `fields`, `limit_disclosure`
/// and the relational `subject_is_issuer` and `is_holder` properties.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<ConstraintsField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_disclosure: Option<ConstraintsLimitDisclosure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_is_issuer: Option<Optionality>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    is_holder: Vec<HolderSubject>,
}

impl Constraints {
    /// Returns an empty Constraints object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new field constraint to the constraints list.
    pub fn add_constraint(mut self, field: ConstraintsField) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the fields of the constraints object.
    pub fn fields(&self) -> &Vec<ConstraintsField> {
        self.fields.as_ref()
    }

    /// Returns the field with the given `id`, if any.
    pub fn field_by_id(&self, id: &str) -> Option<&ConstraintsField> {
        self.fields
            .iter()
            .find(|field| field.id().is_some_and(|field_id| field_id == id))
    }

    /// Set the limit disclosure value.
    ///
    /// For all [Claims](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:claims) submitted in relation to [InputDescriptor] Objects that include a `constraints`
    /// object with a `limit_disclosure` property set to the string value `required`,
    /// ensure that the data submitted is limited to the entries specified in the `fields` property of the `constraints` object.
    ///
    /// For more information: see [https://identity.foundation/presentation-exchange/spec/v2.0.0/#limited-disclosure-submissions](https://identity.foundation/presentation-exchange/spec/v2.0.0/#limited-disclosure-submissions)
    pub fn set_limit_disclosure(mut self, limit_disclosure: ConstraintsLimitDisclosure) -> Self {
        self.limit_disclosure = Some(limit_disclosure);
        self
    }

    /// Returns the limit disclosure value.
    pub fn limit_disclosure(&self) -> Option<&ConstraintsLimitDisclosure> {
        self.limit_disclosure.as_ref()
    }

    /// Require (or prefer) that the subject of the credential is its issuer.
    pub fn set_subject_is_issuer(mut self, subject_is_issuer: Optionality) -> Self {
        self.subject_is_issuer = Some(subject_is_issuer);
        self
    }

    pub fn subject_is_issuer(&self) -> Option<Optionality> {
        self.subject_is_issuer
    }

    /// Add a holder binding directive.
    pub fn add_holder_subject(mut self, subject: HolderSubject) -> Self {
        self.is_holder.push(subject);
        self
    }

    /// Returns the holder binding directives.
    pub fn is_holder(&self) -> &[HolderSubject] {
        &self.is_holder
    }

    /// Returns if the constraints fields contain non-optional
    /// fields that must be satisfied.
    pub fn is_required(&self) -> bool {
        self.fields.iter().any(|field| field.is_required())
    }
}

/// A holder binding directive: the fields named by `field_id` must be about
/// the holder of the credential.
///
/// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#relational-constraint-feature](https://identity.foundation/presentation-exchange/spec/v2.0.0/#relational-constraint-feature)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolderSubject {
    field_id: NonEmptyVec<String>,
    directive: Optionality,
}

impl HolderSubject {
    pub fn new(field_id: NonEmptyVec<String>, directive: Optionality) -> Self {
        Self {
            field_id,
            directive,
        }
    }

    pub fn field_id(&self) -> &NonEmptyVec<String> {
        &self.field_id
    }

    pub fn directive(&self) -> Optionality {
        self.directive
    }
}

/// ConstraintsField objects are used to describe the constraints that a
/// [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder)
/// must satisfy to fulfill an Input Descriptor.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintsField {
    path: NonEmptyVec<JsonPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<Predicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional: Option<bool>,
    #[serde(default)]
    intent_to_retain: bool,
}

impl From<NonEmptyVec<JsonPath>> for ConstraintsField {
    fn from(path: NonEmptyVec<JsonPath>) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

impl ConstraintsField {
    /// Create a new instance of the constraints field with the given path.
    ///
    /// Constraint fields must have at least one JSONPath to the field for which the constraint is applied.
    pub fn new(path: JsonPath) -> ConstraintsField {
        ConstraintsField {
            path: NonEmptyVec::new(path),
            ..Default::default()
        }
    }

    /// Add a new path alternative to the constraints field.
    pub fn add_path(mut self, path: JsonPath) -> Self {
        self.path.push(path);
        self
    }

    /// Return the path alternatives of the constraints field, in evaluation order.
    ///
    /// For syntax definition, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition)
    pub fn path(&self) -> &NonEmptyVec<JsonPath> {
        &self.path
    }

    /// Set the id of the constraints field.
    pub fn set_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }

    /// Return the id of the constraints field.
    pub fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    /// Set the purpose of the constraints field.
    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    /// Return the purpose of the constraints field.
    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// Set the name of the constraints field.
    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Return the name of the constraints field.
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Set the filter of the constraints field.
    ///
    /// If present its value MUST be a JSON Schema descriptor used to filter against
    /// the values returned from evaluation of the JSONPath string expressions in the path array.
    pub fn set_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Return the raw filter of the constraints field.
    pub fn filter(&self) -> Option<&serde_json::Value> {
        self.filter.as_ref()
    }

    /// Set the predicate of the constraints field.
    ///
    /// If the predicate property is present, the filter property **MUST** also be present.
    pub fn set_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Return the predicate of the constraints field.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Set the optional value of the constraints field.
    ///
    /// Even when the optional property is present, the value located at the
    /// indicated path of the field MUST validate against the JSON Schema filter,
    /// if a filter is present.
    pub fn set_optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    /// Return the optional value of the constraints field.
    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    /// Inverse alias for `!is_optional()`.
    pub fn is_required(&self) -> bool {
        !self.is_optional()
    }

    /// Set the intent to retain the constraints field.
    pub fn set_retained(mut self, intent_to_retain: bool) -> Self {
        self.intent_to_retain = intent_to_retain;
        self
    }

    /// Return the intent to retain the constraints field.
    pub fn intent_to_retain(&self) -> bool {
        self.intent_to_retain
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintsLimitDisclosure {
    Required,
    Preferred,
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn relational_constraints_deserialization() {
        let descriptor: InputDescriptor = serde_json::from_value(json!({
            "id": "banking",
            "group": ["A"],
            "schema": [{ "uri": "https://bank-standards.example.com/customer.json", "required": true }],
            "constraints": {
                "limit_disclosure": "required",
                "subject_is_issuer": "preferred",
                "is_holder": [{ "field_id": ["account"], "directive": "required" }],
                "fields": [{
                    "id": "account",
                    "path": ["$.credentialSubject.account[*].id", "$.vc.credentialSubject.account[*].id"],
                    "filter": { "type": "string", "pattern": "^[0-9]{10,12}" }
                }]
            }
        }))
        .unwrap();

        let constraints = descriptor.constraints();
        assert_eq!(
            constraints.limit_disclosure(),
            Some(&ConstraintsLimitDisclosure::Required)
        );
        assert_eq!(constraints.subject_is_issuer(), Some(Optionality::Preferred));
        assert_eq!(constraints.is_holder()[0].directive(), Optionality::Required);
        assert_eq!(constraints.fields()[0].path().len(), 2);
        assert!(descriptor.schema()[0].is_required());
        assert!(descriptor.is_in_group("A"));
        descriptor.validate().unwrap();
    }

    #[test]
    fn empty_path_is_rejected() {
        let res: Result<ConstraintsField, _> = serde_json::from_value(json!({ "path": [] }));
        assert!(res.is_err());
    }

    #[test]
    fn predicate_without_filter_is_invalid() {
        let descriptor = InputDescriptor::new(
            "age".into(),
            Constraints::new().add_constraint(
                ConstraintsField::new("$.credentialSubject.age".into())
                    .set_predicate(Predicate::Required),
            ),
        );
        assert!(matches!(
            descriptor.validate(),
            Err(EvaluationError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn unparsable_path_is_invalid() {
        let descriptor = InputDescriptor::new(
            "broken".into(),
            Constraints::new().add_constraint(ConstraintsField::new("$.[".into())),
        );
        assert!(matches!(
            descriptor.validate(),
            Err(EvaluationError::InvalidPath { .. })
        ));
    }

    #[test]
    fn unknown_holder_field_is_invalid() {
        let descriptor = InputDescriptor::new(
            "holder".into(),
            Constraints::new()
                .add_constraint(ConstraintsField::new("$.sub".into()).set_id("subject".into()))
                .add_holder_subject(HolderSubject::new(
                    NonEmptyVec::new("nope".into()),
                    Optionality::Preferred,
                )),
        );
        assert!(matches!(
            descriptor.validate(),
            Err(EvaluationError::InvalidDefinition(_))
        ));
    }
}
