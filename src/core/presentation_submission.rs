use std::collections::HashMap;

use super::credential_format::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use serde_json_path::JsonPath;

/// A DescriptorMapId is a unique identifier for a DescriptorMap.
pub type DescriptorMapId = String;

/// Presentation Submissions are objects embedded within target
/// [Claim](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:claim) negotiation
/// formats that express how the inputs presented as proofs to a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) are
/// provided in accordance with the requirements specified in a
/// [PresentationDefinition](super::presentation_definition::PresentationDefinition).
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    id: uuid::Uuid,
    definition_id: DescriptorMapId,
    descriptor_map: Vec<DescriptorMap>,
}

impl PresentationSubmission {
    /// The presentation submission MUST contain an id property. The value of this property MUST be a unique identifier, i.e. a UUID.
    ///
    /// The presentation submission object MUST contain a `definition_id` property.
    /// The value of this property MUST be the id value of a valid presentation definition.
    ///
    /// The object MUST include a `descriptor_map` property. The value of this property MUST be an array of
    /// Input [DescriptorMap] Objects.
    pub fn new(
        id: uuid::Uuid,
        definition_id: DescriptorMapId,
        descriptor_map: Vec<DescriptorMap>,
    ) -> Self {
        Self {
            id,
            definition_id,
            descriptor_map,
        }
    }

    /// Return the id of the presentation submission.
    pub fn id(&self) -> &uuid::Uuid {
        &self.id
    }

    /// Return the definition id of the presentation submission.
    pub fn definition_id(&self) -> &String {
        &self.definition_id
    }

    /// Return the descriptor map of the presentation submission.
    pub fn descriptor_map(&self) -> &Vec<DescriptorMap> {
        &self.descriptor_map
    }

    /// Returns the descriptor map entries grouped by input descriptor id.
    pub fn descriptor_map_by_id(&self) -> HashMap<&str, Vec<&DescriptorMap>> {
        let mut by_id: HashMap<&str, Vec<&DescriptorMap>> = HashMap::new();
        for entry in &self.descriptor_map {
            by_id.entry(entry.id.as_str()).or_default().push(entry);
        }
        by_id
    }
}

impl TryFrom<Json> for PresentationSubmission {
    type Error = anyhow::Error;

    fn try_from(raw: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(raw).map_err(Into::into)
    }
}

/// Descriptor Maps are objects used to describe the information a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder) provides to a [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier).
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    pub id: DescriptorMapId,
    pub format: ClaimFormatDesignation,
    pub path: JsonPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_nested: Option<Box<DescriptorMap>>,
}

impl DescriptorMap {
    /// The descriptor map MUST include an `id` property matching the id of the input descriptor it answers.
    ///
    /// The `format` property denotes the data format of the submitted [Claim](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:claim).
    ///
    /// The `path` property indicates the claim submitted in relation to the identified input descriptor,
    /// when executed against the top-level of the object the [PresentationSubmission] is embedded within.
    pub fn new(
        id: impl Into<DescriptorMapId>,
        format: impl Into<ClaimFormatDesignation>,
        path: JsonPath,
    ) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path,
            path_nested: None,
        }
    }

    /// Set the nested path of the descriptor map.
    ///
    /// The `id` property MUST be the same for each level of nesting.
    ///
    /// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#processing-of-submission-entries](https://identity.foundation/presentation-exchange/spec/v2.0.0/#processing-of-submission-entries)
    pub fn set_path_nested(mut self, mut path_nested: DescriptorMap) -> Self {
        // Ensure the nested path has the same id as the parent.
        path_nested.id.clone_from(&self.id);

        self.path_nested = Some(Box::new(path_nested));

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn submission_serialization() {
        let submission = PresentationSubmission::new(
            uuid::Uuid::nil(),
            "32f54163-7166-48f1-93d8-ff217bdb0653".into(),
            vec![
                DescriptorMap::new(
                    "banking_input",
                    ClaimFormatDesignation::LdpVc,
                    JsonPath::parse("$.verifiableCredential[0]").unwrap(),
                ),
                DescriptorMap::new(
                    "license",
                    "vc+sd-jwt",
                    JsonPath::parse("$").unwrap(),
                ),
            ],
        );

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["id"], json!("00000000-0000-0000-0000-000000000000"));
        assert_eq!(value["descriptor_map"][0]["format"], json!("ldp_vc"));
        assert_eq!(
            value["descriptor_map"][1],
            json!({ "id": "license", "format": "vc+sd-jwt", "path": "$" })
        );

        let parsed = PresentationSubmission::try_from(value).unwrap();
        assert_eq!(parsed, submission);
        assert_eq!(parsed.descriptor_map_by_id()["license"].len(), 1);
    }

    #[test]
    fn nested_paths_share_the_descriptor_id() {
        let entry = DescriptorMap::new(
            "banking_input",
            ClaimFormatDesignation::LdpVp,
            JsonPath::parse("$").unwrap(),
        )
        .set_path_nested(DescriptorMap::new(
            "other",
            ClaimFormatDesignation::LdpVc,
            JsonPath::parse("$.verifiableCredential[0]").unwrap(),
        ));

        let nested = entry.path_nested.as_deref().unwrap();
        assert_eq!(nested.id, "banking_input");
        assert_eq!(
            serde_json::to_value(&entry).unwrap()["path_nested"]["format"],
            json!("ldp_vc")
        );
    }
}
