//! A uniform view of the credentials held by a wallet.

use std::{collections::BTreeSet, sync::Arc};

use base64::prelude::*;
use serde_json::Value as Json;

use super::{
    credential_format::{ClaimFormatDesignation, FormatFamily},
    sd_jwt::{Hasher, SdJwtCredential},
};
use crate::error::EvaluationError;

/// Format specific content of a [WrappedCredential].
#[derive(Debug, Clone)]
pub enum CredentialKind {
    /// A JSON-LD credential and the types of the proofs securing it.
    LinkedData {
        claims: Json,
        proof_types: Vec<String>,
    },
    /// The payload of a JWT credential, and the `alg` of its header when known.
    Jwt { claims: Json, alg: Option<String> },
    SdJwt(SdJwtCredential),
    /// The issuer-signed namespaces of an mdoc, keyed by namespace.
    Mdoc { doc_type: String, claims: Json },
}

impl CredentialKind {
    pub fn claims(&self) -> &Json {
        match self {
            Self::LinkedData { claims, .. } | Self::Jwt { claims, .. } | Self::Mdoc { claims, .. } => {
                claims
            }
            Self::SdJwt(sd_jwt) => sd_jwt.claims(),
        }
    }

    /// The format family this content belongs to.
    pub fn family(&self) -> FormatFamily {
        match self {
            Self::LinkedData { .. } => FormatFamily::LinkedData,
            Self::Jwt { .. } => FormatFamily::Jwt,
            Self::SdJwt(_) => FormatFamily::SdJwt,
            Self::Mdoc { .. } => FormatFamily::Mdoc,
        }
    }
}

/// One credential offered for evaluation.
///
/// `original_index` is the position of the credential in the caller's list.
/// It is how every result refers back to the credential, and it is never
/// changed once assigned.
#[derive(Debug, Clone)]
pub struct WrappedCredential {
    original_index: usize,
    format: ClaimFormatDesignation,
    issuer_id: Option<String>,
    subject_ids: BTreeSet<String>,
    kind: CredentialKind,
}

impl WrappedCredential {
    /// Wrap a credential, reading its issuer and subjects from its claims.
    pub fn new(original_index: usize, format: ClaimFormatDesignation, kind: CredentialKind) -> Self {
        let claims = kind.claims();
        let issuer_id = issuer_id(claims);
        let subject_ids = subject_ids(claims);

        Self {
            original_index,
            format,
            issuer_id,
            subject_ids,
            kind,
        }
    }

    /// Wrap the JSON representation of a credential in the given format.
    ///
    /// - Linked data credentials are JSON objects.
    /// - JWT credentials are either a compact JWT or its decoded payload.
    /// - SD-JWT credentials are compact SD-JWTs and need `hasher`.
    /// - mdocs are `{ "docType": .., "nameSpaces": { <namespace>: { <element>: .. } } }`,
    ///   optionally with an `issuer`.
    ///
    /// Signatures are not verified.
    pub fn from_json(
        original_index: usize,
        format: ClaimFormatDesignation,
        value: Json,
        hasher: Option<Arc<dyn Hasher>>,
    ) -> Result<Self, EvaluationError> {
        let Some(family) = format.family() else {
            return Err(EvaluationError::UnsupportedFormat(format));
        };

        let kind = match family {
            FormatFamily::LinkedData => {
                if !value.is_object() {
                    return Err(EvaluationError::invalid_credential(
                        original_index,
                        "linked data credential is not a JSON object",
                    ));
                }
                CredentialKind::LinkedData {
                    proof_types: proof_types(&value),
                    claims: value,
                }
            }
            FormatFamily::Jwt => match value {
                Json::String(jwt) => {
                    let header = decode_jwt_segment(&jwt, 0)
                        .map_err(|e| EvaluationError::invalid_credential(original_index, e))?;
                    let claims = decode_jwt_segment(&jwt, 1)
                        .map_err(|e| EvaluationError::invalid_credential(original_index, e))?;
                    CredentialKind::Jwt {
                        claims,
                        alg: header.get("alg").and_then(Json::as_str).map(ToOwned::to_owned),
                    }
                }
                claims @ Json::Object(_) => CredentialKind::Jwt { claims, alg: None },
                _ => {
                    return Err(EvaluationError::invalid_credential(
                        original_index,
                        "JWT credential is neither a compact JWT nor a JSON object",
                    ))
                }
            },
            FormatFamily::SdJwt => {
                let Some(compact) = value.as_str() else {
                    return Err(EvaluationError::invalid_credential(
                        original_index,
                        "SD-JWT credential is not a compact SD-JWT string",
                    ));
                };
                let hasher = hasher.ok_or(EvaluationError::MissingHasher {
                    index: original_index,
                })?;
                CredentialKind::SdJwt(SdJwtCredential::decode(compact, hasher)?)
            }
            FormatFamily::Mdoc => {
                let doc_type = value
                    .get("docType")
                    .or_else(|| value.get("doc_type"))
                    .and_then(Json::as_str)
                    .ok_or_else(|| {
                        EvaluationError::invalid_credential(original_index, "mdoc has no docType")
                    })?
                    .to_owned();
                let claims = value
                    .get("nameSpaces")
                    .or_else(|| value.get("namespaces"))
                    .cloned()
                    .unwrap_or_else(|| Json::Object(Default::default()));
                let issuer = value.get("issuer").and_then(Json::as_str).map(ToOwned::to_owned);

                // Namespaces carry no issuer or subject claims.
                return Ok(Self {
                    original_index,
                    format,
                    issuer_id: issuer,
                    subject_ids: BTreeSet::new(),
                    kind: CredentialKind::Mdoc { doc_type, claims },
                });
            }
        };

        Ok(Self::new(original_index, format, kind))
    }

    /// Override the issuer, e.g. with one established out of band.
    pub fn set_issuer_id(mut self, issuer_id: String) -> Self {
        self.issuer_id = Some(issuer_id);
        self
    }

    pub fn add_subject_id(mut self, subject_id: String) -> Self {
        self.subject_ids.insert(subject_id);
        self
    }

    pub fn original_index(&self) -> usize {
        self.original_index
    }

    pub fn format(&self) -> &ClaimFormatDesignation {
        &self.format
    }

    pub fn issuer_id(&self) -> Option<&str> {
        self.issuer_id.as_deref()
    }

    pub fn subject_ids(&self) -> &BTreeSet<String> {
        &self.subject_ids
    }

    pub fn kind(&self) -> &CredentialKind {
        &self.kind
    }

    /// The claims constraints are evaluated against.
    pub fn claims(&self) -> &Json {
        self.kind.claims()
    }

    pub fn as_sd_jwt(&self) -> Option<&SdJwtCredential> {
        match &self.kind {
            CredentialKind::SdJwt(sd_jwt) => Some(sd_jwt),
            _ => None,
        }
    }

    /// Check the format designation is supported and agrees with the content.
    pub fn ensure_supported(&self) -> Result<(), EvaluationError> {
        match self.format.family() {
            None => Err(EvaluationError::UnsupportedFormat(self.format.clone())),
            Some(family) if family != self.kind.family() => Err(EvaluationError::invalid_credential(
                self.original_index,
                format!(
                    "format `{}` does not match the {:?} content of the credential",
                    self.format,
                    self.kind.family()
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Copy of this credential carrying another SD-JWT body. Identity
    /// (index, format, issuer and subjects) is kept.
    pub(crate) fn with_sd_jwt(&self, sd_jwt: SdJwtCredential) -> Self {
        Self {
            kind: CredentialKind::SdJwt(sd_jwt),
            ..self.clone()
        }
    }
}

fn decode_jwt_segment(jwt: &str, index: usize) -> Result<Json, String> {
    let segment = jwt
        .split('.')
        .nth(index)
        .ok_or_else(|| format!("JWT has no segment {index}"))?;
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| format!("JWT segment {index} is not base64url: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("JWT segment {index} is not JSON: {e}"))
}

fn id_of(value: &Json) -> Option<&str> {
    match value {
        Json::String(id) => Some(id),
        Json::Object(object) => object.get("id").and_then(Json::as_str),
        _ => None,
    }
}

fn issuer_id(claims: &Json) -> Option<String> {
    claims
        .get("iss")
        .and_then(Json::as_str)
        .or_else(|| claims.get("issuer").and_then(id_of))
        .or_else(|| claims.get("vc")?.get("issuer").and_then(id_of))
        .map(ToOwned::to_owned)
}

fn subject_ids(claims: &Json) -> BTreeSet<String> {
    let mut subjects = BTreeSet::new();

    if let Some(sub) = claims.get("sub").and_then(Json::as_str) {
        subjects.insert(sub.to_owned());
    }

    let credential_subjects = [
        claims.get("credentialSubject"),
        claims.get("vc").and_then(|vc| vc.get("credentialSubject")),
    ];

    for subject in credential_subjects.into_iter().flatten() {
        match subject {
            Json::Array(subjects_array) => subjects.extend(
                subjects_array
                    .iter()
                    .filter_map(|subject| subject.get("id")?.as_str())
                    .map(ToOwned::to_owned),
            ),
            subject => {
                if let Some(id) = subject.get("id").and_then(Json::as_str) {
                    subjects.insert(id.to_owned());
                }
            }
        }
    }

    subjects
}

fn proof_types(credential: &Json) -> Vec<String> {
    let proof_type = |proof: &Json| proof.get("type")?.as_str().map(ToOwned::to_owned);

    match credential.get("proof") {
        Some(Json::Array(proofs)) => proofs.iter().filter_map(proof_type).collect(),
        Some(proof) => proof_type(proof).into_iter().collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::core::sd_jwt::{
        disclosure_digest,
        tests::{encode_disclosure, Sha256Hasher},
    };

    #[test]
    fn linked_data_credential() {
        let credential = WrappedCredential::from_json(
            3,
            ClaimFormatDesignation::LdpVc,
            json!({
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential"],
                "issuer": { "id": "did:example:issuer" },
                "credentialSubject": [{ "id": "did:example:alice" }, { "id": "did:example:bob" }],
                "proof": [{ "type": "BbsBlsSignature2020" }, { "type": "Ed25519Signature2018" }]
            }),
            None,
        )
        .unwrap();

        assert_eq!(credential.original_index(), 3);
        assert_eq!(credential.issuer_id(), Some("did:example:issuer"));
        assert_eq!(
            credential.subject_ids(),
            &BTreeSet::from(["did:example:alice".to_owned(), "did:example:bob".to_owned()])
        );
        let CredentialKind::LinkedData { proof_types, .. } = credential.kind() else {
            panic!("expected a linked data credential");
        };
        assert_eq!(proof_types, &["BbsBlsSignature2020", "Ed25519Signature2018"]);
    }

    #[test]
    fn compact_jwt_credential() {
        let header = BASE64_URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256K","typ":"JWT"}"#);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(
            json!({
                "iss": "did:example:issuer",
                "sub": "did:example:holder",
                "vc": { "credentialSubject": { "id": "did:example:holder", "degree": "BSc" } }
            })
            .to_string(),
        );

        let credential = WrappedCredential::from_json(
            0,
            ClaimFormatDesignation::JwtVcJson,
            json!(format!("{header}.{payload}.c2ln")),
            None,
        )
        .unwrap();

        assert_eq!(credential.issuer_id(), Some("did:example:issuer"));
        assert_eq!(credential.subject_ids().len(), 1);
        assert_eq!(credential.claims()["vc"]["credentialSubject"]["degree"], json!("BSc"));
        assert!(matches!(
            credential.kind(),
            CredentialKind::Jwt { alg: Some(alg), .. } if alg == "ES256K"
        ));
    }

    #[test]
    fn sd_jwt_credential_needs_a_hasher() {
        let header = BASE64_URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256"}"#);
        let given_name = encode_disclosure("salt", Some("given_name"), json!("Erika"));
        let payload = BASE64_URL_SAFE_NO_PAD.encode(
            json!({
                "iss": "https://issuer.example",
                "_sd": [disclosure_digest(&Sha256Hasher, &given_name)]
            })
            .to_string(),
        );
        let compact = json!(format!("{header}.{payload}.c2ln~{given_name}~"));

        assert!(matches!(
            WrappedCredential::from_json(1, ClaimFormatDesignation::VcSdJwt, compact.clone(), None),
            Err(EvaluationError::MissingHasher { index: 1 })
        ));

        let credential = WrappedCredential::from_json(
            1,
            ClaimFormatDesignation::VcSdJwt,
            compact,
            Some(Arc::new(Sha256Hasher)),
        )
        .unwrap();
        assert_eq!(credential.claims()["given_name"], json!("Erika"));
        assert_eq!(credential.issuer_id(), Some("https://issuer.example"));
    }

    #[test]
    fn mdoc_credential() {
        let credential = WrappedCredential::from_json(
            0,
            ClaimFormatDesignation::MsoMDoc,
            json!({
                "docType": "org.iso.18013.5.1.mDL",
                "nameSpaces": { "org.iso.18013.5.1": { "family_name": "Doe" } }
            }),
            None,
        )
        .unwrap();

        assert_eq!(credential.issuer_id(), None);
        assert_eq!(credential.claims()["org.iso.18013.5.1"]["family_name"], json!("Doe"));
    }

    #[test]
    fn unsupported_formats() {
        assert!(matches!(
            WrappedCredential::from_json(0, ClaimFormatDesignation::AcVc, json!({}), None),
            Err(EvaluationError::UnsupportedFormat(ClaimFormatDesignation::AcVc))
        ));
        assert!(matches!(
            WrappedCredential::from_json(0, "zkp_vc".into(), json!({}), None),
            Err(EvaluationError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn identity_overrides() {
        let credential = WrappedCredential::new(
            0,
            ClaimFormatDesignation::MsoMDoc,
            CredentialKind::Mdoc {
                doc_type: "org.iso.18013.5.1.mDL".into(),
                claims: json!({}),
            },
        )
        .set_issuer_id("did:example:dmv".into())
        .add_subject_id("did:example:holder".into());

        assert_eq!(credential.issuer_id(), Some("did:example:dmv"));
        assert!(credential.subject_ids().contains("did:example:holder"));
        credential.ensure_supported().unwrap();
    }

    #[test]
    fn format_must_match_the_content() {
        let linked_data = CredentialKind::LinkedData {
            claims: json!({}),
            proof_types: vec![],
        };

        assert!(matches!(
            WrappedCredential::new(2, "ac_vp".into(), linked_data.clone()).ensure_supported(),
            Err(EvaluationError::UnsupportedFormat(ClaimFormatDesignation::AcVp))
        ));
        assert!(matches!(
            WrappedCredential::new(2, ClaimFormatDesignation::JwtVcJson, linked_data.clone())
                .ensure_supported(),
            Err(EvaluationError::InvalidCredential { index: 2, .. })
        ));
        WrappedCredential::new(2, ClaimFormatDesignation::LdpVc, linked_data)
            .ensure_supported()
            .unwrap();
    }
}
