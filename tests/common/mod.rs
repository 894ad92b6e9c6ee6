#![allow(dead_code)]

use std::sync::Arc;

use base64::prelude::*;
use presentation_exchange::core::{
    credential_format::ClaimFormatDesignation,
    presentation_definition::PresentationDefinition,
    sd_jwt::{disclosure_digest, Hasher, SHA_256_ALG_NAME},
    wrapped_credential::WrappedCredential,
};
use serde_json::{json, Value as Json};
use sha2::{Digest, Sha256};

pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn algorithm(&self) -> &str {
        SHA_256_ALG_NAME
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        Sha256::digest(input).to_vec()
    }
}

pub fn hasher() -> Arc<dyn Hasher> {
    Arc::new(Sha256Hasher)
}

pub fn definition(value: Json) -> PresentationDefinition {
    let definition = PresentationDefinition::try_from(value).unwrap();
    definition.validate().unwrap();
    definition
}

/// A linked data credential of the given type, issued to `did:example:holder`.
pub fn typed_credential(index: usize, credential_type: &str) -> WrappedCredential {
    WrappedCredential::from_json(
        index,
        ClaimFormatDesignation::LdpVc,
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", credential_type],
            "issuer": "did:example:issuer",
            "credentialSubject": { "id": "did:example:holder" },
            "proof": { "type": "Ed25519Signature2018" }
        }),
        None,
    )
    .unwrap()
}

/// An input descriptor accepting credentials of the given type.
pub fn typed_descriptor(id: &str, groups: &[&str], credential_type: &str) -> Json {
    json!({
        "id": id,
        "group": groups,
        "constraints": {
            "fields": [{
                "path": ["$.type"],
                "filter": { "type": "array", "contains": { "const": credential_type } }
            }]
        }
    })
}

/// Encode a disclosure, returning it with its digest.
pub fn disclosure(salt: &str, name: Option<&str>, value: Json) -> (String, String) {
    let parts = match name {
        Some(name) => json!([salt, name, value]),
        None => json!([salt, value]),
    };
    let encoded = BASE64_URL_SAFE_NO_PAD.encode(parts.to_string());
    let digest = disclosure_digest(&Sha256Hasher, &encoded);
    (encoded, digest)
}

/// Build a compact SD-JWT from its payload and encoded disclosures. The
/// signature is not meaningful.
pub fn compact_sd_jwt(payload: Json, disclosures: &[String]) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(json!({ "alg": "ES256", "typ": "vc+sd-jwt" }).to_string());
    let payload = BASE64_URL_SAFE_NO_PAD.encode(payload.to_string());
    let mut compact = format!("{header}.{payload}.c2lnbmF0dXJl~");
    for disclosure in disclosures {
        compact.push_str(disclosure);
        compact.push('~');
    }
    compact
}

/// An SD-JWT with six top-level selectively disclosable claims.
pub fn personal_data_sd_jwt() -> String {
    let claims = [
        ("given_name", json!("Erika")),
        ("family_name", json!("Mustermann")),
        ("email", json!("erika@example.com")),
        ("phone_number", json!("+49 123 456")),
        ("birthdate", json!("1963-08-12")),
        ("address", json!({ "locality": "Berlin", "country": "DE" })),
    ];

    let (disclosures, digests): (Vec<String>, Vec<String>) = claims
        .into_iter()
        .enumerate()
        .map(|(i, (name, value))| disclosure(&format!("salt-{i}"), Some(name), value))
        .unzip();

    compact_sd_jwt(
        json!({
            "iss": "did:example:issuer",
            "sub": "did:example:holder",
            "vct": "https://credentials.example.com/identity_credential",
            "_sd_alg": "sha-256",
            "_sd": digests
        }),
        &disclosures,
    )
}
