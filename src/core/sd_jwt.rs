//! SD-JWT credentials: salted disclosures referenced by digest from the
//! issuer-signed payload.
//!
//! See: <https://datatracker.ietf.org/doc/draft-ietf-oauth-selective-disclosure-jwt/>

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use base64::prelude::*;
use serde_json::{Map, Value as Json};

use super::accessor::{ClaimPath, PathElement};

/// Name of the payload claim listing the digests of disclosable object properties.
pub const SD_DIGESTS_KEY: &str = "_sd";
/// Name of the payload claim carrying the digest algorithm.
pub const SD_ALG_KEY: &str = "_sd_alg";
/// Key of the single-property objects standing in for disclosable array elements.
pub const ARRAY_DIGEST_KEY: &str = "...";
/// Digest algorithm assumed when the payload carries no `_sd_alg`.
pub const SHA_256_ALG_NAME: &str = "sha-256";

const SD_JWT_SEPARATOR: char = '~';

/// One-way hash function used to compute disclosure digests.
///
/// Implementations must be deterministic and free of side effects.
pub trait Hasher: Send + Sync {
    /// IANA "Named Information Hash Algorithm" name, e.g. `sha-256`.
    fn algorithm(&self) -> &str;

    fn digest(&self, input: &[u8]) -> Vec<u8>;
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn algorithm(&self) -> &str {
        (**self).algorithm()
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        (**self).digest(input)
    }
}

impl<H: Hasher + ?Sized> Hasher for Box<H> {
    fn algorithm(&self) -> &str {
        (**self).algorithm()
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        (**self).digest(input)
    }
}

impl<H: Hasher + ?Sized> Hasher for Arc<H> {
    fn algorithm(&self) -> &str {
        (**self).algorithm()
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        (**self).digest(input)
    }
}

/// Base64url (unpadded) digest of a disclosure in its encoded form.
pub fn disclosure_digest(hasher: &dyn Hasher, encoded: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(hasher.digest(encoded.as_bytes()))
}

#[derive(Debug, thiserror::Error)]
pub enum DisclosureError {
    #[error("malformed disclosure `{encoded}`: {reason}")]
    Malformed { encoded: String, reason: String },

    #[error("malformed SD-JWT: {0}")]
    MalformedSdJwt(String),

    #[error("hasher implements `{found}` but the credential digests use `{expected}`")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("disclosure does not hash to its recorded digest `{digest}`")]
    DigestMismatch { digest: String },
}

impl DisclosureError {
    fn malformed(encoded: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            encoded: encoded.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// A single disclosure: a salted claim that can be revealed or withheld.
#[derive(Debug, Clone, PartialEq)]
pub struct Disclosure {
    digest: String,
    salt: String,
    claim_name: Option<String>,
    claim_value: Json,
    raw_encoded: String,
}

impl Disclosure {
    /// Build a disclosure from already decoded parts.
    ///
    /// `claim_name` is `None` for array element disclosures.
    pub fn new(
        digest: String,
        salt: String,
        claim_name: Option<String>,
        claim_value: Json,
        raw_encoded: String,
    ) -> Self {
        Self {
            digest,
            salt,
            claim_name,
            claim_value,
            raw_encoded,
        }
    }

    /// Decode a base64url encoded disclosure and compute its digest.
    pub fn decode(encoded: &str, hasher: &dyn Hasher) -> Result<Self, DisclosureError> {
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| DisclosureError::malformed(encoded, e))?;

        let parts: Vec<Json> =
            serde_json::from_slice(&bytes).map_err(|e| DisclosureError::malformed(encoded, e))?;

        let (salt, claim_name, claim_value) = match <[Json; 3]>::try_from(parts) {
            Ok([salt, Json::String(name), value]) => (salt, Some(name), value),
            Ok(_) => return Err(DisclosureError::malformed(encoded, "claim name is not a string")),
            Err(parts) => match <[Json; 2]>::try_from(parts) {
                Ok([salt, value]) => (salt, None, value),
                Err(parts) => {
                    return Err(DisclosureError::malformed(
                        encoded,
                        format!("expected 2 or 3 elements, found {}", parts.len()),
                    ))
                }
            },
        };

        let Json::String(salt) = salt else {
            return Err(DisclosureError::malformed(encoded, "salt is not a string"));
        };

        Ok(Self {
            digest: disclosure_digest(hasher, encoded),
            salt,
            claim_name,
            claim_value,
            raw_encoded: encoded.to_owned(),
        })
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn claim_name(&self) -> Option<&str> {
        self.claim_name.as_deref()
    }

    pub fn claim_value(&self) -> &Json {
        &self.claim_value
    }

    pub fn raw_encoded(&self) -> &str {
        &self.raw_encoded
    }

    /// Check that re-hashing the encoded disclosure reproduces its digest.
    pub fn verify(&self, hasher: &dyn Hasher) -> Result<(), DisclosureError> {
        if disclosure_digest(hasher, &self.raw_encoded) != self.digest {
            return Err(DisclosureError::DigestMismatch {
                digest: self.digest.clone(),
            });
        }
        Ok(())
    }
}

/// An SD-JWT credential with its disclosures.
///
/// `claims` is the payload as seen by the verifier once every held disclosure
/// is applied; it is what field constraints are evaluated against.
#[derive(Clone)]
pub struct SdJwtCredential {
    issuer_jwt: Option<String>,
    signed_payload: Json,
    claims: Json,
    disclosures: Vec<Disclosure>,
    digest_algorithm: String,
    hasher: Option<Arc<dyn Hasher>>,
}

impl fmt::Debug for SdJwtCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdJwtCredential")
            .field("signed_payload", &self.signed_payload)
            .field("disclosures", &self.disclosures)
            .field("digest_algorithm", &self.digest_algorithm)
            .field(
                "hasher",
                &self.hasher.as_ref().map(|hasher| hasher.algorithm().to_owned()),
            )
            .finish_non_exhaustive()
    }
}

impl SdJwtCredential {
    /// Build a credential from the issuer-signed payload and the disclosures
    /// held for it.
    ///
    /// The hasher may be omitted here, but evaluating the credential then
    /// fails (see [EvaluationError::MissingHasher](crate::EvaluationError::MissingHasher)).
    pub fn new(
        signed_payload: Json,
        disclosures: Vec<Disclosure>,
        hasher: Option<Arc<dyn Hasher>>,
    ) -> Self {
        let digest_algorithm = signed_payload
            .get(SD_ALG_KEY)
            .and_then(Json::as_str)
            .unwrap_or(SHA_256_ALG_NAME)
            .to_owned();

        let claims = apply_disclosures(&signed_payload, &disclosures);

        Self {
            issuer_jwt: None,
            signed_payload,
            claims,
            disclosures,
            digest_algorithm,
            hasher,
        }
    }

    /// Decode a compact SD-JWT, `<issuer-jwt>~<disclosure>~...~[<kb-jwt>]`.
    ///
    /// Signatures are not verified. A trailing key binding JWT is discarded,
    /// since it binds a presentation, not the credential.
    pub fn decode(compact: &str, hasher: Arc<dyn Hasher>) -> Result<Self, DisclosureError> {
        let mut segments = compact.split(SD_JWT_SEPARATOR);

        let issuer_jwt = segments
            .next()
            .filter(|jwt| !jwt.is_empty())
            .ok_or_else(|| DisclosureError::MalformedSdJwt("missing issuer-signed JWT".into()))?;

        let signed_payload = decode_jwt_payload(issuer_jwt)?;

        let mut encoded: Vec<&str> = segments.collect();
        if !compact.ends_with(SD_JWT_SEPARATOR) {
            // The last segment is a key binding JWT.
            encoded.pop();
        }

        let disclosures = encoded
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .map(|segment| Disclosure::decode(segment, &hasher))
            .collect::<Result<Vec<_>, _>>()?;

        let mut credential = Self::new(signed_payload, disclosures, Some(hasher));
        credential.issuer_jwt = Some(issuer_jwt.to_owned());
        Ok(credential)
    }

    pub fn signed_payload(&self) -> &Json {
        &self.signed_payload
    }

    pub fn claims(&self) -> &Json {
        &self.claims
    }

    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    pub fn digest_algorithm(&self) -> &str {
        &self.digest_algorithm
    }

    pub fn hasher(&self) -> Option<&Arc<dyn Hasher>> {
        self.hasher.as_ref()
    }

    /// Serialize as a compact SD-JWT holding the current disclosures.
    ///
    /// Returns `None` when the credential was not decoded from a compact
    /// serialization and the issuer-signed JWT is therefore unknown.
    pub fn to_compact(&self) -> Option<String> {
        let jwt = self.issuer_jwt.as_ref()?;
        let mut compact = format!("{jwt}{SD_JWT_SEPARATOR}");
        for disclosure in &self.disclosures {
            compact.push_str(&disclosure.raw_encoded);
            compact.push(SD_JWT_SEPARATOR);
        }
        Some(compact)
    }

    /// Check every disclosure against `hasher`.
    pub fn verify_disclosures(&self, hasher: &dyn Hasher) -> Result<(), DisclosureError> {
        if hasher.algorithm() != self.digest_algorithm {
            return Err(DisclosureError::AlgorithmMismatch {
                expected: self.digest_algorithm.clone(),
                found: hasher.algorithm().to_owned(),
            });
        }

        self.disclosures
            .iter()
            .try_for_each(|disclosure| disclosure.verify(hasher))
    }

    /// Digests of the disclosures that must be revealed for the claim at
    /// `path` to be visible, including every disclosure nested under it.
    ///
    /// The path is followed through the signed payload; disclosures crossed on
    /// the way are the structural ancestors of the claim.
    pub fn digests_for_path(&self, path: &ClaimPath) -> Vec<&str> {
        let by_digest = self.disclosures_by_digest();
        let mut digests = Vec::new();
        let mut current = &self.signed_payload;

        for element in path.elements() {
            let step = match element {
                PathElement::Key(key) => object_property(current, key, &by_digest),
                PathElement::Index(index) => array_element(current, *index, &by_digest),
            };

            let Some((digest, value)) = step else {
                tracing::debug!("path {path} does not resolve in the signed payload");
                return digests;
            };

            if let Some(digest) = digest {
                digests.push(digest);
            }
            current = value;
        }

        collect_nested_digests(current, &by_digest, &mut digests);
        digests
    }

    /// Return a copy holding only the disclosures whose digest is in `keep`.
    ///
    /// Retained disclosures keep their order and encoding; the signed payload
    /// is untouched.
    pub fn retain_disclosures(&self, keep: &HashSet<&str>) -> Self {
        let disclosures: Vec<Disclosure> = self
            .disclosures
            .iter()
            .filter(|disclosure| keep.contains(disclosure.digest()))
            .cloned()
            .collect();

        Self {
            issuer_jwt: self.issuer_jwt.clone(),
            signed_payload: self.signed_payload.clone(),
            claims: apply_disclosures(&self.signed_payload, &disclosures),
            disclosures,
            digest_algorithm: self.digest_algorithm.clone(),
            hasher: self.hasher.clone(),
        }
    }

    fn disclosures_by_digest(&self) -> HashMap<&str, &Disclosure> {
        self.disclosures
            .iter()
            .map(|disclosure| (disclosure.digest(), disclosure))
            .collect()
    }
}

fn decode_jwt_payload(jwt: &str) -> Result<Json, DisclosureError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| DisclosureError::MalformedSdJwt("issuer JWT has no payload".into()))?;

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DisclosureError::MalformedSdJwt(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| DisclosureError::MalformedSdJwt(format!("payload is not JSON: {e}")))
}

fn array_digest(element: &Json) -> Option<&str> {
    let object = element.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(ARRAY_DIGEST_KEY)?.as_str()
}

fn sd_digests(object: &Map<String, Json>) -> impl Iterator<Item = &str> {
    object
        .get(SD_DIGESTS_KEY)
        .and_then(Json::as_array)
        .into_iter()
        .flatten()
        .filter_map(Json::as_str)
}

/// Step into property `key` of `value`, either plainly or through a disclosure.
fn object_property<'a>(
    value: &'a Json,
    key: &str,
    by_digest: &HashMap<&'a str, &'a Disclosure>,
) -> Option<(Option<&'a str>, &'a Json)> {
    let object = value.as_object()?;

    if key != SD_DIGESTS_KEY {
        if let Some(plain) = object.get(key) {
            return Some((None, plain));
        }
    }

    sd_digests(object).find_map(|digest| {
        let disclosure = by_digest.get(digest)?;
        (disclosure.claim_name() == Some(key)).then_some((Some(disclosure.digest()), &disclosure.claim_value))
    })
}

/// Step into the `index`-th visible element of the array `value`.
///
/// Undisclosed elements (digests with no known disclosure) are not visible and
/// do not count towards the index.
fn array_element<'a>(
    value: &'a Json,
    index: usize,
    by_digest: &HashMap<&'a str, &'a Disclosure>,
) -> Option<(Option<&'a str>, &'a Json)> {
    value
        .as_array()?
        .iter()
        .filter_map(|element| match array_digest(element) {
            Some(digest) => by_digest
                .get(digest)
                .map(|disclosure| (Some(disclosure.digest()), &disclosure.claim_value)),
            None => Some((None, element)),
        })
        .nth(index)
}

fn collect_nested_digests<'a>(
    value: &'a Json,
    by_digest: &HashMap<&'a str, &'a Disclosure>,
    digests: &mut Vec<&'a str>,
) {
    match value {
        Json::Object(object) => {
            for digest in sd_digests(object) {
                if let Some(disclosure) = by_digest.get(digest) {
                    if !digests.contains(&disclosure.digest()) {
                        digests.push(disclosure.digest());
                        collect_nested_digests(&disclosure.claim_value, by_digest, digests);
                    }
                }
            }
            for (key, nested) in object {
                if key != SD_DIGESTS_KEY {
                    collect_nested_digests(nested, by_digest, digests);
                }
            }
        }
        Json::Array(elements) => {
            for element in elements {
                match array_digest(element).and_then(|digest| by_digest.get(digest)) {
                    Some(disclosure) => {
                        if !digests.contains(&disclosure.digest()) {
                            digests.push(disclosure.digest());
                            collect_nested_digests(&disclosure.claim_value, by_digest, digests);
                        }
                    }
                    None => collect_nested_digests(element, by_digest, digests),
                }
            }
        }
        _ => (),
    }
}

/// Rebuild the claims of an SD-JWT from the signed payload and a set of
/// disclosures.
///
/// Digests without a matching disclosure (withheld claims and decoys) are
/// dropped, as are the `_sd` and `_sd_alg` bookkeeping claims.
pub fn apply_disclosures(signed_payload: &Json, disclosures: &[Disclosure]) -> Json {
    let by_digest: HashMap<&str, &Disclosure> = disclosures
        .iter()
        .map(|disclosure| (disclosure.digest(), disclosure))
        .collect();
    let mut used = HashSet::new();

    let mut claims = expand(signed_payload, &by_digest, &mut used);
    if let Some(object) = claims.as_object_mut() {
        object.remove(SD_ALG_KEY);
    }
    claims
}

fn expand<'a>(
    value: &Json,
    by_digest: &HashMap<&'a str, &'a Disclosure>,
    used: &mut HashSet<&'a str>,
) -> Json {
    match value {
        Json::Object(object) => {
            let mut expanded = Map::new();

            for (key, nested) in object {
                if key != SD_DIGESTS_KEY {
                    expanded.insert(key.clone(), expand(nested, by_digest, used));
                }
            }

            for digest in sd_digests(object) {
                let Some(disclosure) = by_digest.get(digest) else {
                    continue;
                };
                let Some(name) = disclosure.claim_name() else {
                    tracing::warn!("array element disclosure referenced from `_sd`, ignoring");
                    continue;
                };
                if !used.insert(disclosure.digest()) {
                    tracing::warn!("digest {digest} is referenced more than once, ignoring");
                    continue;
                }
                expanded.insert(
                    name.to_owned(),
                    expand(&disclosure.claim_value, by_digest, used),
                );
            }

            Json::Object(expanded)
        }
        Json::Array(elements) => Json::Array(
            elements
                .iter()
                .filter_map(|element| match array_digest(element) {
                    Some(digest) => {
                        let disclosure = by_digest.get(digest)?;
                        if !used.insert(disclosure.digest()) {
                            tracing::warn!("digest {digest} is referenced more than once, ignoring");
                            return None;
                        }
                        Some(expand(&disclosure.claim_value, by_digest, used))
                    }
                    None => Some(expand(element, by_digest, used)),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
