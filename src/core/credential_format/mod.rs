use core::fmt;
use std::{borrow::Cow, collections::HashMap, str::FromStr};

use serde::{Deserialize, Serialize};

const FORMAT_JWT: &str = "jwt";
const FORMAT_JWT_VC: &str = "jwt_vc";
const FORMAT_JWT_VP: &str = "jwt_vp";
const FORMAT_JWT_VC_JSON: &str = "jwt_vc_json";
const FORMAT_JWT_VP_JSON: &str = "jwt_vp_json";
const FORMAT_LDP: &str = "ldp";
const FORMAT_LDP_VC: &str = "ldp_vc";
const FORMAT_LDP_VP: &str = "ldp_vp";
const FORMAT_AC_VC: &str = "ac_vc";
const FORMAT_AC_VP: &str = "ac_vp";
const FORMAT_MSO_MDOC: &str = "mso_mdoc";
const FORMAT_VC_SD_JWT: &str = "vc+sd-jwt";
const FORMAT_DC_SD_JWT: &str = "dc+sd-jwt";

/// A Json object of claim formats.
pub type ClaimFormatMap = HashMap<ClaimFormatDesignation, ClaimFormatPayload>;

/// Claim format payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimFormatPayload {
    #[serde(rename = "alg")]
    Alg(Vec<String>),
    /// This variant is primarily used for `jwt_vc_json` and `jwt_vp_json`
    /// claim presentation algorithm types supported by a wallet.
    #[serde(rename = "alg_values_supported")]
    AlgValuesSupported(Vec<String>),
    #[serde(rename = "proof_type")]
    ProofType(Vec<String>),
    #[serde(untagged)]
    Other(serde_json::Value),
}

impl ClaimFormatPayload {
    /// Return the signing algorithms listed by the payload, if it lists any.
    pub fn algorithms(&self) -> Option<&[String]> {
        match self {
            Self::Alg(algs) | Self::AlgValuesSupported(algs) => Some(algs),
            _ => None,
        }
    }

    /// Return the linked data proof types listed by the payload, if it lists any.
    pub fn proof_types(&self) -> Option<&[String]> {
        match self {
            Self::ProofType(proof_types) => Some(proof_types),
            _ => None,
        }
    }
}

/// The family of encodings a claim format belongs to.
///
/// Credentials are evaluated per family: every designation of a family shares
/// the same claim view, issuer extraction and selective disclosure abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    /// JSON-LD credentials secured with a linked data proof.
    LinkedData,
    /// JWT encoded credentials.
    Jwt,
    /// SD-JWT credentials carrying salted, per-claim disclosures.
    SdJwt,
    /// ISO/IEC 18013-5 mobile documents.
    Mdoc,
}

/// The claim format designation type is used in the input description object to specify the format of the claim.
///
/// Registry of claim format type: https://identity.foundation/claim-format-registry/#registry
///
/// Documentation based on the [DIF Presentation Exchange Specification v2.0](https://identity.foundation/presentation-exchange/spec/v2.0.0/#claim-format-designations)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClaimFormatDesignation {
    /// The format is a JSON Web Token (JWT) as defined by [RFC7519](https://identity.foundation/claim-format-registry/#ref:RFC7519)
    /// that will be submitted in the form of a JWT encoded string. Expression of
    /// supported algorithms in relation to this format MUST be conveyed using an `alg`
    /// property paired with values that are identifiers from the JSON Web Algorithms
    /// registry [RFC7518](https://identity.foundation/claim-format-registry/#ref:RFC7518).
    Jwt,

    /// JWT encoded Verifiable Credential, with a payload defined according to the
    /// JSON Web Token section of the W3C [VC-DATA-MODEL](https://identity.foundation/claim-format-registry/#term:vc-data-model).
    JwtVc,

    /// See [JwtVc](JwtVc) for more information.
    JwtVp,

    JwtVcJson,

    JwtVpJson,

    /// The format is a Linked-Data Proof that will be submitted as an object.
    /// Expression of supported algorithms in relation to these formats MUST be
    /// conveyed using a proof_type property with values that are identifiers from
    /// the Linked Data Cryptographic Suite Registry [LDP-Registry](https://identity.foundation/claim-format-registry/#term:ldp-registry).
    Ldp,

    /// Verifiable Credentials signed with Linked Data Proof formats, submitted as JSON objects.
    LdpVc,

    /// See [LdpVc](LdpVc) for more information.
    LdpVp,

    /// Verifiable Credentials using AnonCreds.
    ///
    /// Recognized so that definitions naming it deserialize, but no claim view
    /// exists for it.
    AcVc,

    /// Verifiable Presentations using AnonCreds.
    AcVp,

    /// The format is defined by ISO/IEC 18013-5:2021 [ISO.18013-5](https://identity.foundation/claim-format-registry/#term:iso.18013-5)
    /// which defines a mobile driving license (mDL) Credential in the mobile document (mdoc) format.
    MsoMDoc,

    /// SD-JWT based Verifiable Credential, `vc+sd-jwt`.
    ///
    /// See: <https://datatracker.ietf.org/doc/draft-ietf-oauth-sd-jwt-vc/>
    VcSdJwt,

    /// SD-JWT based Digital Credential, `dc+sd-jwt`. Same encoding as [VcSdJwt](Self::VcSdJwt).
    DcSdJwt,

    /// Other claim format designations not covered by the above.
    ///
    /// The value of this variant is the name of the claim format designation.
    Other(String),
}

impl ClaimFormatDesignation {
    pub fn from_name(name: Cow<str>) -> Self {
        match name.as_ref() {
            FORMAT_JWT => Self::Jwt,
            FORMAT_JWT_VC => Self::JwtVc,
            FORMAT_JWT_VP => Self::JwtVp,
            FORMAT_JWT_VC_JSON => Self::JwtVcJson,
            FORMAT_JWT_VP_JSON => Self::JwtVpJson,
            FORMAT_LDP => Self::Ldp,
            FORMAT_LDP_VC => Self::LdpVc,
            FORMAT_LDP_VP => Self::LdpVp,
            FORMAT_AC_VC => Self::AcVc,
            FORMAT_AC_VP => Self::AcVp,
            FORMAT_MSO_MDOC => Self::MsoMDoc,
            FORMAT_VC_SD_JWT => Self::VcSdJwt,
            FORMAT_DC_SD_JWT => Self::DcSdJwt,
            _ => Self::Other(name.into_owned()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Jwt => FORMAT_JWT,
            Self::JwtVc => FORMAT_JWT_VC,
            Self::JwtVp => FORMAT_JWT_VP,
            Self::JwtVcJson => FORMAT_JWT_VC_JSON,
            Self::JwtVpJson => FORMAT_JWT_VP_JSON,
            Self::Ldp => FORMAT_LDP,
            Self::LdpVc => FORMAT_LDP_VC,
            Self::LdpVp => FORMAT_LDP_VP,
            Self::AcVc => FORMAT_AC_VC,
            Self::AcVp => FORMAT_AC_VP,
            Self::MsoMDoc => FORMAT_MSO_MDOC,
            Self::VcSdJwt => FORMAT_VC_SD_JWT,
            Self::DcSdJwt => FORMAT_DC_SD_JWT,
            Self::Other(other) => other,
        }
    }

    fn into_name(self) -> Cow<'static, str> {
        match self {
            Self::Other(other) => Cow::Owned(other),
            known => Cow::Owned(known.name().to_owned()),
        }
    }

    /// Return the encoding family of the designation.
    ///
    /// AnonCreds and unknown designations have no family; credentials in those
    /// formats cannot be evaluated.
    pub fn family(&self) -> Option<FormatFamily> {
        match self {
            Self::Ldp | Self::LdpVc | Self::LdpVp => Some(FormatFamily::LinkedData),
            Self::Jwt | Self::JwtVc | Self::JwtVp | Self::JwtVcJson | Self::JwtVpJson => {
                Some(FormatFamily::Jwt)
            }
            Self::VcSdJwt | Self::DcSdJwt => Some(FormatFamily::SdJwt),
            Self::MsoMDoc => Some(FormatFamily::Mdoc),
            Self::AcVc | Self::AcVp | Self::Other(_) => None,
        }
    }
}

impl From<&str> for ClaimFormatDesignation {
    fn from(s: &str) -> Self {
        Self::from_name(Cow::Borrowed(s))
    }
}

impl From<String> for ClaimFormatDesignation {
    fn from(value: String) -> Self {
        Self::from_name(Cow::Owned(value))
    }
}

impl FromStr for ClaimFormatDesignation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl From<ClaimFormatDesignation> for String {
    fn from(format: ClaimFormatDesignation) -> Self {
        format.into_name().into_owned()
    }
}

impl fmt::Display for ClaimFormatDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl Serialize for ClaimFormatDesignation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.name().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClaimFormatDesignation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Into::into)
    }
}
