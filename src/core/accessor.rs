//! Claim access: resolving JSONPath alternatives against a claim tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::input_descriptor::JsonPath;
use crate::error::EvaluationError;

/// One step of a concrete claim path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

/// A concrete location in a claim tree, as produced by resolving a JSONPath
/// expression.
///
/// Displayed as a normalized JSONPath, e.g. `$['credentialSubject']['age'][0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimPath(Vec<PathElement>);

impl ClaimPath {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }

    /// The path of the root of the claim tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathElement::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathElement::Index(index));
        self
    }

    /// Return the value at this path in `claims`.
    pub fn lookup<'a>(&self, claims: &'a Json) -> Option<&'a Json> {
        self.0
            .iter()
            .try_fold(claims, |value, element| match element {
                PathElement::Key(key) => value.get(key.as_str()),
                PathElement::Index(index) => value.get(*index),
            })
    }
}

impl fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for element in &self.0 {
            match element {
                PathElement::Key(key) => write!(f, "['{}']", key.replace('\'', "\\'"))?,
                PathElement::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A value found in a claim tree, with the concrete path it was found at.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClaim {
    pub path: ClaimPath,
    pub value: Json,
}

/// Resolves field paths against a claim tree.
pub trait ClaimAccessor: fmt::Debug {
    /// Evaluate the path alternatives in order and return the first match.
    ///
    /// `Ok(None)` means no alternative resolved. Errors are request-level,
    /// e.g. an expression that cannot be parsed.
    fn resolve(
        &self,
        claims: &Json,
        paths: &[JsonPath],
    ) -> Result<Option<ResolvedClaim>, EvaluationError>;
}

/// [ClaimAccessor] evaluating RFC 9535 JSONPath expressions.
///
/// When an expression selects several nodes, the first one in document order
/// is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathAccessor;

impl ClaimAccessor for JsonPathAccessor {
    fn resolve(
        &self,
        claims: &Json,
        paths: &[JsonPath],
    ) -> Result<Option<ResolvedClaim>, EvaluationError> {
        for path in paths {
            let query = serde_json_path::JsonPath::parse(path)
                .map_err(|e| EvaluationError::invalid_path(path, e))?;

            let Some(node) = query.query_located(claims).into_iter().next() else {
                continue;
            };

            let elements = node
                .location()
                .iter()
                .map(|element| match element {
                    serde_json_path::PathElement::Name(name) => {
                        PathElement::Key(name.to_string())
                    }
                    serde_json_path::PathElement::Index(index) => PathElement::Index(*index),
                })
                .collect();

            return Ok(Some(ResolvedClaim {
                path: ClaimPath::new(elements),
                value: node.node().clone(),
            }));
        }

        Ok(None)
    }
}
