use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::core::{
    accessor::ClaimPath,
    input_descriptor::{GroupId, Predicate},
};

/// Severity of a check, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Info,
    Warn,
    Error,
}

impl Status {
    /// Return the worse of two statuses.
    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn is_error(self) -> bool {
        self == Status::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Info => f.write_str("info"),
            Status::Warn => f.write_str("warn"),
            Status::Error => f.write_str("error"),
        }
    }
}

/// A constraint field that resolved against a credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    /// Position of the field in the descriptor's constraints.
    pub field_index: usize,
    pub field_id: Option<String>,
    /// Concrete path the field resolved to.
    pub path: ClaimPath,
    /// The resolved value, withheld for predicate fields.
    pub value: Option<Json>,
    pub predicate: Option<Predicate>,
    /// Filter outcome of a predicate field.
    pub predicate_satisfied: Option<bool>,
}

/// Boolean outcome reported in place of a predicate field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateOutcome {
    pub field_index: usize,
    pub field_id: Option<String>,
    pub predicate: Predicate,
    pub satisfied: bool,
}

/// Typed data attached to a check row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckPayload {
    #[default]
    None,
    Fields { matches: Vec<FieldMatch> },
    Predicates { outcomes: Vec<PredicateOutcome> },
    Eligible { groups: Vec<GroupId> },
    /// `evaluator` names the first stage that failed the pair.
    Ineligible { evaluator: &'static str },
}

/// One row of the evaluation log: the outcome of one stage for one
/// (input descriptor, credential) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerCheckResult {
    pub evaluator: &'static str,
    pub status: Status,
    pub input_descriptor_index: usize,
    /// `original_index` of the credential.
    pub credential_index: usize,
    pub message: String,
    pub payload: CheckPayload,
}

impl HandlerCheckResult {
    pub(crate) fn new(
        evaluator: &'static str,
        status: Status,
        (input_descriptor_index, credential_index): (usize, usize),
        message: impl Into<String>,
    ) -> Self {
        Self {
            evaluator,
            status,
            input_descriptor_index,
            credential_index,
            message: message.into(),
            payload: CheckPayload::None,
        }
    }

    pub(crate) fn info(
        evaluator: &'static str,
        pair: (usize, usize),
        message: impl Into<String>,
    ) -> Self {
        Self::new(evaluator, Status::Info, pair, message)
    }

    pub(crate) fn with_payload(mut self, payload: CheckPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn pair(&self) -> (usize, usize) {
        (self.input_descriptor_index, self.credential_index)
    }

    pub fn input_descriptor_path(&self) -> String {
        format!("$.input_descriptors[{}]", self.input_descriptor_index)
    }

    pub fn credential_path(&self) -> String {
        format!("$.verifiableCredential[{}]", self.credential_index)
    }
}

/// Append-only record of every check made during one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationLog(Vec<HandlerCheckResult>);

impl EvaluationLog {
    pub(crate) fn extend(&mut self, rows: impl IntoIterator<Item = HandlerCheckResult>) {
        self.0.extend(rows)
    }

    pub fn rows(&self) -> &[HandlerCheckResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rows of one (input descriptor, credential) pair, in stage order.
    pub fn for_pair(
        &self,
        input_descriptor_index: usize,
        credential_index: usize,
    ) -> impl Iterator<Item = &HandlerCheckResult> {
        self.0.iter().filter(move |row| {
            row.input_descriptor_index == input_descriptor_index
                && row.credential_index == credential_index
        })
    }

    /// Rows written by the stage named `evaluator`.
    pub fn by_evaluator<'a>(
        &'a self,
        evaluator: &'a str,
    ) -> impl Iterator<Item = &'a HandlerCheckResult> {
        self.0.iter().filter(move |row| row.evaluator == evaluator)
    }
}

impl<'a> IntoIterator for &'a EvaluationLog {
    type Item = &'a HandlerCheckResult;
    type IntoIter = std::slice::Iter<'a, HandlerCheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A rendered error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checked {
    pub tag: String,
    pub status: Status,
    pub message: String,
}

impl From<&HandlerCheckResult> for Checked {
    fn from(row: &HandlerCheckResult) -> Self {
        Self {
            tag: row.evaluator.to_owned(),
            status: row.status,
            message: format!(
                "{}: {}: {}",
                row.message,
                row.input_descriptor_path(),
                row.credential_path()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_status_wins() {
        assert_eq!(Status::Info.worst(Status::Warn), Status::Warn);
        assert_eq!(Status::Error.worst(Status::Warn), Status::Error);
        assert_eq!(
            [Status::Info, Status::Info].into_iter().max(),
            Some(Status::Info)
        );
        assert_eq!(serde_json::to_string(&Status::Warn).unwrap(), r#""warn""#);
    }

    #[test]
    fn rows_render_with_paths() {
        let row = HandlerCheckResult::new(
            "FilterEvaluation",
            Status::Error,
            (1, 4),
            "field value does not pass the filter",
        );
        let checked = Checked::from(&row);
        assert_eq!(checked.tag, "FilterEvaluation");
        assert_eq!(
            checked.message,
            "field value does not pass the filter: $.input_descriptors[1]: $.verifiableCredential[4]"
        );
    }

    #[test]
    fn log_lookup() {
        let mut log = EvaluationLog::default();
        log.extend([
            HandlerCheckResult::info("A", (0, 0), "ok"),
            HandlerCheckResult::info("A", (0, 1), "ok"),
            HandlerCheckResult::new("B", Status::Error, (0, 1), "failed"),
        ]);

        assert_eq!(log.for_pair(0, 1).count(), 2);
        assert_eq!(log.by_evaluator("A").count(), 2);
        assert_eq!(log.len(), 3);
    }
}
