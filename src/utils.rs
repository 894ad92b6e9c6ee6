use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A vector guaranteed to hold at least one element.
///
/// Deserialization fails on an empty JSON array, which lets the type system
/// carry "at least one path alternative" style invariants.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
pub struct NonEmptyVec<T: Clone>(Vec<T>);

impl<T: Clone> NonEmptyVec<T> {
    pub fn new(t: T) -> Self {
        Self(vec![t])
    }

    pub fn maybe_new(v: Vec<T>) -> Option<Self> {
        Self::try_from(v).ok()
    }

    pub fn push(&mut self, t: T) {
        self.0.push(t)
    }

    pub fn first(&self) -> &T {
        // Non-emptiness is checked on construction.
        &self.0[0]
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T: Clone> TryFrom<Vec<T>> for NonEmptyVec<T> {
    type Error = Error;

    fn try_from(v: Vec<T>) -> Result<NonEmptyVec<T>, Error> {
        if v.is_empty() {
            bail!("cannot create a NonEmptyVec from an empty Vec")
        }
        Ok(NonEmptyVec(v))
    }
}

impl<T: Clone> From<NonEmptyVec<T>> for Vec<T> {
    fn from(NonEmptyVec(v): NonEmptyVec<T>) -> Vec<T> {
        v
    }
}

impl<T: Clone> AsRef<[T]> for NonEmptyVec<T> {
    fn as_ref(&self) -> &[T] {
        &self.0
    }
}

impl<T: Clone> Deref for NonEmptyVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// Append the items of `other` to `target`, skipping values already present.
///
/// Keeps first-seen order, which is how credential positions are reported.
pub(crate) fn extend_unique<T: PartialEq + Copy>(target: &mut Vec<T>, other: &[T]) {
    for item in other {
        if !target.contains(item) {
            target.push(*item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_vec_rejects_empty_array() {
        let res: Result<NonEmptyVec<String>, _> = serde_json::from_str("[]");
        assert!(res.is_err());

        let v: NonEmptyVec<String> = serde_json::from_str(r#"["$.a", "$.b"]"#).unwrap();
        assert_eq!(v.first(), "$.a");
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn extend_unique_keeps_first_seen_order() {
        let mut v = vec![2, 0];
        extend_unique(&mut v, &[1, 0, 3, 2]);
        assert_eq!(v, vec![2, 0, 1, 3]);
    }
}
