//! Field filters: JSON Schema descriptors applied to resolved claim values.

use jsonschema::JSONSchema;
use serde_json::{Map, Value as Json};

/// Decides whether a resolved claim value passes a field filter.
pub trait FilterEvaluator: std::fmt::Debug {
    fn evaluate(&self, value: &Json, filter: &Json) -> bool;
}

const FORMAT_MINIMUM: &str = "formatMinimum";
const FORMAT_EXCLUSIVE_MINIMUM: &str = "formatExclusiveMinimum";
const FORMAT_MAXIMUM: &str = "formatMaximum";
const FORMAT_EXCLUSIVE_MAXIMUM: &str = "formatExclusiveMaximum";

/// [FilterEvaluator] backed by the `jsonschema` crate.
///
/// Presentation definitions commonly bound dates with the `formatMinimum`
/// family of keywords, which JSON Schema validators do not ship. They are
/// handled here for string values, comparing `date` and `date-time` strings
/// lexicographically (which matches chronological order for RFC 3339 values
/// of the same shape).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaFilter;

impl FilterEvaluator for JsonSchemaFilter {
    fn evaluate(&self, value: &Json, filter: &Json) -> bool {
        let (schema, bounds) = split_format_bounds(filter);

        let compiled = match JSONSchema::compile(&schema) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!("filter is not a valid JSON Schema, treating as a mismatch: {e}");
                return false;
            }
        };

        if let Err(errors) = compiled.validate(value) {
            for error in errors {
                tracing::debug!("value did not pass filter validation: {error}");
            }
            return false;
        }

        bounds.accepts(value)
    }
}

#[derive(Debug, Default)]
struct FormatBounds {
    minimum: Option<(String, bool)>,
    maximum: Option<(String, bool)>,
}

impl FormatBounds {
    fn accepts(&self, value: &Json) -> bool {
        let Some(value) = value.as_str() else {
            return true;
        };

        let above_minimum = self.minimum.as_ref().map_or(true, |(bound, exclusive)| {
            if *exclusive {
                value > bound.as_str()
            } else {
                value >= bound.as_str()
            }
        });

        let below_maximum = self.maximum.as_ref().map_or(true, |(bound, exclusive)| {
            if *exclusive {
                value < bound.as_str()
            } else {
                value <= bound.as_str()
            }
        });

        above_minimum && below_maximum
    }
}

/// Remove the `format*imum` keywords from a filter, returning the remaining
/// schema and the extracted bounds.
fn split_format_bounds(filter: &Json) -> (Json, FormatBounds) {
    let Some(object) = filter.as_object() else {
        return (filter.clone(), FormatBounds::default());
    };

    let mut schema = Map::with_capacity(object.len());
    let mut bounds = FormatBounds::default();

    for (key, value) in object {
        let bound = value.as_str().map(ToOwned::to_owned);
        match (key.as_str(), bound) {
            (FORMAT_MINIMUM, Some(bound)) => bounds.minimum = Some((bound, false)),
            (FORMAT_EXCLUSIVE_MINIMUM, Some(bound)) => bounds.minimum = Some((bound, true)),
            (FORMAT_MAXIMUM, Some(bound)) => bounds.maximum = Some((bound, false)),
            (FORMAT_EXCLUSIVE_MAXIMUM, Some(bound)) => bounds.maximum = Some((bound, true)),
            _ => {
                schema.insert(key.clone(), value.clone());
            }
        }
    }

    (Json::Object(schema), bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn schema_keywords() {
        let filter = JsonSchemaFilter;
        assert!(filter.evaluate(&json!("IDCardCredential"), &json!({ "type": "string", "pattern": "IDCard" })));
        assert!(!filter.evaluate(&json!(17), &json!({ "type": "number", "minimum": 18 })));
        assert!(filter.evaluate(&json!("B"), &json!({ "enum": ["A", "B"] })));
        assert!(filter.evaluate(
            &json!(["VerifiableCredential", "DriversLicense"]),
            &json!({ "type": "array", "contains": { "const": "DriversLicense" } })
        ));
    }

    #[test]
    fn date_bounds() {
        let filter = json!({ "type": "string", "format": "date", "formatMaximum": "2005-01-01" });
        assert!(JsonSchemaFilter.evaluate(&json!("1990-05-17"), &filter));
        assert!(!JsonSchemaFilter.evaluate(&json!("2010-05-17"), &filter));

        let filter = json!({ "type": "string", "formatExclusiveMinimum": "2020-01-01" });
        assert!(!JsonSchemaFilter.evaluate(&json!("2020-01-01"), &filter));
        assert!(JsonSchemaFilter.evaluate(&json!("2020-01-02"), &filter));
    }

    #[test]
    fn invalid_schema_is_a_mismatch() {
        assert!(!JsonSchemaFilter.evaluate(&json!("x"), &json!({ "type": 12 })));
    }
}
