//! Fail-closed validation of model output against the product schema

use std::borrow::Cow;

use serde::de::Error as _;
use serde_json::Value;
use tracing::{error, info};

use crate::error::ValidationError;
use crate::models::ResultSet;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Removes every markdown fence marker when the text opens with a
/// ```` ```json ```` fence. Anything else is returned untouched.
pub fn strip_code_fence(raw: &str) -> Cow<'_, str> {
    if !raw.trim_start().starts_with(JSON_FENCE) {
        return Cow::Borrowed(raw);
    }

    Cow::Owned(
        raw.replace(JSON_FENCE, "")
            .replace(FENCE, "")
            .trim()
            .to_string(),
    )
}

/// Parses and validates the model's answer. Any bad record rejects the set.
pub fn parse_results(raw: &str) -> Result<ResultSet, ValidationError> {
    let result = parse(raw);

    match &result {
        Ok(results) => info!("Successfully parsed data with {} products", results.len()),
        Err(e) => error!("Error parsing JSON: {}", e),
    }

    result
}

fn parse(raw: &str) -> Result<ResultSet, ValidationError> {
    let json = strip_code_fence(raw);
    let value: Value = serde_json::from_str(&json).map_err(ValidationError::Json)?;
    check_shape(&value)?;
    serde_json::from_value(value).map_err(ValidationError::Schema)
}

/// Derived structs also deserialize from arrays; only objects are accepted
/// for the result set and its records.
fn check_shape(value: &Value) -> Result<(), ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(schema_error("expected a JSON object with a `dataset` key"));
    };

    if let Some(Value::Array(records)) = object.get("dataset")
        && let Some(index) = records.iter().position(|record| !record.is_object())
    {
        return Err(schema_error(format!("dataset[{index}] is not an object")));
    }

    Ok(())
}

fn schema_error(message: impl std::fmt::Display) -> ValidationError {
    ValidationError::Schema(serde_json::Error::custom(message))
}
