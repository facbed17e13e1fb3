//! Raw-string to typed-value coercion.

use std::collections::BTreeSet;

use thiserror::Error;

use hermes_core::{BoundValue, TargetType};

/// A raw value that could not be coerced to its declared target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot convert '{value}' to {target:?}")]
pub struct CoerceError {
    /// The raw value that failed.
    pub value: String,
    /// The declared target type.
    pub target: TargetType,
}

/// Coerces the raw values of one parameter into its declared target.
///
/// `values` is everything the source yielded (already decoded), in arrival
/// order; an empty slice means the parameter was absent and binds the
/// target's neutral value: nothing for text, zero for integers, empty for
/// collections.
///
/// # Errors
///
/// Any single value failing to parse fails the whole parameter.
pub fn coerce(target: TargetType, values: &[String]) -> Result<BoundValue, CoerceError> {
    match target {
        TargetType::Text => Ok(BoundValue::Text(values.first().cloned())),
        TargetType::Int => {
            let value = match values.first() {
                Some(v) => parse_int(v, target)?,
                None => 0,
            };
            Ok(BoundValue::Int(value))
        }
        TargetType::TextList => Ok(BoundValue::TextList(values.to_vec())),
        TargetType::IntList => {
            let ints = values
                .iter()
                .map(|v| parse_int(v, target))
                .collect::<Result<Vec<i64>, CoerceError>>()?;
            Ok(BoundValue::IntList(ints))
        }
        TargetType::TextSortedSet => Ok(BoundValue::TextSortedSet(
            values.iter().cloned().collect::<BTreeSet<String>>(),
        )),
        TargetType::IntSortedSet => {
            let ints = values
                .iter()
                .map(|v| parse_int(v, target))
                .collect::<Result<BTreeSet<i64>, CoerceError>>()?;
            Ok(BoundValue::IntSortedSet(ints))
        }
        TargetType::Raw => Ok(BoundValue::Raw(values.to_vec())),
    }
}

fn parse_int(value: &str, target: TargetType) -> Result<i64, CoerceError> {
    value.trim().parse::<i64>().map_err(|_| CoerceError {
        value: value.to_string(),
        target,
    })
}
