//! Structural checks for dictionary payloads.
//!
//! The same rules apply to fresh API responses and to payloads read back
//! from the local store.

use serde_json::Value;
use thiserror::Error;

/// Reason a payload was rejected. The first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("not valid")]
    NotValid,
    #[error("missing required fields")]
    MissingRequiredFields,
    #[error("missing category count")]
    MissingCategoryCount,
    /// Well-formed but empty: the API answers this way for unknown terms.
    #[error("blank api")]
    BlankApi,
}

/// Validate a raw payload.
///
/// Pure: the result depends only on `payload`.
pub fn validate(payload: &Value) -> Result<(), ValidationFailure> {
    let object = match payload {
        Value::Object(object) if !object.is_empty() => object,
        _ => return Err(ValidationFailure::NotValid),
    };

    let first = object
        .get("data")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or(ValidationFailure::MissingRequiredFields)?;

    if !first.get("examples").is_some_and(Value::is_array) {
        return Err(ValidationFailure::MissingRequiredFields);
    }

    let counts = first
        .get("category_count")
        .and_then(Value::as_object)
        .ok_or(ValidationFailure::MissingCategoryCount)?;

    if counts.values().all(is_zero) {
        return Err(ValidationFailure::BlankApi);
    }

    Ok(())
}

fn is_zero(value: &Value) -> bool {
    value.as_f64() == Some(0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_object_is_not_valid() {
        assert_eq!(validate(&json!({})), Err(ValidationFailure::NotValid));
        assert_eq!(validate(&Value::Null), Err(ValidationFailure::NotValid));
        assert_eq!(validate(&json!([])), Err(ValidationFailure::NotValid));
    }

    #[test]
    fn missing_results_or_examples() {
        assert_eq!(
            validate(&json!({"message": "ok"})),
            Err(ValidationFailure::MissingRequiredFields)
        );
        assert_eq!(
            validate(&json!({"data": []})),
            Err(ValidationFailure::MissingRequiredFields)
        );
        assert_eq!(
            validate(&json!({"data": [{"category_count": {"a": 1}}]})),
            Err(ValidationFailure::MissingRequiredFields)
        );
    }

    #[test]
    fn missing_category_count() {
        assert_eq!(
            validate(&json!({"data": [{"examples": [{"sentence": "x"}]}]})),
            Err(ValidationFailure::MissingCategoryCount)
        );
    }

    #[test]
    fn all_zero_counts_are_blank() {
        let payload = json!({"data": [{"category_count": {"a": 0, "b": 0}, "examples": [{"sentence": "x"}]}]});
        assert_eq!(validate(&payload), Err(ValidationFailure::BlankApi));
        assert_eq!(ValidationFailure::BlankApi.to_string(), "blank api");
    }

    #[test]
    fn non_zero_count_is_valid() {
        let payload = json!({"data": [{"category_count": {"a": 1}, "examples": [{"sentence": "x"}]}]});
        assert_eq!(validate(&payload), Ok(()));
    }

    #[test]
    fn earlier_checks_win() {
        let payload = json!({"data": [{"category_count": {"a": 0}}]});
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::MissingRequiredFields)
        );
    }

    #[test]
    fn results_do_not_leak_between_calls() {
        let blank = json!({"data": [{"category_count": {"a": 0}, "examples": []}]});
        let good = json!({"data": [{"category_count": {"a": 3}, "examples": []}]});

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let payload = if i % 2 == 0 { blank.clone() } else { good.clone() };
                std::thread::spawn(move || (i, validate(&payload)))
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.join().expect("validator thread");
            if i % 2 == 0 {
                assert_eq!(result, Err(ValidationFailure::BlankApi));
            } else {
                assert_eq!(result, Ok(()));
            }
        }
        assert_eq!(validate(&good), Ok(()));
    }
}
