//! # Policy Documents
//!
//! Semantic equality for IAM-style JSON policy documents. IAM re-emits
//! documents percent-encoded, with its own whitespace and array ordering, and
//! collapses single-element arrays; none of that is drift.

use super::DriftError;
use serde_json::Value;

/// Decode, parse and canonicalize a policy document
pub fn normalize_policy(document: &str) -> Result<Value, DriftError> {
    let decoded = urlencoding::decode(document)
        .map_err(|e| DriftError::InvalidDocument(format!("cannot percent-decode: {e}")))?;
    let parsed: Value = serde_json::from_str(decoded.trim())
        .map_err(|e| DriftError::InvalidDocument(format!("cannot parse JSON: {e}")))?;
    Ok(canonicalize(parsed))
}

/// Whether two policy documents grant the same thing
pub fn is_policy_equal(a: &str, b: &str) -> Result<bool, DriftError> {
    Ok(normalize_policy(a)? == normalize_policy(b)?)
}

/// Like [`is_policy_equal`], treating two absent documents as equal
pub fn is_policy_equal_opt(a: Option<&str>, b: Option<&str>) -> Result<bool, DriftError> {
    match (a.filter(|d| !d.is_empty()), b.filter(|d| !d.is_empty())) {
        (None, None) => Ok(true),
        (Some(a), Some(b)) => is_policy_equal(a, b),
        _ => Ok(false),
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(canonicalize).collect();
            if items.len() == 1 {
                if let Some(only) = items.pop() {
                    return only;
                }
            }
            if items.iter().all(Value::is_string) {
                items.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
            }
            Value::Array(items)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        ),
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARED: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"sts:AssumeRole","Principal":{"AWS":["A","B"]}}]}"#;

    #[test]
    fn percent_encoded_reordered_document_is_equal() {
        let observed_json = r#"{"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": ["sts:AssumeRole"], "Principal": {"AWS": ["B", "A"]}}]}"#;
        let observed = urlencoding::encode(observed_json);
        assert!(is_policy_equal(DECLARED, &observed).unwrap());
    }

    #[test]
    fn numbers_and_strings_of_same_form_are_equal() {
        let a = r#"{"Condition":{"NumericLessThan":{"aws:MultiFactorAuthAge":"3600"}}}"#;
        let b = r#"{"Condition":{"NumericLessThan":{"aws:MultiFactorAuthAge":3600}}}"#;
        assert!(is_policy_equal(a, b).unwrap());
    }

    #[test]
    fn different_principals_are_not_equal() {
        let other = DECLARED.replace("\"B\"", "\"C\"");
        assert!(!is_policy_equal(DECLARED, &other).unwrap());
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            is_policy_equal(DECLARED, "{not json"),
            Err(DriftError::InvalidDocument(_))
        ));
    }

    #[test]
    fn absent_documents_compare_by_presence() {
        assert!(is_policy_equal_opt(None, Some("")).unwrap());
        assert!(!is_policy_equal_opt(Some(DECLARED), None).unwrap());
    }
}
