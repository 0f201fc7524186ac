//! Trust-boundary policy document editing.
//!
//! The document is kept as raw JSON so statements and keys this crate does not
//! understand survive a read-modify-write untouched. Only the admitted-account
//! condition of one named statement is edited.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statement id of the clause that restricts access by account.
pub const DEFAULT_CLAUSE_SID: &str = "RestrictAccountID";

/// Condition operator holding the admitted accounts.
pub const CONDITION_OPERATOR: &str = "StringEquals";

/// Condition key listing admitted account ids.
pub const ADMITTED_ACCOUNT_KEY: &str = "aws:PrincipalAccount";

/// Errors raised while editing a policy document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The text is not a JSON object.
    #[error("policy document is not valid JSON: {0}")]
    Malformed(String),

    /// No statement carries the expected `Sid`.
    #[error("no statement with Sid {0:?}")]
    ClauseNotFound(String),

    /// The statement lacks the admitted-account condition.
    #[error("statement {sid:?} has no {operator}.{key} condition")]
    ConditionMissing {
        /// Statement id.
        sid: String,
        /// Condition operator.
        operator: String,
        /// Condition key.
        key: String,
    },

    /// The admitted-account value is neither a string nor a list of strings.
    #[error("statement {sid:?} has a non-string admitted account value: {value}")]
    UnexpectedValue {
        /// Statement id.
        sid: String,
        /// The offending JSON.
        value: String,
    },
}

/// Result of admitting an account into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The account was appended.
    Added,
    /// The account was already admitted; the document is unchanged.
    AlreadyAdmitted,
}

/// A structured access-policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustPolicyDocument(Value);

impl TrustPolicyDocument {
    /// Parse a policy document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Malformed`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| PolicyError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Malformed`] if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, PolicyError> {
        if !value.is_object() {
            return Err(PolicyError::Malformed("expected a JSON object".into()));
        }
        Ok(Self(value))
    }

    /// Serialize for a full-document write.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    /// Borrow the raw document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The account ids admitted by the named clause, in document order.
    ///
    /// # Errors
    ///
    /// Fails when the clause or its condition is missing or malformed.
    pub fn admitted_accounts(&self, sid: &str) -> Result<Vec<String>, PolicyError> {
        let statement = find_statement(&self.0, sid)?;
        let value = statement
            .get("Condition")
            .and_then(|c| c.get(CONDITION_OPERATOR))
            .and_then(|o| o.get(ADMITTED_ACCOUNT_KEY))
            .ok_or_else(|| condition_missing(sid))?;
        admitted_values(sid, value)
    }

    /// Append an account id to the named clause's admitted-account condition.
    ///
    /// A scalar value is normalized to a list `[existing, new]`; a list gets the
    /// new id appended at the end. Ids already present are not duplicated.
    ///
    /// # Errors
    ///
    /// Fails when the clause or its condition is missing or malformed.
    pub fn admit(&mut self, sid: &str, account_id: &str) -> Result<Admission, PolicyError> {
        let statement = find_statement_mut(&mut self.0, sid)?;
        let slot = statement
            .get_mut("Condition")
            .and_then(Value::as_object_mut)
            .and_then(|c| c.get_mut(CONDITION_OPERATOR))
            .and_then(Value::as_object_mut)
            .and_then(|o| o.get_mut(ADMITTED_ACCOUNT_KEY))
            .ok_or_else(|| condition_missing(sid))?;

        if admitted_values(sid, slot)?.iter().any(|a| a == account_id) {
            return Ok(Admission::AlreadyAdmitted);
        }

        match slot {
            Value::Array(values) => values.push(Value::String(account_id.to_string())),
            scalar => {
                let existing = scalar.take();
                *scalar = Value::Array(vec![existing, Value::String(account_id.to_string())]);
            }
        }
        Ok(Admission::Added)
    }
}

fn statements(doc: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    // A single statement may be written as an object instead of a list.
    let list = match doc.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };
    list.into_iter().filter_map(Value::as_object)
}

fn find_statement<'a>(doc: &'a Value, sid: &str) -> Result<&'a Map<String, Value>, PolicyError> {
    statements(doc)
        .find(|s| s.get("Sid").and_then(Value::as_str) == Some(sid))
        .ok_or_else(|| PolicyError::ClauseNotFound(sid.to_string()))
}

fn find_statement_mut<'a>(
    doc: &'a mut Value,
    sid: &str,
) -> Result<&'a mut Map<String, Value>, PolicyError> {
    let matches = |v: &Value| v.get("Sid").and_then(Value::as_str) == Some(sid);
    let found = match doc.get_mut("Statement") {
        Some(Value::Array(items)) => items.iter_mut().find(|s| matches(s)),
        Some(single) if matches(single) => Some(single),
        _ => None,
    };
    found
        .and_then(Value::as_object_mut)
        .ok_or_else(|| PolicyError::ClauseNotFound(sid.to_string()))
}

fn admitted_values(sid: &str, value: &Value) -> Result<Vec<String>, PolicyError> {
    let unexpected = || PolicyError::UnexpectedValue {
        sid: sid.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(unexpected))
            .collect(),
        _ => Err(unexpected()),
    }
}

fn condition_missing(sid: &str) -> PolicyError {
    PolicyError::ConditionMissing {
        sid: sid.to_string(),
        operator: CONDITION_OPERATOR.to_string(),
        key: ADMITTED_ACCOUNT_KEY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(admitted: &Value) -> TrustPolicyDocument {
        TrustPolicyDocument::from_value(json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "AllowRead",
                    "Effect": "Allow",
                    "Principal": "*",
                    "Action": "s3:GetObject",
                    "Resource": "arn:aws:s3:::metadata/*"
                },
                {
                    "Sid": DEFAULT_CLAUSE_SID,
                    "Effect": "Deny",
                    "Principal": "*",
                    "Action": "s3:GetObject",
                    "Resource": "arn:aws:s3:::metadata/*",
                    "Condition": { "StringEquals": { "aws:PrincipalAccount": admitted } }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn scalar_is_normalized_to_two_element_list() {
        let mut doc = document(&json!("222222222222"));

        let outcome = doc.admit(DEFAULT_CLAUSE_SID, "111111111111").unwrap();

        assert_eq!(outcome, Admission::Added);
        assert_eq!(
            doc.admitted_accounts(DEFAULT_CLAUSE_SID).unwrap(),
            vec!["222222222222", "111111111111"]
        );
        let raw = &doc.as_value()["Statement"][1]["Condition"]["StringEquals"]["aws:PrincipalAccount"];
        assert!(raw.is_array());
    }

    #[test]
    fn list_gets_new_id_appended_at_end() {
        let mut doc = document(&json!(["222222222222", "333333333333"]));

        doc.admit(DEFAULT_CLAUSE_SID, "111111111111").unwrap();

        assert_eq!(
            doc.admitted_accounts(DEFAULT_CLAUSE_SID).unwrap(),
            vec!["222222222222", "333333333333", "111111111111"]
        );
    }

    #[test]
    fn admitting_twice_does_not_duplicate() {
        let mut doc = document(&json!(["222222222222"]));
        doc.admit(DEFAULT_CLAUSE_SID, "111111111111").unwrap();

        let second = doc.admit(DEFAULT_CLAUSE_SID, "111111111111").unwrap();

        assert_eq!(second, Admission::AlreadyAdmitted);
        assert_eq!(doc.admitted_accounts(DEFAULT_CLAUSE_SID).unwrap().len(), 2);
    }

    #[test]
    fn other_statements_are_untouched() {
        let mut doc = document(&json!("222222222222"));
        let before = doc.as_value()["Statement"][0].clone();

        doc.admit(DEFAULT_CLAUSE_SID, "111111111111").unwrap();

        assert_eq!(doc.as_value()["Statement"][0], before);
    }

    #[test]
    fn missing_clause_is_reported() {
        let mut doc = document(&json!("222222222222"));
        let err = doc.admit("Nope", "111111111111").unwrap_err();
        assert_eq!(err, PolicyError::ClauseNotFound("Nope".into()));
    }

    #[test]
    fn missing_condition_is_reported() {
        let mut doc = TrustPolicyDocument::from_value(json!({
            "Statement": { "Sid": DEFAULT_CLAUSE_SID, "Effect": "Deny" }
        }))
        .unwrap();
        assert!(matches!(
            doc.admit(DEFAULT_CLAUSE_SID, "111111111111"),
            Err(PolicyError::ConditionMissing { .. })
        ));
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(TrustPolicyDocument::parse("[1,2]").is_err());
        assert!(TrustPolicyDocument::parse("not json").is_err());
    }

    #[test]
    fn round_trips_through_text() {
        let doc = document(&json!("222222222222"));
        let reparsed = TrustPolicyDocument::parse(&doc.to_json()).unwrap();
        assert_eq!(reparsed, doc);
    }
}
