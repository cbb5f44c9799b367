use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the admin flag on a user record.
pub const IS_ADMIN_FIELD: &str = "is_admin";

/// A user record as returned by the server and mirrored into session storage.
///
/// Only `is_admin` is interpreted. Every other field is carried opaquely so a
/// record read back from storage is identical to the one that was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Map<String, Value>);

impl UserRecord {
    /// Creates a record with the fields the auth endpoints return.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>, is_admin: bool) -> Self {
        Self::default()
            .with_field("user_id", user_id)
            .with_field("username", username.into())
            .with_field(IS_ADMIN_FIELD, is_admin)
    }

    /// Returns the record with `field` set to `value`.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Raw access to any field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the record grants admin rights.
    ///
    /// The flag is evaluated by truthiness, so `1` and `"yes"` count as admin
    /// while `0`, `""`, `null` or a missing field do not.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.get(IS_ADMIN_FIELD).is_some_and(is_truthy)
    }

    /// The `username` field, if it is a string.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get("username").and_then(Value::as_str)
    }

    /// The `user_id` field, if it is an integer.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.get("user_id").and_then(Value::as_i64)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for UserRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// JSON truthiness as browsers evaluate it.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
