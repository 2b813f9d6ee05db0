//! The authenticated user as known to the gateway.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Profile fields of the backend's `user` object.
///
/// Parsing never fails on field shape. Name-like fields take scalars as
/// text; descriptive fields keep whatever JSON the backend sent (a role may
/// be `"ADMIN"` or `{"id": 3, "name": "ADMIN"}`). Unknown fields land in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "scalar_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub department: Option<Value>,
    #[serde(default)]
    pub job_title: Option<Value>,
    #[serde(default)]
    pub avatar: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Strings as-is, numbers and booleans as their text, anything else absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Profile plus the bearer token for backend calls.
///
/// Rebuilt from the session on every request; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub profile: UserProfile,
    pub token: String,
}

impl Principal {
    /// Build from the raw `user` object; `None` if it is not an object.
    pub fn from_profile(profile: &Value, token: impl Into<String>) -> Option<Self> {
        if !profile.is_object() {
            return None;
        }
        let profile = serde_json::from_value(profile.clone()).ok()?;
        Some(Self {
            profile,
            token: token.into(),
        })
    }

    pub fn first_name(&self) -> &str {
        self.profile.first_name.as_deref().unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        let first = self.profile.first_name.as_deref().unwrap_or_default();
        let last = self.profile.last_name.as_deref().unwrap_or_default();
        format!("{first} {last}").trim().to_string()
    }

    /// Uppercased first letters of first and last name, `"??"` if either is missing.
    pub fn initials(&self) -> String {
        let first = self.profile.first_name.as_deref().and_then(|s| s.chars().next());
        let last = self.profile.last_name.as_deref().and_then(|s| s.chars().next());
        match (first, last) {
            (Some(f), Some(l)) => f.to_uppercase().chain(l.to_uppercase()).collect(),
            _ => "??".into(),
        }
    }
}
