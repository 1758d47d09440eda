//! Core data type definitions
//!
//! Identity records mirror what the identity backend hands out. Only the id
//! is structural; everything else stays in an attribute map and is read
//! through accessors, so a record survives a persist/restore cycle unchanged
//! (absent keys stay absent, explicit nulls stay null).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Authenticated user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimsUser {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl AimsUser {
    pub fn name(&self) -> Option<&str> {
        string_attribute(&self.attributes, "name")
    }

    pub fn email(&self) -> Option<&str> {
        string_attribute(&self.attributes, "email")
    }

    /// Type-check the attributes the session reads
    pub fn check_attributes(&self) -> Result<(), String> {
        expect_string(&self.attributes, "name")?;
        expect_string(&self.attributes, "email")
    }
}

/// Account record (primary, acting or managed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimsAccount {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl AimsAccount {
    /// Minimal account record carrying only an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
        .with_attribute("name", name)
    }

    /// Set one attribute, replacing any previous value
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        string_attribute(&self.attributes, "name")
    }

    pub fn default_location(&self) -> Option<&str> {
        string_attribute(&self.attributes, "default_location")
    }

    pub fn accessible_locations(&self) -> Option<Vec<String>> {
        self.attributes
            .get("accessible_locations")?
            .as_array()?
            .iter()
            .map(|location| location.as_str().map(str::to_string))
            .collect()
    }

    /// Type-check the attributes the session reads
    pub fn check_attributes(&self) -> Result<(), String> {
        expect_string(&self.attributes, "name")?;
        expect_string(&self.attributes, "default_location")?;
        match self.attributes.get("accessible_locations") {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Array(locations)) if locations.iter().all(Value::is_string) => Ok(()),
            Some(_) => Err("accessible_locations must be a list of strings".to_string()),
        }
    }
}

fn string_attribute<'a>(attributes: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

fn expect_string(attributes: &Map<String, Value>, key: &str) -> Result<(), String> {
    match attributes.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("{key} must be a string")),
    }
}

/// The authentication part of a session: who, for which account, with what token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub user: AimsUser,
    pub account: AimsAccount,
    pub token: String,
    /// Expiry as seconds since the unix epoch, kept exactly as supplied
    /// (browser-side clients write fractional seconds)
    pub token_expiration: Number,
}

impl SessionDescriptor {
    /// Expiry as fractional seconds since the unix epoch
    pub fn expires_at(&self) -> f64 {
        self.token_expiration.as_f64().unwrap_or(0.0)
    }

    /// True if the token is non-empty and has not expired yet
    pub fn is_current(&self) -> bool {
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        !self.token.is_empty() && self.expires_at() > now
    }
}

/// Expiry seconds as a JSON number: whole values stay integers, anything
/// else must be finite
pub fn expiration_number(seconds: f64) -> Option<Number> {
    if seconds.fract() == 0.0 && seconds.abs() < i64::MAX as f64 {
        Some(Number::from(seconds as i64))
    } else {
        Number::from_f64(seconds)
    }
}

/// The persisted session record: `{authentication, acting?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authentication: SessionDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acting: Option<AimsAccount>,
    #[serde(default, rename = "boundLocationId", skip_serializing_if = "Option::is_none")]
    pub bound_location_id: Option<String>,
}

impl SessionRecord {
    pub fn new(authentication: SessionDescriptor) -> Self {
        Self {
            authentication,
            acting: None,
            bound_location_id: None,
        }
    }
}

/// A subscribed capability grant for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub product_family: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Expiry as seconds since the unix epoch, `None` for open-ended grants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl EntitlementRecord {
    pub fn new(product_family: impl Into<String>) -> Self {
        Self {
            product_family: product_family.into(),
            active: true,
            expires: None,
            value_type: None,
            value: None,
        }
    }

    /// Active and not past its expiry
    pub fn is_effective(&self) -> bool {
        self.active
            && self
                .expires
                .map_or(true, |expires| expires > chrono::Utc::now().timestamp())
    }
}

/// All entitlements of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitlementCollection {
    pub records: Vec<EntitlementRecord>,
}

impl EntitlementCollection {
    pub fn new(records: Vec<EntitlementRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, product_family: &str) -> Option<&EntitlementRecord> {
        self.records
            .iter()
            .find(|record| record.product_family == product_family)
    }

    /// True if the product family is present and currently effective
    pub fn has(&self, product_family: &str) -> bool {
        self.get(product_family)
            .is_some_and(EntitlementRecord::is_effective)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
