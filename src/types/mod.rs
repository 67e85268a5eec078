mod graph;
mod sharepoint;

pub use graph::*;
pub use sharepoint::*;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Access token with expiration (epoch seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub expires: u64,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.expires > now
    }
}

/// Device code information for OAuth flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub device_code: String,
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    #[serde(deserialize_with = "string_to_u64")]
    pub expires_in: u64,
    #[serde(default = "default_interval", deserialize_with = "string_to_u64")]
    pub interval: u64,
    pub message: String,
}

fn default_interval() -> u64 {
    5
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in", deserialize_with = "string_to_u64")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Token storage keyed by resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStore {
    #[serde(default)]
    pub tokens: HashMap<String, AccessToken>,
}

impl TokenStore {
    pub fn get(&self, resource: &str) -> Option<&AccessToken> {
        self.tokens.get(resource)
    }

    pub fn insert(&mut self, resource: String, token: AccessToken) {
        self.tokens.insert(resource, token);
    }

    pub fn refresh_token(&self) -> Option<&AccessToken> {
        self.tokens.get("refresh_token")
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// Convert string or number to u64 (Azure AD v1 endpoints send strings)
pub fn string_to_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => u64::from_str(&s).map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("Number is not a valid u64")),
        _ => Err(serde::de::Error::custom("Unexpected type")),
    }
}
