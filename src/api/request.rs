use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::{urls, GRAPH_RESOURCE, ODATA_NOMETADATA};
use crate::error::{CommandError, CommandResult};

/// Service a request is authenticated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Graph,
    /// SharePoint tenant, identified by its origin
    SharePoint(String),
}

impl Resource {
    /// SharePoint resource of the tenant hosting `web_url`
    pub fn sharepoint(web_url: &str) -> CommandResult<Self> {
        Ok(Self::SharePoint(urls::origin(web_url)?))
    }

    /// Key access tokens are cached under
    pub fn key(&self) -> String {
        match self {
            Self::Graph => GRAPH_RESOURCE.to_string(),
            Self::SharePoint(origin) => origin.clone(),
        }
    }

    /// OAuth scope requested when exchanging the refresh token
    pub fn scope(&self) -> String {
        format!("{}/.default", self.key())
    }
}

/// Fully materialized HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: String,
    pub resource: Resource,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    /// Web whose form digest must be sent as `X-RequestDigest`
    pub digest_for: Option<String>,
}

impl ResolvedRequest {
    /// SharePoint REST request using the `nometadata` JSON flavor
    pub fn sharepoint(method: Method, url: String, resource: Resource) -> Self {
        Self {
            method,
            url,
            resource,
            headers: vec![
                ("accept", ODATA_NOMETADATA.to_string()),
                ("content-type", ODATA_NOMETADATA.to_string()),
            ],
            body: None,
            digest_for: None,
        }
    }

    pub fn graph(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            resource: Resource::Graph,
            headers: vec![("accept", "application/json".to_string())],
            body: None,
            digest_for: None,
        }
    }

    pub fn with_body<T: Serialize>(mut self, body: &T) -> CommandResult<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| CommandError::Other(anyhow::anyhow!("Failed to serialize body: {}", e)))?;
        if !self.has_header("content-type") {
            self.headers
                .push(("content-type", "application/json".to_string()));
        }
        self.body = Some(body);
        Ok(self)
    }

    pub fn with_digest(mut self, web_url: &str) -> Self {
        self.digest_for = Some(web_url.to_string());
        self
    }

    /// Same request against another URL (next page of a collection)
    pub fn with_url(&self, url: String) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// How an identifier is read from a resolution response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdExtractor {
    /// `field` of the first element of the `value` collection
    FirstInCollection { field: &'static str },
    /// The scalar `value` property
    Scalar,
}

impl IdExtractor {
    pub fn extract(&self, response: &Value) -> Option<String> {
        let found = match self {
            Self::FirstInCollection { field } => response
                .get("value")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get(*field)),
            Self::Scalar => response.get("value"),
        };
        match found? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Name-to-id resolution call
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub request: ResolvedRequest,
    pub extract: IdExtractor,
    /// Message reported when nothing matches
    pub not_found: String,
}

/// Entity a primary request is addressed to
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Id(String),
    Lookup(Lookup),
}
