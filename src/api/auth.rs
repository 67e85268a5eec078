use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::normalize_response;
use super::urls;
use crate::config::Config;
use crate::types::{DeviceCodeInfo, TokenResponse};

/// Scopes requested at login; the refresh token is later exchanged for
/// tokens of other resources
pub const LOGIN_SCOPE: &str = "https://graph.microsoft.com/.default offline_access openid profile";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Azure AD authority and the app signing in through it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub login_url: String,
    pub tenant: String,
    pub client_id: String,
}

impl Authority {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.api.login_url.clone(),
            tenant: config.auth.tenant.clone(),
            client_id: config.auth.client_id.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        urls::join(&self.login_url, &format!("{}/oauth2/v2.0/{}", self.tenant, path))
    }
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

async fn post_form(
    http: &Client,
    url: &str,
    pairs: &[(&str, &str)],
) -> Result<(reqwest::StatusCode, String)> {
    let res = http
        .post(url)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(form_body(pairs))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;
    let status = res.status();
    let body = res.text().await?;
    Ok((status, body))
}

fn parse<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| format!("Failed to parse {} response", what))
}

/// Start the device code flow
pub async fn gen_device_code(http: &Client, authority: &Authority) -> Result<DeviceCodeInfo> {
    let url = authority.endpoint("devicecode");
    let (status, body) = post_form(
        http,
        &url,
        &[("client_id", authority.client_id.as_str()), ("scope", LOGIN_SCOPE)],
    )
    .await?;

    if status.is_success() {
        parse(&body, "device code")
    } else {
        let envelope = normalize_response(status.as_u16(), status.canonical_reason(), &body);
        Err(anyhow!("Failed to generate device code: {}", envelope.message))
    }
}

/// Poll once for the tokens of an authorized device code.
///
/// Returns `None` while the user has not finished signing in.
pub async fn poll_device_code(
    http: &Client,
    authority: &Authority,
    device_code: &str,
) -> Result<Option<TokenResponse>> {
    let url = authority.endpoint("token");
    let (status, body) = post_form(
        http,
        &url,
        &[
            ("client_id", authority.client_id.as_str()),
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", device_code),
        ],
    )
    .await?;

    if status.is_success() {
        return parse(&body, "token").map(Some);
    }

    let pending = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
    match pending.as_deref() {
        Some("authorization_pending") | Some("slow_down") => Ok(None),
        _ => {
            let envelope = normalize_response(status.as_u16(), status.canonical_reason(), &body);
            Err(anyhow!("Login failed: {}", envelope.message))
        }
    }
}

/// Exchange a refresh token for an access token for `scope`
pub async fn gen_token(
    http: &Client,
    authority: &Authority,
    refresh_token: &str,
    scope: &str,
) -> Result<TokenResponse> {
    let url = authority.endpoint("token");
    let full_scope = format!("{} offline_access", scope);
    let (status, body) = post_form(
        http,
        &url,
        &[
            ("client_id", authority.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", full_scope.as_str()),
        ],
    )
    .await?;

    if status.is_success() {
        parse(&body, "token")
    } else {
        let envelope = normalize_response(status.as_u16(), status.canonical_reason(), &body);
        Err(anyhow!(
            "Failed to get a token for {}: {}",
            scope,
            envelope.message
        ))
    }
}
