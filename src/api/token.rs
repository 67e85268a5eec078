//! Read claims from JWT access tokens. Signatures are not verified; the
//! claims are only used for display and for picking the right error early.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Decode the payload segment of a JWT
pub fn claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Signed-in user (or app) the token was issued to
pub fn user_name(token: &str) -> Option<String> {
    let claims = claims(token)?;
    ["upn", "unique_name", "preferred_username", "app_displayname"]
        .iter()
        .find_map(|claim| claims.get(*claim).and_then(Value::as_str))
        .map(str::to_string)
}

pub fn tenant_id(token: &str) -> Option<String> {
    claims(token)?
        .get("tid")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// True when the token carries application roles and no delegated scopes
pub fn is_application_only(token: &str) -> bool {
    match claims(token) {
        Some(claims) => claims.get("scp").is_none() && claims.get("roles").is_some(),
        None => false,
    }
}

#[cfg(test)]
pub(crate) fn fake_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_delegated_claims() {
        let token = fake_jwt(&json!({
            "upn": "admin@contoso.com",
            "tid": "9b1b1e42-794b-4c71-93ac-5ed92488b67f",
            "scp": "Tasks.ReadWrite"
        }));
        assert_eq!(user_name(&token).as_deref(), Some("admin@contoso.com"));
        assert_eq!(
            tenant_id(&token).as_deref(),
            Some("9b1b1e42-794b-4c71-93ac-5ed92488b67f")
        );
        assert!(!is_application_only(&token));
    }

    #[test]
    fn detects_application_tokens() {
        let token = fake_jwt(&json!({
            "app_displayname": "Contoso automation",
            "roles": ["Tasks.ReadWrite.All"]
        }));
        assert!(is_application_only(&token));
        assert_eq!(user_name(&token).as_deref(), Some("Contoso automation"));
    }

    #[test]
    fn opaque_tokens_have_no_claims() {
        assert!(claims("test-token").is_none());
        assert!(!is_application_only("test-token"));
    }
}
