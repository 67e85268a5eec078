use serde::Serialize;
use serde_json::Value;

/// Normalized error extracted from a vendor response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Known error body shapes, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorShape {
    /// `{"error": {"odata.error": {"message": {"value": ..}}}}`
    WrappedOData,
    /// `{"odata.error": {"message": {"value": ..}}}` as sent by SharePoint
    OData,
    /// `{"error": {"code": .., "message": ..}}` as sent by Graph
    Graph,
    /// `{"error": "invalid_grant", "error_description": ..}` from Azure AD
    AzureAd,
    /// `{"message": ..}`
    Message,
    /// `{"error": ".."}`
    PlainError,
}

const SHAPES: &[ErrorShape] = &[
    ErrorShape::WrappedOData,
    ErrorShape::OData,
    ErrorShape::Graph,
    ErrorShape::AzureAd,
    ErrorShape::Message,
    ErrorShape::PlainError,
];

impl ErrorShape {
    fn message_pointer(self) -> &'static str {
        match self {
            Self::WrappedOData => "/error/odata.error/message/value",
            Self::OData => "/odata.error/message/value",
            Self::Graph => "/error/message",
            Self::AzureAd => "/error_description",
            Self::Message => "/message",
            Self::PlainError => "/error",
        }
    }

    fn code_pointer(self) -> Option<&'static str> {
        match self {
            Self::WrappedOData => Some("/error/odata.error/code"),
            Self::OData => Some("/odata.error/code"),
            Self::Graph => Some("/error/code"),
            Self::AzureAd => Some("/error"),
            Self::Message => Some("/code"),
            Self::PlainError => None,
        }
    }

    fn extract(self, body: &Value) -> Option<ErrorEnvelope> {
        // JSON pointers treat '.' literally, so "odata.error" is one segment
        let message = body
            .pointer(self.message_pointer())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())?;

        let code = self
            .code_pointer()
            .and_then(|p| body.pointer(p))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(ErrorEnvelope {
            message: message.to_string(),
            code,
            status: None,
        })
    }
}

/// Normalize a vendor error body into an envelope.
///
/// Never fails: unrecognized shapes fall back to the raw string form.
pub fn normalize(body: &Value) -> ErrorEnvelope {
    SHAPES
        .iter()
        .find_map(|shape| shape.extract(body))
        .unwrap_or_else(|| ErrorEnvelope {
            message: fallback_message(body),
            code: None,
            status: None,
        })
}

/// Normalize a raw HTTP error response body
pub fn normalize_response(status: u16, reason: Option<&str>, body: &str) -> ErrorEnvelope {
    let trimmed = body.trim();
    let mut envelope = if trimmed.is_empty() {
        ErrorEnvelope {
            message: status_line(status, reason),
            code: None,
            status: None,
        }
    } else {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => normalize(&value),
            Err(_) => ErrorEnvelope {
                message: trimmed.to_string(),
                code: None,
                status: None,
            },
        }
    };

    if envelope.message.is_empty() {
        envelope.message = status_line(status, reason);
    }
    envelope.status = Some(status);
    envelope
}

fn fallback_message(body: &Value) -> String {
    match body {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Null => "An unknown error occurred".to_string(),
        other => other.to_string(),
    }
}

fn status_line(status: u16, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Request failed with status {} {}", status, reason),
        None => format!("Request failed with status {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_wrapped_odata_error() {
        let body = json!({
            "error": {
                "odata.error": {
                    "code": "-1, Microsoft.SharePoint.Client.ResourceNotFoundException",
                    "message": { "lang": "en-US", "value": "X" }
                }
            }
        });
        let envelope = normalize(&body);
        assert_eq!(envelope.message, "X");
        assert_eq!(
            envelope.code.as_deref(),
            Some("-1, Microsoft.SharePoint.Client.ResourceNotFoundException")
        );
    }

    #[test]
    fn unwraps_sharepoint_response_body() {
        let body = json!({
            "odata.error": {
                "code": "-1, Microsoft.SharePoint.Client.InvalidOperationException",
                "message": { "value": "request rejected" }
            }
        });
        assert_eq!(normalize(&body).message, "request rejected");
    }

    #[test]
    fn unwraps_graph_error() {
        let body = json!({
            "error": {
                "code": "UnknownError",
                "message": "An error has occurred",
                "innerError": { "request-id": "77e0ed26-8b57-48d6-a502-aca6211d6e7c" }
            }
        });
        let envelope = normalize(&body);
        assert_eq!(envelope.message, "An error has occurred");
        assert_eq!(envelope.code.as_deref(), Some("UnknownError"));
    }

    #[test]
    fn prefers_azure_ad_description_over_error_code() {
        let body = json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70008: The refresh token has expired"
        });
        let envelope = normalize(&body);
        assert_eq!(envelope.message, "AADSTS70008: The refresh token has expired");
        assert_eq!(envelope.code.as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn empty_graph_message_falls_through_to_next_shape() {
        let body = json!({ "error": { "code": "x", "message": "" }, "message": "outer" });
        assert_eq!(normalize(&body).message, "outer");
    }

    #[test]
    fn unrecognized_shape_falls_back_to_raw_form() {
        assert_eq!(normalize(&json!("Invalid request")).message, "Invalid request");
        assert_eq!(normalize(&json!({ "foo": 1 })).message, r#"{"foo":1}"#);
        assert!(!normalize(&Value::Null).message.is_empty());
    }

    #[test]
    fn response_without_body_uses_status_line() {
        let envelope = normalize_response(404, Some("Not Found"), "");
        assert_eq!(envelope.message, "Request failed with status 404 Not Found");
        assert_eq!(envelope.status, Some(404));
    }

    #[test]
    fn non_json_response_body_is_passed_through() {
        let envelope = normalize_response(502, None, "Bad gateway\n");
        assert_eq!(envelope.message, "Bad gateway");
    }
}
