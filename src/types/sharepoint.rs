use serde::{Deserialize, Serialize};

/// Response of `_api/contextinfo` (odata=nometadata)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextInfo {
    pub form_digest_value: String,
    pub form_digest_timeout_seconds: u64,
    pub web_full_url: Option<String>,
}

/// Web properties updated by `spo web set`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_launch_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_layout: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_emphasis: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mega_menu_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_audience_targeting_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_scope: Option<u8>,
}

/// Root folder properties
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootFolderUpdate {
    pub welcome_page: String,
}
