pub mod auth;
pub mod client;
pub mod digest;
pub mod errors;
pub mod request;
pub mod token;
pub mod urls;

pub use client::M365Client;
pub use errors::ErrorEnvelope;
pub use request::{IdExtractor, Lookup, ResolvedRequest, Resource, Target};

/// Microsoft Graph v1.0 endpoint
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
/// Resource identifier Graph tokens are issued for
pub const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";
/// Azure AD authority
pub const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

// PnP Management Shell multi-tenant app
pub const DEFAULT_CLIENT_ID: &str = "31359c7f-bd7e-475c-86db-fdb8c937548e";

/// Static bearer token used for every resource, bypassing the session
pub const ACCESS_TOKEN_ENV: &str = "M365_ACCESS_TOKEN";

pub const ODATA_NOMETADATA: &str = "application/json;odata=nometadata";
