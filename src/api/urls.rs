use reqwest::Url;

use crate::error::{CommandError, CommandResult};

/// Encode a value for embedding inside an OData string literal (`'...'`).
///
/// Percent-encodes like `encodeURIComponent` and doubles single quotes,
/// which OData uses as the escape for a quote inside a literal.
pub fn encode_query_parameter(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%27", "''")
}

/// Join a base URL and a relative path with exactly one slash between them
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Origin (`scheme://host[:port]`) of an absolute URL
pub fn origin(url: &str) -> CommandResult<String> {
    let parsed = Url::parse(url)
        .map_err(|e| CommandError::validation(format!("{} is not a valid URL: {}", url, e)))?;
    Ok(parsed.origin().ascii_serialization())
}

/// Compute the server-relative path of a list or folder.
///
/// `path` may be absolute (`https://contoso.sharepoint.com/sites/a/Lists/x`),
/// server-relative (`/sites/a/Lists/x`) or web-relative (`Lists/x`).
pub fn server_relative_path(web_url: &str, path: &str) -> CommandResult<String> {
    let web = Url::parse(web_url)
        .map_err(|e| CommandError::validation(format!("{} is not a valid URL: {}", web_url, e)))?;
    let tenant = web.origin().ascii_serialization();
    let web_path = web.path().trim_end_matches('/');

    let mut relative = strip_prefix_ignore_case(path, &tenant).unwrap_or(path);
    if !web_path.is_empty() {
        if let Some(rest) = strip_prefix_ignore_case(relative, web_path) {
            if rest.is_empty() || rest.starts_with('/') {
                relative = rest;
            }
        }
    }

    let relative = relative.trim_end_matches('/');
    if relative.is_empty() {
        return Ok(if web_path.is_empty() {
            "/".to_string()
        } else {
            web_path.to_string()
        });
    }

    let separator = if relative.starts_with('/') { "" } else { "/" };
    Ok(format!("{}{}{}", web_path, separator, relative))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    value
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &value[prefix.len()..])
}
