use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use reqwest::Url;

static GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[{(]?[0-9a-fA-F]{8}-?(?:[0-9a-fA-F]{4}-?){3}[0-9a-fA-F]{12}[)}]?$")
        .expect("valid GUID pattern")
});

static UPN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+$")
        .expect("valid UPN pattern")
});

pub fn is_guid(value: &str) -> bool {
    GUID.is_match(value)
}

/// Absolute URL with the `https` scheme and a host
pub fn is_https_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => url.scheme() == "https" && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

pub fn is_upn(value: &str) -> bool {
    UPN.is_match(value)
}

/// ISO 8601 date (`2023-01-01`) or date-time, with or without offset
pub fn is_iso_date_time(value: &str) -> bool {
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }
    if ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
    {
        return true;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_shapes() {
        assert!(is_guid("0cd891ef-afce-4e55-b836-fce03286cccf"));
        assert!(is_guid("{0CD891EF-AFCE-4E55-B836-FCE03286CCCF}"));
        assert!(!is_guid("invalid"));
        assert!(!is_guid("0cd891ef-afce-4e55-b836-fce03286ccc"));
    }

    #[test]
    fn https_urls_only() {
        assert!(is_https_url("https://contoso.sharepoint.com/sites/team-a"));
        assert!(is_https_url("https://contoso.sharepoint.com"));
        assert!(!is_https_url("abc"));
        assert!(!is_https_url("http://contoso.sharepoint.com"));
        assert!(!is_https_url("/sites/team-a"));
    }

    #[test]
    fn user_principal_names() {
        assert!(is_upn("admin@contoso.com"));
        assert!(is_upn("john.doe+tasks@contoso.onmicrosoft.com"));
        assert!(!is_upn("no-an-email"));
        assert!(!is_upn("admin@localhost"));
    }

    #[test]
    fn iso_dates_and_date_times() {
        assert!(is_iso_date_time("2023-01-01"));
        assert!(is_iso_date_time("2023-01-01T12:00:00"));
        assert!(is_iso_date_time("2023-01-01T12:00:00.123"));
        assert!(is_iso_date_time("2023-01-01T12:00:00Z"));
        assert!(is_iso_date_time("2023-01-01T12:00:00+02:00"));
        assert!(!is_iso_date_time("01/01/2022"));
        assert!(!is_iso_date_time("2023-13-01"));
    }
}
