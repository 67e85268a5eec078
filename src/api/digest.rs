use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Refresh digests this long before SharePoint expires them
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// SharePoint anti-forgery token for one web
#[derive(Debug, Clone)]
pub struct FormDigest {
    pub value: String,
    pub expires_at: Instant,
}

impl FormDigest {
    pub fn new(value: String, timeout_seconds: u64) -> Self {
        let lifetime = Duration::from_secs(timeout_seconds).saturating_sub(EXPIRY_MARGIN);
        Self {
            value,
            expires_at: Instant::now() + lifetime,
        }
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Form digests keyed by web URL
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: Mutex<HashMap<String, FormDigest>>,
}

impl DigestCache {
    fn key(web_url: &str) -> String {
        web_url.trim_end_matches('/').to_ascii_lowercase()
    }

    /// Unexpired digest for `web_url`
    pub fn get(&self, web_url: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&Self::key(web_url))
            .filter(|digest| digest.is_valid())
            .map(|digest| digest.value.clone())
    }

    pub fn insert(&self, web_url: &str, digest: FormDigest) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(Self::key(web_url), digest);
    }
}
