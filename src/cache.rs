use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::config::Config;

/// Cache manager for session and token files
#[derive(Debug, Clone)]
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a cache manager in the configured cache directory
    pub fn new() -> Result<Self> {
        Self::at(Config::cache_dir()?)
    }

    /// Create a cache manager rooted at `cache_dir`
    pub fn at(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;
        Ok(Self { cache_dir })
    }

    /// Get the path for a cache file
    fn file_path(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Save data to cache, replacing the file atomically
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data).context("Failed to serialize data")?;

        let mut file = NamedTempFile::new_in(&self.cache_dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", self.cache_dir))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write cache file: {:?}", path))?;
        file.persist(&path)
            .with_context(|| format!("Failed to write cache file: {:?}", path))?;
        Ok(())
    }

    /// Load data from cache
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {:?}", path))?;
        let data = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {:?}", path))?;
        Ok(Some(data))
    }

    /// Delete a cache file
    pub fn delete(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete cache file: {:?}", path))?;
        }
        Ok(())
    }
}

/// Session file name
pub const SESSION_FILE: &str = "session.json";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path().join("nested")).unwrap();

        assert_eq!(cache.load::<BTreeMap<String, u32>>("x.json").unwrap(), None);

        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);
        cache.save("x.json", &data).unwrap();
        assert_eq!(cache.load::<BTreeMap<String, u32>>("x.json").unwrap(), Some(data));

        cache.delete("x.json").unwrap();
        cache.delete("x.json").unwrap();
        assert!(!dir.path().join("nested/x.json").exists());
    }
}
