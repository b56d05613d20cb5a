//! Disk-backed access token cache
//!
//! The cache is a single file holding the raw token. Its modification time
//! doubles as the issue time, so nothing else needs to be stored and a token
//! survives process restarts.

use super::types::Credential;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const ACCESS_TOKEN_FILE: &str = "access_token";

/// File-based store for the access token
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Create a cache storing its token file in `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(ACCESS_TOKEN_FILE),
        }
    }

    /// Create a cache in the per-user cache directory for `integration`
    pub fn for_integration(integration: &str) -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| Error::config("Could not determine user cache directory"))?;
        Ok(Self::new(base.join(integration)))
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached credential, if any
    ///
    /// An mtime in the future (clock skew) is taken as "issued now".
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let token = std::fs::read_to_string(&self.path)?;
        if token.is_empty() {
            return Ok(None);
        }

        let issued_at = self.modified()?.min(Utc::now());
        Ok(Some(Credential::new(token, issued_at)))
    }

    /// Write `token`, returning the credential stamped with the write time
    pub fn save(&self, token: &str) -> Result<Credential> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, token)?;

        let issued_at = self.modified()?;
        Ok(Credential::new(token, issued_at))
    }

    fn modified(&self) -> Result<DateTime<Utc>> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_load_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        std::fs::write(cache.path(), "").unwrap();
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        let before = Utc::now() - Duration::seconds(2);
        let saved = cache.save("abc123").unwrap();
        let after = Utc::now() + Duration::seconds(2);

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.token, "abc123");
        assert_eq!(loaded.issued_at, saved.issued_at);
        assert!(loaded.issued_at >= before && loaded.issued_at <= after);
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("tap"));
        cache.save("token").unwrap();
        assert!(cache.path().exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        cache.save("first").unwrap();
        cache.save("second").unwrap();
        assert_eq!(cache.load().unwrap().unwrap().token, "second");
    }

    #[test]
    fn test_future_mtime_is_clamped_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        cache.save("skewed").unwrap();

        let future = std::time::SystemTime::now() + std::time::Duration::from_secs(90 * 24 * 3600);
        std::fs::File::options()
            .write(true)
            .open(cache.path())
            .unwrap()
            .set_modified(future)
            .unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert!(loaded.issued_at <= Utc::now());
        assert!(loaded.is_valid());
        assert!(!loaded.is_valid_at(Utc::now() + Duration::days(31)));
    }
}
