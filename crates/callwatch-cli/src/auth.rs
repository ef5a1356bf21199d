//! Access token storage.
//!
//! The token is read from `CALLWATCH_TOKEN` if set, otherwise from the
//! configured token file. A missing or empty token is not an error: the
//! call is still shown, just without live updates.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::config::AuthConfig;

/// Environment variable that takes precedence over the token file.
pub const TOKEN_ENV: &str = "CALLWATCH_TOKEN";

/// Where the access token lives.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    env_token: Option<String>,
}

impl TokenStore {
    /// Store backed by `path` only.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_token: None,
        }
    }

    /// Store described by the configuration, honouring `CALLWATCH_TOKEN`.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Self {
        let store = Self::new(shellexpand::tilde(&auth.token_file).into_owned());
        match std::env::var(TOKEN_ENV) {
            Ok(token) => store.with_token(token),
            Err(_) => store,
        }
    }

    /// Override the file with an explicit token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.env_token = Some(token.into());
        self
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file exists but cannot be read.
    pub fn load(&self) -> Result<Option<String>> {
        if let Some(token) = self.env_token.as_deref().and_then(non_empty) {
            debug!("Using token from {}", TOKEN_ENV);
            return Ok(Some(token));
        }

        if !self.path.exists() {
            debug!(path = %self.path.display(), "No token file");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        Ok(non_empty(&contents))
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("callwatch-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_means_no_token() {
        let store = TokenStore::new(temp_path("absent"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_token_is_trimmed() {
        let path = temp_path("token");
        std::fs::write(&path, "  tok\n").unwrap();

        let store = TokenStore::new(&path);
        assert_eq!(store.load().unwrap().as_deref(), Some("tok"));

        std::fs::write(&path, "\n").unwrap();
        assert_eq!(store.load().unwrap(), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_explicit_token_wins() {
        let path = temp_path("shadowed");
        std::fs::write(&path, "from-file").unwrap();

        let store = TokenStore::new(&path).with_token("from-env");
        assert_eq!(store.load().unwrap().as_deref(), Some("from-env"));

        let store = TokenStore::new(&path).with_token("   ");
        assert_eq!(store.load().unwrap().as_deref(), Some("from-file"));

        let _ = std::fs::remove_file(&path);
    }
}
