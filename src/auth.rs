//! Google implicit-grant authentication
//!
//! Builds the consent URL, reads the access token back out of the redirect
//! fragment and persists it with an absolute expiry. Expired tokens are
//! discarded when read.

use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::providers::ProviderError;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Full drive access plus basic profile information
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Token as returned in the redirect fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    pub token_type: String,
    pub scope: String,
}

/// Consent URL for the implicit grant (`response_type=token`)
pub fn authorization_url(client_id: &str, redirect_uri: &str) -> Result<String, ProviderError> {
    let scope = SCOPES.join(" ");
    let url = url::Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("access_type", "online"),
            ("response_type", "token"),
            ("scope", scope.as_str()),
            ("include_granted_scopes", "true"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| ProviderError::InvalidConfig(format!("Invalid auth URL: {}", e)))?;
    Ok(url.into())
}

/// Parse the token out of a redirect fragment.
///
/// Accepts the bare fragment (with or without `#`) or the whole redirect URL.
/// Returns `None` when there is no `access_token`.
pub fn parse_token_fragment(input: &str) -> Option<AuthToken> {
    let fragment = match input.split_once('#') {
        Some((_, fragment)) => fragment,
        None => input,
    };

    let mut access_token = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut scope = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse().ok(),
            "token_type" => token_type = Some(value.into_owned()),
            "scope" => scope = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(AuthToken {
        access_token: access_token.filter(|t| !t.is_empty())?,
        expires_in: expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
        scope: scope.unwrap_or_default(),
    })
}

/// Persisted token with absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    /// Unix time in milliseconds
    pub expires_at: i64,
}

impl StoredToken {
    pub fn from_auth(token: &AuthToken) -> Self {
        Self {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            scope: token.scope.clone(),
            expires_at: Utc::now().timestamp_millis() + (token.expires_in as i64) * 1000,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at
    }

    pub fn secret(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }
}

/// File-backed token storage
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/finderdrive/token.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("finderdrive")
            .join("token.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored token, unless missing, unreadable or expired
    pub fn load(&self) -> Option<StoredToken> {
        let json = std::fs::read_to_string(&self.path).ok()?;
        let token: StoredToken = match serde_json::from_str(&json) {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring unreadable token file {:?}: {}", self.path, e);
                return None;
            }
        };
        if token.is_expired() {
            info!("Stored token expired, removing it");
            let _ = std::fs::remove_file(&self.path);
            return None;
        }
        Some(token)
    }

    pub fn save(&self, token: &StoredToken) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| ProviderError::Other(format!("Failed to serialize token: {}", e)))?;
        std::fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600));
        }
        info!("Token stored at {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ProviderError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let url = authorization_url("test-client-id", "http://localhost:5173").unwrap();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("response_type=token"));
        assert!(url.contains("scope="));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn test_parse_fragment() {
        let token = parse_token_fragment(
            "#access_token=ya29.test&token_type=Bearer&expires_in=3600&scope=https://www.googleapis.com/auth/drive",
        )
        .unwrap();
        assert_eq!(
            token,
            AuthToken {
                access_token: "ya29.test".to_string(),
                expires_in: 3600,
                token_type: "Bearer".to_string(),
                scope: "https://www.googleapis.com/auth/drive".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fragment_defaults_and_full_url() {
        let token = parse_token_fragment("http://localhost:5173/#access_token=abc").unwrap();
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scope, "");
    }

    #[test]
    fn test_parse_fragment_without_token() {
        assert_eq!(parse_token_fragment("#other_param=123"), None);
        assert_eq!(parse_token_fragment("#access_token="), None);
    }

    #[test]
    fn test_token_store_roundtrip_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load(), None);

        let token = StoredToken::from_auth(&parse_token_fragment("access_token=abc&expires_in=60").unwrap());
        store.save(&token).unwrap();
        assert_eq!(store.load(), Some(token.clone()));

        let expired = StoredToken { expires_at: Utc::now().timestamp_millis() - 1, ..token };
        store.save(&expired).unwrap();
        assert_eq!(store.load(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_token_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.clear().unwrap();
        let token = StoredToken::from_auth(&parse_token_fragment("access_token=abc").unwrap());
        store.save(&token).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }
}
