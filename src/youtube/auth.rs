//! Credential acquisition for the YouTube Data API.
//!
//! Credentials are acquired fresh for every fetch; providers that talk to a
//! real identity service are expected to do their own caching.

use async_trait::async_trait;
use std::fmt;

use crate::error::AuthError;

/// Read-only scope every request needs.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// A bearer token plus the scopes it was granted for.
#[derive(Clone, Default)]
pub struct Credential {
  pub token: Option<String>,
  pub granted_scopes: Vec<String>,
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credential")
      .field("token", &self.token.as_ref().map(|_| "<redacted>"))
      .field("granted_scopes", &self.granted_scopes)
      .finish()
  }
}

impl Credential {
  pub fn new(token: impl Into<String>, granted_scopes: Vec<String>) -> Self {
    Self {
      token: Some(token.into()),
      granted_scopes,
    }
  }

  /// Return the token if it is present and carries `scope`.
  pub fn authorize(&self, scope: &str) -> Result<&str, AuthError> {
    let token = self
      .token
      .as_deref()
      .filter(|t| !t.is_empty())
      .ok_or(AuthError::MissingToken)?;

    if !self.granted_scopes.iter().any(|s| s == scope) {
      return Err(AuthError::MissingScope {
        required: scope.to_string(),
      });
    }

    Ok(token)
  }
}

/// Source of credentials for API requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
  /// Obtain a credential. `interactive` allows the provider to prompt the
  /// user if it needs to.
  async fn acquire(&self, interactive: bool) -> Result<Credential, AuthError>;
}

/// Fixed credential, useful for scripting and tests.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
  credential: Credential,
}

impl StaticCredentials {
  pub fn new(credential: Credential) -> Self {
    Self { credential }
  }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
  async fn acquire(&self, _interactive: bool) -> Result<Credential, AuthError> {
    Ok(self.credential.clone())
  }
}

/// Reads the access token from the environment on every acquisition.
///
/// Checks `VIDMETA_TOKEN` first, then `YOUTUBE_OAUTH_TOKEN` as fallback. The
/// granted scopes come from configuration since a bare token does not carry
/// them.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
  granted_scopes: Vec<String>,
}

impl EnvCredentials {
  pub const TOKEN_VARS: [&'static str; 2] = ["VIDMETA_TOKEN", "YOUTUBE_OAUTH_TOKEN"];

  pub fn new(granted_scopes: Vec<String>) -> Self {
    Self { granted_scopes }
  }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
  async fn acquire(&self, _interactive: bool) -> Result<Credential, AuthError> {
    let token = Self::TOKEN_VARS
      .iter()
      .find_map(|var| std::env::var(var).ok())
      .filter(|t| !t.is_empty());

    Ok(Credential {
      token,
      granted_scopes: self.granted_scopes.clone(),
    })
  }
}
