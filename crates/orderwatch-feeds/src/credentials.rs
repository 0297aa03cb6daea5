//! Credentials presented to the spreadsheet API.
//!
//! Either a long-lived API key (public documents only) or an OAuth access
//! token obtained by exchanging the refresh token of an authorized-user file.
//! The interactive consent flow that produces that file is out of scope.

use std::{
  future::Future,
  path::Path,
  time::{Duration, Instant},
};

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Error, Result, http};

const SERVICE: &str = "token endpoint";

/// Default OAuth token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ─── Credential ──────────────────────────────────────────────────────────────

/// A key or token ready to be attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
  ApiKey(String),
  Bearer(String),
}

impl Credential {
  pub fn apply(self, req: RequestBuilder) -> RequestBuilder {
    match self {
      Self::ApiKey(key) => req.query(&[("key", key)]),
      Self::Bearer(token) => req.bearer_auth(token),
    }
  }
}

/// Anything that can hand out a [`Credential`] on demand.
pub trait CredentialProvider: Send + Sync {
  fn credential(&self) -> impl Future<Output = Result<Credential>> + Send + '_;
}

// ─── Authorized user ─────────────────────────────────────────────────────────

/// The authorized-user JSON file written by an OAuth consent flow.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserFile {
  pub client_id:     String,
  pub client_secret: String,
  pub refresh_token: String,
  #[serde(default = "default_token_uri")]
  pub token_uri:     String,
}

fn default_token_uri() -> String { GOOGLE_TOKEN_URI.to_owned() }

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default = "default_expires_in")]
  expires_in:   u64,
}

fn default_expires_in() -> u64 { 3600 }

struct CachedToken {
  access_token: String,
  expires_at:   Instant,
}

/// Exchanges a refresh token for access tokens and caches each one until
/// shortly before it expires.
pub struct AuthorizedUser {
  client: Client,
  file:   AuthorizedUserFile,
  cached: Mutex<Option<CachedToken>>,
}

impl AuthorizedUser {
  pub fn new(file: AuthorizedUserFile, timeout: Duration) -> Result<Self> {
    Ok(Self {
      client: http::client(SERVICE, timeout)?,
      file,
      cached: Mutex::new(None),
    })
  }

  /// Load an authorized-user JSON file from disk.
  pub fn from_file(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|e| Error::Credential(format!("cannot read {}: {e}", path.display())))?;
    let file: AuthorizedUserFile = serde_json::from_str(&text)
      .map_err(|e| Error::Credential(format!("cannot parse {}: {e}", path.display())))?;
    Self::new(file, timeout)
  }

  async fn access_token(&self) -> Result<String> {
    let mut cached = self.cached.lock().await;
    if let Some(token) = cached
      .as_ref()
      .filter(|t| t.expires_at > Instant::now() + EXPIRY_MARGIN)
    {
      return Ok(token.access_token.clone());
    }

    let resp = self
      .client
      .post(&self.file.token_uri)
      .form(&[
        ("grant_type", "refresh_token"),
        ("client_id", self.file.client_id.as_str()),
        ("client_secret", self.file.client_secret.as_str()),
        ("refresh_token", self.file.refresh_token.as_str()),
      ])
      .send()
      .await
      .map_err(|e| Error::unavailable(SERVICE, e))?;

    let status = resp.status();
    if status.is_client_error() {
      return Err(Error::Credential(format!("refresh token rejected ({status})")));
    }
    let token: TokenResponse = http::require_success(SERVICE, resp)?
      .json()
      .await
      .map_err(|e| Error::malformed(SERVICE, e))?;

    debug!(expires_in = token.expires_in, "refreshed access token");
    let access_token = token.access_token.clone();
    *cached = Some(CachedToken {
      access_token: token.access_token,
      expires_at:   Instant::now() + Duration::from_secs(token.expires_in),
    });
    Ok(access_token)
  }
}

impl CredentialProvider for AuthorizedUser {
  async fn credential(&self) -> Result<Credential> {
    Ok(Credential::Bearer(self.access_token().await?))
  }
}

// ─── Configured choice ───────────────────────────────────────────────────────

/// The credential source selected by configuration.
pub enum Credentials {
  ApiKey(String),
  AuthorizedUser(AuthorizedUser),
}

impl CredentialProvider for Credentials {
  async fn credential(&self) -> Result<Credential> {
    match self {
      Self::ApiKey(key) => Ok(Credential::ApiKey(key.clone())),
      Self::AuthorizedUser(user) => user.credential().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_string_contains, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn file_for(server: &MockServer) -> AuthorizedUserFile {
    AuthorizedUserFile {
      client_id:     "client".into(),
      client_secret: "secret".into(),
      refresh_token: "refresh-me".into(),
      token_uri:     format!("{}/token", server.uri()),
    }
  }

  #[tokio::test]
  async fn refreshes_once_and_caches_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/token"))
      .and(body_string_contains("grant_type=refresh_token"))
      .and(body_string_contains("refresh_token=refresh-me"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": "ya29.token",
        "expires_in": 3599,
        "token_type": "Bearer",
      })))
      .expect(1)
      .mount(&server)
      .await;

    let user = AuthorizedUser::new(file_for(&server), Duration::from_secs(5)).unwrap();
    assert_eq!(
      user.credential().await.unwrap(),
      Credential::Bearer("ya29.token".into())
    );
    assert_eq!(
      user.credential().await.unwrap(),
      Credential::Bearer("ya29.token".into())
    );
  }

  #[tokio::test]
  async fn near_expiry_tokens_are_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": "short-lived",
        "expires_in": 30,
      })))
      .expect(2)
      .mount(&server)
      .await;

    let user = AuthorizedUser::new(file_for(&server), Duration::from_secs(5)).unwrap();
    user.credential().await.unwrap();
    user.credential().await.unwrap();
  }

  #[tokio::test]
  async fn rejected_refresh_token_is_a_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
      .mount(&server)
      .await;

    let user = AuthorizedUser::new(file_for(&server), Duration::from_secs(5)).unwrap();
    assert!(matches!(user.credential().await, Err(Error::Credential(_))));
  }

  #[tokio::test]
  async fn loads_authorized_user_file_with_default_token_uri() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(
      &path,
      r#"{"client_id":"c","client_secret":"s","refresh_token":"r","type":"authorized_user"}"#,
    )
    .unwrap();

    let user = AuthorizedUser::from_file(&path, Duration::from_secs(5)).unwrap();
    assert_eq!(user.file.token_uri, GOOGLE_TOKEN_URI);
  }

  #[tokio::test]
  async fn missing_file_is_a_credential_error() {
    let result = AuthorizedUser::from_file("/nonexistent/token.json", Duration::from_secs(5));
    assert!(matches!(result, Err(Error::Credential(_))));
  }

  #[tokio::test]
  async fn api_key_is_passed_through() {
    let credentials = Credentials::ApiKey("AIza-key".into());
    assert_eq!(
      credentials.credential().await.unwrap(),
      Credential::ApiKey("AIza-key".into())
    );
  }
}
