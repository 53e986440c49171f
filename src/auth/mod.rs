//! Access tokens for the publisher API.
//!
//! Three credential sources are supported:
//! - a pre-issued bearer token, used as is;
//! - a service-account JSON key, exchanged for a token with a signed JWT;
//! - a legacy PKCS#12 key plus service-account email, decoded with the
//!   system `openssl` and then exchanged the same way.
//!
//! Key files may be local (`file://` prefix or a bare path) or remote
//! (`http://`/`https://`), in which case they are downloaded once into the
//! system temp directory.

use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::PublishError;

/// OAuth scope granting access to the Android Publisher API.
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const P12_PASSPHRASE: &str = "pass:notasecret";
const DOWNLOAD_DIR: &str = "play-publish";

/// Where a key file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation {
    Local(PathBuf),
    Remote(String),
}

impl KeyLocation {
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if let Some(path) = location.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else if location.starts_with("http://") || location.starts_with("https://") {
            Self::Remote(location.to_string())
        } else {
            Self::Local(PathBuf::from(location))
        }
    }

    /// Local path of the key, downloading it first if needed.
    async fn fetch(&self, http: &Client, file_name: &str) -> Result<PathBuf, PublishError> {
        match self {
            Self::Local(path) => Ok(path.clone()),
            Self::Remote(url) => {
                let dir = std::env::temp_dir().join(DOWNLOAD_DIR);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(PublishError::io(&dir))?;
                let target = dir.join(file_name);
                download_file(http, url, &target).await?;
                Ok(target)
            }
        }
    }
}

/// Credential source for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessToken(String),
    ServiceAccountJson(KeyLocation),
    LegacyP12 { key: KeyLocation, email: String },
}

impl Credentials {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::AccessToken(_) => "access token",
            Self::ServiceAccountJson(_) => "service account JSON key",
            Self::LegacyP12 { .. } => "service account P12 key",
        }
    }
}

/// The fields of a service-account JSON key this tool needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(bytes: &[u8]) -> Result<Self, PublishError> {
        serde_json::from_slice(bytes).map_err(|e| {
            PublishError::Authentication(format!("invalid service account key: {}", e))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Turns [`Credentials`] into a bearer token.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    http: Client,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_token(&self, credentials: &Credentials) -> Result<String, PublishError> {
        tracing::info!("Authenticating with {}", credentials.describe());
        match credentials {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccountJson(location) => {
                let path = location.fetch(&self.http, "key.json").await?;
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(PublishError::io(&path))?;
                let key = ServiceAccountKey::from_json(&bytes)?;
                self.exchange(&key).await
            }
            Credentials::LegacyP12 { key, email } => {
                let path = key.fetch(&self.http, "key.p12").await?;
                let private_key = decode_p12(&path).await?;
                let key = ServiceAccountKey {
                    client_email: email.clone(),
                    private_key,
                    private_key_id: None,
                    token_uri: DEFAULT_TOKEN_URI.to_string(),
                };
                self.exchange(&key).await
            }
        }
    }

    /// Exchange a signed assertion for an access token at the key's token URI.
    pub async fn exchange(&self, key: &ServiceAccountKey) -> Result<String, PublishError> {
        let now = chrono::Utc::now().timestamp();
        let assertion = sign_assertion(key, now)?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PublishError::Authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PublishError::Authentication(format!("invalid token response: {}", e))
        })?;
        tracing::debug!(expires_in = ?token.expires_in, "Access token issued");
        Ok(token.access_token)
    }
}

/// Sign the RS256 JWT assertion for the service account, valid for one hour from `now`.
pub fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, PublishError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: ANDROID_PUBLISHER_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| PublishError::Authentication(format!("invalid private key: {}", e)))?;

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| PublishError::Authentication(format!("failed to sign assertion: {}", e)))
}

async fn download_file(http: &Client, url: &str, target: &Path) -> Result<(), PublishError> {
    tracing::debug!("Downloading key file to {}", target.display());
    let download_err =
        |e: reqwest::Error| PublishError::Authentication(format!("failed to download key file: {}", e));

    let response = http.get(url).send().await.map_err(download_err)?;
    let response = response.error_for_status().map_err(download_err)?;
    let bytes = response.bytes().await.map_err(download_err)?;

    tokio::fs::write(target, &bytes)
        .await
        .map_err(PublishError::io(target))
}

/// Decode a PKCS#12 key into a PEM private key using the system `openssl`.
///
/// OpenSSL 3 rejects the legacy ciphers older keys were written with unless
/// `-legacy` is passed, so that is tried when the plain invocation fails.
async fn decode_p12(path: &Path) -> Result<String, PublishError> {
    let mut last_error = String::new();
    for legacy in [false, true] {
        let mut cmd = Command::new("openssl");
        cmd.arg("pkcs12");
        if legacy {
            cmd.arg("-legacy");
        }
        cmd.arg("-in")
            .arg(path)
            .args(["-passin", P12_PASSPHRASE, "-nodes", "-nocerts"]);

        let output = cmd
            .output()
            .await
            .map_err(|e| PublishError::Authentication(format!("failed to run openssl: {}", e)))?;

        if output.status.success() {
            let text = String::from_utf8_lossy(&output.stdout);
            return extract_pem_private_key(&text).ok_or_else(|| {
                PublishError::Authentication("no private key found in P12 file".to_string())
            });
        }
        last_error = String::from_utf8_lossy(&output.stderr).trim().to_string();
    }

    Err(PublishError::Authentication(format!(
        "failed to decode P12 key: {}",
        last_error
    )))
}

/// Pull the first PEM private-key block out of `openssl` output, dropping
/// the bag attributes printed around it.
pub fn extract_pem_private_key(text: &str) -> Option<String> {
    let begin = text.find("-----BEGIN ")?;
    let rest = &text[begin..];
    let header_end = rest.find('\n')?;
    let label = rest[..header_end]
        .trim()
        .strip_prefix("-----BEGIN ")?
        .strip_suffix("-----")?;
    if !label.ends_with("PRIVATE KEY") {
        return None;
    }

    let footer = format!("-----END {}-----", label);
    let end = rest.find(&footer)? + footer.len();
    Some(format!("{}\n", &rest[..end]))
}
