//! HTTP client for the Google Play Android Publisher API.
//!
//! The publishing workflow talks to the backend through the [`EditsApi`]
//! trait; [`PublisherClient`] is the reqwest implementation. Endpoints can
//! be redirected for local testing:
//! - `PLAY_PUBLISH_API_URL` - Base URL for resource calls
//! - `PLAY_PUBLISH_UPLOAD_URL` - Base URL for media uploads

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::*;

/// Default base URL for edit and track resources.
pub const DEFAULT_API_URL: &str =
    "https://androidpublisher.googleapis.com/androidpublisher/v3/applications";

/// Default base URL for media uploads.
pub const DEFAULT_UPLOAD_URL: &str =
    "https://androidpublisher.googleapis.com/upload/androidpublisher/v3/applications";

const OCTET_STREAM: &str = "application/octet-stream";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: access token missing or expired")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Remote operations scoped to an edit.
///
/// Each call maps to exactly one request. Nothing here retries; a failed
/// call is reported once and the caller decides what to do.
#[async_trait]
pub trait EditsApi: Send + Sync {
    /// Open a new edit for the package.
    async fn insert_edit(&self, package_name: &str) -> Result<AppEdit, ClientError>;

    /// Upload an APK or bundle and return the version code the backend assigned.
    async fn upload_binary(
        &self,
        package_name: &str,
        edit_id: &str,
        kind: ArtifactKind,
        contents: Vec<u8>,
    ) -> Result<UploadedBinary, ClientError>;

    async fn upload_expansion_file(
        &self,
        package_name: &str,
        edit_id: &str,
        version_code: i64,
        file_type: ExpansionFileType,
        contents: Vec<u8>,
    ) -> Result<(), ClientError>;

    /// Upload a ProGuard deobfuscation map for a version code.
    async fn upload_deobfuscation_file(
        &self,
        package_name: &str,
        edit_id: &str,
        version_code: i64,
        contents: Vec<u8>,
    ) -> Result<(), ClientError>;

    async fn list_tracks(&self, package_name: &str, edit_id: &str)
        -> Result<Vec<Track>, ClientError>;

    /// Partially update a track. An empty response body is accepted.
    async fn patch_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &Track,
    ) -> Result<(), ClientError>;

    /// Replace a track's releases.
    async fn update_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &Track,
    ) -> Result<Track, ClientError>;

    async fn commit_edit(&self, package_name: &str, edit_id: &str)
        -> Result<AppEdit, ClientError>;
}

/// HTTP client for the Android Publisher API.
#[derive(Debug, Clone)]
pub struct PublisherClient {
    api_url: String,
    upload_url: String,
    access_token: Option<String>,
    client: Client,
}

impl PublisherClient {
    /// Create a client against the public endpoints.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_urls(DEFAULT_API_URL, DEFAULT_UPLOAD_URL, Some(access_token.into()))
    }

    /// Create with explicit configuration.
    pub fn with_urls(
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            access_token,
            client: Client::new(),
        }
    }

    /// Build a request with optional auth header.
    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn edit_url(&self, package_name: &str, edit_id: &str) -> String {
        format!("{}/{}/edits/{}", self.api_url, package_name, edit_id)
    }

    fn upload_edit_url(&self, package_name: &str, edit_id: &str) -> String {
        format!("{}/{}/edits/{}", self.upload_url, package_name, edit_id)
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::status_error(status, response).await)
        }
    }

    /// Handle response whose body is not needed (and may be empty).
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, response).await)
        }
    }

    async fn status_error(status: StatusCode, response: reqwest::Response) -> ClientError {
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(body),
            _ => ClientError::Server(format!("{}: {}", status, body)),
        }
    }

    async fn upload_media(
        &self,
        url: String,
        content_type: &str,
        contents: Vec<u8>,
    ) -> Result<reqwest::Response, ClientError> {
        let response = self
            .request(reqwest::Method::POST, url)
            .query(&[("uploadType", "media")])
            .header(CONTENT_TYPE, content_type)
            .body(contents)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl EditsApi for PublisherClient {
    // ============================================================
    // Edit Operations
    // ============================================================

    async fn insert_edit(&self, package_name: &str) -> Result<AppEdit, ClientError> {
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/{}/edits", self.api_url, package_name),
            )
            .json(&serde_json::json!({}))
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn commit_edit(
        &self,
        package_name: &str,
        edit_id: &str,
    ) -> Result<AppEdit, ClientError> {
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}:commit", self.edit_url(package_name, edit_id)),
            )
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ============================================================
    // Upload Operations
    // ============================================================

    async fn upload_binary(
        &self,
        package_name: &str,
        edit_id: &str,
        kind: ArtifactKind,
        contents: Vec<u8>,
    ) -> Result<UploadedBinary, ClientError> {
        let url = format!(
            "{}/{}",
            self.upload_edit_url(package_name, edit_id),
            kind.endpoint()
        );
        let response = self.upload_media(url, kind.content_type(), contents).await?;
        self.handle_response(response).await
    }

    async fn upload_expansion_file(
        &self,
        package_name: &str,
        edit_id: &str,
        version_code: i64,
        file_type: ExpansionFileType,
        contents: Vec<u8>,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/apks/{}/expansionFiles/{}",
            self.upload_edit_url(package_name, edit_id),
            version_code,
            file_type.as_str()
        );
        let response = self.upload_media(url, OCTET_STREAM, contents).await?;
        self.handle_empty_response(response).await
    }

    async fn upload_deobfuscation_file(
        &self,
        package_name: &str,
        edit_id: &str,
        version_code: i64,
        contents: Vec<u8>,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/apks/{}/deobfuscationFiles/proguard",
            self.upload_edit_url(package_name, edit_id),
            version_code
        );
        let response = self.upload_media(url, OCTET_STREAM, contents).await?;
        self.handle_empty_response(response).await
    }

    // ============================================================
    // Track Operations
    // ============================================================

    async fn list_tracks(
        &self,
        package_name: &str,
        edit_id: &str,
    ) -> Result<Vec<Track>, ClientError> {
        let response = self
            .request(
                reqwest::Method::GET,
                format!("{}/tracks", self.edit_url(package_name, edit_id)),
            )
            .send()
            .await?;
        let list: TracksListResponse = self.handle_response(response).await?;
        Ok(list.tracks)
    }

    async fn patch_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &Track,
    ) -> Result<(), ClientError> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                format!("{}/tracks/{}", self.edit_url(package_name, edit_id), track.track),
            )
            .json(track)
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn update_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &Track,
    ) -> Result<Track, ClientError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                format!("{}/tracks/{}", self.edit_url(package_name, edit_id), track.track),
            )
            .json(track)
            .send()
            .await?;
        self.handle_response(response).await
    }
}
