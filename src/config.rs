//! Publishing configuration.
//!
//! Every option can be given on the command line or through the environment,
//! which is how build pipelines usually pass them. [`PublishConfig`] is built
//! once from the raw arguments, validated before any network call and then
//! passed explicitly to the components that need it.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::auth::{Credentials, KeyLocation};
use crate::client::{DEFAULT_API_URL, DEFAULT_UPLOAD_URL};
use crate::error::PublishError;
use crate::models::ExpansionFileSpec;
use crate::publish::tracks::ROLLOUT_TRACK;

/// Raw publishing options.
#[derive(Debug, Clone, Default, Args)]
pub struct PublishArgs {
    /// Application id, e.g. com.example.app
    #[arg(long, env = "PLAY_PACKAGE_NAME")]
    pub package_name: Option<String>,

    /// APK or AAB paths, separated by `|` or newlines
    #[arg(long, env = "PLAY_APP_PATH")]
    pub app_path: Option<String>,

    /// Target track (internal, alpha, beta, rollout, production, ...)
    #[arg(long, env = "PLAY_TRACK")]
    pub track: Option<String>,

    /// Staged rollout fraction in [0, 1]; 0 or unset means full rollout
    #[arg(long, env = "PLAY_USER_FRACTION")]
    pub user_fraction: Option<String>,

    /// Service account JSON key: local path, file:// URL or http(s) URL
    #[arg(long, env = "PLAY_SERVICE_ACCOUNT_JSON_KEY")]
    pub service_account_json_key: Option<String>,

    /// Legacy P12 key: local path, file:// URL or http(s) URL
    #[arg(long, env = "PLAY_KEY_FILE_PATH")]
    pub key_file_path: Option<String>,

    /// Service account email, required with --key-file-path
    #[arg(long, env = "PLAY_SERVICE_ACCOUNT_EMAIL")]
    pub service_account_email: Option<String>,

    /// Pre-issued OAuth access token
    #[arg(long, env = "PLAY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Expansion files as `main:<path>` or `patch:<path>`, one per app path, separated by `|`
    #[arg(long, env = "PLAY_EXPANSION_FILE_PATH")]
    pub expansion_file_path: Option<String>,

    /// ProGuard mapping file uploaded for every version code
    #[arg(long, env = "PLAY_MAPPING_FILE")]
    pub mapping_file: Option<String>,

    /// Directory containing whatsnew-<locale> release note files
    #[arg(long, env = "PLAY_WHATSNEW_DIR")]
    pub whatsnew_dir: Option<String>,

    #[arg(long, env = "PLAY_PUBLISH_API_URL", hide = true)]
    pub api_url: Option<String>,

    #[arg(long, env = "PLAY_PUBLISH_UPLOAD_URL", hide = true)]
    pub upload_url: Option<String>,
}

/// Validated, immutable configuration for one publishing run.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub package_name: String,
    pub app_paths: Vec<PathBuf>,
    pub track: String,
    /// Fraction of users receiving a staged rollout; `0.0` means everyone.
    pub user_fraction: f64,
    pub credentials: Credentials,
    /// Either empty or one entry per app path, in the same order.
    pub expansion_files: Vec<ExpansionFileSpec>,
    pub mapping_file: Option<PathBuf>,
    pub whatsnew_dir: Option<PathBuf>,
    pub api_url: String,
    pub upload_url: String,
}

impl PublishConfig {
    pub fn from_args(args: PublishArgs) -> Result<Self, PublishError> {
        let package_name = non_empty(args.package_name)
            .ok_or_else(|| config_error("no package name specified"))?;

        let app_path = non_empty(args.app_path)
            .ok_or_else(|| config_error("no app path specified"))?;
        let app_paths: Vec<PathBuf> = split_list(&app_path).into_iter().map(PathBuf::from).collect();
        if app_paths.is_empty() {
            return Err(config_error("no app path specified"));
        }
        for path in &app_paths {
            require_file(path, "app")?;
        }

        let track = non_empty(args.track).ok_or_else(|| config_error("no track specified"))?;

        let user_fraction = match non_empty(args.user_fraction) {
            Some(raw) => parse_user_fraction(&raw)?,
            None if track == ROLLOUT_TRACK => {
                return Err(config_error("the rollout track requires a user fraction"))
            }
            None => 0.0,
        };

        let credentials = credentials_from(
            non_empty(args.access_token),
            non_empty(args.service_account_json_key),
            non_empty(args.key_file_path),
            non_empty(args.service_account_email),
        )?;

        let expansion_files = match non_empty(args.expansion_file_path) {
            Some(raw) => {
                let entries = split_list(&raw)
                    .iter()
                    .map(|entry| ExpansionFileSpec::parse(entry))
                    .collect::<Result<Vec<_>, _>>()?;
                if entries.len() != app_paths.len() {
                    return Err(config_error(format!(
                        "mismatching number of app paths ({}) and expansion file entries ({})",
                        app_paths.len(),
                        entries.len()
                    )));
                }
                for entry in &entries {
                    require_file(&entry.path, "expansion file")?;
                }
                entries
            }
            None => Vec::new(),
        };

        let mapping_file = non_empty(args.mapping_file).map(PathBuf::from);
        if let Some(ref path) = mapping_file {
            require_file(path, "mapping file")?;
        }

        Ok(Self {
            package_name,
            app_paths,
            track,
            user_fraction,
            credentials,
            expansion_files,
            mapping_file,
            whatsnew_dir: non_empty(args.whatsnew_dir).map(PathBuf::from),
            api_url: non_empty(args.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            upload_url: non_empty(args.upload_url)
                .unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
        })
    }

    /// Log the effective configuration. Secrets are never printed.
    pub fn log_summary(&self) {
        tracing::info!("Configs:");
        tracing::info!("- package name: {}", self.package_name);
        for path in &self.app_paths {
            tracing::info!("- app: {}", path.display());
        }
        tracing::info!("- track: {}", self.track);
        tracing::info!("- user fraction: {}", self.user_fraction);
        tracing::info!("- credentials: {}", self.credentials.describe());
        for entry in &self.expansion_files {
            tracing::info!("- expansion file: {}:{}", entry.file_type, entry.path.display());
        }
        if let Some(ref path) = self.mapping_file {
            tracing::info!("- mapping file: {}", path.display());
        }
        if let Some(ref dir) = self.whatsnew_dir {
            tracing::info!("- whatsnew dir: {}", dir.display());
        }
    }
}

fn config_error(msg: impl Into<String>) -> PublishError {
    PublishError::Configuration(msg.into())
}

/// Pipelines often export unset inputs as empty strings.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a `|`- or newline-separated list, dropping blank entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(['|', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn require_file(path: &Path, what: &str) -> Result<(), PublishError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(config_error(format!("{} not found at {}", what, path.display())))
    }
}

fn parse_user_fraction(raw: &str) -> Result<f64, PublishError> {
    let fraction: f64 = raw
        .parse()
        .map_err(|e| config_error(format!("invalid user fraction '{}': {}", raw, e)))?;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(config_error(format!(
            "user fraction {} must be between 0 and 1",
            fraction
        )));
    }
    Ok(fraction)
}

fn credentials_from(
    access_token: Option<String>,
    json_key: Option<String>,
    p12_key: Option<String>,
    email: Option<String>,
) -> Result<Credentials, PublishError> {
    if let Some(token) = access_token {
        return Ok(Credentials::AccessToken(token));
    }

    if let Some(location) = json_key {
        let location = KeyLocation::parse(&location);
        require_local_key(&location)?;
        return Ok(Credentials::ServiceAccountJson(location));
    }

    if let Some(location) = p12_key {
        let location = KeyLocation::parse(&location);
        require_local_key(&location)?;
        let email = email.ok_or_else(|| {
            config_error("a service account email is required with a P12 key")
        })?;
        return Ok(Credentials::LegacyP12 {
            key: location,
            email,
        });
    }

    Err(config_error(
        "no credentials: provide an access token, a JSON key or a P12 key",
    ))
}

fn require_local_key(location: &KeyLocation) -> Result<(), PublishError> {
    match location {
        KeyLocation::Local(path) => require_file(path, "key file"),
        KeyLocation::Remote(_) => Ok(()),
    }
}
