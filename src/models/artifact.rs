use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// The kind of binary being uploaded.
///
/// - `Apk`: A package archive
/// - `Bundle`: An app bundle, split into APKs by the backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Apk,
    Bundle,
}

impl ArtifactKind {
    /// Bundles are recognized by their `.aab` extension; everything else is an APK.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("aab") => Self::Bundle,
            _ => Self::Apk,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apk => "apk",
            Self::Bundle => "bundle",
        }
    }

    /// Collection segment of the upload endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Apk => "apks",
            Self::Bundle => "bundles",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Apk => "application/vnd.android.package-archive",
            Self::Bundle => "application/octet-stream",
        }
    }
}

/// A binary uploaded under the current edit.
///
/// The version code is assigned by the backend on upload and is never
/// computed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub version_code: i64,
}

/// Response body of an APK or bundle upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBinary {
    pub version_code: i64,
}

/// Expansion file slot on an APK.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionFileType {
    Main,
    Patch,
}

impl ExpansionFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Patch => "patch",
        }
    }
}

impl FromStr for ExpansionFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Self::Main),
            "patch" => Ok(Self::Patch),
            other => Err(format!(
                "unknown expansion file type '{}', expected main or patch",
                other
            )),
        }
    }
}

impl fmt::Display for ExpansionFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured expansion file, e.g. `"main:/build/main.obb"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionFileSpec {
    pub file_type: ExpansionFileType,
    pub path: PathBuf,
}

impl ExpansionFileSpec {
    /// Parse a `"<type>:<path>"` entry.
    ///
    /// The first colon-delimited segment is the type, the remaining segments
    /// are joined back together (without the colons) to form the path. Both
    /// parts are trimmed.
    pub fn parse(entry: &str) -> Result<Self, PublishError> {
        let malformed = |reason: String| PublishError::MalformedInput {
            entry: entry.to_string(),
            reason,
        };

        let segments: Vec<&str> = entry.trim().split(':').collect();
        if segments.len() < 2 {
            return Err(malformed("expected <type>:<path>".to_string()));
        }

        let file_type = segments[0].trim().parse::<ExpansionFileType>().map_err(malformed)?;

        let path = segments[1..].concat();
        let path = path.trim();
        if path.is_empty() {
            return Err(malformed("missing file path".to_string()));
        }

        Ok(Self {
            file_type,
            path: PathBuf::from(path),
        })
    }
}
