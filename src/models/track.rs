use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named distribution channel with its releases.
///
/// Tracks are fetched fresh for every edit, modified in memory and written
/// back with a patch or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub track: String,
    #[serde(default)]
    pub releases: Vec<Release>,
    /// Backend fields not modeled here, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    pub fn new(name: impl Into<String>, releases: Vec<Release>) -> Self {
        Self {
            track: name.into(),
            releases,
            extra: Map::new(),
        }
    }
}

/// A release on a track.
///
/// `user_fraction` is only set for staged rollouts (`InProgress`), and then
/// lies in (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `None` omits the field from requests; `Some(vec![])` explicitly
    /// clears every version from the release.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "version_codes"
    )]
    pub version_codes: Option<Vec<i64>>,
    pub status: ReleaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub release_notes: Vec<LocalizedText>,
    /// Everything else the backend reports (country targeting, in-app
    /// update priority, ...). A patch must send these back as they came.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Release {
    pub fn new(version_codes: Vec<i64>, status: ReleaseStatus) -> Self {
        Self {
            name: None,
            version_codes: Some(version_codes),
            status,
            user_fraction: None,
            release_notes: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Version codes currently exposed, treating an unspecified list as empty.
    pub fn exposed_version_codes(&self) -> &[i64] {
        self.version_codes.as_deref().unwrap_or(&[])
    }

    /// Whether the version list has been explicitly emptied.
    pub fn is_cleared(&self) -> bool {
        matches!(self.version_codes.as_deref(), Some([]))
    }
}

/// Rollout status of a release.
///
/// - `Completed`: Available to every user of the track
/// - `InProgress`: Staged rollout to `user_fraction` of users
/// - `Draft`: Not yet available (reported by the backend, never produced here)
/// - `Halted`: Rollout stopped (reported by the backend, never produced here)
/// - `Unspecified`: The backend's `statusUnspecified`
/// - `Other`: Any status this client does not know, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReleaseStatus {
    Completed,
    InProgress,
    Draft,
    Halted,
    Unspecified,
    Other(String),
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "inProgress",
            Self::Draft => "draft",
            Self::Halted => "halted",
            Self::Unspecified => "statusUnspecified",
            Self::Other(status) => status,
        }
    }
}

impl From<&str> for ReleaseStatus {
    fn from(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "inProgress" => Self::InProgress,
            "draft" => Self::Draft,
            "halted" => Self::Halted,
            "statusUnspecified" => Self::Unspecified,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ReleaseStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ReleaseStatus> for String {
    fn from(status: ReleaseStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Release notes for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    pub language: String,
    pub text: String,
}

/// Response body of the list-tracks call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracksListResponse {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Version codes are int64 values, which the backend sends as JSON strings.
mod version_codes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    pub fn serialize<S: Serializer>(codes: &Option<Vec<i64>>, s: S) -> Result<S::Ok, S::Error> {
        match codes {
            Some(codes) => s.collect_seq(codes.iter().map(|code| code.to_string())),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<i64>>, D::Error> {
        let raw: Option<Vec<Code>> = Option::deserialize(d)?;
        raw.map(|codes| {
            codes
                .into_iter()
                .map(|code| match code {
                    Code::Text(text) => text.parse::<i64>().map_err(D::Error::custom),
                    Code::Number(n) => Ok(n),
                })
                .collect()
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(codes: Option<Vec<i64>>) -> Release {
        Release {
            name: Some("42 (1.2.0)".to_string()),
            version_codes: codes,
            ..Release::new(vec![], ReleaseStatus::Completed)
        }
    }

    #[test]
    fn cleared_codes_are_sent_as_empty_list() {
        let value = serde_json::to_value(release(Some(vec![]))).unwrap();
        assert_eq!(value["versionCodes"], json!([]));
    }

    #[test]
    fn unspecified_codes_are_omitted() {
        let value = serde_json::to_value(release(None)).unwrap();
        assert!(value.get("versionCodes").is_none());
        assert!(value.get("userFraction").is_none());
        assert!(value.get("releaseNotes").is_none());
    }

    #[test]
    fn codes_serialize_as_strings() {
        let value = serde_json::to_value(release(Some(vec![7, 12]))).unwrap();
        assert_eq!(value["versionCodes"], json!(["7", "12"]));
    }

    #[test]
    fn codes_deserialize_from_strings_or_numbers() {
        let parsed: Release = serde_json::from_value(json!({
            "versionCodes": ["3", 4],
            "status": "inProgress",
            "userFraction": 0.1
        }))
        .unwrap();
        assert_eq!(parsed.version_codes, Some(vec![3, 4]));
        assert_eq!(parsed.status, ReleaseStatus::InProgress);
        assert_eq!(parsed.user_fraction, Some(0.1));
    }

    #[test]
    fn track_without_releases_deserializes() {
        let track: Track = serde_json::from_value(json!({ "track": "alpha" })).unwrap();
        assert!(track.releases.is_empty());
    }

    #[test]
    fn cleared_release_is_distinguished_from_unspecified() {
        assert!(release(Some(vec![])).is_cleared());
        assert!(!release(None).is_cleared());
        assert!(release(None).exposed_version_codes().is_empty());
    }

    #[test]
    fn unknown_release_fields_survive_a_round_trip() {
        let raw = json!({
            "track": "alpha",
            "releases": [{
                "name": "3",
                "versionCodes": ["3"],
                "status": "completed",
                "inAppUpdatePriority": 5,
                "countryTargeting": { "countries": ["DE", "FR"], "includeRestOfWorld": false }
            }]
        });
        let track: Track = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(track.releases[0].extra["inAppUpdatePriority"], json!(5));
        assert_eq!(serde_json::to_value(&track).unwrap(), raw);
    }

    #[test]
    fn unknown_statuses_are_kept_verbatim() {
        let parsed: TracksListResponse = serde_json::from_value(json!({
            "tracks": [{
                "track": "alpha",
                "releases": [{ "status": "statusUnspecified" }, { "status": "archived" }]
            }]
        }))
        .unwrap();
        let releases = &parsed.tracks[0].releases;
        assert_eq!(releases[0].status, ReleaseStatus::Unspecified);
        assert_eq!(releases[1].status, ReleaseStatus::Other("archived".to_string()));

        let value = serde_json::to_value(&releases[1]).unwrap();
        assert_eq!(value["status"], "archived");
    }
}
