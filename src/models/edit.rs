use serde::{Deserialize, Serialize};

/// An edit resource as returned by the open-edit and commit calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEdit {
    pub id: String,
    /// Seconds since the epoch after which the backend drops the edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time_seconds: Option<String>,
}

/// Lifecycle of an edit within one publishing run.
///
/// - `Open`: Accepting uploads and track changes
/// - `Committed`: Changes are live and durable
/// - `Abandoned`: The run failed; the edit is left to expire on the backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditState {
    Open,
    Committed,
    Abandoned,
}

impl EditState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Committed => "committed",
            Self::Abandoned => "abandoned",
        }
    }
}
