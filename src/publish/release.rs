use std::collections::BTreeMap;

use crate::error::PublishError;
use crate::models::{LocalizedText, Release, ReleaseStatus};

/// Source of localized release notes, keyed by locale.
///
/// Returning an empty map is valid and means the release carries no notes.
pub trait NotesProvider {
    fn localized_notes(&self) -> Result<BTreeMap<String, String>, PublishError>;
}

impl NotesProvider for BTreeMap<String, String> {
    fn localized_notes(&self) -> Result<BTreeMap<String, String>, PublishError> {
        Ok(self.clone())
    }
}

/// A non-zero fraction makes the release a staged rollout.
pub fn release_status(user_fraction: f64) -> ReleaseStatus {
    if user_fraction != 0.0 {
        tracing::info!(
            "Release is a staged rollout, {} of users will receive it.",
            user_fraction
        );
        ReleaseStatus::InProgress
    } else {
        ReleaseStatus::Completed
    }
}

/// Build the release that will replace the target track's releases.
///
/// A zero fraction means full rollout and is left out of the release
/// entirely rather than sent as 0%.
pub fn build_release(
    version_codes: &[i64],
    user_fraction: f64,
    notes: &dyn NotesProvider,
) -> Result<Release, PublishError> {
    let status = release_status(user_fraction);
    tracing::info!("Release version codes are: {:?}", version_codes);

    let release_notes = notes
        .localized_notes()?
        .into_iter()
        .map(|(language, text)| LocalizedText { language, text })
        .collect::<Vec<_>>();
    if !release_notes.is_empty() {
        tracing::info!("Attaching release notes for {} locales", release_notes.len());
    }

    Ok(Release {
        user_fraction: (user_fraction != 0.0).then_some(user_fraction),
        release_notes,
        ..Release::new(version_codes.to_vec(), status)
    })
}
