//! Clearing lower-track releases that a new release would shadow.
//!
//! A lower track (alpha, beta) that keeps exposing versions older than what
//! is about to ship on a higher track leaves its testers on a regressed
//! build. Before the target track is updated, every release on the
//! candidate tracks is compared against the new version codes and emptied
//! when it would be shadowed.

use super::session::EditSession;
use crate::client::EditsApi;
use crate::error::PublishError;
use crate::models::{Release, Track};

/// Whether a release exposing `current` would be shadowed by `new`.
///
/// Lists of different lengths cannot be compared element-wise and always
/// block. Otherwise both are sorted (on copies) and the release blocks if
/// any current code is lower than the new code at the same position.
pub fn is_blocking(current: &[i64], new: &[i64]) -> bool {
    if current.len() != new.len() {
        return true;
    }

    let mut current = current.to_vec();
    let mut new = new.to_vec();
    current.sort_unstable();
    new.sort_unstable();

    current.iter().zip(&new).any(|(current, new)| current < new)
}

/// Empty the release's version codes if it blocks `new_codes`.
///
/// Only the version list changes; every other field, modeled or not, is kept.
pub fn clear_if_blocking(release: &mut Release, new_codes: &[i64]) -> bool {
    let current = release.exposed_version_codes();
    let name = release.name.as_deref().unwrap_or("<unnamed>");
    tracing::info!("Checking app versions on release: {}", name);
    tracing::info!("Current version codes: {:?}", current);
    tracing::info!("New version codes: {:?}", new_codes);

    if !is_blocking(current, new_codes) {
        return false;
    }

    if current.len() != new_codes.len() {
        tracing::warn!(
            "Mismatching app count, removing {:?} versions from release: {}",
            current,
            name
        );
    } else {
        tracing::info!("Shadowing versions found, removing {:?} from release: {}", current, name);
    }

    release.version_codes = Some(Vec::new());
    true
}

/// Result of checking one candidate track.
///
/// - `Cleared`: `releases` releases had their versions removed
/// - `NothingToClear`: the track had releases but none were blocking
/// - `Empty`: the track had no releases, so it was not written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Cleared { releases: usize },
    NothingToClear,
    Empty,
}

impl CleanupOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Cleared { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCleanup {
    pub track: String,
    pub outcome: CleanupOutcome,
}

/// Clear every blocking release on `track` in place.
pub fn clear_shadowed_releases(track: &mut Track, new_codes: &[i64]) -> CleanupOutcome {
    if track.releases.is_empty() {
        return CleanupOutcome::Empty;
    }

    let cleared = track
        .releases
        .iter_mut()
        .map(|release| clear_if_blocking(release, new_codes))
        .filter(|cleared| *cleared)
        .count();

    if cleared > 0 {
        CleanupOutcome::Cleared { releases: cleared }
    } else {
        CleanupOutcome::NothingToClear
    }
}

/// Check each candidate track and patch it back.
///
/// Tracks with releases are patched even when nothing changed; tracks with
/// no releases are skipped.
pub async fn apply_cleanup<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    candidates: Vec<Track>,
    new_codes: &[i64],
) -> Result<Vec<TrackCleanup>, PublishError> {
    let mut results = Vec::with_capacity(candidates.len());
    for mut track in candidates {
        let outcome = clear_shadowed_releases(&mut track, new_codes);
        match outcome {
            CleanupOutcome::Empty => {
                tracing::info!("Track {} has no releases, nothing to patch", track.track);
            }
            _ => {
                if outcome.changed() {
                    tracing::info!("Desired versions deactivated on track {}", track.track);
                } else {
                    tracing::info!("No blocking version found on track {}", track.track);
                }
                api.patch_track(session.package_name(), session.edit_id(), &track)
                    .await
                    .map_err(PublishError::remote(format!("update track {}", track.track)))?;
            }
        }
        results.push(TrackCleanup {
            track: track.track,
            outcome,
        });
    }
    Ok(results)
}
