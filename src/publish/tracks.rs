use super::session::EditSession;
use crate::client::EditsApi;
use crate::error::PublishError;
use crate::models::Track;

pub const ALPHA_TRACK: &str = "alpha";
pub const BETA_TRACK: &str = "beta";
pub const ROLLOUT_TRACK: &str = "rollout";
pub const PRODUCTION_TRACK: &str = "production";

pub async fn list_tracks<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
) -> Result<Vec<Track>, PublishError> {
    tracing::info!("Listing tracks");
    let tracks = api
        .list_tracks(session.package_name(), session.edit_id())
        .await
        .map_err(PublishError::remote("list tracks"))?;
    for track in &tracks {
        tracing::info!(
            "Found track: {} ({} releases)",
            track.track,
            track.releases.len()
        );
    }
    Ok(tracks)
}

/// Find a track by exact, case-sensitive name.
pub fn resolve_track<'a>(name: &str, tracks: &'a [Track]) -> Result<&'a Track, PublishError> {
    tracks
        .iter()
        .find(|track| track.track == name)
        .ok_or_else(|| PublishError::NotFound(name.to_string()))
}

/// Lower tracks whose releases can be shadowed by publishing to `target`.
pub fn cleanup_chain(target: &str) -> &'static [&'static str] {
    match target {
        BETA_TRACK => &[ALPHA_TRACK],
        ROLLOUT_TRACK | PRODUCTION_TRACK => &[ALPHA_TRACK, BETA_TRACK],
        _ => &[],
    }
}

/// The existing tracks that need a shadowing check before publishing to
/// `target`, in chain order. Chain entries with no matching track are skipped.
pub fn candidate_tracks_for_cleanup(target: &str, tracks: &[Track]) -> Vec<Track> {
    let candidates: Vec<Track> = cleanup_chain(target)
        .iter()
        .filter_map(|name| tracks.iter().find(|track| track.track == *name))
        .cloned()
        .collect();

    tracing::info!(
        " possible tracks to update: {:?}",
        candidates.iter().map(|t| t.track.as_str()).collect::<Vec<_>>()
    );
    candidates
}
