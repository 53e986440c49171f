//! The edit-session publishing workflow.
//!
//! A run moves through these stages, in order:
//!
//! ```text
//! Configured → SessionOpen → ArtifactsUploaded → AuxiliaryAssetsUploaded
//!   → TracksResolved → CleanupApplied → ReleaseBuilt → TrackUpdated → Committed
//! ```
//!
//! The first failing step aborts the run. No further call is made against
//! the edit, which is abandoned uncommitted; a retry starts over with a new
//! edit.

pub mod release;
pub mod session;
pub mod shadowing;
pub mod tracks;
pub mod upload;

use crate::client::EditsApi;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::models::{Artifact, Track};

use release::NotesProvider;
use session::EditSession;
use shadowing::TrackCleanup;

/// Stage a publishing run has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowStage {
    Configured,
    SessionOpen,
    ArtifactsUploaded,
    AuxiliaryAssetsUploaded,
    TracksResolved,
    CleanupApplied,
    ReleaseBuilt,
    TrackUpdated,
    Committed,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::SessionOpen => "session_open",
            Self::ArtifactsUploaded => "artifacts_uploaded",
            Self::AuxiliaryAssetsUploaded => "auxiliary_assets_uploaded",
            Self::TracksResolved => "tracks_resolved",
            Self::CleanupApplied => "cleanup_applied",
            Self::ReleaseBuilt => "release_built",
            Self::TrackUpdated => "track_updated",
            Self::Committed => "committed",
        }
    }
}

/// Outcome of a committed run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub edit_id: String,
    pub artifacts: Vec<Artifact>,
    pub cleanup: Vec<TrackCleanup>,
    /// The target track as returned by the update call.
    pub track: Track,
}

impl PublishReport {
    pub fn version_codes(&self) -> Vec<i64> {
        self.artifacts.iter().map(|a| a.version_code).collect()
    }
}

/// Changes staged under an edit, ready to commit.
struct StagedChanges {
    artifacts: Vec<Artifact>,
    cleanup: Vec<TrackCleanup>,
    track: Track,
}

/// Runs the publishing workflow for one configuration.
pub struct Publisher<A> {
    api: A,
    config: PublishConfig,
}

impl<A: EditsApi> Publisher<A> {
    pub fn new(api: A, config: PublishConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publish and commit. On error the edit is left uncommitted.
    pub async fn run(&self, notes: &dyn NotesProvider) -> Result<PublishReport, PublishError> {
        let mut stage = WorkflowStage::Configured;
        let result = self.execute(&mut stage, notes).await;
        if let Err(ref e) = result {
            tracing::error!(
                stage = stage.as_str(),
                "Publishing failed after stage {}: {}",
                stage.as_str(),
                e
            );
        }
        result
    }

    async fn execute(
        &self,
        stage: &mut WorkflowStage,
        notes: &dyn NotesProvider,
    ) -> Result<PublishReport, PublishError> {
        let session = session::open_session(&self.api, &self.config.package_name).await?;
        *stage = WorkflowStage::SessionOpen;

        let staged = match self.stage_changes(&session, stage, notes).await {
            Ok(staged) => staged,
            Err(e) => {
                session.abandon();
                return Err(e);
            }
        };

        let committed = session::commit(&self.api, session).await?;
        *stage = WorkflowStage::Committed;

        Ok(PublishReport {
            edit_id: committed.edit_id,
            artifacts: staged.artifacts,
            cleanup: staged.cleanup,
            track: staged.track,
        })
    }

    async fn stage_changes(
        &self,
        session: &EditSession,
        stage: &mut WorkflowStage,
        notes: &dyn NotesProvider,
    ) -> Result<StagedChanges, PublishError> {
        let config = &self.config;

        tracing::info!("Upload apps");
        let artifacts = upload::upload_artifacts(&self.api, session, &config.app_paths).await?;
        let version_codes: Vec<i64> = artifacts.iter().map(|a| a.version_code).collect();
        *stage = WorkflowStage::ArtifactsUploaded;

        let auxiliary = upload::upload_auxiliary_assets(
            &self.api,
            session,
            &artifacts,
            &config.expansion_files,
            config.mapping_file.as_deref(),
        )
        .await?;
        if auxiliary > 0 {
            *stage = WorkflowStage::AuxiliaryAssetsUploaded;
        }

        let all_tracks = tracks::list_tracks(&self.api, session).await?;
        let mut target = tracks::resolve_track(&config.track, &all_tracks)?.clone();
        let candidates = tracks::candidate_tracks_for_cleanup(&config.track, &all_tracks);
        *stage = WorkflowStage::TracksResolved;

        let cleanup = if candidates.is_empty() {
            Vec::new()
        } else {
            let cleanup =
                shadowing::apply_cleanup(&self.api, session, candidates, &version_codes).await?;
            *stage = WorkflowStage::CleanupApplied;
            cleanup
        };

        let release = release::build_release(&version_codes, config.user_fraction, notes)?;
        *stage = WorkflowStage::ReleaseBuilt;

        tracing::info!("Update track {}", target.track);
        target.releases = vec![release];
        let track = self
            .api
            .update_track(session.package_name(), session.edit_id(), &target)
            .await
            .map_err(PublishError::remote(format!("update track {}", target.track)))?;
        *stage = WorkflowStage::TrackUpdated;
        tracing::info!(" updated track: {}", track.track);

        Ok(StagedChanges {
            artifacts,
            cleanup,
            track,
        })
    }
}
