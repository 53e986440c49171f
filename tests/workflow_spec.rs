//! Publishing workflow tests against an in-memory backend.
//!
//! The fake records every call in order so tests can check both the
//! resulting state and that nothing is called after a failure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use play_publish::auth::Credentials;
use play_publish::client::{ClientError, EditsApi};
use play_publish::config::PublishConfig;
use play_publish::models::*;
use play_publish::publish::shadowing::{CleanupOutcome, TrackCleanup};
use play_publish::publish::Publisher;
use play_publish::PublishError;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    InsertEdit,
    UploadBinary(ArtifactKind),
    UploadExpansion(i64, ExpansionFileType),
    UploadMapping(i64),
    ListTracks,
    PatchTrack(Track),
    UpdateTrack(Track),
    Commit,
}

/// Which call should fail, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FailOn {
    Nothing,
    SecondUpload,
    PatchTrack,
    UpdateTrack,
}

struct FakeBackend {
    tracks: Vec<Track>,
    fail_on: FailOn,
    calls: Mutex<Vec<Call>>,
    next_version: Mutex<i64>,
}

impl FakeBackend {
    fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            fail_on: FailOn::Nothing,
            calls: Mutex::new(Vec::new()),
            next_version: Mutex::new(6),
        }
    }

    fn failing(mut self, fail_on: FailOn) -> Self {
        self.fail_on = fail_on;
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn patched(&self) -> Vec<Track> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PatchTrack(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn updated(&self) -> Vec<Track> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateTrack(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn server_error() -> ClientError {
        ClientError::Server("500 Internal Server Error: boom".to_string())
    }
}

#[async_trait]
impl EditsApi for FakeBackend {
    async fn insert_edit(&self, _package_name: &str) -> Result<AppEdit, ClientError> {
        self.record(Call::InsertEdit);
        Ok(AppEdit {
            id: "edit-1".to_string(),
            expiry_time_seconds: None,
        })
    }

    async fn upload_binary(
        &self,
        _package_name: &str,
        edit_id: &str,
        kind: ArtifactKind,
        _contents: Vec<u8>,
    ) -> Result<UploadedBinary, ClientError> {
        assert_eq!(edit_id, "edit-1");
        let uploads = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::UploadBinary(_)))
            .count();
        self.record(Call::UploadBinary(kind));
        if self.fail_on == FailOn::SecondUpload && uploads == 1 {
            return Err(Self::server_error());
        }
        let mut next = self.next_version.lock().unwrap();
        let version_code = *next;
        *next += 1;
        Ok(UploadedBinary { version_code })
    }

    async fn upload_expansion_file(
        &self,
        _package_name: &str,
        _edit_id: &str,
        version_code: i64,
        file_type: ExpansionFileType,
        _contents: Vec<u8>,
    ) -> Result<(), ClientError> {
        self.record(Call::UploadExpansion(version_code, file_type));
        Ok(())
    }

    async fn upload_deobfuscation_file(
        &self,
        _package_name: &str,
        _edit_id: &str,
        version_code: i64,
        _contents: Vec<u8>,
    ) -> Result<(), ClientError> {
        self.record(Call::UploadMapping(version_code));
        Ok(())
    }

    async fn list_tracks(
        &self,
        _package_name: &str,
        _edit_id: &str,
    ) -> Result<Vec<Track>, ClientError> {
        self.record(Call::ListTracks);
        Ok(self.tracks.clone())
    }

    async fn patch_track(
        &self,
        _package_name: &str,
        _edit_id: &str,
        track: &Track,
    ) -> Result<(), ClientError> {
        self.record(Call::PatchTrack(track.clone()));
        if self.fail_on == FailOn::PatchTrack {
            return Err(Self::server_error());
        }
        Ok(())
    }

    async fn update_track(
        &self,
        _package_name: &str,
        _edit_id: &str,
        track: &Track,
    ) -> Result<Track, ClientError> {
        self.record(Call::UpdateTrack(track.clone()));
        if self.fail_on == FailOn::UpdateTrack {
            return Err(ClientError::BadRequest("invalid release".to_string()));
        }
        Ok(track.clone())
    }

    async fn commit_edit(
        &self,
        _package_name: &str,
        edit_id: &str,
    ) -> Result<AppEdit, ClientError> {
        self.record(Call::Commit);
        Ok(AppEdit {
            id: edit_id.to_string(),
            expiry_time_seconds: None,
        })
    }
}

fn release(name: &str, codes: &[i64]) -> Release {
    Release {
        name: Some(name.to_string()),
        ..Release::new(codes.to_vec(), ReleaseStatus::Completed)
    }
}

fn store_tracks() -> Vec<Track> {
    vec![
        Track::new("alpha", vec![release("3", &[3])]),
        Track::new("beta", vec![release("4-5", &[4, 5])]),
        Track::new("production", vec![release("2", &[2])]),
        Track::new("internal", vec![]),
    ]
}

fn write_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"contents").expect("Failed to write fixture");
    path
}

fn config(track: &str, app_paths: Vec<PathBuf>) -> PublishConfig {
    PublishConfig {
        package_name: "com.example.app".to_string(),
        app_paths,
        track: track.to_string(),
        user_fraction: 0.0,
        credentials: Credentials::AccessToken("token".to_string()),
        expansion_files: vec![],
        mapping_file: None,
        whatsnew_dir: None,
        api_url: "http://unused".to_string(),
        upload_url: "http://unused".to_string(),
    }
}

fn no_notes() -> BTreeMap<String, String> {
    BTreeMap::new()
}

mod publishing {
    use super::*;

    #[tokio::test]
    async fn production_release_clears_shadowed_lower_tracks() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(
            FakeBackend::new(store_tracks()),
            config("production", vec![apk]),
        );

        let report = publisher.run(&no_notes()).await.expect("publish failed");

        assert_eq!(report.edit_id, "edit-1");
        assert_eq!(report.version_codes(), vec![6]);
        assert_eq!(
            report.cleanup,
            vec![
                TrackCleanup {
                    track: "alpha".to_string(),
                    outcome: CleanupOutcome::Cleared { releases: 1 },
                },
                TrackCleanup {
                    track: "beta".to_string(),
                    outcome: CleanupOutcome::Cleared { releases: 1 },
                },
            ]
        );

        let patched = publisher.api().patched();
        assert_eq!(patched.len(), 2);
        assert_eq!(patched[0].track, "alpha");
        assert_eq!(patched[1].track, "beta");
        assert!(patched.iter().all(|t| t.releases[0].is_cleared()));
        assert_eq!(patched[1].releases[0].name.as_deref(), Some("4-5"));

        let updated = publisher.api().updated();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].track, "production");
        assert_eq!(updated[0].releases.len(), 1);
        assert_eq!(updated[0].releases[0].version_codes, Some(vec![6]));
        assert_eq!(updated[0].releases[0].status, ReleaseStatus::Completed);
        assert!(updated[0].releases[0].name.is_none());
    }

    #[tokio::test]
    async fn calls_happen_in_workflow_order() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(FakeBackend::new(store_tracks()), config("beta", vec![apk]));

        publisher.run(&no_notes()).await.expect("publish failed");

        let kinds: Vec<&'static str> = publisher
            .api()
            .calls()
            .iter()
            .map(|c| match c {
                Call::InsertEdit => "insert",
                Call::UploadBinary(_) => "upload",
                Call::UploadExpansion(..) => "expansion",
                Call::UploadMapping(_) => "mapping",
                Call::ListTracks => "list",
                Call::PatchTrack(_) => "patch",
                Call::UpdateTrack(_) => "update",
                Call::Commit => "commit",
            })
            .collect();
        assert_eq!(kinds, vec!["insert", "upload", "list", "patch", "update", "commit"]);
    }

    #[tokio::test]
    async fn alpha_release_touches_no_other_track() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(FakeBackend::new(store_tracks()), config("alpha", vec![apk]));

        let report = publisher.run(&no_notes()).await.expect("publish failed");

        assert!(report.cleanup.is_empty());
        assert!(publisher.api().patched().is_empty());
        assert_eq!(publisher.api().updated()[0].track, "alpha");
    }

    #[tokio::test]
    async fn newer_lower_track_is_patched_without_changes() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let tracks = vec![
            Track::new("alpha", vec![release("9", &[9])]),
            Track::new("beta", vec![]),
        ];
        let publisher = Publisher::new(FakeBackend::new(tracks), config("beta", vec![apk]));

        let report = publisher.run(&no_notes()).await.expect("publish failed");

        assert_eq!(report.cleanup[0].outcome, CleanupOutcome::NothingToClear);
        let patched = publisher.api().patched();
        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].releases[0].version_codes, Some(vec![9]));
    }

    #[tokio::test]
    async fn empty_candidate_track_is_not_patched() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let tracks = vec![Track::new("alpha", vec![]), Track::new("beta", vec![])];
        let publisher = Publisher::new(FakeBackend::new(tracks), config("beta", vec![apk]));

        let report = publisher.run(&no_notes()).await.expect("publish failed");

        assert_eq!(report.cleanup[0].outcome, CleanupOutcome::Empty);
        assert!(publisher.api().patched().is_empty());
    }

    #[tokio::test]
    async fn staged_rollout_carries_fraction_and_notes() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let mut cfg = config("production", vec![apk]);
        cfg.user_fraction = 0.1;
        let publisher = Publisher::new(FakeBackend::new(store_tracks()), cfg);
        let notes: BTreeMap<String, String> =
            [("en-US".to_string(), "Fixed bugs".to_string())].into_iter().collect();

        publisher.run(&notes).await.expect("publish failed");

        let release = &publisher.api().updated()[0].releases[0];
        assert_eq!(release.status, ReleaseStatus::InProgress);
        assert_eq!(release.user_fraction, Some(0.1));
        assert_eq!(release.release_notes[0].language, "en-US");
    }

    #[tokio::test]
    async fn split_builds_upload_auxiliary_files_per_version() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "arm.apk");
        let aab = write_file(dir.path(), "x86.aab");
        let main_obb = write_file(dir.path(), "main.obb");
        let patch_obb = write_file(dir.path(), "patch.obb");
        let mapping = write_file(dir.path(), "mapping.txt");

        let mut cfg = config("internal", vec![apk, aab]);
        cfg.expansion_files = vec![
            ExpansionFileSpec {
                file_type: ExpansionFileType::Main,
                path: main_obb,
            },
            ExpansionFileSpec {
                file_type: ExpansionFileType::Patch,
                path: patch_obb,
            },
        ];
        cfg.mapping_file = Some(mapping);
        let publisher = Publisher::new(FakeBackend::new(store_tracks()), cfg);

        let report = publisher.run(&no_notes()).await.expect("publish failed");

        assert_eq!(report.version_codes(), vec![6, 7]);
        assert_eq!(report.artifacts[1].kind, ArtifactKind::Bundle);
        let calls = publisher.api().calls();
        assert!(calls.contains(&Call::UploadBinary(ArtifactKind::Apk)));
        assert!(calls.contains(&Call::UploadBinary(ArtifactKind::Bundle)));
        assert!(calls.contains(&Call::UploadExpansion(6, ExpansionFileType::Main)));
        assert!(calls.contains(&Call::UploadExpansion(7, ExpansionFileType::Patch)));
        assert!(calls.contains(&Call::UploadMapping(6)));
        assert!(calls.contains(&Call::UploadMapping(7)));
        assert_eq!(
            publisher.api().updated()[0].releases[0].version_codes,
            Some(vec![6, 7])
        );
    }
}

mod failures {
    use super::*;

    fn assert_not_committed(calls: &[Call]) {
        assert!(!calls.contains(&Call::Commit), "edit must not be committed");
    }

    #[tokio::test]
    async fn missing_target_track_aborts_before_any_track_change() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(FakeBackend::new(store_tracks()), config("beta2", vec![apk]));

        let err = publisher.run(&no_notes()).await.unwrap_err();

        assert!(matches!(err, PublishError::NotFound(ref name) if name == "beta2"));
        let calls = publisher.api().calls();
        assert_not_committed(&calls);
        assert!(publisher.api().patched().is_empty());
        assert!(publisher.api().updated().is_empty());
    }

    #[tokio::test]
    async fn failed_split_upload_stops_the_run() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let first = write_file(dir.path(), "a.apk");
        let second = write_file(dir.path(), "b.apk");
        let third = write_file(dir.path(), "c.apk");
        let publisher = Publisher::new(
            FakeBackend::new(store_tracks()).failing(FailOn::SecondUpload),
            config("beta", vec![first, second, third]),
        );

        let err = publisher.run(&no_notes()).await.unwrap_err();

        match err {
            PublishError::RemoteCall { ref operation, .. } => assert_eq!(operation, "upload apk"),
            other => panic!("unexpected error: {}", other),
        }
        let calls = publisher.api().calls();
        assert_eq!(
            calls,
            vec![
                Call::InsertEdit,
                Call::UploadBinary(ArtifactKind::Apk),
                Call::UploadBinary(ArtifactKind::Apk),
            ]
        );
    }

    #[tokio::test]
    async fn failed_cleanup_patch_is_fatal() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(
            FakeBackend::new(store_tracks()).failing(FailOn::PatchTrack),
            config("production", vec![apk]),
        );

        let err = publisher.run(&no_notes()).await.unwrap_err();

        assert!(err.to_string().starts_with("failed to update track alpha"));
        let calls = publisher.api().calls();
        assert_not_committed(&calls);
        assert_eq!(publisher.api().patched().len(), 1);
        assert!(publisher.api().updated().is_empty());
    }

    #[tokio::test]
    async fn failed_track_update_is_fatal() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let apk = write_file(dir.path(), "app.apk");
        let publisher = Publisher::new(
            FakeBackend::new(store_tracks()).failing(FailOn::UpdateTrack),
            config("beta", vec![apk]),
        );

        let err = publisher.run(&no_notes()).await.unwrap_err();

        assert!(matches!(
            err,
            PublishError::RemoteCall {
                source: ClientError::BadRequest(_),
                ..
            }
        ));
        assert_not_committed(&publisher.api().calls());
    }

    #[tokio::test]
    async fn unreadable_app_fails_after_opening_the_edit() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let publisher = Publisher::new(
            FakeBackend::new(store_tracks()),
            config("beta", vec![dir.path().join("gone.apk")]),
        );

        let err = publisher.run(&no_notes()).await.unwrap_err();

        assert!(matches!(err, PublishError::Io { .. }));
        assert_eq!(publisher.api().calls(), vec![Call::InsertEdit]);
    }
}
