use std::path::{Path, PathBuf};

use super::session::EditSession;
use crate::client::EditsApi;
use crate::error::PublishError;
use crate::models::{Artifact, ArtifactKind, ExpansionFileSpec};

/// Upload one APK or bundle. The backend assigns its version code.
pub async fn upload_artifact<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    path: &Path,
) -> Result<Artifact, PublishError> {
    let kind = ArtifactKind::from_path(path);
    let contents = tokio::fs::read(path).await.map_err(PublishError::io(path))?;
    tracing::debug!(
        "Uploading {} ({} bytes) to edit {}",
        path.display(),
        contents.len(),
        session.edit_id()
    );

    let uploaded = api
        .upload_binary(session.package_name(), session.edit_id(), kind, contents)
        .await
        .map_err(PublishError::remote(format!("upload {}", kind.as_str())))?;

    tracing::info!("Uploaded {} version: {}", kind.as_str(), uploaded.version_code);
    Ok(Artifact {
        path: path.to_path_buf(),
        kind,
        version_code: uploaded.version_code,
    })
}

/// Upload every binary, one after the other.
///
/// A failure stops the loop; binaries already uploaded stay attached to the
/// edit, which is then abandoned by the caller.
pub async fn upload_artifacts<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    paths: &[PathBuf],
) -> Result<Vec<Artifact>, PublishError> {
    let mut artifacts = Vec::with_capacity(paths.len());
    for path in paths {
        artifacts.push(upload_artifact(api, session, path).await?);
    }
    Ok(artifacts)
}

pub async fn upload_expansion_file<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    version_code: i64,
    expansion: &ExpansionFileSpec,
) -> Result<(), PublishError> {
    let contents = tokio::fs::read(&expansion.path)
        .await
        .map_err(PublishError::io(&expansion.path))?;
    tracing::debug!(
        "Uploading {} expansion file {} for version code {}",
        expansion.file_type,
        expansion.path.display(),
        version_code
    );

    api.upload_expansion_file(
        session.package_name(),
        session.edit_id(),
        version_code,
        expansion.file_type,
        contents,
    )
    .await
    .map_err(PublishError::remote("upload expansion file"))?;

    tracing::info!("Uploaded expansion file {}", expansion.path.display());
    Ok(())
}

/// Upload the deobfuscation map for a version code. Returns `false` when no
/// mapping file is configured.
pub async fn upload_mapping_file<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    version_code: i64,
    mapping_file: Option<&Path>,
) -> Result<bool, PublishError> {
    let Some(path) = mapping_file else {
        return Ok(false);
    };

    let contents = tokio::fs::read(path).await.map_err(PublishError::io(path))?;
    api.upload_deobfuscation_file(
        session.package_name(),
        session.edit_id(),
        version_code,
        contents,
    )
    .await
    .map_err(PublishError::remote("upload mapping file"))?;

    tracing::info!(" uploaded mapping file for version: {}", version_code);
    Ok(true)
}

/// Upload expansion files (paired with artifacts by position) and the
/// mapping file for every artifact. Returns the number of files uploaded.
pub async fn upload_auxiliary_assets<A: EditsApi + ?Sized>(
    api: &A,
    session: &EditSession,
    artifacts: &[Artifact],
    expansion_files: &[ExpansionFileSpec],
    mapping_file: Option<&Path>,
) -> Result<usize, PublishError> {
    let mut uploaded = 0;
    for (index, artifact) in artifacts.iter().enumerate() {
        if let Some(expansion) = expansion_files.get(index) {
            upload_expansion_file(api, session, artifact.version_code, expansion).await?;
            uploaded += 1;
        }
        if upload_mapping_file(api, session, artifact.version_code, mapping_file).await? {
            uploaded += 1;
        }
    }
    Ok(uploaded)
}
