use crate::client::EditsApi;
use crate::error::PublishError;
use crate::models::EditState;

/// The single edit a publishing run stages its changes under.
///
/// Committing consumes the session, so no call can be made against an edit
/// once it is committed or abandoned.
#[derive(Debug)]
pub struct EditSession {
    package_name: String,
    edit_id: String,
    state: EditState,
}

impl EditSession {
    pub fn new(package_name: impl Into<String>, edit_id: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            edit_id: edit_id.into(),
            state: EditState::Open,
        }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn edit_id(&self) -> &str {
        &self.edit_id
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// Give up on the edit after a failed step.
    ///
    /// No remote call is made: an uncommitted edit expires on the backend
    /// and leaves no durable trace.
    pub fn abandon(mut self) -> EditState {
        self.state = EditState::Abandoned;
        tracing::warn!(
            "Edit {} abandoned without committing; it will expire on its own",
            self.edit_id
        );
        self.state
    }
}

/// A committed edit. Its changes are live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEdit {
    pub package_name: String,
    pub edit_id: String,
}

pub async fn open_session<A: EditsApi + ?Sized>(
    api: &A,
    package_name: &str,
) -> Result<EditSession, PublishError> {
    tracing::info!("Create new edit");
    let edit = api
        .insert_edit(package_name)
        .await
        .map_err(PublishError::remote("open edit"))?;
    tracing::info!(" editID: {}", edit.id);
    Ok(EditSession::new(package_name, edit.id))
}

pub async fn commit<A: EditsApi + ?Sized>(
    api: &A,
    mut session: EditSession,
) -> Result<CommittedEdit, PublishError> {
    tracing::info!("Committing edit {}", session.edit_id);
    let edit = api
        .commit_edit(&session.package_name, &session.edit_id)
        .await
        .map_err(PublishError::remote(format!("commit edit {}", session.edit_id)))?;
    session.state = EditState::Committed;
    tracing::info!("Edit committed");
    Ok(CommittedEdit {
        package_name: session.package_name,
        edit_id: edit.id,
    })
}
