// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    models::{exam::ExamDefinition, exam_record::ResponseRecord},
    services::{auth::AuthState, remote::RemoteExamClient, users::UserDirectory},
    store::{Collection, Slot, Storage, keys},
    utils::ids::IdGenerator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub auth: AuthState,
    pub ids: Arc<IdGenerator>,
    /// Set when exams are created through a remote API instead of locally.
    pub remote: Option<RemoteExamClient>,
}

impl AppState {
    /// Restores the session and seeds the id generator past every stored id.
    pub async fn new(config: Config, storage: Storage) -> Result<Self, AppError> {
        let auth = AuthState::restore(&storage).await?;
        let ids = Arc::new(IdGenerator::new());

        let exams = storage.collection::<ExamDefinition>(keys::EXAMS).load().await?;
        if let Some(max) = exams.iter().flat_map(|e| [e.id, e.group_id]).max() {
            ids.observe(max);
        }

        let remote = RemoteExamClient::from_config(&config);
        if let Some(client) = &remote {
            tracing::info!("Exam creation goes through {}", client.base_url());
        }

        Ok(Self {
            config,
            storage,
            auth,
            ids,
            remote,
        })
    }

    pub fn exams(&self) -> Collection<ExamDefinition> {
        self.storage.collection(keys::EXAMS)
    }

    pub fn responses(&self) -> Collection<ResponseRecord> {
        self.storage.collection(keys::RESPONSES)
    }

    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(
            self.storage.collection(keys::USERS),
            self.config.reject_duplicate_emails,
        )
    }

    pub fn panel_collapsed(&self) -> Slot<bool> {
        self.storage.slot(keys::PANEL_COLLAPSED)
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
