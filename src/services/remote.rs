// src/services/remote.rs

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::Config,
    error::AppError,
    models::exam::{CreateGroupResponse, ExamCreateDto, ExamDefinition, ExamGroupCreateDto},
};

/// Client for a remote exam backend exposing `POST /exams` and `POST /exam-groups`.
#[derive(Debug, Clone)]
pub struct RemoteExamClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteExamClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// `None` unless `REMOTE_API_URL` is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .remote_api_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.remote_api_token.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_exam(&self, dto: &ExamCreateDto) -> Result<ExamDefinition, AppError> {
        self.post("exams", dto).await
    }

    pub async fn create_group(&self, dto: &ExamGroupCreateDto) -> Result<CreateGroupResponse, AppError> {
        self.post("exam-groups", dto).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::BadGateway(format!(
                "Remote exam API answered {} for {}: {}",
                status, url, detail
            )));
        }

        Ok(response.json::<R>().await?)
    }
}
