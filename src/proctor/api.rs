use async_trait::async_trait;
use log::info;
use serde_json::Value;
use uuid::Uuid;

use super::{SubmittedAnswer, TestResult};

/// Serves the sectioned question paper for a job's aptitude test.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Raw payload as served; the runner owns shape validation.
    async fn fetch(&self, job_id: Uuid) -> anyhow::Result<Value>;
}

/// Receives the answer sheet and returns the graded result.
#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn submit(&self, job_id: Uuid, answers: &[SubmittedAnswer]) -> anyhow::Result<TestResult>;
}

/// Host hooks for entering and leaving fullscreen. Both are best effort;
/// the runner swallows failures.
pub trait FullscreenControl: Send + Sync {
    fn enter(&self) -> anyhow::Result<()>;
    fn exit(&self) -> anyhow::Result<()>;
}

/// No-op screen control for tests and non-interactive hosts.
#[derive(Debug, Default)]
pub struct HeadlessScreen;

impl FullscreenControl for HeadlessScreen {
    fn enter(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn exit(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// HTTP bank and sink against the placement backend, authenticated with the
/// student's bearer token.
pub struct TestApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TestApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl QuestionBank for TestApiClient {
    async fn fetch(&self, job_id: Uuid) -> anyhow::Result<Value> {
        let url = format!(
            "{}/api/jobs/{}/aptitude-test/questions/public",
            self.base_url, job_id
        );
        info!("Fetching test paper for job {}", job_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ScoreSink for TestApiClient {
    async fn submit(&self, job_id: Uuid, answers: &[SubmittedAnswer]) -> anyhow::Result<TestResult> {
        let url = format!("{}/api/jobs/{}/aptitude-test/submit", self.base_url, job_id);
        let body = serde_json::json!({ "answers": answers });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
