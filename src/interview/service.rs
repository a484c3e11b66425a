use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::database::InterviewMode;

/// Body POSTed to the generation service's `/generate-question` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub mode: InterviewMode,
    pub job_title: String,
    pub job_description: String,
    pub required_skills: Vec<String>,
    pub candidate_skills: Option<Vec<String>>,
    pub candidate_profile: String,
    pub previous_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Failure surfaced by the generation collaborator. `status` carries the
/// downstream HTTP status when the service answered at all.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct GenerationFailure {
    pub status: Option<u16>,
    pub message: String,
}

/// Produces the next interview question for a session's context.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure>;
}

/// HTTP client for the external AI question-generation service. One request
/// must finish inside the configured timeout; the caller surfaces anything
/// slower as a generation failure.
pub struct InterviewServiceClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl InterviewServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.interview_service_url.clone(),
            config.generation_timeout,
        )
    }
}

#[async_trait]
impl QuestionGenerator for InterviewServiceClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let url = format!("{}/generate-question", self.base_url);
        info!(
            "Requesting {} question ({} previous)",
            request.mode,
            request.previous_questions.len()
        );

        let response = self
            .client
            .post(&url)
            // Holds even when the builder fell back to a default client.
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationFailure {
                status: None,
                message: format!("Interview service unreachable: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<GenerationResponse>().await {
                Ok(body) => body
                    .error
                    .unwrap_or_else(|| "Failed to generate question".to_string()),
                Err(_) => "Failed to generate question".to_string(),
            };
            error!("Interview service returned {}: {}", status, message);
            return Err(GenerationFailure {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: GenerationResponse =
            response.json().await.map_err(|e| GenerationFailure {
                status: None,
                message: format!("Invalid generation response: {}", e),
            })?;

        match body.question {
            Some(question) if body.success => Ok(question),
            _ => Err(GenerationFailure {
                status: Some(500),
                message: body
                    .error
                    .unwrap_or_else(|| "Failed to generate question".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_keeps_the_configured_timeout() {
        let client = InterviewServiceClient::new("http://localhost:8001", Duration::from_secs(30));
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_request_serializes_with_snake_case_fields() {
        let request = GenerationRequest {
            mode: InterviewMode::Tech,
            job_title: "Backend Engineer".to_string(),
            job_description: "Rust services".to_string(),
            required_skills: vec!["Rust".to_string()],
            candidate_skills: None,
            candidate_profile: "Student with CGPA: 8.4, Backlogs: 0".to_string(),
            previous_questions: vec!["Explain ownership.".to_string()],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["mode"], "TECH");
        assert_eq!(value["job_title"], "Backend Engineer");
        assert!(value["candidate_skills"].is_null());
        assert_eq!(value["previous_questions"][0], "Explain ownership.");
    }

    #[test]
    fn test_response_tolerates_partial_bodies() {
        let body: GenerationResponse = serde_json::from_str(r#"{"success": true, "question": "Q1"}"#).unwrap();
        assert!(body.success);
        assert_eq!(body.question.as_deref(), Some("Q1"));
        assert!(body.error.is_none());

        let body: GenerationResponse = serde_json::from_str(r#"{"error": "Mode must be TECH or HR"}"#).unwrap();
        assert!(!body.success);
        assert!(body.question.is_none());
        assert_eq!(body.error.as_deref(), Some("Mode must be TECH or HR"));
    }
}
