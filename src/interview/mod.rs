pub mod controller;
pub mod service;

pub use controller::InterviewController;
pub use service::{
    GenerationFailure, GenerationRequest, InterviewServiceClient, QuestionGenerator,
};

use serde::Serialize;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::database::{Interview, InterviewMode, InterviewSession, SessionStatus, StoreError};
use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("Job not found")]
    JobNotFound,
    #[error("Application not found")]
    ApplicationNotFound,
    #[error("Interview not found")]
    InterviewNotFound,
    #[error("No active interview session found")]
    NoActiveSession,
    #[error("Mode must be TECH or HR")]
    InvalidMode,
    #[error("Answer is required")]
    EmptyAnswer,
    #[error("Invalid question index")]
    QuestionIndexOutOfRange,
    #[error("Failed to generate question: {message}")]
    Generation {
        status: Option<u16>,
        message: String,
    },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InterviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InterviewError::JobNotFound
            | InterviewError::ApplicationNotFound
            | InterviewError::InterviewNotFound
            | InterviewError::NoActiveSession => ErrorKind::NotFound,
            InterviewError::InvalidMode
            | InterviewError::EmptyAnswer
            | InterviewError::QuestionIndexOutOfRange => ErrorKind::Validation,
            InterviewError::Generation { .. } => ErrorKind::Upstream,
            InterviewError::Store(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status a transport should answer with. Generation failures keep
    /// the downstream status when one was observed.
    pub fn status(&self) -> u16 {
        match self {
            InterviewError::JobNotFound
            | InterviewError::ApplicationNotFound
            | InterviewError::InterviewNotFound
            | InterviewError::NoActiveSession => 404,
            InterviewError::InvalidMode
            | InterviewError::EmptyAnswer
            | InterviewError::QuestionIndexOutOfRange => 400,
            InterviewError::Generation { status, .. } => status.unwrap_or(500),
            InterviewError::Store(_) => 500,
        }
    }
}

/// Result of starting (or re-entering) an interview.
#[derive(Debug, Clone, Serialize)]
pub struct StartedInterview {
    pub interview: Interview,
    pub session: InterviewSession,
}

/// Student block embedded in session and listing views.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: Option<Vec<String>>,
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
}

/// One question joined with its recorded answer, `None` while unanswered.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithAnswer {
    pub index: u32,
    pub question: String,
    pub timestamp: DateTime<Utc>,
    pub answer: Option<String>,
}

/// Everything a company dashboard renders for the current session: the
/// interview record plus the question log joined with answers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub interview: Interview,
    pub session_id: Uuid,
    pub mode: InterviewMode,
    pub status: SessionStatus,
    pub current_question_index: u32,
    pub questions: Vec<QuestionWithAnswer>,
    pub candidate: CandidateSummary,
}

/// Interview row in the per-job listing, with full session history.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub interview: Interview,
    pub candidate: Option<CandidateSummary>,
    pub sessions: Vec<InterviewSession>,
}
