pub mod api;
pub mod monitor;
pub mod runner;
pub mod timer;

pub use api::{FullscreenControl, HeadlessScreen, QuestionBank, ScoreSink, TestApiClient};
pub use monitor::{IntegrityMonitor, SignalOutcome};
pub use runner::{SubmitOutcome, TestRunner};
pub use timer::CountdownTimer;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;

/// Section of a test paper as served by the placement backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSection {
    pub title: String,
    pub questions: Vec<TestQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestQuestion {
    pub id: Uuid,
    #[serde(rename = "questionText")]
    pub text: String,
    pub options: Vec<String>,
}

/// Graded outcome returned by the scoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub score: i32,
    #[serde(rename = "maxScore")]
    pub max_score: i32,
    pub passed: bool,
}

/// One row of the submission payload. `selected_index` is `-1` for
/// questions never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    #[serde(rename = "questionId")]
    pub question_id: Uuid,
    #[serde(rename = "selectedIndex")]
    pub selected_index: i32,
}

/// Why a submission fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitReason {
    Manual,
    Timeout,
    ViolationLimit,
    SecurityModal,
}

impl SubmitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitReason::Manual => "manual",
            SubmitReason::Timeout => "timeout",
            SubmitReason::ViolationLimit => "violation-limit",
            SubmitReason::SecurityModal => "security-modal",
        }
    }
}

/// Keyboard shortcuts the proctored surface blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedKey {
    DevTools,
    ViewSource,
    Copy,
    Cut,
    Paste,
    SelectAll,
}

/// Signals the host surface reports to the integrity monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegritySignal {
    BlockedKey(BlockedKey),
    VisibilityLost,
    FocusLost,
    FullscreenExit,
}

/// Non-blocking warning shown while the violation count stays within the
/// allowed limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecurityWarning {
    pub violations: u32,
    pub remaining: u32,
}

#[derive(Error, Debug)]
pub enum ProctorError {
    #[error("Failed to load test: {0}")]
    LoadFailed(String),
    #[error("Test payload is malformed: {0}")]
    MalformedPaper(String),
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("No test loaded")]
    NotLoaded,
    #[error("Runner is closed")]
    Closed,
}

impl ProctorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProctorError::LoadFailed(_) | ProctorError::SubmissionFailed(_) => ErrorKind::Upstream,
            ProctorError::MalformedPaper(_) | ProctorError::NotLoaded => ErrorKind::Validation,
            ProctorError::Closed => ErrorKind::Internal,
        }
    }
}
