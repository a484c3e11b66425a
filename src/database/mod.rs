pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{
    Application, Interview, InterviewMode, InterviewSession, InterviewStatus, Job, Notification,
    SessionAnswer, SessionQuestion, SessionStatus,
};
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Interview not found: {0}")]
    InterviewNotFound(String),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Notification not found: {0}")]
    NotificationNotFound(String),
    #[error("Stale revision for session {0}")]
    RevisionConflict(Uuid),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable store behind the interview controller and notification feed.
///
/// Each method is individually atomic; callers re-read state per operation
/// and never hold cross-call transactions.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn find_job(&self, job_id: Uuid, company_id: Uuid) -> Result<Option<Job>>;
    async fn find_application(
        &self,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<Option<Application>>;

    async fn interview_for_application(&self, application_id: Uuid) -> Result<Option<Interview>>;
    /// Newest first.
    async fn interviews_for_job(&self, job_id: Uuid) -> Result<Vec<Interview>>;
    async fn create_interview(&self, interview: &Interview) -> Result<()>;
    async fn set_interview_status(
        &self,
        interview_id: Uuid,
        status: InterviewStatus,
    ) -> Result<()>;

    async fn create_session(&self, session: &InterviewSession) -> Result<()>;
    /// Newest first.
    async fn sessions_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>>;
    /// The most recently created ACTIVE session, if any.
    async fn active_session(&self, interview_id: Uuid) -> Result<Option<InterviewSession>>;
    /// Appends a question and advances the cursor, guarded by the session's
    /// revision counter. `RevisionConflict` means another append landed
    /// first; re-read and try again.
    async fn append_question(
        &self,
        session_id: Uuid,
        question: &SessionQuestion,
        expected_revision: i64,
    ) -> Result<InterviewSession>;
    /// Records an answer by question index, overwriting any earlier one.
    async fn upsert_answer(&self, session_id: Uuid, answer: &SessionAnswer) -> Result<()>;
    async fn complete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Newest first.
    async fn notifications_for_student(&self, student_id: Uuid) -> Result<Vec<Notification>>;
    /// Flips the read flag; a notification owned by another student reports
    /// `NotificationNotFound`.
    async fn mark_notification_read(
        &self,
        student_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification>;
    /// Returns how many unread notifications were flipped.
    async fn mark_all_notifications_read(&self, student_id: Uuid) -> Result<u64>;
}
