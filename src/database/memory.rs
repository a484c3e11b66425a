use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::models::*;
use super::{PlacementStore, Result, StoreError};

/// In-process store used by tests and embedded wiring.
///
/// Interviews, sessions and notifications live in insertion-ordered vectors
/// (insertion order is creation order); jobs and applications are keyed
/// lookups. Every trait method locks, mutates and releases before
/// returning, which gives the same per-call atomicity the Postgres store
/// gets from single statements.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, Application>,
    interviews: Vec<Interview>,
    sessions: Vec<InterviewSession>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_job(&self, job: Job) {
        self.inner.lock().jobs.insert(job.id, job);
    }

    pub fn put_application(&self, application: Application) {
        self.inner
            .lock()
            .applications
            .insert(application.id, application);
    }

    pub fn put_notification(&self, notification: Notification) {
        self.inner.lock().notifications.push(notification);
    }
}

#[async_trait]
impl PlacementStore for MemoryStore {
    async fn find_job(&self, job_id: Uuid, company_id: Uuid) -> Result<Option<Job>> {
        let inner = self.inner.lock();
        Ok(inner
            .jobs
            .get(&job_id)
            .filter(|job| job.company_id == company_id)
            .cloned())
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<Option<Application>> {
        let inner = self.inner.lock();
        Ok(inner
            .applications
            .get(&application_id)
            .filter(|application| application.job_id == job_id)
            .cloned())
    }

    async fn interview_for_application(&self, application_id: Uuid) -> Result<Option<Interview>> {
        let inner = self.inner.lock();
        Ok(inner
            .interviews
            .iter()
            .find(|interview| interview.application_id == application_id)
            .cloned())
    }

    async fn interviews_for_job(&self, job_id: Uuid) -> Result<Vec<Interview>> {
        let inner = self.inner.lock();
        let mut rows: Vec<Interview> = inner
            .interviews
            .iter()
            .filter(|interview| interview.job_id == job_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn create_interview(&self, interview: &Interview) -> Result<()> {
        let mut inner = self.inner.lock();
        // One interview per application, like the UNIQUE constraint on the
        // Postgres table.
        if inner
            .interviews
            .iter()
            .any(|existing| existing.application_id == interview.application_id)
        {
            return Err(StoreError::QueryFailed(format!(
                "Interview already exists for application {}",
                interview.application_id
            )));
        }
        inner.interviews.push(interview.clone());
        Ok(())
    }

    async fn set_interview_status(
        &self,
        interview_id: Uuid,
        status: InterviewStatus,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner
            .interviews
            .iter_mut()
            .find(|interview| interview.id == interview_id)
        {
            Some(interview) => {
                interview.status = status;
                Ok(())
            }
            None => Err(StoreError::InterviewNotFound(interview_id.to_string())),
        }
    }

    async fn create_session(&self, session: &InterviewSession) -> Result<()> {
        self.inner.lock().sessions.push(session.clone());
        Ok(())
    }

    async fn sessions_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>> {
        let inner = self.inner.lock();
        let mut rows: Vec<InterviewSession> = inner
            .sessions
            .iter()
            .filter(|session| session.interview_id == interview_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn active_session(&self, interview_id: Uuid) -> Result<Option<InterviewSession>> {
        let inner = self.inner.lock();
        Ok(inner
            .sessions
            .iter()
            .rev()
            .find(|session| {
                session.interview_id == interview_id && session.status == SessionStatus::Active
            })
            .cloned())
    }

    async fn append_question(
        &self,
        session_id: Uuid,
        question: &SessionQuestion,
        expected_revision: i64,
    ) -> Result<InterviewSession> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|session| session.id == session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        if session.revision != expected_revision {
            return Err(StoreError::RevisionConflict(session_id));
        }

        session.questions.push(question.clone());
        session.current_question_index = question.index;
        session.revision += 1;
        Ok(session.clone())
    }

    async fn upsert_answer(&self, session_id: Uuid, answer: &SessionAnswer) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|session| session.id == session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        session.answers.insert(answer.question_index, answer.clone());
        Ok(())
    }

    async fn complete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|session| session.id == session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        session.status = SessionStatus::Completed;
        session.completed_at = Some(at);
        Ok(())
    }

    async fn notifications_for_student(&self, student_id: Uuid) -> Result<Vec<Notification>> {
        let inner = self.inner.lock();
        let mut rows: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|notification| notification.student_id == student_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn mark_notification_read(
        &self,
        student_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification> {
        let mut inner = self.inner.lock();
        match inner.notifications.iter_mut().find(|notification| {
            notification.id == notification_id && notification.student_id == student_id
        }) {
            Some(notification) => {
                notification.read = true;
                Ok(notification.clone())
            }
            None => Err(StoreError::NotificationNotFound(
                notification_id.to_string(),
            )),
        }
    }

    async fn mark_all_notifications_read(&self, student_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.lock();
        let mut updated = 0;
        for notification in inner
            .notifications
            .iter_mut()
            .filter(|notification| notification.student_id == student_id && !notification.read)
        {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}
