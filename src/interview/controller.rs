use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::database::{
    Application, Interview, InterviewMode, InterviewSession, InterviewStatus, PlacementStore,
    SessionAnswer, SessionQuestion, StoreError,
};

use super::service::{GenerationRequest, QuestionGenerator};
use super::{
    CandidateSummary, InterviewError, InterviewSummary, QuestionWithAnswer, SessionView,
    StartedInterview,
};

/// How many times a question append is retried when a concurrent append
/// bumps the session revision first.
const APPEND_RETRY_LIMIT: u32 = 3;

/// Server-side orchestration of company-run interviews: lifecycle, the
/// per-session question log, and answer capture. Callers arrive with an
/// authenticated company identity; job ownership is checked through the
/// store on every operation.
pub struct InterviewController<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
}

impl<S, G> InterviewController<S, G>
where
    S: PlacementStore,
    G: QuestionGenerator,
{
    pub fn new(store: Arc<S>, generator: Arc<G>) -> Self {
        Self { store, generator }
    }

    /// Starts (or re-enters) the interview for an application and always
    /// opens a fresh ACTIVE session with empty logs.
    pub async fn start(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
        mode: &str,
    ) -> Result<StartedInterview, InterviewError> {
        let mode = InterviewMode::parse(mode).ok_or(InterviewError::InvalidMode)?;

        self.store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;
        self.store
            .find_application(job_id, application_id)
            .await?
            .ok_or(InterviewError::ApplicationNotFound)?;

        let interview = match self.store.interview_for_application(application_id).await? {
            Some(existing) => {
                self.store
                    .set_interview_status(existing.id, InterviewStatus::InProgress)
                    .await?;
                Interview {
                    status: InterviewStatus::InProgress,
                    ..existing
                }
            }
            None => {
                let interview = Interview {
                    id: Uuid::new_v4(),
                    application_id,
                    job_id,
                    date: Utc::now(),
                    mode,
                    status: InterviewStatus::InProgress,
                    created_at: Utc::now(),
                };
                self.store.create_interview(&interview).await?;
                interview
            }
        };

        let session = InterviewSession::new(interview.id, mode);
        self.store.create_session(&session).await?;

        info!(
            "🎤 Started {} interview {} (session {})",
            mode, interview.id, session.id
        );

        Ok(StartedInterview { interview, session })
    }

    /// Generates the next question through the external service and appends
    /// it to the current session's log.
    pub async fn generate_question(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<SessionQuestion, InterviewError> {
        let job = self
            .store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;
        let application = self
            .store
            .find_application(job_id, application_id)
            .await?
            .ok_or(InterviewError::ApplicationNotFound)?;

        let interview = self
            .store
            .interview_for_application(application_id)
            .await?
            .ok_or(InterviewError::InterviewNotFound)?;
        let mut session = self
            .store
            .active_session(interview.id)
            .await?
            .ok_or(InterviewError::NoActiveSession)?;

        let request = GenerationRequest {
            mode: session.mode,
            job_title: job.title.clone(),
            job_description: job.description.clone(),
            required_skills: job.required_skill_list(),
            candidate_skills: application.skill_list(),
            candidate_profile: application.candidate_profile(),
            previous_questions: session.question_texts(),
        };

        let text = self
            .generator
            .generate(&request)
            .await
            .map_err(|failure| InterviewError::Generation {
                status: failure.status,
                message: failure.message,
            })?;

        // Append under the revision observed at read time. A conflict means
        // the log advanced concurrently; re-read for a fresh index and try
        // again without calling the generator a second time.
        for attempt in 0..APPEND_RETRY_LIMIT {
            let question = SessionQuestion {
                index: session.question_count(),
                text: text.clone(),
                timestamp: Utc::now(),
            };
            match self
                .store
                .append_question(session.id, &question, session.revision)
                .await
            {
                Ok(_) => {
                    info!(
                        "📝 Question {} appended to session {}",
                        question.index, session.id
                    );
                    return Ok(question);
                }
                Err(StoreError::RevisionConflict(_)) if attempt + 1 < APPEND_RETRY_LIMIT => {
                    warn!(
                        "Session {} advanced concurrently, retrying append",
                        session.id
                    );
                    session = self
                        .store
                        .active_session(interview.id)
                        .await?
                        .ok_or(InterviewError::NoActiveSession)?;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(StoreError::RevisionConflict(session.id).into())
    }

    /// Records an answer against a question index, overwriting any earlier
    /// answer for the same index. Defaults to the session cursor when no
    /// index is given.
    pub async fn submit_answer(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
        answer: &str,
        question_index: Option<i64>,
    ) -> Result<SessionAnswer, InterviewError> {
        if answer.trim().is_empty() {
            return Err(InterviewError::EmptyAnswer);
        }

        self.store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;
        let interview = self
            .store
            .interview_for_application(application_id)
            .await?
            .ok_or(InterviewError::InterviewNotFound)?;
        let session = self
            .store
            .active_session(interview.id)
            .await?
            .ok_or(InterviewError::NoActiveSession)?;

        let target = question_index.unwrap_or_else(|| i64::from(session.current_question_index));
        if target < 0 || target >= i64::from(session.question_count()) {
            return Err(InterviewError::QuestionIndexOutOfRange);
        }

        let recorded = SessionAnswer {
            question_index: target as u32,
            text: answer.to_string(),
            timestamp: Utc::now(),
        };
        self.store.upsert_answer(session.id, &recorded).await?;

        info!(
            "💬 Answer recorded for question {} in session {}",
            recorded.question_index, session.id
        );
        Ok(recorded)
    }

    /// Current-session view: the interview record and its active session,
    /// with the question log joined against recorded answers.
    pub async fn session(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<SessionView, InterviewError> {
        self.store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;
        let application = self
            .store
            .find_application(job_id, application_id)
            .await?
            .ok_or(InterviewError::ApplicationNotFound)?;
        let interview = self
            .store
            .interview_for_application(application_id)
            .await?
            .ok_or(InterviewError::InterviewNotFound)?;
        let session = self
            .store
            .active_session(interview.id)
            .await?
            .ok_or(InterviewError::NoActiveSession)?;

        let questions = session
            .questions
            .iter()
            .map(|q| QuestionWithAnswer {
                index: q.index,
                question: q.text.clone(),
                timestamp: q.timestamp,
                answer: session.answers.get(&q.index).map(|a| a.text.clone()),
            })
            .collect();

        Ok(SessionView {
            interview,
            session_id: session.id,
            mode: session.mode,
            status: session.status,
            current_question_index: session.current_question_index,
            questions,
            candidate: candidate_summary(&application),
        })
    }

    /// Completes the current session, then the interview. With no ACTIVE
    /// session left this fails not-found; completion is not idempotent.
    pub async fn complete(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<(), InterviewError> {
        self.store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;
        let interview = self
            .store
            .interview_for_application(application_id)
            .await?
            .ok_or(InterviewError::InterviewNotFound)?;
        let session = self
            .store
            .active_session(interview.id)
            .await?
            .ok_or(InterviewError::NoActiveSession)?;

        self.store.complete_session(session.id, Utc::now()).await?;
        self.store
            .set_interview_status(interview.id, InterviewStatus::Completed)
            .await?;

        info!("🏁 Interview {} completed (session {})", interview.id, session.id);
        Ok(())
    }

    /// Every interview under a job, newest first, each with its candidate
    /// and full session history.
    pub async fn list_interviews(
        &self,
        company_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<InterviewSummary>, InterviewError> {
        self.store
            .find_job(job_id, company_id)
            .await?
            .ok_or(InterviewError::JobNotFound)?;

        let mut summaries = Vec::new();
        for interview in self.store.interviews_for_job(job_id).await? {
            let candidate = self
                .store
                .find_application(job_id, interview.application_id)
                .await?
                .map(|application| candidate_summary(&application));
            let sessions = self.store.sessions_for_interview(interview.id).await?;
            summaries.push(InterviewSummary {
                interview,
                candidate,
                sessions,
            });
        }
        Ok(summaries)
    }
}

fn candidate_summary(application: &Application) -> CandidateSummary {
    CandidateSummary {
        student_id: application.student_id,
        name: application.student_name.clone(),
        email: application.student_email.clone(),
        skills: application.skill_list(),
        cgpa: application.cgpa,
        backlog: application.backlog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::interview::GenerationFailure;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct ScriptedGenerator {
        requests: Mutex<Vec<GenerationRequest>>,
        failure: Option<GenerationFailure>,
    }

    impl ScriptedGenerator {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                failure: None,
            }
        }

        fn failing(status: Option<u16>, message: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                failure: Some(GenerationFailure {
                    status,
                    message: message.to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl QuestionGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            match &self.failure {
                Some(failure) => Err(failure.clone()),
                None => Ok(format!("Question {}", requests.len())),
            }
        }
    }

    fn seeded_store() -> (Arc<MemoryStore>, Uuid, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let company_id = Uuid::new_v4();
        let job = crate::database::Job {
            id: Uuid::new_v4(),
            company_id,
            title: "Backend Engineer".to_string(),
            description: "Rust services for the placement portal".to_string(),
            required_skills: Some(r#"["Rust","SQL"]"#.to_string()),
            created_at: Utc::now(),
        };
        let application = Application {
            id: Uuid::new_v4(),
            job_id: job.id,
            student_id: Uuid::new_v4(),
            student_name: "Asha Rao".to_string(),
            student_email: "asha@example.edu".to_string(),
            skills: Some(r#"["Rust"]"#.to_string()),
            cgpa: Some(8.2),
            backlog: None,
            created_at: Utc::now(),
        };
        let job_id = job.id;
        let application_id = application.id;
        store.put_job(job);
        store.put_application(application);
        (store, company_id, job_id, application_id)
    }

    fn controller(
        store: Arc<MemoryStore>,
        generator: ScriptedGenerator,
    ) -> InterviewController<MemoryStore, ScriptedGenerator> {
        InterviewController::new(store, Arc::new(generator))
    }

    #[tokio::test]
    async fn test_invalid_mode_is_rejected() {
        let (store, company, job, app) = seeded_store();
        let c = controller(store, ScriptedGenerator::new());

        let err = c.start(company, job, app, "fullstack").await.unwrap_err();
        assert!(matches!(err, InterviewError::InvalidMode));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);

        // Lowercase is fine.
        let started = c.start(company, job, app, "hr").await.unwrap();
        assert_eq!(started.session.mode, InterviewMode::Hr);
    }

    #[tokio::test]
    async fn test_empty_answer_and_bad_indices_fail_validation() {
        let (store, company, job, app) = seeded_store();
        let c = controller(store, ScriptedGenerator::new());
        c.start(company, job, app, "TECH").await.unwrap();

        // No questions yet, so even the default index is out of range.
        let err = c
            .submit_answer(company, job, app, "An answer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::QuestionIndexOutOfRange));

        c.generate_question(company, job, app).await.unwrap();

        let err = c
            .submit_answer(company, job, app, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::EmptyAnswer));

        let err = c
            .submit_answer(company, job, app, "An answer", Some(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::QuestionIndexOutOfRange));

        let err = c
            .submit_answer(company, job, app, "An answer", Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::QuestionIndexOutOfRange));
    }

    #[tokio::test]
    async fn test_generation_failure_preserves_downstream_status() {
        let (store, company, job, app) = seeded_store();
        let c = controller(store, ScriptedGenerator::failing(Some(503), "Service busy"));
        c.start(company, job, app, "TECH").await.unwrap();

        let err = c.generate_question(company, job, app).await.unwrap_err();
        match &err {
            InterviewError::Generation { status, message } => {
                assert_eq!(*status, Some(503));
                assert_eq!(message, "Service busy");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.kind(), crate::error::ErrorKind::Upstream);
        assert_eq!(err.status(), 503);

        // Nothing was appended.
        let view = c.session(company, job, app).await.unwrap();
        assert!(view.questions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (store, company, _job, app) = seeded_store();
        let c = controller(store, ScriptedGenerator::new());

        let err = c
            .start(company, Uuid::new_v4(), app, "TECH")
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::JobNotFound));
        assert_eq!(err.status(), 404);
    }
}
