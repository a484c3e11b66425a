use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use log::{info, error};

use crate::config::DatabaseConfig;

use super::models::*;
use super::{PlacementStore, Result, StoreError};
use async_trait::async_trait;

/// Postgres-backed store. Question logs and answer maps live in JSONB
/// columns on the session row; appends go through a revision-guarded UPDATE
/// so concurrent generators cannot assign the same index twice.
#[derive(Debug)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            config.user, config.password, config.host, config.port, config.dbname
        );

        info!(
            "Connecting to database: {}@{}:{}/{}",
            config.user, config.host, config.port, config.dbname
        );

        let mut cfg = Config::new();
        cfg.url = Some(database_url);
        cfg.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::ConnectionFailed(format!("Pool creation failed: {}", e)))?;

        // Test connection
        let _client = pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {}", e)))?;

        info!("Database connection established successfully");

        Ok(PostgresStore { pool })
    }

    /// Creates the placement tables when they do not exist yet. Intended for
    /// development and embedded deployments; production schemas are managed
    /// by the platform's migration pipeline.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS jobs (
                    id UUID PRIMARY KEY,
                    company_id UUID NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    required_skills TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE IF NOT EXISTS applications (
                    id UUID PRIMARY KEY,
                    job_id UUID NOT NULL REFERENCES jobs(id),
                    student_id UUID NOT NULL,
                    student_name TEXT NOT NULL,
                    student_email TEXT NOT NULL,
                    skills TEXT,
                    cgpa DOUBLE PRECISION,
                    backlog INTEGER,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE IF NOT EXISTS interviews (
                    id UUID PRIMARY KEY,
                    application_id UUID NOT NULL UNIQUE,
                    job_id UUID NOT NULL,
                    interview_date TIMESTAMPTZ NOT NULL,
                    mode TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE IF NOT EXISTS interview_sessions (
                    id UUID PRIMARY KEY,
                    interview_id UUID NOT NULL REFERENCES interviews(id),
                    mode TEXT NOT NULL,
                    status TEXT NOT NULL,
                    questions JSONB NOT NULL DEFAULT '[]'::jsonb,
                    answers JSONB NOT NULL DEFAULT '{}'::jsonb,
                    current_question_index INTEGER NOT NULL DEFAULT 0,
                    revision BIGINT NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ
                );

                CREATE TABLE IF NOT EXISTS notifications (
                    id UUID PRIMARY KEY,
                    student_id UUID NOT NULL,
                    job_id UUID,
                    application_id UUID,
                    message TEXT NOT NULL,
                    read BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                "#,
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Schema setup failed: {}", e)))?;

        info!("Placement schema ready");
        Ok(())
    }

    pub async fn insert_job(&self, job: &Job) -> Result<()> {
        self.execute(
            r#"
            INSERT INTO jobs (id, company_id, title, description, required_skills, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            &[
                &job.id,
                &job.company_id,
                &job.title,
                &job.description,
                &job.required_skills,
                &job.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn insert_application(&self, application: &Application) -> Result<()> {
        self.execute(
            r#"
            INSERT INTO applications
                (id, job_id, student_id, student_name, student_email, skills, cgpa, backlog, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            &[
                &application.id,
                &application.job_id,
                &application.student_id,
                &application.student_name,
                &application.student_email,
                &application.skills,
                &application.cgpa,
                &application.backlog,
                &application.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.execute(
            r#"
            INSERT INTO notifications
                (id, student_id, job_id, application_id, message, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            &[
                &notification.id,
                &notification.student_id,
                &notification.job_id,
                &notification.application_id,
                &notification.message,
                &notification.read,
                &notification.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        client.execute(sql, params).await.map_err(|e| {
            error!("Query failed: {}", e);
            StoreError::QueryFailed(e.to_string())
        })
    }

    async fn query_rows(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        client.query(sql, params).await.map_err(|e| {
            error!("Query failed: {}", e);
            StoreError::QueryFailed(e.to_string())
        })
    }

    async fn query_row_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        client.query_opt(sql, params).await.map_err(|e| {
            error!("Query failed: {}", e);
            StoreError::QueryFailed(e.to_string())
        })
    }
}

fn job_from_row(row: &Row) -> Job {
    Job {
        id: row.get("id"),
        company_id: row.get("company_id"),
        title: row.get("title"),
        description: row.get("description"),
        required_skills: row.get("required_skills"),
        created_at: row.get("created_at"),
    }
}

fn application_from_row(row: &Row) -> Application {
    Application {
        id: row.get("id"),
        job_id: row.get("job_id"),
        student_id: row.get("student_id"),
        student_name: row.get("student_name"),
        student_email: row.get("student_email"),
        skills: row.get("skills"),
        cgpa: row.get("cgpa"),
        backlog: row.get("backlog"),
        created_at: row.get("created_at"),
    }
}

fn interview_from_row(row: &Row) -> Result<Interview> {
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    Ok(Interview {
        id: row.get("id"),
        application_id: row.get("application_id"),
        job_id: row.get("job_id"),
        date: row.get("interview_date"),
        mode: InterviewMode::parse(&mode)
            .ok_or_else(|| StoreError::QueryFailed(format!("Unknown interview mode: {}", mode)))?,
        status: InterviewStatus::parse(&status)
            .ok_or_else(|| StoreError::QueryFailed(format!("Unknown interview status: {}", status)))?,
        created_at: row.get("created_at"),
    })
}

fn session_from_row(row: &Row) -> Result<InterviewSession> {
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    let questions: serde_json::Value = row.get("questions");
    let answers: serde_json::Value = row.get("answers");
    let current_question_index: i32 = row.get("current_question_index");

    Ok(InterviewSession {
        id: row.get("id"),
        interview_id: row.get("interview_id"),
        mode: InterviewMode::parse(&mode)
            .ok_or_else(|| StoreError::QueryFailed(format!("Unknown session mode: {}", mode)))?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| StoreError::QueryFailed(format!("Unknown session status: {}", status)))?,
        questions: serde_json::from_value(questions)
            .map_err(|e| StoreError::QueryFailed(format!("Corrupt question log: {}", e)))?,
        answers: serde_json::from_value(answers)
            .map_err(|e| StoreError::QueryFailed(format!("Corrupt answer map: {}", e)))?,
        current_question_index: current_question_index as u32,
        revision: row.get("revision"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    })
}

fn notification_from_row(row: &Row) -> Notification {
    Notification {
        id: row.get("id"),
        student_id: row.get("student_id"),
        job_id: row.get("job_id"),
        application_id: row.get("application_id"),
        message: row.get("message"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    }
}

const SESSION_COLUMNS: &str = "id, interview_id, mode, status, questions, answers, \
     current_question_index, revision, created_at, completed_at";

#[async_trait]
impl PlacementStore for PostgresStore {
    async fn find_job(&self, job_id: Uuid, company_id: Uuid) -> Result<Option<Job>> {
        let row = self
            .query_row_opt(
                r#"
                SELECT id, company_id, title, description, required_skills, created_at
                FROM jobs
                WHERE id = $1 AND company_id = $2
                "#,
                &[&job_id, &company_id],
            )
            .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        application_id: Uuid,
    ) -> Result<Option<Application>> {
        let row = self
            .query_row_opt(
                r#"
                SELECT id, job_id, student_id, student_name, student_email,
                       skills, cgpa, backlog, created_at
                FROM applications
                WHERE id = $1 AND job_id = $2
                "#,
                &[&application_id, &job_id],
            )
            .await?;
        Ok(row.as_ref().map(application_from_row))
    }

    async fn interview_for_application(&self, application_id: Uuid) -> Result<Option<Interview>> {
        let row = self
            .query_row_opt(
                r#"
                SELECT id, application_id, job_id, interview_date, mode, status, created_at
                FROM interviews
                WHERE application_id = $1
                "#,
                &[&application_id],
            )
            .await?;
        row.as_ref().map(interview_from_row).transpose()
    }

    async fn interviews_for_job(&self, job_id: Uuid) -> Result<Vec<Interview>> {
        let rows = self
            .query_rows(
                r#"
                SELECT id, application_id, job_id, interview_date, mode, status, created_at
                FROM interviews
                WHERE job_id = $1
                ORDER BY created_at DESC
                "#,
                &[&job_id],
            )
            .await?;
        rows.iter().map(interview_from_row).collect()
    }

    async fn create_interview(&self, interview: &Interview) -> Result<()> {
        self.execute(
            r#"
            INSERT INTO interviews (id, application_id, job_id, interview_date, mode, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            &[
                &interview.id,
                &interview.application_id,
                &interview.job_id,
                &interview.date,
                &interview.mode.as_str(),
                &interview.status.as_str(),
                &interview.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn set_interview_status(
        &self,
        interview_id: Uuid,
        status: InterviewStatus,
    ) -> Result<()> {
        let rows_affected = self
            .execute(
                "UPDATE interviews SET status = $1 WHERE id = $2",
                &[&status.as_str(), &interview_id],
            )
            .await?;

        if rows_affected == 0 {
            return Err(StoreError::InterviewNotFound(interview_id.to_string()));
        }
        Ok(())
    }

    async fn create_session(&self, session: &InterviewSession) -> Result<()> {
        let questions = serde_json::to_value(&session.questions)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let answers = serde_json::to_value(&session.answers)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        self.execute(
            r#"
            INSERT INTO interview_sessions
                (id, interview_id, mode, status, questions, answers,
                 current_question_index, revision, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            &[
                &session.id,
                &session.interview_id,
                &session.mode.as_str(),
                &session.status.as_str(),
                &questions,
                &answers,
                &(session.current_question_index as i32),
                &session.revision,
                &session.created_at,
                &session.completed_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn sessions_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewSession>> {
        let rows = self
            .query_rows(
                &format!(
                    "SELECT {} FROM interview_sessions WHERE interview_id = $1 ORDER BY created_at DESC",
                    SESSION_COLUMNS
                ),
                &[&interview_id],
            )
            .await?;
        rows.iter().map(session_from_row).collect()
    }

    async fn active_session(&self, interview_id: Uuid) -> Result<Option<InterviewSession>> {
        let row = self
            .query_row_opt(
                &format!(
                    "SELECT {} FROM interview_sessions \
                     WHERE interview_id = $1 AND status = 'ACTIVE' \
                     ORDER BY created_at DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                &[&interview_id],
            )
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn append_question(
        &self,
        session_id: Uuid,
        question: &SessionQuestion,
        expected_revision: i64,
    ) -> Result<InterviewSession> {
        let entry = serde_json::to_value(question)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let row = self
            .query_row_opt(
                &format!(
                    r#"
                    UPDATE interview_sessions
                    SET questions = questions || $1::jsonb,
                        current_question_index = $2,
                        revision = revision + 1
                    WHERE id = $3 AND revision = $4
                    RETURNING {}
                    "#,
                    SESSION_COLUMNS
                ),
                &[
                    &entry,
                    &(question.index as i32),
                    &session_id,
                    &expected_revision,
                ],
            )
            .await?;

        match row {
            Some(row) => session_from_row(&row),
            None => {
                // Zero rows means either a stale revision or a missing session.
                let exists = self
                    .query_row_opt(
                        "SELECT id FROM interview_sessions WHERE id = $1",
                        &[&session_id],
                    )
                    .await?;
                if exists.is_some() {
                    Err(StoreError::RevisionConflict(session_id))
                } else {
                    Err(StoreError::SessionNotFound(session_id.to_string()))
                }
            }
        }
    }

    async fn upsert_answer(&self, session_id: Uuid, answer: &SessionAnswer) -> Result<()> {
        let entry = serde_json::to_value(answer)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let key = answer.question_index.to_string();

        let rows_affected = self
            .execute(
                r#"
                UPDATE interview_sessions
                SET answers = jsonb_set(answers, ARRAY[$1], $2::jsonb)
                WHERE id = $3
                "#,
                &[&key, &entry, &session_id],
            )
            .await?;

        if rows_affected == 0 {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    async fn complete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let rows_affected = self
            .execute(
                r#"
                UPDATE interview_sessions
                SET status = 'COMPLETED', completed_at = $1
                WHERE id = $2
                "#,
                &[&at, &session_id],
            )
            .await?;

        if rows_affected == 0 {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    async fn notifications_for_student(&self, student_id: Uuid) -> Result<Vec<Notification>> {
        let rows = self
            .query_rows(
                r#"
                SELECT id, student_id, job_id, application_id, message, read, created_at
                FROM notifications
                WHERE student_id = $1
                ORDER BY created_at DESC
                "#,
                &[&student_id],
            )
            .await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn mark_notification_read(
        &self,
        student_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification> {
        let row = self
            .query_row_opt(
                r#"
                UPDATE notifications
                SET read = TRUE
                WHERE id = $1 AND student_id = $2
                RETURNING id, student_id, job_id, application_id, message, read, created_at
                "#,
                &[&notification_id, &student_id],
            )
            .await?;

        match row {
            Some(row) => Ok(notification_from_row(&row)),
            None => Err(StoreError::NotificationNotFound(
                notification_id.to_string(),
            )),
        }
    }

    async fn mark_all_notifications_read(&self, student_id: Uuid) -> Result<u64> {
        self.execute(
            "UPDATE notifications SET read = TRUE WHERE student_id = $1 AND read = FALSE",
            &[&student_id],
        )
        .await
    }
}
