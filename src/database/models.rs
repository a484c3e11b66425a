use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Interview track requested by the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewMode {
    #[serde(rename = "TECH")]
    Tech,
    #[serde(rename = "HR")]
    Hr,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Tech => "TECH",
            InterviewMode::Hr => "HR",
        }
    }

    /// Accepts any casing.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "TECH" => Some(InterviewMode::Tech),
            "HR" => Some(InterviewMode::Hr),
            _ => None,
        }
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewStatus {
    #[serde(rename = "SCHEDULED")]
    Scheduled,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "SCHEDULED",
            InterviewStatus::InProgress => "IN_PROGRESS",
            InterviewStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULED" => Some(InterviewStatus::Scheduled),
            "IN_PROGRESS" => Some(InterviewStatus::InProgress),
            "COMPLETED" => Some(InterviewStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACTIVE" => Some(SessionStatus::Active),
            "COMPLETED" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// Job posting owned by a company. Placement intake creates these; the
/// interview flow only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    /// JSON-encoded string array, as the intake pipeline stores it.
    pub required_skills: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Parsed skill list; empty when the field is absent or unparseable.
    pub fn required_skill_list(&self) -> Vec<String> {
        self.required_skills
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// A student's application to a job, denormalized with the display fields
/// interview views need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    /// JSON-encoded string array of self-reported skills.
    pub skills: Option<String>,
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// Parsed skill list, `None` when the student never filled one in.
    pub fn skill_list(&self) -> Option<Vec<String>> {
        self.skills
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// One-line academic profile used to steer HR question generation.
    pub fn candidate_profile(&self) -> String {
        let cgpa = self
            .cgpa
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "Student with CGPA: {}, Backlogs: {}",
            cgpa,
            self.backlog.unwrap_or(0)
        )
    }
}

/// One interview per application. Re-entering an existing interview flips it
/// back to IN_PROGRESS rather than creating a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub date: DateTime<Utc>,
    pub mode: InterviewMode,
    pub status: InterviewStatus,
    pub created_at: DateTime<Utc>,
}

/// One generated question in a session's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub index: u32,
    #[serde(rename = "question")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Answer recorded against a question index. Resubmission overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnswer {
    #[serde(rename = "questionIndex")]
    pub question_index: u32,
    #[serde(rename = "answer")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A single sitting of an interview. Sessions accumulate over re-entries;
/// the most recently created ACTIVE one is the addressable current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub mode: InterviewMode,
    pub status: SessionStatus,
    pub questions: Vec<SessionQuestion>,
    /// Keyed by question index, so upserts never scan the log.
    pub answers: BTreeMap<u32, SessionAnswer>,
    pub current_question_index: u32,
    /// Bumped on every question append; the optimistic check for
    /// read-modify-append callers.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn new(interview_id: Uuid, mode: InterviewMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            interview_id,
            mode,
            status: SessionStatus::Active,
            questions: Vec::new(),
            answers: BTreeMap::new(),
            current_question_index: 0,
            revision: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn question_count(&self) -> u32 {
        self.questions.len() as u32
    }

    /// Texts of every question generated so far, oldest first.
    pub fn question_texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.text.clone()).collect()
    }
}

/// Placement event surfaced to a student. Created elsewhere in the platform;
/// this crate only lists them and flips the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub student_id: Uuid,
    pub job_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> Application {
        Application {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            student_name: "Asha Rao".to_string(),
            student_email: "asha@example.edu".to_string(),
            skills: Some(r#"["Rust","SQL"]"#.to_string()),
            cgpa: Some(8.4),
            backlog: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_mode_parsing_is_case_insensitive() {
        assert_eq!(InterviewMode::parse("tech"), Some(InterviewMode::Tech));
        assert_eq!(InterviewMode::parse("Hr"), Some(InterviewMode::Hr));
        assert_eq!(InterviewMode::parse(" TECH "), Some(InterviewMode::Tech));
        assert_eq!(InterviewMode::parse("fullstack"), None);
        assert_eq!(InterviewMode::parse(""), None);
    }

    #[test]
    fn test_candidate_profile_fills_gaps() {
        let mut app = application();
        assert_eq!(app.candidate_profile(), "Student with CGPA: 8.4, Backlogs: 0");

        app.cgpa = None;
        app.backlog = Some(2);
        assert_eq!(app.candidate_profile(), "Student with CGPA: N/A, Backlogs: 2");
    }

    #[test]
    fn test_skill_lists_tolerate_missing_fields() {
        let mut app = application();
        assert_eq!(
            app.skill_list(),
            Some(vec!["Rust".to_string(), "SQL".to_string()])
        );
        app.skills = None;
        assert_eq!(app.skill_list(), None);

        let job = Job {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            description: "Rust services".to_string(),
            required_skills: None,
            created_at: Utc::now(),
        };
        assert!(job.required_skill_list().is_empty());
    }

    #[test]
    fn test_question_log_serializes_with_wire_names() {
        let question = SessionQuestion {
            index: 0,
            text: "Tell me about ownership in Rust.".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&question).unwrap();
        assert!(value.get("question").is_some());
        assert!(value.get("text").is_none());

        let answer = SessionAnswer {
            question_index: 0,
            text: "Each value has a single owner.".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&answer).unwrap();
        assert!(value.get("questionIndex").is_some());
        assert!(value.get("answer").is_some());
    }
}
