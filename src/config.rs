use std::env;
use std::time::Duration;

use log::info;

/// Runtime configuration assembled from the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the external question-generation service.
    pub interview_service_url: String,
    /// Base URL of the placement backend serving test papers and scoring.
    pub placement_api_url: String,
    /// Upper bound for a single generate-question round trip.
    pub generation_timeout: Duration,
    pub proctor: ProctorPolicy,
    pub database: DatabaseConfig,
}

/// Client-side proctoring policy.
#[derive(Debug, Clone, Copy)]
pub struct ProctorPolicy {
    /// Violations beyond this count trigger automatic submission.
    pub violation_limit: u32,
    /// Per-question slice of the overall time budget, in seconds.
    pub seconds_per_question: u64,
}

impl Default for ProctorPolicy {
    fn default() -> Self {
        Self {
            violation_limit: 2,
            seconds_per_question: 60,
        }
    }
}

impl ProctorPolicy {
    /// Overall time budget for a paper with `question_count` questions.
    pub fn time_budget(&self, question_count: usize) -> u64 {
        question_count as u64 * self.seconds_per_question
    }
}

/// Connection parameters for the Postgres-backed store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl AppConfig {
    /// Loads configuration from the environment, falling back to local
    /// development defaults. A `.env` file is honored when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let interview_service_url = env::var("INTERVIEW_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:8001".to_string());
        let placement_api_url =
            env::var("PLACEMENT_API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
        let generation_timeout_secs = env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let violation_limit = env::var("VIOLATION_LIMIT")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);
        let seconds_per_question = env::var("SECONDS_PER_QUESTION")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let database = DatabaseConfig {
            host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DB_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()
                .unwrap_or(5432),
            dbname: env::var("DB_NAME").unwrap_or_else(|_| "placemate_db".to_string()),
            user: env::var("DB_USER").unwrap_or_else(|_| "placemate_user".to_string()),
            password: env::var("DB_PASSWORD").unwrap_or_else(|_| "".to_string()),
        };

        info!(
            "Configuration loaded (interview service: {}, placement api: {})",
            interview_service_url, placement_api_url
        );

        Self {
            interview_service_url,
            placement_api_url,
            generation_timeout: Duration::from_secs(generation_timeout_secs),
            proctor: ProctorPolicy {
                violation_limit,
                seconds_per_question,
            },
            database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_product_rules() {
        let policy = ProctorPolicy::default();
        assert_eq!(policy.violation_limit, 2);
        assert_eq!(policy.seconds_per_question, 60);
    }

    #[test]
    fn time_budget_scales_with_question_count() {
        let policy = ProctorPolicy::default();
        assert_eq!(policy.time_budget(0), 0);
        assert_eq!(policy.time_budget(4), 240);
        assert_eq!(policy.time_budget(25), 1500);
    }
}
