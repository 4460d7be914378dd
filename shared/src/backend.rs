use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::stats::{
    OverallStats, SubjectStats, TopBoringSubject, TopPositiveSubject, TrendingSubject,
    VotesPastHour,
};
use crate::{NewSubject, Subject, SubjectId, TagVote, VotePayload};

/// Postgres `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Vote for this subject already exists for this device")]
    AlreadyVoted,

    #[error("Remote call failed with status {status}: {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Can't reach backend: {0}")]
    Transport(String),

    #[error("Can't decode backend response: {0}")]
    Decode(String),

    #[error("Backend is not configured: {0}")]
    NotConfigured(String),
}

/// Error body returned by PostgREST.
#[derive(Deserialize, Debug, Default)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl BackendError {
    pub fn from_response(status: u16, body: &str) -> Self {
        let error = serde_json::from_str::<PostgrestError>(body).unwrap_or_default();

        if error.code.as_deref() == Some(UNIQUE_VIOLATION) {
            return BackendError::AlreadyVoted;
        }

        let message = error
            .message
            .or(error.details)
            .or(error.hint)
            .unwrap_or_else(|| body.trim().to_string());

        BackendError::Remote {
            status,
            code: error.code,
            message,
        }
    }

    pub fn is_already_voted(&self) -> bool {
        matches!(self, BackendError::AlreadyVoted)
    }
}

/// Everything the application asks of the hosted database.
#[async_trait(?Send)]
pub trait RatingBackend {
    async fn fetch_subjects(&self) -> Result<Vec<Subject>, BackendError>;

    async fn insert_subject(&self, subject: &NewSubject) -> Result<(), BackendError>;

    /// Upsert keyed on `(user_id, subject_id)`.
    async fn upsert_vote(&self, vote: &VotePayload) -> Result<(), BackendError>;

    async fn insert_tag_votes(&self, tags: &[TagVote]) -> Result<(), BackendError>;

    async fn subject_stats(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<SubjectStats>, BackendError>;

    async fn overall_stats(&self) -> Result<Option<OverallStats>, BackendError>;

    async fn top_positive(&self) -> Result<Vec<TopPositiveSubject>, BackendError>;

    async fn top_boring(&self) -> Result<Vec<TopBoringSubject>, BackendError>;

    async fn trending_today(&self) -> Result<Vec<TrendingSubject>, BackendError>;

    async fn votes_past_hour(&self) -> Result<Option<VotesPastHour>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_already_voted() {
        let body = r#"{"code":"23505","details":"Key (user_id, subject_id) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"votes_user_subject\""}"#;

        assert_eq!(
            BackendError::from_response(409, body),
            BackendError::AlreadyVoted
        );
    }

    #[test]
    fn other_errors_keep_status_and_message() {
        let body = r#"{"code":"PGRST202","message":"Could not find the function"}"#;

        assert_eq!(
            BackendError::from_response(404, body),
            BackendError::Remote {
                status: 404,
                code: Some("PGRST202".to_string()),
                message: "Could not find the function".to_string(),
            }
        );
    }

    #[test]
    fn non_json_body_becomes_message() {
        let error = BackendError::from_response(502, " Bad Gateway ");

        assert!(!error.is_already_voted());
        assert_eq!(
            error,
            BackendError::Remote {
                status: 502,
                code: None,
                message: "Bad Gateway".to_string(),
            }
        );
    }
}
