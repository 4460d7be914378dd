//! Supabase PostgREST calls described independently of the HTTP client.
//!
//! The browser and the native client each provide a [`Transport`]; the
//! endpoints, headers and decoding live here once.

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{BackendError, RatingBackend};
use crate::stats::{
    OverallStats, SubjectStats, TopBoringSubject, TopPositiveSubject, TrendingSubject,
    VotesPastHour,
};
use crate::{NewSubject, Subject, SubjectId, TagVote, VotePayload};

/// Conflict target of the canonical vote upsert.
pub const VOTE_CONFLICT_TARGET: &str = "user_id,subject_id";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, BackendError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let anon_key = anon_key.into().trim().to_string();

        if url.is_empty() || anon_key.is_empty() {
            return Err(BackendError::NotConfigured(
                "Missing Supabase environment variables".to_string(),
            ));
        }

        Ok(Self { url, anon_key })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_result(self) -> Result<String, BackendError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(BackendError::from_response(self.status, &self.body))
        }
    }
}

#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, BackendError>;
}

#[derive(Serialize)]
struct SubjectStatsParams<'a> {
    subject_uuid: &'a SubjectId,
}

pub struct SupabaseRest<T> {
    config: SupabaseConfig,
    transport: T,
}

impl<T: Transport> SupabaseRest<T> {
    pub fn new(config: SupabaseConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RestRequest {
        RestRequest {
            method,
            url: format!("{}/rest/v1/{path}", self.config.url),
            headers: vec![
                ("apikey", self.config.anon_key.clone()),
                ("Authorization", format!("Bearer {}", self.config.anon_key)),
                ("Accept", "application/json".to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: None,
        }
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        prefer: &'static str,
    ) -> Result<RestRequest, BackendError> {
        let mut request = self.request(Method::Post, path);
        request.headers.push(("Prefer", prefer.to_string()));
        request.body =
            Some(serde_json::to_string(body).map_err(|e| BackendError::Decode(e.to_string()))?);
        Ok(request)
    }

    pub fn subjects_request(&self) -> RestRequest {
        self.request(Method::Get, "subjects?select=*&order=created_at.asc")
    }

    pub fn vote_request(&self, vote: &VotePayload) -> Result<RestRequest, BackendError> {
        self.post(
            &format!("votes?on_conflict={VOTE_CONFLICT_TARGET}"),
            std::slice::from_ref(vote),
            "resolution=merge-duplicates,return=minimal",
        )
    }

    pub fn rpc_request<P: Serialize>(
        &self,
        function: &str,
        params: &P,
    ) -> Result<RestRequest, BackendError> {
        self.post(&format!("rpc/{function}"), params, "return=representation")
    }

    async fn execute(&self, request: RestRequest) -> Result<String, BackendError> {
        tracing::debug!(method = %request.method, url = %request.url, "supabase request");
        self.transport.send(request).await?.into_result()
    }

    async fn execute_json<R: DeserializeOwned>(
        &self,
        request: RestRequest,
    ) -> Result<R, BackendError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Table-returning functions answer with an array; the first row is the value.
    async fn rpc_first<R: DeserializeOwned>(
        &self,
        function: &str,
    ) -> Result<Option<R>, BackendError> {
        let rows = self.rpc_rows(function).await?;
        Ok(rows.into_iter().next())
    }

    async fn rpc_rows<R: DeserializeOwned>(&self, function: &str) -> Result<Vec<R>, BackendError> {
        let request = self.rpc_request(function, &json!({}))?;
        let rows: Option<Vec<R>> = self.execute_json(request).await?;
        Ok(rows.unwrap_or_default())
    }
}

#[async_trait(?Send)]
impl<T: Transport> RatingBackend for SupabaseRest<T> {
    async fn fetch_subjects(&self) -> Result<Vec<Subject>, BackendError> {
        let subjects: Option<Vec<Subject>> = self.execute_json(self.subjects_request()).await?;
        Ok(subjects.unwrap_or_default())
    }

    async fn insert_subject(&self, subject: &NewSubject) -> Result<(), BackendError> {
        let request = self.post("subjects", subject, "return=minimal")?;
        self.execute(request).await.map(|_| ())
    }

    async fn upsert_vote(&self, vote: &VotePayload) -> Result<(), BackendError> {
        let request = self.vote_request(vote)?;
        self.execute(request).await.map(|_| ())
    }

    async fn insert_tag_votes(&self, tags: &[TagVote]) -> Result<(), BackendError> {
        if tags.is_empty() {
            return Ok(());
        }

        let request = self.post("tag_votes", tags, "return=minimal")?;
        self.execute(request).await.map(|_| ())
    }

    async fn subject_stats(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<SubjectStats>, BackendError> {
        let params = SubjectStatsParams {
            subject_uuid: subject,
        };
        let rows: Option<Vec<SubjectStats>> = self
            .execute_json(self.rpc_request("get_subject_stats", &params)?)
            .await?;

        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn overall_stats(&self) -> Result<Option<OverallStats>, BackendError> {
        self.rpc_first("get_overall_stats").await
    }

    async fn top_positive(&self) -> Result<Vec<TopPositiveSubject>, BackendError> {
        self.rpc_rows("get_top_3_positive_subjects").await
    }

    async fn top_boring(&self) -> Result<Vec<TopBoringSubject>, BackendError> {
        self.rpc_rows("get_top_3_boring_subjects").await
    }

    async fn trending_today(&self) -> Result<Vec<TrendingSubject>, BackendError> {
        self.rpc_rows("get_todays_top_3_subjects").await
    }

    async fn votes_past_hour(&self) -> Result<Option<VotesPastHour>, BackendError> {
        self.rpc_first("get_votes_past_hour").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VoteValue, VoteWeight};
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;

    /// Records requests and answers each with the next queued response.
    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<RestRequest>>,
        responses: RefCell<Vec<RestResponse>>,
    }

    impl Recorder {
        fn answering(status: u16, body: &str) -> Self {
            let recorder = Recorder::default();
            recorder.responses.borrow_mut().push(RestResponse {
                status,
                body: body.to_string(),
            });
            recorder
        }
    }

    #[async_trait(?Send)]
    impl<'a> Transport for &'a Recorder {
        async fn send(&self, request: RestRequest) -> Result<RestResponse, BackendError> {
            self.sent.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop()
                .ok_or_else(|| BackendError::Transport("no response queued".to_string()))
        }
    }

    fn config() -> SupabaseConfig {
        SupabaseConfig::new("https://demo.supabase.co/", "anon").unwrap()
    }

    fn vote() -> VotePayload {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        VotePayload {
            user_id: "device".to_string(),
            subject_id: SubjectId::from("s1"),
            vote_value: VoteValue::LovedIt,
            vote_weight: VoteWeight::Double,
            feedback: None,
            created_at: now,
            updated_at: now,
            fingerprint_id: None,
        }
    }

    #[test]
    fn config_requires_url_and_key() {
        assert!(SupabaseConfig::new("", "key").is_err());
        assert!(SupabaseConfig::new("https://x.supabase.co", " ").is_err());
        assert_eq!(config().url, "https://demo.supabase.co");
    }

    #[test]
    fn vote_is_an_upsert_on_device_and_subject() {
        let recorder = Recorder::default();
        let rest = SupabaseRest::new(config(), &recorder);

        let request = rest.vote_request(&vote()).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.url,
            "https://demo.supabase.co/rest/v1/votes?on_conflict=user_id,subject_id"
        );
        assert!(request
            .headers
            .contains(&("Prefer", "resolution=merge-duplicates,return=minimal".to_string())));

        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body[0]["vote_value"], 1);
        assert_eq!(body[0]["vote_weight"], 2);
        assert!(body[0]["feedback"].is_null());
    }

    #[tokio::test]
    async fn subject_stats_reads_first_row() {
        let recorder = Recorder::answering(
            200,
            r#"[{"subject_id":"s1","subject_name":"Calculus","total_votes":4,"average_vote":0.5,
                "vote_distribution":{"-2":1,"-1":0,"1":2,"2":1},"tags":{"easy":3,"hard":1}}]"#,
        );
        let rest = SupabaseRest::new(config(), &recorder);

        let stats = rest.subject_stats(&SubjectId::from("s1")).await.unwrap().unwrap();

        assert_eq!(stats.top_tags(), vec!["easy", "hard"]);
        let sent = recorder.sent.borrow();
        assert_eq!(sent[0].url, "https://demo.supabase.co/rest/v1/rpc/get_subject_stats");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"subject_uuid":"s1"}"#));
    }

    #[tokio::test]
    async fn duplicate_vote_surfaces_as_already_voted() {
        let recorder = Recorder::answering(409, r#"{"code":"23505","message":"duplicate key"}"#);
        let rest = SupabaseRest::new(config(), &recorder);

        let err = rest.upsert_vote(&vote()).await.unwrap_err();
        assert!(err.is_already_voted());
    }

    #[tokio::test]
    async fn empty_tag_list_sends_nothing() {
        let recorder = Recorder::default();
        let rest = SupabaseRest::new(config(), &recorder);

        rest.insert_tag_votes(&[]).await.unwrap();
        assert!(recorder.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn null_rpc_result_is_empty() {
        let recorder = Recorder::answering(200, "null");
        let rest = SupabaseRest::new(config(), &recorder);

        assert!(rest.top_boring().await.unwrap().is_empty());
    }
}
