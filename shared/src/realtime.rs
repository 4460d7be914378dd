//! Supabase Realtime (Phoenix channels) frames for "a vote was inserted".
//!
//! The payload of a change is never inspected; an insert only tells the
//! caller to re-fetch its aggregates.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rest::SupabaseConfig;

pub const VOTES_TOPIC: &str = "realtime:public:votes";
pub const HEARTBEAT_INTERVAL_MS: u32 = 30_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl Frame {
    pub fn to_text(&self) -> String {
        // A frame of strings and JSON values always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    VoteInserted,
    Joined,
    Rejected(String),
    Ignored,
}

pub fn websocket_url(config: &SupabaseConfig) -> String {
    let base = if let Some(rest) = config.url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = config.url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        config.url.clone()
    };

    format!(
        "{base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        config.anon_key
    )
}

/// Monotonic message references for one socket.
#[derive(Debug, Default)]
pub struct RefCounter(u64);

impl RefCounter {
    pub fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

pub fn join_frame(reference: String) -> Frame {
    Frame {
        topic: VOTES_TOPIC.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": "votes" }
                ]
            }
        }),
        reference: Some(reference),
    }
}

pub fn heartbeat_frame(reference: String) -> Frame {
    Frame {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference),
    }
}

pub fn classify(text: &str) -> Signal {
    let Ok(frame) = serde_json::from_str::<Frame>(text) else {
        return Signal::Ignored;
    };

    if frame.topic != VOTES_TOPIC {
        return Signal::Ignored;
    }

    match frame.event.as_str() {
        "postgres_changes" => {
            let change = frame.payload["data"]["type"].as_str().unwrap_or_default();
            if change.eq_ignore_ascii_case("INSERT") {
                Signal::VoteInserted
            } else {
                Signal::Ignored
            }
        }
        "phx_reply" => match frame.payload["status"].as_str() {
            Some("ok") => Signal::Joined,
            Some(_) => Signal::Rejected(frame.payload["response"].to_string()),
            None => Signal::Ignored,
        },
        "phx_error" | "phx_close" => Signal::Rejected(frame.event.clone()),
        _ => Signal::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_uses_websocket_scheme() {
        let config = SupabaseConfig::new("https://demo.supabase.co", "anon").unwrap();

        assert_eq!(
            websocket_url(&config),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn join_subscribes_to_vote_inserts() {
        let mut refs = RefCounter::default();
        let frame = join_frame(refs.next());

        assert_eq!(frame.reference.as_deref(), Some("1"));
        assert_eq!(
            frame.payload["config"]["postgres_changes"][0]["table"],
            "votes"
        );
        assert_eq!(heartbeat_frame(refs.next()).reference.as_deref(), Some("2"));
    }

    #[test]
    fn insert_change_is_a_vote_signal() {
        let text = r#"{"topic":"realtime:public:votes","event":"postgres_changes","ref":null,
            "payload":{"ids":[1],"data":{"type":"INSERT","table":"votes","schema":"public","record":{}}}}"#;

        assert_eq!(classify(text), Signal::VoteInserted);
    }

    #[test]
    fn replies_and_noise_are_classified() {
        let ok = r#"{"topic":"realtime:public:votes","event":"phx_reply","ref":"1","payload":{"status":"ok","response":{}}}"#;
        let err = r#"{"topic":"realtime:public:votes","event":"phx_reply","ref":"1","payload":{"status":"error","response":{"reason":"bad"}}}"#;
        let heartbeat = r#"{"topic":"phoenix","event":"phx_reply","ref":"2","payload":{"status":"ok"}}"#;

        assert_eq!(classify(ok), Signal::Joined);
        assert!(matches!(classify(err), Signal::Rejected(reason) if reason.contains("bad")));
        assert_eq!(classify(heartbeat), Signal::Ignored);
        assert_eq!(classify("not json"), Signal::Ignored);
    }
}
