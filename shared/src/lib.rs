use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use serde_with::skip_serializing_none;

pub mod backend;
pub mod course;
pub mod filter;
pub mod identity;
pub mod ledger;
pub mod powerup;
pub mod realtime;
pub mod rest;
pub mod stats;
pub mod storage;
pub mod voting;

#[cfg(test)]
pub(crate) mod testing;

/// Tags a voter can attach to a subject.
pub const TAGS: [&str; 6] = [
    "good prof",
    "bad prof",
    "heavy workload",
    "light workload",
    "easy",
    "hard",
];

/// Longest feedback text accepted with a vote, in characters.
pub const FEEDBACK_MAX_CHARS: usize = 200;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl Display for SubjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        SubjectId(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: SubjectId(id.into()),
            name: name.into(),
            major: None,
            university: None,
            created_at: None,
        }
    }

    pub fn with_major(mut self, major: impl Into<String>) -> Self {
        self.major = Some(major.into());
        self
    }

    pub fn with_university(mut self, university: impl Into<String>) -> Self {
        self.university = Some(university.into());
        self
    }
}

#[derive(Debug, Serialize_repr, Deserialize_repr, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum VoteValue {
    WayTooHard = -2,
    TooBoring = -1,
    LovedIt = 1,
    SuperFun = 2,
}

impl VoteValue {
    pub const ALL: [VoteValue; 4] = [
        VoteValue::WayTooHard,
        VoteValue::TooBoring,
        VoteValue::LovedIt,
        VoteValue::SuperFun,
    ];

    pub fn value(self) -> i8 {
        self as i8
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -2 => Some(VoteValue::WayTooHard),
            -1 => Some(VoteValue::TooBoring),
            1 => Some(VoteValue::LovedIt),
            2 => Some(VoteValue::SuperFun),
            _ => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            VoteValue::WayTooHard => "💀",
            VoteValue::TooBoring => "😴",
            VoteValue::LovedIt => "❤️",
            VoteValue::SuperFun => "🔥",
        }
    }

    pub fn is_positive(self) -> bool {
        self.value() > 0
    }
}

impl Display for VoteValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VoteValue::WayTooHard => {
                "Way too hard"
            }
            VoteValue::TooBoring => {
                "Too boring"
            }
            VoteValue::LovedIt => {
                "Loved the subject"
            }
            VoteValue::SuperFun => {
                "Super Fun"
            }
        })
    }
}

/// Multiplier applied to a vote by the aggregation functions.
#[derive(Debug, Serialize_repr, Deserialize_repr, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum VoteWeight {
    #[default]
    Normal = 1,
    Double = 2,
}

/// Row written to the `votes` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VotePayload {
    pub user_id: String,
    pub subject_id: SubjectId,
    pub vote_value: VoteValue,
    pub vote_weight: VoteWeight,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fingerprint_id: Option<String>,
}

/// Row written to the `tag_votes` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TagVote {
    pub subject_id: SubjectId,
    pub tag: String,
}

/// Row written to the `subjects` table by the add-course flow.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewSubject {
    pub name: String,
    pub university: Option<String>,
    pub major: Option<String>,
}

/// Trims feedback text and caps it, returning `None` when nothing is left.
pub fn normalize_feedback(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(FEEDBACK_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_value_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&VoteValue::WayTooHard).unwrap(), "-2");
        assert_eq!(
            serde_json::from_str::<VoteValue>("2").unwrap(),
            VoteValue::SuperFun
        );
        assert!(serde_json::from_str::<VoteValue>("0").is_err());
    }

    #[test]
    fn feedback_is_trimmed_and_capped() {
        assert_eq!(normalize_feedback("   "), None);
        assert_eq!(normalize_feedback("  fine  ").as_deref(), Some("fine"));

        let long = "x".repeat(FEEDBACK_MAX_CHARS + 50);
        assert_eq!(
            normalize_feedback(&long).map(|f| f.chars().count()),
            Some(FEEDBACK_MAX_CHARS)
        );
    }

    #[test]
    fn new_subject_skips_missing_fields() {
        let subject = NewSubject {
            name: "Algebra".to_string(),
            university: None,
            major: Some("Math".to_string()),
        };

        assert_eq!(
            serde_json::to_string(&subject).unwrap(),
            r#"{"name":"Algebra","major":"Math"}"#
        );
    }
}
