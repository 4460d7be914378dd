//! Pre-aggregated numbers returned by the hosted stats functions.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::{BackendError, RatingBackend};
use crate::SubjectId;

/// How many tags count as a subject's "top" tags.
pub const TOP_TAGS: usize = 3;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct VoteDistribution {
    #[serde(rename = "-2", default)]
    pub way_too_hard: i64,
    #[serde(rename = "-1", default)]
    pub too_boring: i64,
    #[serde(rename = "1", default)]
    pub loved_it: i64,
    #[serde(rename = "2", default)]
    pub super_fun: i64,
}

/// Tag vote counts in the order the aggregation returned them.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct TagCounts(pub Vec<(String, i64)>);

impl TagCounts {
    /// Tags by descending count. Equal counts keep their original order.
    pub fn top(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<&(String, i64)> = self.0.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| b.cmp(a));

        ranked
            .into_iter()
            .take(n)
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TagCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagCountsVisitor;

        impl<'de> Visitor<'de> for TagCountsVisitor {
            type Value = TagCounts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of tag names to vote counts")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(TagCounts::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(TagCounts::default())
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(TagCountsVisitor)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut counts = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((tag, count)) = map.next_entry::<String, i64>()? {
                    counts.push((tag, count));
                }
                Ok(TagCounts(counts))
            }
        }

        deserializer.deserialize_any(TagCountsVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubjectStats {
    pub subject_id: SubjectId,
    pub subject_name: String,
    #[serde(default)]
    pub total_votes: i64,
    #[serde(default)]
    pub average_vote: f64,
    #[serde(default)]
    pub vote_distribution: VoteDistribution,
    #[serde(default)]
    pub tags: TagCounts,
}

impl SubjectStats {
    pub fn top_tags(&self) -> Vec<String> {
        self.tags.top(TOP_TAGS)
    }

    /// Position of the hard/fun needle, 0 to 100. Neutral without votes.
    pub fn cool_o_meter(&self) -> u8 {
        if self.total_votes == 0 {
            return 50;
        }

        let percentage = ((self.average_vote + 2.0) / 4.0 * 100.0).round();
        percentage.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OverallStats {
    #[serde(default)]
    pub total_subjects: i64,
    #[serde(default)]
    pub total_votes: i64,
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub average_vote: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TopPositiveSubject {
    pub subject_name: String,
    pub average_rating: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TopBoringSubject {
    pub subject_name: String,
    pub total_rating_sum: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendingSubject {
    pub subject_name: String,
    pub todays_votes: i64,
    pub average_vote: f64,
    pub rank_position: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct VotesPastHour {
    pub votes_past_hour: i64,
    pub unique_voters_past_hour: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    pub overall: Option<OverallStats>,
    pub top_positive: Vec<TopPositiveSubject>,
    pub top_boring: Vec<TopBoringSubject>,
    pub trending: Vec<TrendingSubject>,
}

/// Loads every leaderboard panel concurrently. A failing panel stays empty.
pub async fn load_leaderboard<B: RatingBackend + ?Sized>(backend: &B) -> Leaderboard {
    let (overall, top_positive, top_boring, trending) = futures::join!(
        backend.overall_stats(),
        backend.top_positive(),
        backend.top_boring(),
        backend.trending_today(),
    );

    Leaderboard {
        overall: panel("overall stats", overall).flatten(),
        top_positive: panel("top positive", top_positive).unwrap_or_default(),
        top_boring: panel("top boring", top_boring).unwrap_or_default(),
        trending: panel("trending today", trending).unwrap_or_default(),
    }
}

fn panel<T>(name: &'static str, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::error!(panel = name, %err, "can't load leaderboard panel");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn stats_with_tags(tags: &str) -> SubjectStats {
        serde_json::from_str(&format!(
            r#"{{"subject_id":"s1","subject_name":"Calculus","total_votes":3,"average_vote":1.0,
                "vote_distribution":{{"-2":0,"-1":1,"1":0,"2":2}},"tags":{tags}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn top_tags_rank_by_count_and_keep_order_on_ties() {
        let stats = stats_with_tags(r#"{"easy":2,"hard":5,"good prof":2,"heavy workload":2}"#);

        assert_eq!(stats.top_tags(), vec!["hard", "easy", "good prof"]);
        assert_eq!(stats.vote_distribution.super_fun, 2);
    }

    #[test]
    fn null_tags_mean_no_top_tags() {
        let stats = stats_with_tags("null");

        assert!(stats.tags.is_empty());
        assert!(stats.top_tags().is_empty());
    }

    #[test]
    fn cool_o_meter_maps_average_to_percentage() {
        let mut stats = stats_with_tags("{}");

        stats.average_vote = 2.0;
        assert_eq!(stats.cool_o_meter(), 100);

        stats.average_vote = -1.0;
        assert_eq!(stats.cool_o_meter(), 25);

        stats.total_votes = 0;
        assert_eq!(stats.cool_o_meter(), 50);
    }

    #[tokio::test]
    async fn leaderboard_keeps_working_panels_when_one_fails() {
        let backend = MockBackend::default();
        backend.state.borrow_mut().top_positive = vec![TopPositiveSubject {
            subject_name: "Calculus".to_string(),
            average_rating: 1.5,
        }];
        backend.state.borrow_mut().fail_overall = true;

        let leaderboard = load_leaderboard(&backend).await;

        assert!(leaderboard.overall.is_none());
        assert_eq!(leaderboard.top_positive.len(), 1);
        assert!(leaderboard.top_boring.is_empty());
    }
}
