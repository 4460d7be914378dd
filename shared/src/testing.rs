use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::backend::{BackendError, RatingBackend};
use crate::identity::{Fingerprint, FingerprintError, FingerprintProbe};
use crate::stats::{
    OverallStats, SubjectStats, TagCounts, TopBoringSubject, TopPositiveSubject, TrendingSubject,
    VoteDistribution, VotesPastHour,
};
use crate::storage::{KeyValueStore, StorageError};
use crate::{NewSubject, Subject, SubjectId, TagVote, VotePayload};

/// A store that refuses every operation.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

pub struct StaticProbe(pub String);

#[async_trait(?Send)]
impl FingerprintProbe for StaticProbe {
    async fn fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        Fingerprint::from_signals([("static", self.0.clone())]).ok_or(FingerprintError::NoSignals)
    }
}

pub struct FailingProbe;

#[async_trait(?Send)]
impl FingerprintProbe for FailingProbe {
    async fn fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        Err(FingerprintError::Unavailable("no environment".to_string()))
    }
}

#[derive(Default)]
pub struct MockState {
    pub subjects: Vec<Subject>,
    pub inserted_subjects: Vec<NewSubject>,
    pub votes: Vec<VotePayload>,
    pub tag_votes: Vec<TagVote>,
    pub stats: HashMap<SubjectId, SubjectStats>,
    pub failing_stats: HashSet<SubjectId>,
    pub vote_error: Option<BackendError>,
    pub tag_vote_error: Option<BackendError>,
    pub fail_overall: bool,
    pub top_positive: Vec<TopPositiveSubject>,
}

#[derive(Default)]
pub struct MockBackend {
    pub state: RefCell<MockState>,
    stats_calls: Cell<usize>,
    stats_yields: Cell<usize>,
}

impl MockBackend {
    pub fn set_tags(&self, subject: &str, tags: &[(&str, i64)]) {
        let stats = SubjectStats {
            subject_id: SubjectId::from(subject),
            subject_name: subject.to_string(),
            total_votes: 0,
            average_vote: 0.0,
            vote_distribution: VoteDistribution::default(),
            tags: TagCounts(
                tags.iter()
                    .map(|(tag, count)| (tag.to_string(), *count))
                    .collect(),
            ),
        };

        self.state
            .borrow_mut()
            .stats
            .insert(SubjectId::from(subject), stats);
    }

    pub fn fail_stats_for(&self, subject: &str) {
        self.state
            .borrow_mut()
            .failing_stats
            .insert(SubjectId::from(subject));
    }

    /// Makes every stats lookup yield to the executor `times` times first.
    pub fn slow_stats(&self, times: usize) {
        self.stats_yields.set(times);
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.get()
    }
}

fn transient() -> BackendError {
    BackendError::Transport("connection reset".to_string())
}

#[async_trait(?Send)]
impl RatingBackend for MockBackend {
    async fn fetch_subjects(&self) -> Result<Vec<Subject>, BackendError> {
        Ok(self.state.borrow().subjects.clone())
    }

    async fn insert_subject(&self, subject: &NewSubject) -> Result<(), BackendError> {
        self.state
            .borrow_mut()
            .inserted_subjects
            .push(subject.clone());
        Ok(())
    }

    async fn upsert_vote(&self, vote: &VotePayload) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.vote_error.clone() {
            return Err(err);
        }
        state.votes.push(vote.clone());
        Ok(())
    }

    async fn insert_tag_votes(&self, tags: &[TagVote]) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.tag_vote_error.clone() {
            return Err(err);
        }
        state.tag_votes.extend_from_slice(tags);
        Ok(())
    }

    async fn subject_stats(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<SubjectStats>, BackendError> {
        self.stats_calls.set(self.stats_calls.get() + 1);
        for _ in 0..self.stats_yields.get() {
            tokio::task::yield_now().await;
        }

        let state = self.state.borrow();
        if state.failing_stats.contains(subject) {
            return Err(transient());
        }
        Ok(state.stats.get(subject).cloned())
    }

    async fn overall_stats(&self) -> Result<Option<OverallStats>, BackendError> {
        if self.state.borrow().fail_overall {
            return Err(transient());
        }
        Ok(Some(OverallStats::default()))
    }

    async fn top_positive(&self) -> Result<Vec<TopPositiveSubject>, BackendError> {
        Ok(self.state.borrow().top_positive.clone())
    }

    async fn top_boring(&self) -> Result<Vec<TopBoringSubject>, BackendError> {
        Ok(Vec::new())
    }

    async fn trending_today(&self) -> Result<Vec<TrendingSubject>, BackendError> {
        Ok(Vec::new())
    }

    async fn votes_past_hour(&self) -> Result<Option<VotesPastHour>, BackendError> {
        Ok(Some(VotesPastHour::default()))
    }
}
