//! Casting a vote: identity, power-ups, the remote upsert and the local
//! ledger, in that order.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::backend::{BackendError, RatingBackend};
use crate::identity::{compute_fingerprint, DeviceIdentity, FingerprintProbe};
use crate::ledger::VoteLedger;
use crate::powerup::{PowerUp, PowerUps};
use crate::storage::KeyValueStore;
use crate::{normalize_feedback, SubjectId, TagVote, VotePayload, VoteValue, VoteWeight};

#[derive(Debug, Clone, PartialEq)]
pub struct VoteDraft {
    pub subject_id: SubjectId,
    pub value: VoteValue,
    pub tags: Vec<String>,
    pub feedback: String,
}

impl VoteDraft {
    pub fn new(subject_id: SubjectId, value: VoteValue) -> Self {
        Self {
            subject_id,
            value,
            tags: Vec::new(),
            feedback: String::new(),
        }
    }

    fn tag_votes(&self) -> Vec<TagVote> {
        let mut tags: Vec<TagVote> = Vec::new();

        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|existing| existing.tag == tag) {
                tags.push(TagVote {
                    subject_id: self.subject_id.clone(),
                    tag: tag.to_string(),
                });
            }
        }

        tags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Open,
    /// Already voted, but a vote-again power-up is armed.
    VoteAgain,
    Closed,
}

impl Eligibility {
    pub fn can_vote(self) -> bool {
        self != Eligibility::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Celebrate,
    Sad,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    pub subject_id: SubjectId,
    pub value: VoteValue,
    pub weight: VoteWeight,
    pub revote: bool,
    pub mood: Mood,
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("You have already voted for this subject.")]
    VotedLocally,

    #[error("You have already voted for this subject from this device or browser.")]
    AlreadyVoted,

    #[error("Failed to submit vote. Please try again.")]
    Failed(#[source] BackendError),
}

pub fn eligibility<S: KeyValueStore + ?Sized>(store: &S, subject: &SubjectId) -> Eligibility {
    if !VoteLedger::new(store).has_voted(subject) {
        Eligibility::Open
    } else if PowerUps::new(store).is_armed(PowerUp::VoteAgain) {
        Eligibility::VoteAgain
    } else {
        Eligibility::Closed
    }
}

/// Everything a vote needs, borrowed from the application root.
pub struct VotingBooth<'a, S: ?Sized, B: ?Sized, P: ?Sized> {
    store: &'a S,
    backend: &'a B,
    probe: &'a P,
}

impl<'a, S, B, P> VotingBooth<'a, S, B, P>
where
    S: KeyValueStore + ?Sized,
    B: RatingBackend + ?Sized,
    P: FingerprintProbe + ?Sized,
{
    pub fn new(store: &'a S, backend: &'a B, probe: &'a P) -> Self {
        Self {
            store,
            backend,
            probe,
        }
    }

    pub fn eligibility(&self, subject: &SubjectId) -> Eligibility {
        eligibility(self.store, subject)
    }

    pub async fn submit(
        &self,
        draft: &VoteDraft,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt, VoteError> {
        let eligibility = self.eligibility(&draft.subject_id);
        if !eligibility.can_vote() {
            return Err(VoteError::VotedLocally);
        }
        let revote = eligibility == Eligibility::VoteAgain;

        let power_ups = PowerUps::new(self.store);
        let weight = if power_ups.is_armed(PowerUp::DoubleVote) {
            VoteWeight::Double
        } else {
            VoteWeight::Normal
        };

        let user_id = DeviceIdentity::new(self.store).get_or_create_device_id();
        let fingerprint = compute_fingerprint(self.probe).await;

        let payload = VotePayload {
            user_id: user_id.to_string(),
            subject_id: draft.subject_id.clone(),
            vote_value: draft.value,
            vote_weight: weight,
            feedback: normalize_feedback(&draft.feedback),
            created_at: now,
            updated_at: now,
            fingerprint_id: fingerprint.map(|f| f.as_str().to_string()),
        };

        if let Err(err) = self.backend.upsert_vote(&payload).await {
            tracing::error!(
                %err,
                user_id = %payload.user_id,
                subject_id = %payload.subject_id,
                vote_value = payload.vote_value.value(),
                "voting error"
            );

            return Err(if err.is_already_voted() {
                VoteError::AlreadyVoted
            } else {
                VoteError::Failed(err)
            });
        }

        let tag_votes = draft.tag_votes();
        if let Err(err) = self.backend.insert_tag_votes(&tag_votes).await {
            tracing::error!(%err, "tag vote insert error");
        }

        if let Err(err) = VoteLedger::new(self.store).record_vote(&draft.subject_id, draft.value) {
            tracing::warn!(%err, "can't record vote locally");
        }

        if weight == VoteWeight::Double {
            self.consume(&power_ups, PowerUp::DoubleVote);
        }
        if revote {
            self.consume(&power_ups, PowerUp::VoteAgain);
        }

        tracing::info!(subject_id = %draft.subject_id, ?weight, revote, "vote submitted");

        Ok(VoteReceipt {
            subject_id: draft.subject_id.clone(),
            value: draft.value,
            weight,
            revote,
            mood: if draft.value.is_positive() {
                Mood::Celebrate
            } else {
                Mood::Sad
            },
        })
    }

    fn consume(&self, power_ups: &PowerUps<'a, S>, power_up: PowerUp) {
        if let Err(err) = power_ups.consume(power_up) {
            tracing::warn!(%err, ?power_up, "can't clear power-up");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{FailingProbe, MockBackend, StaticProbe};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
    }

    fn draft(value: VoteValue) -> VoteDraft {
        VoteDraft {
            subject_id: SubjectId::from("s1"),
            value,
            tags: vec!["easy".to_string(), " easy ".to_string(), "".to_string()],
            feedback: "  great course ".to_string(),
        }
    }

    #[tokio::test]
    async fn first_vote_is_sent_and_recorded() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        let probe = StaticProbe("browser".to_string());
        let booth = VotingBooth::new(&store, &backend, &probe);

        let receipt = booth.submit(&draft(VoteValue::SuperFun), now()).await.unwrap();

        assert_eq!(receipt.weight, VoteWeight::Normal);
        assert_eq!(receipt.mood, Mood::Celebrate);
        assert!(!receipt.revote);

        let state = backend.state.borrow();
        let vote = &state.votes[0];
        assert_eq!(vote.feedback.as_deref(), Some("great course"));
        assert!(vote.fingerprint_id.is_some());
        assert_eq!(
            vote.user_id,
            DeviceIdentity::new(&store).get_or_create_device_id().to_string()
        );
        assert_eq!(state.tag_votes.len(), 1);

        assert_eq!(
            VoteLedger::new(&store).vote_value(&SubjectId::from("s1")),
            Some(VoteValue::SuperFun)
        );
        assert_eq!(booth.eligibility(&SubjectId::from("s1")), Eligibility::Closed);
    }

    #[tokio::test]
    async fn second_vote_is_refused_locally() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);

        booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap();
        let err = booth.submit(&draft(VoteValue::TooBoring), now()).await.unwrap_err();

        assert!(matches!(err, VoteError::VotedLocally));
        assert_eq!(backend.state.borrow().votes.len(), 1);
    }

    #[tokio::test]
    async fn double_vote_applies_to_one_submission() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);
        PowerUps::new(&store).arm(PowerUp::DoubleVote).unwrap();

        let first = booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap();
        let other = VoteDraft::new(SubjectId::from("s2"), VoteValue::WayTooHard);
        let second = booth.submit(&other, now()).await.unwrap();

        assert_eq!(first.weight, VoteWeight::Double);
        assert_eq!(second.weight, VoteWeight::Normal);
        assert_eq!(second.mood, Mood::Sad);
        assert!(backend.state.borrow().votes[0].fingerprint_id.is_none());
    }

    #[tokio::test]
    async fn vote_again_allows_exactly_one_revote() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);

        booth.submit(&draft(VoteValue::TooBoring), now()).await.unwrap();
        PowerUps::new(&store).arm(PowerUp::VoteAgain).unwrap();
        assert_eq!(booth.eligibility(&SubjectId::from("s1")), Eligibility::VoteAgain);

        let revote = booth.submit(&draft(VoteValue::SuperFun), now()).await.unwrap();
        assert!(revote.revote);
        assert_eq!(
            VoteLedger::new(&store).vote_value(&SubjectId::from("s1")),
            Some(VoteValue::SuperFun)
        );

        let err = booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap_err();
        assert!(matches!(err, VoteError::VotedLocally));
    }

    #[tokio::test]
    async fn vote_again_is_kept_for_a_fresh_subject() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);
        PowerUps::new(&store).arm(PowerUp::VoteAgain).unwrap();

        booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap();

        assert!(PowerUps::new(&store).is_armed(PowerUp::VoteAgain));
    }

    #[tokio::test]
    async fn remote_duplicate_is_reported_distinctly() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        backend.state.borrow_mut().vote_error = Some(BackendError::AlreadyVoted);
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);
        PowerUps::new(&store).arm(PowerUp::DoubleVote).unwrap();

        let err = booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap_err();

        assert!(matches!(err, VoteError::AlreadyVoted));
        assert!(!VoteLedger::new(&store).has_voted(&SubjectId::from("s1")));
        assert!(PowerUps::new(&store).is_armed(PowerUp::DoubleVote));
    }

    #[tokio::test]
    async fn transient_failure_is_generic() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        backend.state.borrow_mut().vote_error = Some(BackendError::Transport("timeout".to_string()));
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);

        let err = booth.submit(&draft(VoteValue::LovedIt), now()).await.unwrap_err();

        assert!(matches!(err, VoteError::Failed(_)));
        assert_eq!(err.to_string(), "Failed to submit vote. Please try again.");
    }

    #[tokio::test]
    async fn tag_failure_does_not_fail_the_vote() {
        let store = MemoryStore::new();
        let backend = MockBackend::default();
        backend.state.borrow_mut().tag_vote_error = Some(BackendError::Transport("reset".to_string()));
        let booth = VotingBooth::new(&store, &backend, &FailingProbe);

        assert!(booth.submit(&draft(VoteValue::LovedIt), now()).await.is_ok());
        assert!(VoteLedger::new(&store).has_voted(&SubjectId::from("s1")));
    }
}
