use std::collections::BTreeMap;

use crate::storage::{KeyValueStore, LocalRecord, StorageError, VOTES_KEY};
use crate::{SubjectId, VoteValue};

pub type VoteMap = BTreeMap<SubjectId, VoteValue>;

/// Which subjects this device has voted on, and how.
pub struct VoteLedger<'a, S: ?Sized> {
    votes: LocalRecord<'a, S, VoteMap>,
}

impl<'a, S: KeyValueStore + ?Sized> VoteLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            votes: LocalRecord::new(store, VOTES_KEY),
        }
    }

    pub fn has_voted(&self, subject: &SubjectId) -> bool {
        self.votes.get_or_default().contains_key(subject)
    }

    pub fn vote_value(&self, subject: &SubjectId) -> Option<VoteValue> {
        self.votes.get_or_default().get(subject).copied()
    }

    pub fn record_vote(&self, subject: &SubjectId, value: VoteValue) -> Result<(), StorageError> {
        self.votes.update(|votes| {
            votes.insert(subject.clone(), value);
        })
    }

    pub fn votes(&self) -> VoteMap {
        self.votes.get_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn recorded_vote_is_visible() {
        let store = MemoryStore::new();
        let ledger = VoteLedger::new(&store);
        let subject = SubjectId::from("s1");

        assert!(!ledger.has_voted(&subject));
        assert_eq!(ledger.vote_value(&subject), None);

        ledger.record_vote(&subject, VoteValue::TooBoring).unwrap();

        assert!(ledger.has_voted(&subject));
        assert_eq!(ledger.vote_value(&subject), Some(VoteValue::TooBoring));
        assert!(!ledger.has_voted(&SubjectId::from("s2")));
    }

    #[test]
    fn later_vote_overwrites_earlier_one() {
        let store = MemoryStore::new();
        let ledger = VoteLedger::new(&store);
        let subject = SubjectId::from("s1");

        ledger.record_vote(&subject, VoteValue::TooBoring).unwrap();
        ledger.record_vote(&subject, VoteValue::SuperFun).unwrap();

        assert_eq!(ledger.votes().len(), 1);
        assert_eq!(ledger.vote_value(&subject), Some(VoteValue::SuperFun));
    }

    #[test]
    fn reads_the_stored_json_object() {
        let store = MemoryStore::new();
        store
            .set_item(VOTES_KEY, r#"{"s1":2,"s2":-2}"#)
            .unwrap();

        let ledger = VoteLedger::new(&store);
        assert_eq!(
            ledger.vote_value(&SubjectId::from("s2")),
            Some(VoteValue::WayTooHard)
        );
    }

    #[test]
    fn corrupted_ledger_is_treated_as_empty() {
        let store = MemoryStore::new();
        store.set_item(VOTES_KEY, "[[[").unwrap();

        let ledger = VoteLedger::new(&store);
        assert!(!ledger.has_voted(&SubjectId::from("s1")));

        ledger
            .record_vote(&SubjectId::from("s1"), VoteValue::LovedIt)
            .unwrap();
        assert_eq!(ledger.votes().len(), 1);
    }
}
