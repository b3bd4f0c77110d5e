use crate::*;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("poll {0} not found")]
pub struct PollNotFound(pub PollId);

/// A poll store
///
/// The store is the only owner of poll records. Ids are handed out sequentially by
/// `next_id` and polls are never removed.
pub trait PollStore {
    /// Get a poll
    fn get(&self, id: PollId) -> Option<&Poll>;

    /// Get a poll for mutation
    fn get_mut(&mut self, id: PollId) -> Option<&mut Poll>;

    /// Store a newly created poll under `poll.id()`
    ///
    /// Polls are never replaced: an id that is already taken is an error.
    fn insert(&mut self, poll: Poll) -> Result<(), Error>;

    /// The id the next created poll will receive
    fn next_id(&self) -> PollId;

    /// Number of stored polls
    fn count(&self) -> u64;

    fn get_poll(&self, id: PollId) -> Result<&Poll, PollNotFound> {
        self.get(id).ok_or(PollNotFound(id))
    }

    fn get_poll_mut(&mut self, id: PollId) -> Result<&mut Poll, PollNotFound> {
        self.get_mut(id).ok_or(PollNotFound(id))
    }
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct MemStore {
    inner: BTreeMap<PollId, Poll>,
}

impl MemStore {
    pub fn iter(&self) -> impl Iterator<Item = &Poll> {
        self.inner.values()
    }
}

impl PollStore for MemStore {
    fn get(&self, id: PollId) -> Option<&Poll> {
        self.inner.get(&id)
    }

    fn get_mut(&mut self, id: PollId) -> Option<&mut Poll> {
        self.inner.get_mut(&id)
    }

    fn insert(&mut self, poll: Poll) -> Result<(), Error> {
        match self.inner.entry(poll.id()) {
            Entry::Occupied(_) => Err(Error::DuplicatePollId(poll.id())),
            Entry::Vacant(entry) => {
                entry.insert(poll);
                Ok(())
            }
        }
    }

    fn next_id(&self) -> PollId {
        self.inner.keys().next_back().map_or(0, |id| id + 1)
    }

    fn count(&self) -> u64 {
        self.inner.len() as u64
    }
}

/// Polls with an id that is already present are dropped; the first one wins
impl From<Vec<Poll>> for MemStore {
    fn from(item: Vec<Poll>) -> Self {
        let mut memstore = MemStore::default();
        for poll in item {
            let _ = memstore.insert(poll);
        }
        memstore
    }
}
