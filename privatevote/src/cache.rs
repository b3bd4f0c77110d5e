use crate::*;
use std::collections::HashMap;
use tracing::debug;

/// Read-side cache of `can_reveal` answers
///
/// Entries are never authoritative. They expire after `ttl` seconds and must be
/// invalidated whenever the poll's reveal state changes.
#[derive(Clone, Debug)]
pub struct RevealCheckCache {
    ttl: u64,
    entries: HashMap<PollId, CachedCheck>,
}

#[derive(Clone, Copy, Debug)]
struct CachedCheck {
    can_reveal: bool,
    checked_at: Timestamp,
}

impl Default for RevealCheckCache {
    fn default() -> Self {
        RevealCheckCache::new(Self::DEFAULT_TTL)
    }
}

impl RevealCheckCache {
    pub const DEFAULT_TTL: u64 = 5;

    pub fn new(ttl: u64) -> Self {
        RevealCheckCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// A fresh cached answer, if there is one
    pub fn get(&self, poll_id: PollId, now: Timestamp) -> Option<bool> {
        self.entries
            .get(&poll_id)
            .filter(|c| now.saturating_sub(c.checked_at) < self.ttl)
            .map(|c| c.can_reveal)
    }

    pub fn insert(&mut self, poll_id: PollId, can_reveal: bool, now: Timestamp) {
        self.entries.insert(
            poll_id,
            CachedCheck {
                can_reveal,
                checked_at: now,
            },
        );
    }

    /// Return the cached answer, or compute and cache a new one
    ///
    /// Errors from `check` are passed through and nothing is cached.
    pub fn get_or_refresh<F>(
        &mut self,
        poll_id: PollId,
        now: Timestamp,
        check: F,
    ) -> Result<bool, ValidationError>
    where
        F: FnOnce() -> Result<bool, ValidationError>,
    {
        if let Some(can_reveal) = self.get(poll_id, now) {
            debug!(poll_id, can_reveal, "using cached reveal check");
            return Ok(can_reveal);
        }

        let can_reveal = check()?;
        self.insert(poll_id, can_reveal, now);
        Ok(can_reveal)
    }

    pub fn invalidate(&mut self, poll_id: PollId) {
        if self.entries.remove(&poll_id).is_some() {
            debug!(poll_id, "reveal check cache cleared");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
