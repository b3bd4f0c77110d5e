use crate::*;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe handle to a ledger
///
/// Every operation holds the ledger lock for its whole transition, so concurrent
/// callers observe operations one at a time. Clones share the same ledger.
pub struct PollService<S: PollStore = MemStore> {
    ledger: Arc<Mutex<PollLifecycleManager<S>>>,
    reveal_checks: Arc<Mutex<RevealCheckCache>>,
}

impl<S: PollStore> Clone for PollService<S> {
    fn clone(&self) -> Self {
        PollService {
            ledger: self.ledger.clone(),
            reveal_checks: self.reveal_checks.clone(),
        }
    }
}

impl<S: PollStore> PollService<S> {
    pub fn new(ledger: PollLifecycleManager<S>) -> Self {
        PollService {
            ledger: Arc::new(Mutex::new(ledger)),
            reveal_checks: Arc::new(Mutex::new(RevealCheckCache::default())),
        }
    }

    pub fn with_reveal_cache(mut self, cache: RevealCheckCache) -> Self {
        self.reveal_checks = Arc::new(Mutex::new(cache));
        self
    }

    /// Lock the ledger for a sequence of reads or writes
    pub fn lock(&self) -> Result<MutexGuard<'_, PollLifecycleManager<S>>, ValidationError> {
        self.ledger.lock().map_err(|_| Error::LockPoisoned.into())
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, RevealCheckCache>, ValidationError> {
        self.reveal_checks
            .lock()
            .map_err(|_| Error::LockPoisoned.into())
    }

    pub fn create_poll(
        &self,
        caller: Address,
        params: NewPoll,
        paid_fee: Amount,
    ) -> Result<PollId, ValidationError> {
        self.lock()?.create_poll(caller, params, paid_fee)
    }

    pub fn vote(
        &self,
        caller: Address,
        poll_id: PollId,
        option: usize,
        encrypted_one: &Ciphertext,
        proof: &InputProof,
    ) -> Result<(), ValidationError> {
        self.lock()?
            .vote(caller, poll_id, option, encrypted_one, proof)
    }

    pub fn request_reveal(
        &self,
        caller: Address,
        poll_id: PollId,
    ) -> Result<RequestId, ValidationError> {
        let request_id = self.lock()?.request_reveal(caller, poll_id)?;
        self.lock_cache()?.invalidate(poll_id);
        Ok(request_id)
    }

    pub fn public_reveal(
        &self,
        caller: Address,
        poll_id: PollId,
    ) -> Result<RequestId, ValidationError> {
        self.request_reveal(caller, poll_id)
    }

    pub fn on_decryption_result(
        &self,
        caller: Address,
        result: DecryptionResult,
    ) -> Result<(), ValidationError> {
        let poll_id = result.poll_id;
        self.lock()?.on_decryption_result(caller, result)?;
        self.lock_cache()?.invalidate(poll_id);
        Ok(())
    }

    pub fn set_creation_fee(&self, caller: Address, new_fee: Amount) -> Result<(), ValidationError> {
        self.lock()?.set_creation_fee(caller, new_fee)
    }

    pub fn withdraw_fees(&self, caller: Address) -> Result<Amount, ValidationError> {
        self.lock()?.withdraw_fees(caller)
    }

    /// `can_reveal`, answered from the reveal check cache when fresh
    pub fn can_reveal(&self, poll_id: PollId) -> Result<bool, ValidationError> {
        let ledger = self.lock()?;
        let now = ledger.now();
        self.lock_cache()?
            .get_or_refresh(poll_id, now, || ledger.can_reveal(poll_id))
    }

    pub fn get_poll_info(&self, poll_id: PollId) -> Result<PollInfo, ValidationError> {
        self.lock()?.get_poll_info(poll_id)
    }

    pub fn get_poll_results(&self, poll_id: PollId) -> Result<PollResults, ValidationError> {
        self.lock()?.get_poll_results(poll_id)
    }

    pub fn get_poll_status(&self, poll_id: PollId) -> Result<PollStatus, ValidationError> {
        self.lock()?.get_poll_status(poll_id)
    }

    pub fn has_user_voted(&self, poll_id: PollId, voter: &Address) -> Result<bool, ValidationError> {
        self.lock()?.has_user_voted(poll_id, voter)
    }

    pub fn poll_count(&self) -> Result<u64, ValidationError> {
        Ok(self.lock()?.poll_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::Fixture;
    use std::thread;

    #[test]
    fn test_concurrent_reveal_single_winner() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        fx.clock.set(fx.start);
        fx.vote(fx.bob, id, 1).unwrap();
        fx.clock.set(fx.end);

        let oracle = fx.oracle.clone();
        let service = PollService::new(fx.ledger);

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || service.public_reveal(Address::derive(&[i]), id))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ValidationError::DecryptionInProgress)));
        assert_eq!(oracle.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_votes() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        fx.clock.set(fx.start);

        let voters: Vec<Address> = (0..6u8).map(|i| Address::derive(&[b'v', i])).collect();
        let ballots: Vec<_> = voters
            .iter()
            .map(|v| {
                let input = fx.encrypt_one();
                let proof = fx.attestor.attest(&input, &fx.ledger.contract_address(), v);
                (*v, input, proof)
            })
            .collect();

        let service = PollService::new(fx.ledger);
        let handles: Vec<_> = ballots
            .into_iter()
            .enumerate()
            .map(|(i, (voter, input, proof))| {
                let service = service.clone();
                thread::spawn(move || service.vote(voter, id, i % 3, &input, &proof))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(service.get_poll_info(id).unwrap().total_voters, 6);
        for v in &voters {
            assert!(service.has_user_voted(id, v).unwrap());
        }
    }

    #[test]
    fn test_reveal_check_is_invalidated() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        fx.clock.set(fx.end);

        let clock = fx.clock.clone();
        let service = PollService::new(fx.ledger);

        assert!(service.can_reveal(id).unwrap());
        service.request_reveal(fx.bob, id).unwrap();

        // Same second, but the cached answer was dropped
        assert_eq!(clock.now(), fx.end);
        assert!(!service.can_reveal(id).unwrap());
        assert!(service.can_reveal(42).is_err());
    }
}
