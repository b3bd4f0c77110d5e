use crate::*;
use tracing::{debug, info};

/// Deployment parameters of a ledger
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Receives withdrawn fees and may change the creation fee
    pub owner: Address,

    /// Address decryption results must be delivered from
    pub oracle: Address,

    /// Address of the ledger itself; encrypted inputs are bound to it
    pub contract_address: Address,

    #[serde(with = "amount_string")]
    pub creation_fee: Amount,
}

impl LedgerConfig {
    pub fn new(owner: Address, oracle: Address, contract_address: Address) -> Self {
        LedgerConfig {
            owner,
            oracle,
            contract_address,
            creation_fee: DEFAULT_CREATION_FEE,
        }
    }
}

/// Everything a ledger persists
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LedgerState<S = MemStore> {
    pub contract_address: Address,
    pub store: S,
    pub treasury: FeeTreasury,
    pub bridge: RevealOracleBridge,
    pub events: EventLog,
}

impl<S: PollStore + Default> LedgerState<S> {
    pub fn new(config: LedgerConfig) -> Self {
        LedgerState {
            contract_address: config.contract_address,
            store: S::default(),
            treasury: FeeTreasury::new(config.owner, config.creation_fee),
            bridge: RevealOracleBridge::new(config.oracle),
            events: EventLog::default(),
        }
    }
}

/// Entry point for every poll operation
///
/// Each operation checks all of its preconditions before it changes anything, so a
/// rejected call leaves polls, voters, tallies and fees exactly as they were. Taking
/// `&mut self` serializes operations; share a ledger between threads through
/// `PollService`.
pub struct PollLifecycleManager<S: PollStore = MemStore> {
    state: LedgerState<S>,
    verifier: Box<dyn InputVerifier>,
    oracle: Box<dyn DecryptionOracle>,
    clock: Box<dyn Clock>,
}

impl<S: PollStore + Default> PollLifecycleManager<S> {
    pub fn new(
        config: LedgerConfig,
        verifier: impl InputVerifier + 'static,
        oracle: impl DecryptionOracle + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        PollLifecycleManager::with_state(LedgerState::new(config), verifier, oracle, clock)
    }
}

impl<S: PollStore> PollLifecycleManager<S> {
    /// Resume a ledger from persisted state
    pub fn with_state(
        state: LedgerState<S>,
        verifier: impl InputVerifier + 'static,
        oracle: impl DecryptionOracle + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        PollLifecycleManager {
            state,
            verifier: Box::new(verifier),
            oracle: Box::new(oracle),
            clock: Box::new(clock),
        }
    }

    pub fn state(&self) -> &LedgerState<S> {
        &self.state
    }

    pub fn into_state(self) -> LedgerState<S> {
        self.state
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Create a poll, paying `paid_fee`
    pub fn create_poll(
        &mut self,
        caller: Address,
        params: NewPoll,
        paid_fee: Amount,
    ) -> Result<PollId, ValidationError> {
        let now = self.now();
        let state = &mut self.state;

        let checked = state
            .treasury
            .check_payment(paid_fee)
            .and_then(|_| params.validate());
        if let Err(e) = checked {
            debug!(%caller, error = %e, "poll creation rejected");
            return Err(e);
        }

        let poll_id = state.store.next_id();
        let event = Event::PollCreated {
            poll_id,
            creator: caller,
            title: params.title.clone(),
            start_time: params.start_time,
            end_time: params.end_time,
            option_count: params.options.len(),
            paid_fee,
        };

        state.store.insert(Poll::new(poll_id, caller, params))?;
        state.treasury.credit(paid_fee);
        state.events.emit(now, event);

        info!(poll_id, creator = %caller, paid_fee, "poll created");
        Ok(poll_id)
    }

    /// Cast an encrypted vote for `option`
    ///
    /// `encrypted_one` must encrypt the value 1 and `proof` must bind it to this ledger
    /// and to `caller`. The option is never logged.
    pub fn vote(
        &mut self,
        caller: Address,
        poll_id: PollId,
        option: usize,
        encrypted_one: &Ciphertext,
        proof: &InputProof,
    ) -> Result<(), ValidationError> {
        let now = self.now();
        let contract = self.state.contract_address;

        let unit = {
            let poll = self.state.store.get_poll(poll_id)?;
            if now < poll.start_time {
                return Err(ValidationError::VotingNotStarted);
            }
            if now >= poll.end_time {
                return Err(ValidationError::VotingEnded);
            }
            if option >= poll.options.len() {
                return Err(ValidationError::InvalidOptionIndex(option));
            }
            if poll.has_voted(&caller) {
                return Err(ValidationError::AlreadyVoted(caller));
            }

            self.verifier
                .verify(encrypted_one, proof, &contract, &caller)
                .map_err(|e| {
                    debug!(poll_id, voter = %caller, "encrypted input rejected");
                    e
                })?
        };

        let poll = self.state.store.get_poll_mut(poll_id)?;
        poll.tally.accumulate(option, unit)?;
        poll.voters.insert(caller);
        poll.total_voters += 1;

        self.state.events.emit(
            now,
            Event::Voted {
                poll_id,
                voter: caller,
            },
        );

        info!(poll_id, voter = %caller, "vote accepted");
        Ok(())
    }

    /// Ask the decryption service to open an ended poll's tallies
    ///
    /// Anyone may call this once voting has ended. Only one request per poll can be in
    /// flight, and there is no way to abandon it.
    pub fn request_reveal(
        &mut self,
        caller: Address,
        poll_id: PollId,
    ) -> Result<RequestId, ValidationError> {
        let now = self.now();
        let state = &mut self.state;

        let poll = state.store.get_poll(poll_id)?;
        if now < poll.end_time {
            return Err(ValidationError::VotingStillActive);
        }
        if poll.revealed {
            return Err(ValidationError::AlreadyRevealed);
        }
        if poll.decryption_in_progress {
            debug!(poll_id, %caller, "reveal rejected, decryption in progress");
            return Err(ValidationError::DecryptionInProgress);
        }

        let request_id =
            state
                .bridge
                .request_decryption(self.oracle.as_ref(), poll_id, poll.tally_ciphertexts())?;

        state.store.get_poll_mut(poll_id)?.decryption_in_progress = true;
        state.events.emit(
            now,
            Event::RevealRequested {
                poll_id,
                request_id,
                requested_by: caller,
            },
        );

        info!(poll_id, request_id, requested_by = %caller, "reveal requested");
        Ok(request_id)
    }

    /// Same as `request_reveal`
    pub fn public_reveal(
        &mut self,
        caller: Address,
        poll_id: PollId,
    ) -> Result<RequestId, ValidationError> {
        self.request_reveal(caller, poll_id)
    }

    /// Deliver a decryption result
    ///
    /// Treated as untrusted input: it must come from the oracle address, answer the
    /// poll's in-flight request, and carry one tally per option. A poll is finalized at
    /// most once; repeated deliveries are rejected.
    pub fn on_decryption_result(
        &mut self,
        caller: Address,
        result: DecryptionResult,
    ) -> Result<(), ValidationError> {
        if caller != self.state.bridge.oracle() {
            return Err(ValidationError::OnlyOracle);
        }

        let poll = self.state.store.get_poll(result.poll_id)?;
        if poll.revealed {
            return Err(ValidationError::AlreadyRevealed);
        }
        if !poll.decryption_in_progress {
            return Err(ValidationError::NoDecryptionInProgress(result.poll_id));
        }

        self.state.bridge.check_result(&caller, &result)?;
        self.finalize(result.poll_id, result.plaintexts)
    }

    fn finalize(&mut self, poll_id: PollId, tallies: Vec<u64>) -> Result<(), ValidationError> {
        let now = self.now();
        let state = &mut self.state;

        let poll = state.store.get_poll_mut(poll_id)?;
        if tallies.len() != poll.options.len() {
            return Err(ValidationError::TallyCountMismatch {
                expected: poll.options.len(),
                found: tallies.len(),
            });
        }

        poll.plaintext_tallies = Some(tallies);
        poll.revealed = true;
        poll.decryption_in_progress = false;
        state.bridge.complete(poll_id);
        state.events.emit(now, Event::RevealCompleted { poll_id });

        info!(poll_id, "reveal completed");
        Ok(())
    }

    /// Change the creation fee (owner only)
    pub fn set_creation_fee(
        &mut self,
        caller: Address,
        new_fee: Amount,
    ) -> Result<(), ValidationError> {
        let now = self.now();
        let old_fee = self.state.treasury.set_creation_fee(&caller, new_fee)?;
        self.state.events.emit(
            now,
            Event::CreationFeeUpdated {
                old_fee,
                new_fee,
                owner: caller,
            },
        );

        info!(old_fee, new_fee, "creation fee updated");
        Ok(())
    }

    /// Pay the collected fees out to the owner (owner only)
    pub fn withdraw_fees(&mut self, caller: Address) -> Result<Amount, ValidationError> {
        let now = self.now();
        let amount = self.state.treasury.withdraw(&caller)?;
        self.state.events.emit(
            now,
            Event::FeesWithdrawn {
                amount,
                owner: caller,
            },
        );

        info!(amount, owner = %caller, "fees withdrawn");
        Ok(amount)
    }

    // Reads
    // -----

    pub fn get_poll(&self, poll_id: PollId) -> Result<&Poll, ValidationError> {
        Ok(self.state.store.get_poll(poll_id)?)
    }

    pub fn get_poll_info(&self, poll_id: PollId) -> Result<PollInfo, ValidationError> {
        Ok(self.get_poll(poll_id)?.info())
    }

    pub fn get_poll_results(&self, poll_id: PollId) -> Result<PollResults, ValidationError> {
        Ok(self.get_poll(poll_id)?.results())
    }

    pub fn get_poll_status(&self, poll_id: PollId) -> Result<PollStatus, ValidationError> {
        Ok(self.get_poll(poll_id)?.status(self.now()))
    }

    pub fn has_user_voted(&self, poll_id: PollId, voter: &Address) -> Result<bool, ValidationError> {
        Ok(self.get_poll(poll_id)?.has_voted(voter))
    }

    pub fn is_decryption_in_progress(&self, poll_id: PollId) -> Result<bool, ValidationError> {
        Ok(self.get_poll(poll_id)?.is_decryption_in_progress())
    }

    /// Whether a reveal request would currently be accepted
    pub fn can_reveal(&self, poll_id: PollId) -> Result<bool, ValidationError> {
        let poll = self.get_poll(poll_id)?;
        Ok(poll.status(self.now()) == PollStatus::Ended && !poll.decryption_in_progress)
    }

    pub fn poll_count(&self) -> u64 {
        self.state.store.count()
    }

    pub fn owner(&self) -> Address {
        self.state.treasury.owner()
    }

    pub fn oracle(&self) -> Address {
        self.state.bridge.oracle()
    }

    pub fn contract_address(&self) -> Address {
        self.state.contract_address
    }

    pub fn creation_fee(&self) -> Amount {
        self.state.treasury.creation_fee()
    }

    pub fn treasury_balance(&self) -> Amount {
        self.state.treasury.balance()
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Fixture, UnavailableOracle};

    #[test]
    fn test_create_poll() {
        let mut fx = Fixture::new();

        let id = fx.create_poll().unwrap();
        assert_eq!(id, 0);
        assert_eq!(fx.ledger.poll_count(), 1);
        assert_eq!(fx.ledger.treasury_balance(), DEFAULT_CREATION_FEE);
        assert_eq!(fx.create_poll().unwrap(), 1);

        let info = fx.ledger.get_poll_info(0).unwrap();
        assert_eq!(info.creator, fx.alice);
        assert_eq!(info.options, vec!["Option A", "Option B", "Option C"]);
        assert_eq!(info.total_voters, 0);
        assert!(!info.revealed);

        let created = fx.ledger.events().creation_event(1).unwrap();
        assert_eq!(
            created.event,
            Event::PollCreated {
                poll_id: 1,
                creator: fx.alice,
                title: "Test Poll".to_owned(),
                start_time: fx.start,
                end_time: fx.end,
                option_count: 3,
                paid_fee: DEFAULT_CREATION_FEE,
            }
        );
    }

    #[test]
    fn test_rejected_creation_changes_nothing() {
        let mut fx = Fixture::new();
        let alice = fx.alice;

        let err = fx
            .ledger
            .create_poll(alice, fx.params(), DEFAULT_CREATION_FEE / 2)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientCreationFee { .. }));
        assert_eq!(err.kind(), ErrorKind::Funding);

        let mut bad = fx.params();
        bad.options.truncate(1);
        assert!(matches!(
            fx.ledger.create_poll(alice, bad, DEFAULT_CREATION_FEE),
            Err(ValidationError::InvalidOptionCount(1))
        ));

        let mut bad = fx.params();
        bad.end_time = bad.start_time - 1;
        let err = fx
            .ledger
            .create_poll(alice, bad, DEFAULT_CREATION_FEE)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(fx.ledger.poll_count(), 0);
        assert_eq!(fx.ledger.treasury_balance(), 0);
        assert!(fx.ledger.events().records().is_empty());
    }

    #[test]
    fn test_overpayment_is_kept() {
        let mut fx = Fixture::new();
        let alice = fx.alice;
        fx.ledger
            .create_poll(alice, fx.params(), 3 * DEFAULT_CREATION_FEE)
            .unwrap();
        assert_eq!(fx.ledger.treasury_balance(), 3 * DEFAULT_CREATION_FEE);
    }

    #[test]
    fn test_vote_window() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        let bob = fx.bob;

        // Before start
        let err = fx.vote(bob, id, 0).unwrap_err();
        assert!(matches!(err, ValidationError::VotingNotStarted));
        assert_eq!(err.kind(), ErrorKind::Temporal);

        // Exactly at start
        fx.clock.set(fx.start);
        fx.vote(bob, id, 0).unwrap();

        // Last second of the window
        fx.clock.set(fx.end - 1);
        fx.vote(fx.carol, id, 1).unwrap();

        // Exactly at end
        fx.clock.set(fx.end);
        assert!(matches!(
            fx.vote(fx.dave, id, 1),
            Err(ValidationError::VotingEnded)
        ));

        assert_eq!(fx.ledger.get_poll_info(id).unwrap().total_voters, 2);
    }

    #[test]
    fn test_vote_rejections_change_nothing() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        fx.clock.set(fx.start);
        let bob = fx.bob;

        assert!(matches!(
            fx.vote(bob, 99, 0),
            Err(ValidationError::PollNotFound(PollNotFound(99)))
        ));
        assert!(matches!(
            fx.vote(bob, id, 3),
            Err(ValidationError::InvalidOptionIndex(3))
        ));

        // Proof made out for someone else
        let input = fx.encrypt_one();
        let proof = fx.attestor.attest(&input, &fx.ledger.contract_address(), &fx.carol);
        assert!(matches!(
            fx.ledger.vote(bob, id, 0, &input, &proof),
            Err(ValidationError::InputVerificationFailed)
        ));

        let poll = fx.ledger.get_poll(id).unwrap();
        assert_eq!(poll.total_voters(), 0);
        assert!(!poll.has_voted(&bob));
        assert_eq!(poll.tally_ciphertexts(), &[Ciphertext::zero(); 3][..]);

        fx.vote(bob, id, 0).unwrap();
        let snapshot = fx.ledger.get_poll(id).unwrap().tally_ciphertexts().to_vec();

        // Second vote from the same address, even for another option
        assert!(matches!(
            fx.vote(bob, id, 2),
            Err(ValidationError::AlreadyVoted(_))
        ));
        let poll = fx.ledger.get_poll(id).unwrap();
        assert_eq!(poll.total_voters(), 1);
        assert_eq!(poll.tally_ciphertexts(), &snapshot[..]);
        assert!(fx.ledger.has_user_voted(id, &bob).unwrap());
        assert!(!fx.ledger.has_user_voted(id, &fx.carol).unwrap());
    }

    #[test]
    fn test_reveal_preconditions() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        let carol = fx.carol;

        fx.clock.set(fx.start);
        let err = fx.ledger.public_reveal(carol, id).unwrap_err();
        assert!(matches!(err, ValidationError::VotingStillActive));
        assert_eq!(err.kind(), ErrorKind::Temporal);
        assert!(!fx.ledger.can_reveal(id).unwrap());

        fx.clock.set(fx.end);
        assert!(fx.ledger.can_reveal(id).unwrap());
        fx.ledger.request_reveal(carol, id).unwrap();
        assert!(fx.ledger.is_decryption_in_progress(id).unwrap());
        assert!(!fx.ledger.can_reveal(id).unwrap());

        let err = fx.ledger.public_reveal(fx.bob, id).unwrap_err();
        assert!(matches!(err, ValidationError::DecryptionInProgress));
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(fx.oracle.len().unwrap(), 1);

        assert!(matches!(
            fx.ledger.request_reveal(carol, 42),
            Err(ValidationError::PollNotFound(_))
        ));
    }

    #[test]
    fn test_reveal_with_unavailable_oracle() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        fx.clock.set(fx.end);

        let mut ledger = PollLifecycleManager::with_state(
            fx.ledger.into_state(),
            fx.attestor.verifier(),
            UnavailableOracle,
            fx.clock.clone(),
        );

        let err = ledger.request_reveal(fx.bob, id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!ledger.is_decryption_in_progress(id).unwrap());
        assert!(ledger.state().bridge.in_flight(id).is_none());
        assert!(ledger.can_reveal(id).unwrap());
    }

    #[test]
    fn test_decryption_result_checks() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        let oracle = fx.ledger.oracle();

        // Nothing requested yet
        let early = DecryptionResult {
            request_id: 0,
            poll_id: id,
            plaintexts: vec![0, 0, 0],
        };
        assert!(matches!(
            fx.ledger.on_decryption_result(oracle, early),
            Err(ValidationError::NoDecryptionInProgress(_))
        ));

        fx.clock.set(fx.end);
        let request_id = fx.ledger.request_reveal(fx.bob, id).unwrap();
        let result = DecryptionResult {
            request_id,
            poll_id: id,
            plaintexts: vec![0, 0, 0],
        };

        // Only the oracle may answer
        let err = fx
            .ledger
            .on_decryption_result(fx.bob, result.clone())
            .unwrap_err();
        assert!(matches!(err, ValidationError::OnlyOracle));
        assert_eq!(err.kind(), ErrorKind::Authorization);

        // Wrong correlation id
        let stale = DecryptionResult {
            request_id: request_id + 1,
            ..result.clone()
        };
        assert!(matches!(
            fx.ledger.on_decryption_result(oracle, stale),
            Err(ValidationError::StaleDecryptionResult { .. })
        ));

        // Wrong number of tallies
        let short = DecryptionResult {
            plaintexts: vec![0, 0],
            ..result.clone()
        };
        assert!(matches!(
            fx.ledger.on_decryption_result(oracle, short),
            Err(ValidationError::TallyCountMismatch {
                expected: 3,
                found: 2
            })
        ));

        assert!(fx.ledger.is_decryption_in_progress(id).unwrap());
        assert!(fx.ledger.get_poll_results(id).unwrap().tallies.is_none());

        fx.ledger.on_decryption_result(oracle, result).unwrap();
        assert_eq!(fx.ledger.get_poll_status(id).unwrap(), PollStatus::Revealed);
    }

    #[test]
    fn test_finalize_exactly_once() {
        let mut fx = Fixture::new();
        let id = fx.create_poll().unwrap();
        let oracle = fx.ledger.oracle();
        fx.clock.set(fx.end);
        let request_id = fx.ledger.request_reveal(fx.bob, id).unwrap();

        let result = DecryptionResult {
            request_id,
            poll_id: id,
            plaintexts: vec![0, 0, 0],
        };
        fx.ledger.on_decryption_result(oracle, result).unwrap();

        // Redelivered with different numbers
        let replay = DecryptionResult {
            request_id,
            poll_id: id,
            plaintexts: vec![7, 7, 7],
        };
        assert!(matches!(
            fx.ledger.on_decryption_result(oracle, replay),
            Err(ValidationError::AlreadyRevealed)
        ));
        assert_eq!(
            fx.ledger.get_poll_results(id).unwrap().tallies,
            Some(vec![0, 0, 0])
        );

        // A revealed poll cannot be revealed again
        assert!(matches!(
            fx.ledger.request_reveal(fx.bob, id),
            Err(ValidationError::AlreadyRevealed)
        ));
        assert!(!fx.ledger.can_reveal(id).unwrap());
    }

    #[test]
    fn test_owner_operations() {
        let mut fx = Fixture::new();
        let owner = fx.ledger.owner();
        let alice = fx.alice;

        let err = fx
            .ledger
            .set_creation_fee(alice, 2 * DEFAULT_CREATION_FEE)
            .unwrap_err();
        assert!(matches!(err, ValidationError::OnlyOwner));
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(fx.ledger.creation_fee(), DEFAULT_CREATION_FEE);

        fx.ledger
            .set_creation_fee(owner, 2 * DEFAULT_CREATION_FEE)
            .unwrap();
        assert_eq!(fx.ledger.creation_fee(), 2 * DEFAULT_CREATION_FEE);
        assert_eq!(
            fx.ledger.events().last().unwrap().event,
            Event::CreationFeeUpdated {
                old_fee: DEFAULT_CREATION_FEE,
                new_fee: 2 * DEFAULT_CREATION_FEE,
                owner,
            }
        );

        // Subsequent creations use the new fee
        let err = fx
            .ledger
            .create_poll(alice, fx.params(), DEFAULT_CREATION_FEE)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InsufficientCreationFee {
                required,
                paid: DEFAULT_CREATION_FEE,
            } if required == 2 * DEFAULT_CREATION_FEE
        ));
        assert_eq!(fx.ledger.poll_count(), 0);
        fx.ledger
            .create_poll(alice, fx.params(), 2 * DEFAULT_CREATION_FEE)
            .unwrap();

        assert!(matches!(
            fx.ledger.withdraw_fees(alice),
            Err(ValidationError::OnlyOwner)
        ));
        assert_eq!(
            fx.ledger.withdraw_fees(owner).unwrap(),
            2 * DEFAULT_CREATION_FEE
        );
        assert_eq!(fx.ledger.treasury_balance(), 0);
        assert_eq!(
            fx.ledger.events().last().unwrap().event,
            Event::FeesWithdrawn {
                amount: 2 * DEFAULT_CREATION_FEE,
                owner,
            }
        );
    }
}
