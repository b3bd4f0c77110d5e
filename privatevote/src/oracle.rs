use crate::*;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Correlation id of a decryption request
pub type RequestId = u64;

/// A request to decrypt a poll's tally ciphertexts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecryptionRequest {
    pub request_id: RequestId,
    pub poll_id: PollId,
    pub ciphertexts: Vec<Ciphertext>,
}

/// The decryption service's answer to a `DecryptionRequest`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecryptionResult {
    pub request_id: RequestId,
    pub poll_id: PollId,
    pub plaintexts: Vec<u64>,
}

/// An external decryption service
///
/// `submit` hands the request over and returns immediately. The result comes back
/// later, as a separate call from the oracle's own address.
pub trait DecryptionOracle: Send + Sync {
    fn submit(&self, request: &DecryptionRequest) -> Result<(), Error>;
}

/// Bookkeeping for the request/result exchange with the decryption service
///
/// At most one request per poll is in flight. There is no timeout: a request whose
/// result never arrives stays in flight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RevealOracleBridge {
    oracle: Address,
    next_request_id: RequestId,
    in_flight: IndexMap<PollId, RequestId>,
}

impl RevealOracleBridge {
    pub fn new(oracle: Address) -> Self {
        RevealOracleBridge {
            oracle,
            next_request_id: 0,
            in_flight: IndexMap::new(),
        }
    }

    /// The address results must come from
    pub fn oracle(&self) -> Address {
        self.oracle
    }

    pub fn in_flight(&self, poll_id: PollId) -> Option<RequestId> {
        self.in_flight.get(&poll_id).copied()
    }

    /// All outstanding requests, oldest first
    pub fn pending(&self) -> impl Iterator<Item = (PollId, RequestId)> + '_ {
        self.in_flight.iter().map(|(p, r)| (*p, *r))
    }

    /// Submit a poll's ciphertexts for decryption
    ///
    /// Nothing is recorded unless the oracle accepts the request.
    pub fn request_decryption(
        &mut self,
        oracle: &dyn DecryptionOracle,
        poll_id: PollId,
        ciphertexts: &[Ciphertext],
    ) -> Result<RequestId, ValidationError> {
        if self.in_flight.contains_key(&poll_id) {
            return Err(ValidationError::DecryptionInProgress);
        }

        let request = DecryptionRequest {
            request_id: self.next_request_id,
            poll_id,
            ciphertexts: ciphertexts.to_vec(),
        };
        oracle.submit(&request)?;

        self.next_request_id += 1;
        self.in_flight.insert(poll_id, request.request_id);
        Ok(request.request_id)
    }

    /// Check that a result comes from the oracle and answers the in-flight request
    pub fn check_result(
        &self,
        caller: &Address,
        result: &DecryptionResult,
    ) -> Result<(), ValidationError> {
        if *caller != self.oracle {
            warn!(poll_id = result.poll_id, %caller, "decryption result from unexpected caller");
            return Err(ValidationError::OnlyOracle);
        }

        if self.in_flight(result.poll_id) != Some(result.request_id) {
            warn!(
                poll_id = result.poll_id,
                request_id = result.request_id,
                "stale or duplicate decryption result"
            );
            return Err(ValidationError::StaleDecryptionResult {
                poll_id: result.poll_id,
                request_id: result.request_id,
            });
        }

        Ok(())
    }

    /// Retire the in-flight request of a finalized poll
    pub(crate) fn complete(&mut self, poll_id: PollId) {
        self.in_flight.shift_remove(&poll_id);
    }
}

/// An in-process oracle that queues requests for a `LocalDecryptionService`
///
/// Clones share the same queue.
#[derive(Clone, Default, Debug)]
pub struct QueuedOracle {
    queue: Arc<Mutex<VecDeque<DecryptionRequest>>>,
}

impl QueuedOracle {
    pub fn with_pending(pending: Vec<DecryptionRequest>) -> Self {
        QueuedOracle {
            queue: Arc::new(Mutex::new(pending.into())),
        }
    }

    /// Take every queued request
    pub fn drain(&self) -> Result<Vec<DecryptionRequest>, Error> {
        let mut queue = self.queue.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(queue.drain(..).collect())
    }

    /// Number of queued requests
    pub fn len(&self) -> Result<usize, Error> {
        let queue = self.queue.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(queue.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }
}

impl DecryptionOracle for QueuedOracle {
    fn submit(&self, request: &DecryptionRequest) -> Result<(), Error> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|e| Error::OracleUnavailable(e.to_string()))?;
        queue.push_back(request.clone());
        Ok(())
    }
}

/// Stand-in for the external decryption service
pub struct LocalDecryptionService {
    keypair: TallyKeypair,
    address: Address,
    search_bound: u64,
}

impl LocalDecryptionService {
    pub const DEFAULT_SEARCH_BOUND: u64 = 1 << 20;

    pub fn new(keypair: TallyKeypair, address: Address) -> Self {
        LocalDecryptionService {
            keypair,
            address,
            search_bound: Self::DEFAULT_SEARCH_BOUND,
        }
    }

    /// Largest per-option count the service will search for
    pub fn with_search_bound(mut self, search_bound: u64) -> Self {
        self.search_bound = search_bound;
        self
    }

    /// The address results are delivered from
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> TallyPublicKey {
        self.keypair.public()
    }

    pub fn process(&self, request: &DecryptionRequest) -> Result<DecryptionResult, Error> {
        let plaintexts = request
            .ciphertexts
            .iter()
            .map(|c| self.keypair.decrypt(c, self.search_bound))
            .collect::<Result<Vec<u64>, Error>>()?;

        Ok(DecryptionResult {
            request_id: request.request_id,
            poll_id: request.poll_id,
            plaintexts,
        })
    }
}
