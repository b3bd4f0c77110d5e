use privatevote::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the CLI keeps between invocations
///
/// Holds the ledger plus the secrets of the simulated decryption service and input
/// gateway. A real deployment keeps those secrets off the ledger host.
#[derive(Serialize, Deserialize)]
pub struct CliState {
    pub ledger: LedgerState,
    pub tally_secret: String,
    pub gateway_secret: String,
    pub search_bound: u64,

    /// Requests submitted to the decryption service and not yet processed
    #[serde(default)]
    pub pending: Vec<DecryptionRequest>,
}

impl CliState {
    pub fn load(command: &str, path: &str) -> Self {
        let json = std::fs::read_to_string(path).unwrap_or_else(|e| {
            crate::fail(
                command,
                format!("unable to read {}: {} (run `privatevote init` first)", path, e),
            )
        });
        serde_json::from_str(&json)
            .unwrap_or_else(|e| crate::fail(command, format!("unable to parse {}: {}", path, e)))
    }

    pub fn save(&self, command: &str, path: &str) {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).unwrap_or_else(|e| crate::fail(command, e));
            }
        }

        let json = serde_json::to_string_pretty(self).unwrap_or_else(|e| crate::fail(command, e));
        std::fs::write(path, json)
            .unwrap_or_else(|e| crate::fail(command, format!("unable to write {}: {}", path, e)));
    }

    pub fn tally_keypair(&self, command: &str) -> TallyKeypair {
        hex::decode(&self.tally_secret)
            .map_err(|_| Error::TallyKeyBadEncoding)
            .and_then(|bytes| TallyKeypair::from_secret_bytes(&bytes))
            .unwrap_or_else(|e| crate::fail(command, e))
    }

    pub fn attestor(&self, command: &str) -> InputAttestor {
        let bytes = hex::decode(&self.gateway_secret)
            .unwrap_or_else(|e| crate::fail(command, format!("invalid gateway secret: {}", e)));
        InputAttestor::from_secret_bytes(&bytes).unwrap_or_else(|e| crate::fail(command, e))
    }

    pub fn decryption_service(&self, command: &str) -> LocalDecryptionService {
        LocalDecryptionService::new(self.tally_keypair(command), self.ledger.bridge.oracle())
            .with_search_bound(self.search_bound)
    }
}

/// A ledger opened from a state file, to be written back with `close`
pub struct OpenLedger {
    pub ledger: PollLifecycleManager,
    pub oracle: QueuedOracle,
    pub state: CliState,
}

impl OpenLedger {
    pub fn open(command: &str, path: &str, now: Timestamp) -> Self {
        let mut state = CliState::load(command, path);
        let attestor = state.attestor(command);
        let oracle = QueuedOracle::with_pending(std::mem::take(&mut state.pending));

        // The ledger is moved into the manager; a placeholder stands in until `close`
        let ledger_state = std::mem::replace(
            &mut state.ledger,
            LedgerState::new(LedgerConfig::new(
                Address::zero(),
                Address::zero(),
                Address::zero(),
            )),
        );
        let ledger = PollLifecycleManager::with_state(
            ledger_state,
            attestor.verifier(),
            oracle.clone(),
            ManualClock::new(now),
        );

        OpenLedger {
            ledger,
            oracle,
            state,
        }
    }

    pub fn close(self, command: &str, path: &str) {
        let OpenLedger {
            ledger,
            oracle,
            mut state,
        } = self;

        state.ledger = ledger.into_state();
        state.pending = oracle.drain().unwrap_or_else(|e| crate::fail(command, e));
        state.save(command, path);
    }
}
