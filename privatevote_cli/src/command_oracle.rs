use crate::state::OpenLedger;
use privatevote::*;
use tracing::{info, warn};

/// Play the decryption service: decrypt every pending request and deliver the results
pub fn command_oracle(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let mut open = OpenLedger::open("oracle", path, now);
    let service = open.state.decryption_service("oracle");
    let caller = match matches.value_of("as") {
        Some(account) => crate::account("oracle", account),
        None => service.address(),
    };

    let requests = open
        .oracle
        .drain()
        .unwrap_or_else(|e| crate::fail("oracle", e));
    if requests.is_empty() {
        println!("no pending decryption requests");
        return;
    }

    let mut failed = 0;
    for request in requests {
        let result = match service.process(&request) {
            Ok(result) => result,
            Err(e) => {
                warn!(poll_id = request.poll_id, error = %e, "decryption failed");
                eprintln!("privatevote oracle: poll {}: {}", request.poll_id, e);
                requeue(&open.oracle, &request);
                failed += 1;
                continue;
            }
        };

        let poll_id = result.poll_id;
        let tallies = result.plaintexts.clone();
        match open.ledger.on_decryption_result(caller, result) {
            Ok(()) => {
                info!(poll_id, "result delivered");
                println!("poll {} revealed: {:?}", poll_id, tallies);
            }
            Err(e) => {
                eprintln!("privatevote oracle: poll {}: {}", poll_id, e);
                if e.kind() != ErrorKind::State {
                    requeue(&open.oracle, &request);
                }
                failed += 1;
            }
        }
    }

    open.close("oracle", path);
    if failed > 0 {
        std::process::exit(1);
    }
}

// Undelivered requests stay pending so a later run can retry them
fn requeue(oracle: &QueuedOracle, request: &DecryptionRequest) {
    oracle
        .submit(request)
        .unwrap_or_else(|e| crate::fail("oracle", e));
}
