use privatevote::*;
use rand::Rng;
use std::str::FromStr;

/// Run a whole poll against an in-memory ledger and check the revealed tally
pub fn command_e2e(matches: &clap::ArgMatches, now: Timestamp) {
    let voters = usize::from_str(matches.value_of("voters").unwrap_or("25"))
        .unwrap_or_else(|e| crate::fail("e2e", e));
    let option_count = usize::from_str(matches.value_of("options").unwrap_or("3"))
        .unwrap_or_else(|e| crate::fail("e2e", e));

    let mut rng = rand::rngs::OsRng {};
    let clock = ManualClock::new(now);
    let oracle = QueuedOracle::default();
    let gateway = InputAttestor::generate();
    let decryptor =
        LocalDecryptionService::new(TallyKeypair::generate(&mut rng), Address::random());

    let owner = Address::derive(b"owner");
    let config = LedgerConfig::new(owner, decryptor.address(), Address::random());
    let contract = config.contract_address;
    let service: PollService = PollService::new(PollLifecycleManager::new(
        config,
        gateway.verifier(),
        oracle.clone(),
        clock.clone(),
    ));

    let options: Vec<String> = (0..option_count).map(|i| format!("Option {}", i)).collect();
    let options: Vec<&str> = options.iter().map(|o| o.as_str()).collect();
    let params = NewPoll::new(
        "End to end",
        "Throwaway poll",
        &options,
        now + 60,
        now + 3660,
    );
    let fee = DEFAULT_CREATION_FEE;
    let poll_id = service
        .create_poll(Address::derive(b"creator"), params, fee)
        .unwrap_or_else(|e| crate::fail("e2e", e));
    println!("> Poll {} created", poll_id);

    // Voting is open
    clock.set(now + 60);
    let public_key = decryptor.public_key();
    let mut expected = vec![0u64; option_count];
    for i in 0..voters {
        let voter = Address::derive(format!("voter {}", i).as_bytes());
        let choice = rng.gen_range(0, option_count);
        let encrypted_one = public_key.encrypt(1, &mut rng);
        let proof = gateway.attest(&encrypted_one, &contract, &voter);

        service
            .vote(voter, poll_id, choice, &encrypted_one, &proof)
            .unwrap_or_else(|e| crate::fail("e2e", e));
        expected[choice] += 1;
    }
    println!("> {} votes cast", voters);

    // Voting is over
    clock.set(now + 3660);
    let request_id = service
        .public_reveal(Address::derive(b"anyone"), poll_id)
        .unwrap_or_else(|e| crate::fail("e2e", e));
    println!("> Reveal requested (request {})", request_id);

    for request in oracle.drain().unwrap_or_else(|e| crate::fail("e2e", e)) {
        let result = decryptor
            .process(&request)
            .unwrap_or_else(|e| crate::fail("e2e", e));
        service
            .on_decryption_result(decryptor.address(), result)
            .unwrap_or_else(|e| crate::fail("e2e", e));
    }

    let results = service
        .get_poll_results(poll_id)
        .unwrap_or_else(|e| crate::fail("e2e", e));
    let tallies = results.tallies.unwrap_or_default();
    if tallies != expected {
        crate::fail(
            "e2e",
            format!("tally mismatch: expected {:?}, got {:?}", expected, tallies),
        );
    }

    println!("> Tally verified OK");
    for (option, count) in options.iter().zip(&tallies) {
        println!("  {} got {} votes", option, count);
    }
}
