use crate::state::OpenLedger;
use privatevote::*;
use std::str::FromStr;

pub fn command_create(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let caller = crate::account("create", matches.value_of("from").unwrap_or_default());
    let options: Vec<&str> = matches.values_of("option").map(|v| v.collect()).unwrap_or_default();
    let params = NewPoll::new(
        matches.value_of("title").unwrap_or_default(),
        matches.value_of("description").unwrap_or_default(),
        &options,
        crate::timestamp("create", matches.value_of("start").unwrap_or("+60"), now),
        crate::timestamp("create", matches.value_of("end").unwrap_or("+3660"), now),
    );

    let mut open = OpenLedger::open("create", path, now);
    let fee = match matches.value_of("fee") {
        Some(fee) => crate::ether("create", fee),
        None => open.ledger.creation_fee(),
    };

    let poll_id = open
        .ledger
        .create_poll(caller, params, fee)
        .unwrap_or_else(|e| crate::fail("create", e));
    open.close("create", path);

    println!("poll-id: {}", poll_id);
    println!("paid: {} ETH", format_ether(fee));
}

pub fn command_vote(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let caller = crate::account("vote", matches.value_of("from").unwrap_or_default());
    let poll_id = crate::poll_id("vote", matches);
    let option = matches.value_of("OPTION").unwrap_or_default();
    let option = usize::from_str(option)
        .unwrap_or_else(|e| crate::fail("vote", format!("invalid option {}: {}", option, e)));

    let mut open = OpenLedger::open("vote", path, now);

    // Client side: encrypt the unit and have the gateway attest it
    let mut rng = rand::rngs::OsRng {};
    let tally_key = open.state.tally_keypair("vote").public();
    let encrypted_one = tally_key.encrypt(1, &mut rng);
    let proof = open.state.attestor("vote").attest(
        &encrypted_one,
        &open.ledger.contract_address(),
        &caller,
    );

    open.ledger
        .vote(caller, poll_id, option, &encrypted_one, &proof)
        .unwrap_or_else(|e| crate::fail("vote", e));
    open.close("vote", path);

    println!("voted: {} in poll {}", caller, poll_id);
}

pub fn command_reveal(matches: &clap::ArgMatches, path: &str, now: Timestamp, public: bool) {
    let command = if public { "public-reveal" } else { "reveal" };
    let caller = crate::account(command, matches.value_of("from").unwrap_or_default());
    let poll_id = crate::poll_id(command, matches);

    let mut open = OpenLedger::open(command, path, now);
    let result = if public {
        open.ledger.public_reveal(caller, poll_id)
    } else {
        open.ledger.request_reveal(caller, poll_id)
    };
    let request_id = result.unwrap_or_else(|e| crate::fail(command, e));
    open.close(command, path);

    println!("request-id: {}", request_id);
    println!("run `privatevote oracle` to deliver the decrypted tallies");
}
