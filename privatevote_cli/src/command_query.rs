use crate::state::OpenLedger;
use privatevote::*;
use serde::Serialize;
use std::str::FromStr;

pub fn command_info(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let poll_id = crate::poll_id("info", matches);
    let open = OpenLedger::open("info", path, now);

    let info = open
        .ledger
        .get_poll_info(poll_id)
        .unwrap_or_else(|e| crate::fail("info", e));
    crate::print_json("info", &info);
}

pub fn command_results(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let poll_id = crate::poll_id("results", matches);
    let open = OpenLedger::open("results", path, now);

    let results = open
        .ledger
        .get_poll_results(poll_id)
        .unwrap_or_else(|e| crate::fail("results", e));

    if results.revealed {
        let info = open
            .ledger
            .get_poll_info(poll_id)
            .unwrap_or_else(|e| crate::fail("results", e));
        let tallies = results.tallies.as_deref().unwrap_or_default();
        for (option, count) in info.options.iter().zip(tallies) {
            eprintln!("  {} got {} votes", option, count);
        }
    }
    crate::print_json("results", &results);
}

#[derive(Serialize)]
struct PollStatusReport {
    poll_id: PollId,
    status: PollStatus,
    can_reveal: bool,
    decryption_in_progress: bool,
    total_voters: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_voted: Option<bool>,
}

#[derive(Serialize)]
struct LedgerReport {
    now: Timestamp,
    owner: Address,
    oracle: Address,
    contract: Address,
    creation_fee: String,
    treasury_balance: String,
    poll_count: u64,
    pending_reveals: Vec<PollId>,
}

pub fn command_status(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let open = OpenLedger::open("status", path, now);
    let ledger = &open.ledger;

    if matches.value_of("POLL-ID").is_none() {
        let report = LedgerReport {
            now,
            owner: ledger.owner(),
            oracle: ledger.oracle(),
            contract: ledger.contract_address(),
            creation_fee: format_ether(ledger.creation_fee()),
            treasury_balance: format_ether(ledger.treasury_balance()),
            poll_count: ledger.poll_count(),
            pending_reveals: ledger.state().bridge.pending().map(|(p, _)| p).collect(),
        };
        crate::print_json("status", &report);
        return;
    }

    let poll_id = crate::poll_id("status", matches);
    let poll = ledger
        .get_poll(poll_id)
        .unwrap_or_else(|e| crate::fail("status", e));
    let has_voted = matches
        .value_of("voter")
        .map(|v| poll.has_voted(&crate::account("status", v)));

    let report = PollStatusReport {
        poll_id,
        status: poll.status(now),
        can_reveal: ledger
            .can_reveal(poll_id)
            .unwrap_or_else(|e| crate::fail("status", e)),
        decryption_in_progress: poll.is_decryption_in_progress(),
        total_voters: poll.total_voters(),
        has_voted,
    };
    crate::print_json("status", &report);
}

pub fn command_events(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let open = OpenLedger::open("events", path, now);
    let events = open.ledger.events();

    let records: Vec<&EventRecord> = match matches.value_of("poll") {
        Some(poll_id) => {
            let poll_id = PollId::from_str(poll_id).unwrap_or_else(|e| crate::fail("events", e));
            events.for_poll(poll_id).collect()
        }
        None => events.records().iter().collect(),
    };
    crate::print_json("events", &records);
}
