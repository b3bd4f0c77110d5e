use crate::state::OpenLedger;
use privatevote::*;

pub fn command_set_fee(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let caller = crate::account("set-fee", matches.value_of("from").unwrap_or_default());
    let fee = crate::ether("set-fee", matches.value_of("FEE").unwrap_or_default());

    let mut open = OpenLedger::open("set-fee", path, now);
    open.ledger
        .set_creation_fee(caller, fee)
        .unwrap_or_else(|e| crate::fail("set-fee", e));
    open.close("set-fee", path);

    println!("creation-fee: {} ETH", format_ether(fee));
}

pub fn command_withdraw(matches: &clap::ArgMatches, path: &str, now: Timestamp) {
    let caller = crate::account("withdraw", matches.value_of("from").unwrap_or_default());

    let mut open = OpenLedger::open("withdraw", path, now);
    let amount = open
        .ledger
        .withdraw_fees(caller)
        .unwrap_or_else(|e| crate::fail("withdraw", e));
    open.close("withdraw", path);

    println!("withdrawn: {} ETH to {}", format_ether(amount), caller);
}
