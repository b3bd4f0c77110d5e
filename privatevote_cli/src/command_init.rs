use crate::state::CliState;
use privatevote::*;

pub fn command_init(matches: &clap::ArgMatches, path: &str) {
    if std::path::Path::new(path).exists() && !matches.is_present("force") {
        crate::fail(
            "init",
            format!("{} already exists, use --force to overwrite", path),
        );
    }

    let mut rng = rand::rngs::OsRng {};
    let tally_key = TallyKeypair::generate(&mut rng);
    let gateway = InputAttestor::generate();

    let owner = crate::account("init", matches.value_of("owner").unwrap_or("owner"));
    let mut config = LedgerConfig::new(owner, Address::random(), Address::random());
    if let Some(fee) = matches.value_of("fee") {
        config.creation_fee = crate::ether("init", fee);
    }

    let state = CliState {
        ledger: LedgerState::new(config.clone()),
        tally_secret: hex::encode(tally_key.secret_bytes()),
        gateway_secret: hex::encode(gateway.secret_bytes()),
        search_bound: LocalDecryptionService::DEFAULT_SEARCH_BOUND,
        pending: vec![],
    };
    state.save("init", path);

    println!("state: {}", path);
    println!("owner: {}", config.owner);
    println!("oracle: {}", config.oracle);
    println!("contract: {}", config.contract_address);
    println!("creation-fee: {} ETH", format_ether(config.creation_fee));
    println!("tally-public-key: {}", tally_key.public());
}
