use clap::{App, AppSettings, Arg, SubCommand};
use num_enum::TryFromPrimitive;
use privatevote::*;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

mod command_e2e;
mod command_fees;
mod command_init;
mod command_oracle;
mod command_poll;
mod command_query;
mod state;

use command_e2e::command_e2e;
use command_fees::*;
use command_init::command_init;
use command_oracle::command_oracle;
use command_poll::*;
use command_query::*;

#[derive(TryFromPrimitive, PartialEq, PartialOrd, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Verbosity {
    /// Warn by default, each -v raises the level and each -q lowers it
    fn from_counts(verbose: u64, quiet: u64) -> Self {
        let level = (Verbosity::Warn as i64 + verbose.min(4) as i64 - quiet.min(4) as i64)
            .max(Verbosity::Silent as i64)
            .min(Verbosity::Debug as i64);
        Verbosity::try_from_primitive(level as u8).unwrap_or(Verbosity::Warn)
    }

    fn filter(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

fn main() {
    let poll_id_arg = Arg::with_name("POLL-ID")
        .index(1)
        .required(true)
        .help("Poll id");
    let from_arg = Arg::with_name("from")
        .long("from")
        .takes_value(true)
        .required(true)
        .help("Calling account, as 0x-prefixed hex or a name such as 'alice'");

    let matches = App::new("PrivateVote CLI")
        .version("0.1")
        .about("Runs confidential timed polls against a local ledger")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("state")
                .long("state")
                .takes_value(true)
                .help("Ledger state file - can also be set with PRIVATEVOTE_STATE"),
        )
        .arg(
            Arg::with_name("now")
                .long("now")
                .takes_value(true)
                .help("Unix time to run operations at, defaults to the system clock"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("q")
                .short("q")
                .multiple(true)
                .help("Lowers the level of verbosity, -qq silences logging"),
        )
        .subcommand(
            SubCommand::with_name("init")
                .about("Create a new ledger state file")
                .arg(
                    Arg::with_name("owner")
                        .long("owner")
                        .takes_value(true)
                        .default_value("owner")
                        .help("Owner account"),
                )
                .arg(
                    Arg::with_name("fee")
                        .long("fee")
                        .takes_value(true)
                        .help("Creation fee in ether, defaults to 0.001"),
                )
                .arg(
                    Arg::with_name("force")
                        .long("force")
                        .help("Overwrite an existing state file"),
                ),
        )
        .subcommand(
            SubCommand::with_name("create")
                .about("Create a poll")
                .arg(from_arg.clone())
                .arg(
                    Arg::with_name("title")
                        .long("title")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("description")
                        .long("description")
                        .takes_value(true)
                        .default_value(""),
                )
                .arg(
                    Arg::with_name("option")
                        .long("option")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .required(true)
                        .help("A poll option, repeat for each option"),
                )
                .arg(
                    Arg::with_name("start")
                        .long("start")
                        .takes_value(true)
                        .default_value("+60")
                        .help("Start time, as unix seconds or +SECONDS from now"),
                )
                .arg(
                    Arg::with_name("end")
                        .long("end")
                        .takes_value(true)
                        .default_value("+3660")
                        .help("End time, as unix seconds or +SECONDS from now"),
                )
                .arg(
                    Arg::with_name("fee")
                        .long("fee")
                        .takes_value(true)
                        .help("Fee to pay in ether, defaults to the current creation fee"),
                ),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Encrypt and cast a vote")
                .arg(from_arg.clone())
                .arg(poll_id_arg.clone())
                .arg(
                    Arg::with_name("OPTION")
                        .index(2)
                        .required(true)
                        .help("Index of the chosen option"),
                ),
        )
        .subcommand(
            SubCommand::with_name("reveal")
                .about("Request decryption of an ended poll")
                .arg(from_arg.clone())
                .arg(poll_id_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("public-reveal")
                .about("Request decryption of an ended poll")
                .arg(from_arg.clone())
                .arg(poll_id_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("oracle")
                .about("Run the local decryption service over pending requests")
                .arg(
                    Arg::with_name("as")
                        .long("as")
                        .takes_value(true)
                        .help("Deliver results from this account instead of the oracle"),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Print poll metadata")
                .arg(poll_id_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("results")
                .about("Print poll results")
                .arg(poll_id_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Print the status of a poll, or of the ledger")
                .arg(
                    Arg::with_name("POLL-ID")
                        .index(1)
                        .required(false)
                        .help("Poll id"),
                )
                .arg(
                    Arg::with_name("voter")
                        .long("voter")
                        .takes_value(true)
                        .help("Also report whether this account has voted"),
                ),
        )
        .subcommand(
            SubCommand::with_name("events")
                .about("Print the event log")
                .arg(
                    Arg::with_name("poll")
                        .long("poll")
                        .takes_value(true)
                        .help("Only events about this poll"),
                ),
        )
        .subcommand(
            SubCommand::with_name("set-fee")
                .about("Change the creation fee")
                .arg(from_arg.clone())
                .arg(
                    Arg::with_name("FEE")
                        .index(1)
                        .required(true)
                        .help("New fee in ether"),
                ),
        )
        .subcommand(
            SubCommand::with_name("withdraw")
                .about("Withdraw collected fees")
                .arg(from_arg),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a complete poll against a throwaway ledger")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("25"),
                )
                .arg(
                    Arg::with_name("options")
                        .long("options")
                        .takes_value(true)
                        .default_value("3"),
                ),
        )
        .get_matches();

    let verbosity = Verbosity::from_counts(matches.occurrences_of("v"), matches.occurrences_of("q"));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let env_var = std::env::var("PRIVATEVOTE_STATE");
    let state_path = match matches.value_of("state") {
        Some(path) => path,
        None => env_var.as_deref().unwrap_or("./privatevote.json"),
    };
    let state_path = expand(state_path);

    let now = match matches.value_of("now") {
        Some(now) => u64::from_str(now).unwrap_or_else(|e| {
            eprintln!("privatevote: invalid --now {}: {}", now, e);
            std::process::exit(1);
        }),
        None => SystemClock.now(),
    };
    tracing::debug!(state = %state_path, now, "starting");

    // Subcommands
    match matches.subcommand() {
        ("init", Some(matches)) => command_init(matches, &state_path),
        ("create", Some(matches)) => command_create(matches, &state_path, now),
        ("vote", Some(matches)) => command_vote(matches, &state_path, now),
        ("reveal", Some(matches)) => command_reveal(matches, &state_path, now, false),
        ("public-reveal", Some(matches)) => command_reveal(matches, &state_path, now, true),
        ("oracle", Some(matches)) => command_oracle(matches, &state_path, now),
        ("info", Some(matches)) => command_info(matches, &state_path, now),
        ("results", Some(matches)) => command_results(matches, &state_path, now),
        ("status", Some(matches)) => command_status(matches, &state_path, now),
        ("events", Some(matches)) => command_events(matches, &state_path, now),
        ("set-fee", Some(matches)) => command_set_fee(matches, &state_path, now),
        ("withdraw", Some(matches)) => command_withdraw(matches, &state_path, now),
        ("e2e", Some(matches)) => command_e2e(matches, now),
        _ => {}
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::tilde(input).into_owned()
}

/// Print an error for `command` and exit
pub fn fail(command: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("privatevote {}: {}", command, err);
    std::process::exit(1);
}

/// Parse an account: 0x-prefixed hex, or a name that is hashed into an address
pub fn account(command: &str, value: &str) -> Address {
    if value.starts_with("0x") {
        Address::from_str(value).unwrap_or_else(|e| fail(command, e))
    } else {
        Address::derive(value.as_bytes())
    }
}

/// Parse a time: absolute unix seconds, or +SECONDS relative to `now`
pub fn timestamp(command: &str, value: &str, now: Timestamp) -> Timestamp {
    let parsed = match value.strip_prefix('+') {
        Some(offset) => u64::from_str(offset).map(|o| now.saturating_add(o)),
        None => u64::from_str(value),
    };
    parsed.unwrap_or_else(|e| fail(command, format!("invalid time {}: {}", value, e)))
}

pub fn poll_id(command: &str, matches: &clap::ArgMatches) -> PollId {
    let value = matches.value_of("POLL-ID").unwrap_or_default();
    PollId::from_str(value).unwrap_or_else(|e| fail(command, format!("invalid poll id {}: {}", value, e)))
}

pub fn ether(command: &str, value: &str) -> Amount {
    parse_ether(value).unwrap_or_else(|e| fail(command, e))
}

pub fn print_json<T: serde::Serialize>(command: &str, value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(command, e));
    println!("{}", json);
}
