//! A small CLI for auditing DeVote elections offline.
//! Dumps are checked with the same verification the server links against, so
//! anything returned by `GET /election/dump` can be fed straight in.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use chrono::{Duration, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use devote_backend::model::{
    address::Address,
    auth::AuthToken,
    election::{ElectionDump, VerificationError},
};

const PROGRAM_NAME: &str = "devote-audit";

const ABOUT_TEXT: &str = "Audit a DeVote election.

EXIT CODES:
     0: Success.
   255: Ran successfully, but verification failed.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";
const ADDRESS: &str = "ADDRESS";
const TTL: &str = "ttl";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of the election,\n\
as returned by `GET /election/dump`";

/// The environment variable Rocket reads the server's JWT secret from.
const SECRET_VAR: &str = "ROCKET_JWT_SECRET";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new("verify")
                .about("Check a dump's tallies and winner")
                .arg(
                    Arg::new(DUMP_PATH)
                        .help(DUMP_PATH_HELP)
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("token")
                .about(format!(
                    "Issue a session token for an address, signed with ${SECRET_VAR}"
                ))
                .arg(
                    Arg::new(ADDRESS)
                        .help("The 0x-prefixed address to act as")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(TTL)
                        .long(TTL)
                        .help("Token lifetime in seconds")
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(u32))
                        .default_value("3600"),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// Verification failed due to the contained reason.
    Verification(VerificationError),
    /// Bad input to the token command.
    Token(String),
}

/// One line of the results table.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResults {
    pub candidate_name: String,
    pub party: String,
    pub votes: u64,
}

impl Display for FriendlyResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {} vote{}",
            self.candidate_name,
            self.party,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

/// Run verification, returning candidates ordered by votes, then name.
fn verify(path: &str) -> Result<Vec<FriendlyResults>, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: ElectionDump =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    dump.verify().map_err(Error::Verification)?;

    let mut results = dump
        .candidates
        .into_iter()
        .map(|candidate| FriendlyResults {
            candidate_name: candidate.name,
            party: candidate.party,
            votes: candidate.vote_count,
        })
        .collect::<Vec<_>>();
    results.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.candidate_name.cmp(&b.candidate_name))
    });
    Ok(results)
}

/// Sign a token for `address` valid for `ttl` seconds.
fn issue_token(address: &str, secret: Option<String>, ttl: u32) -> Result<String, Error> {
    let address: Address = address
        .parse()
        .map_err(|e| Error::Token(format!("{e}")))?;
    let secret = secret.ok_or_else(|| Error::Token(format!("${SECRET_VAR} is not set")))?;
    AuthToken::new(address)
        .encode(
            secret.as_bytes(),
            Utc::now() + Duration::seconds(ttl.into()),
        )
        .map_err(|e| Error::Token(e.to_string()))
}

/// Run the chosen subcommand, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let outcome = match args.subcommand() {
        Some(("verify", args)) => {
            // Required argument is guaranteed to be present.
            let path: &String = args.get_one(DUMP_PATH).unwrap();
            verify(path).map(|results| {
                println!("Verification succeeded.");
                for result in results {
                    println!("{result}");
                }
            })
        }
        Some(("token", args)) => {
            // Required argument is guaranteed to be present.
            let address: &String = args.get_one(ADDRESS).unwrap();
            let ttl: u32 = *args.get_one(TTL).unwrap(); // Has a default.
            issue_token(address, std::env::var(SECRET_VAR).ok(), ttl).map(|token| {
                println!("{token}");
            })
        }
        _ => unreachable!("subcommand is required"),
    };

    match outcome {
        Ok(()) => 0,
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::Token(msg)) => {
            println!("Cannot issue token: {msg}");
            1
        }
        Err(Error::Verification(err)) => {
            println!("Verification failed: {err}.");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
