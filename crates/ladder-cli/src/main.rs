use clap::Parser;
use mkenv::Env;

use self::ladder::{ClanCmd, LadderCmd};

mod common;
mod history;
mod ingest;
mod inspect;
mod ladder;

#[derive(clap::Parser)]
#[command(about = "Tools for ingesting ladder snapshots and querying the ranking they produce")]
enum Command {
    /// Fold snapshots into a ranking and write the resulting blob (and stats) to disk.
    Ingest(ingest::IngestCmd),
    /// Fold snapshots into a ranking and run a paged ladder query against it.
    Ladder(LadderCmd),
    /// Fold snapshots into a ranking and look up a fixed set of team ids.
    Clan(ClanCmd),
    /// Publish one ranking per snapshot and print a team's history across them.
    History(history::HistoryCmd),
    /// Print the header (and optionally stats) of a ranking blob already on disk.
    Inspect(inspect::InspectCmd),
}

const DEFAULT_KEEP_API_DATA_DAYS: f64 = 365.0;

mkenv::make_env! {
/// The environment used to configure default CLI behavior.
pub CliEnv:
    /// Default number of days of ranking data to retain when serving a query.
    default_keep_api_data_days: {
        id: DefaultKeepApiDataDays(f64),
        kind: parse,
        var: "LADDER_CLI_KEEP_API_DATA_DAYS",
        desc: "Default number of days of ranking data to retain when serving a ladder query",
        default: DEFAULT_KEEP_API_DATA_DAYS,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("unable to init tracing_subscriber: {e}"))?;

    let env = CliEnv::get();
    tracing::debug!(
        default_keep_api_data_days = env.default_keep_api_data_days,
        "loaded CLI environment"
    );

    let cmd = Command::parse();

    match cmd {
        Command::Ingest(cmd) => ingest::ingest(cmd),
        Command::Ladder(cmd) => ladder::ladder(cmd),
        Command::Clan(cmd) => ladder::clan(cmd),
        Command::History(cmd) => history::history(cmd),
        Command::Inspect(cmd) => inspect::inspect(cmd),
    }
}
