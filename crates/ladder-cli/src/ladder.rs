use std::collections::HashSet;
use std::path::PathBuf;

use ladder_core::comparators::Filters;
use ladder_core::query::{LadderHandler, Pagination};
use ladder_core::store::{MemoryRankingStore, RankingStore};
use ladder_core::types::NOT_SET;
use ladder_core::{SortKey, TeamRow};

use crate::common;

/// The sort keys a caller can request, mirroring [`SortKey`] for `clap`'s benefit.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SortKeyArg {
    /// League/tier/points composite.
    LadderRank,
    /// Total games played.
    Played,
    /// Win count.
    Wins,
    /// Loss count.
    Losses,
    /// Win ratio.
    WinRate,
    /// MMR rating.
    Mmr,
}

impl From<SortKeyArg> for SortKey {
    fn from(arg: SortKeyArg) -> Self {
        match arg {
            SortKeyArg::LadderRank => SortKey::LadderRank,
            SortKeyArg::Played => SortKey::Played,
            SortKeyArg::Wins => SortKey::Wins,
            SortKeyArg::Losses => SortKey::Losses,
            SortKeyArg::WinRate => SortKey::WinRate,
            SortKeyArg::Mmr => SortKey::Mmr,
        }
    }
}

/// Ingests one or more snapshots, then runs a single paged ladder query against the result.
#[derive(clap::Args)]
pub struct LadderCmd {
    /// Ladder snapshot JSON files, applied in the given order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Game version to query.
    #[arg(long)]
    version: i8,
    /// Game mode to query.
    #[arg(long)]
    mode: i8,

    /// Restrict to one region.
    #[arg(long, default_value_t = NOT_SET)]
    region: i32,
    /// Restrict to one league.
    #[arg(long, default_value_t = NOT_SET)]
    league: i32,
    /// Restrict to one race (matched against member 0's race).
    #[arg(long, default_value_t = NOT_SET)]
    race: i32,

    /// Sort field.
    #[arg(long, value_enum, default_value_t = SortKeyArg::LadderRank)]
    key: SortKeyArg,
    /// Reverse the primary sort order.
    #[arg(long)]
    reverse: bool,

    /// Starting offset, or `-1` to center the page on `--team-id`.
    #[arg(long, default_value_t = 0)]
    offset: i64,
    /// Used only with `--offset -1`.
    #[arg(long, default_value_t = 0)]
    team_id: u64,
    /// Maximum rows to return.
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Records older than this many days are dropped before serving.
    #[arg(long, default_value_t = 365.0)]
    keep_api_data_days: f64,
}

impl std::fmt::Display for SortKeyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortKeyArg::LadderRank => "ladder-rank",
            SortKeyArg::Played => "played",
            SortKeyArg::Wins => "wins",
            SortKeyArg::Losses => "losses",
            SortKeyArg::WinRate => "win-rate",
            SortKeyArg::Mmr => "mmr",
        };
        f.write_str(s)
    }
}

/// Ingests one or more snapshots, then queries every team whose id is in `--team-id`.
#[derive(clap::Args)]
pub struct ClanCmd {
    /// Ladder snapshot JSON files, applied in the given order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Team ids to include; may be repeated.
    #[arg(long = "team-id", required = true)]
    team_ids: Vec<u64>,

    /// Sort field.
    #[arg(long, value_enum, default_value_t = SortKeyArg::LadderRank)]
    key: SortKeyArg,
    /// Reverse the primary sort order.
    #[arg(long)]
    reverse: bool,
}

pub fn ladder(cmd: LadderCmd) -> anyhow::Result<()> {
    let outcome = common::ingest_all(&cmd.inputs)?;
    let handler = serve(&outcome.records)?;

    let page = handler.ladder(
        cmd.version,
        cmd.mode,
        Filters::from_raw(cmd.region, cmd.league, cmd.race),
        cmd.key.into(),
        cmd.reverse,
        Pagination {
            offset: cmd.offset,
            team_id: cmd.team_id,
            limit: cmd.limit,
        },
    );

    println!("offset: {}", page.offset);
    print_rows(&page.rows);
    Ok(())
}

pub fn clan(cmd: ClanCmd) -> anyhow::Result<()> {
    let outcome = common::ingest_all(&cmd.inputs)?;
    let handler = serve(&outcome.records)?;

    let ids: HashSet<u64> = cmd.team_ids.into_iter().collect();
    let page = handler.clan(&ids, cmd.key.into(), cmd.reverse);
    print_rows(&page.rows);
    Ok(())
}

/// Publishes `records` into a throwaway store and loads a [`LadderHandler`] from it, the same
/// way a server would serve a freshly computed ranking.
fn serve(records: &[ladder_core::TeamRank]) -> anyhow::Result<LadderHandler> {
    let mut store = MemoryRankingStore::new();
    let id = store.create_ranking(0, 0.0);
    store.save(id, 0.0, records)?;

    let handler = LadderHandler::new(36_500.0);
    handler.refresh(&store, 0.0, true)?;
    Ok(handler)
}

fn print_rows(rows: &[TeamRow]) {
    let mut table = prettytable::Table::init(vec![prettytable::row![
        "Rank", "Team", "Region", "League", "Tier", "MMR", "Points", "W", "L", "Win%"
    ]]);
    for row in rows {
        table.add_row(prettytable::row![
            row.rank,
            row.team_id,
            row.region,
            row.league,
            row.tier,
            row.mmr,
            row.points,
            row.wins,
            row.losses,
            format!("{:.1}", row.win_rate_pct)
        ]);
    }
    println!("{table}");
}
