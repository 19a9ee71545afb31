use std::path::PathBuf;

use ladder_core::query::team_history;
use ladder_core::store::{MemoryRankingStore, RankingStore};
use ladder_core::Ranking;

use crate::common;

/// Ingests each snapshot in turn, publishing one ranking per snapshot, then prints every
/// ranking a team appears in.
#[derive(clap::Args)]
pub struct HistoryCmd {
    /// Ladder snapshot JSON files, applied in order; each produces one published ranking.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Team id to look up.
    #[arg(long)]
    team_id: u64,
}

pub fn history(cmd: HistoryCmd) -> anyhow::Result<()> {
    let mut store = MemoryRankingStore::new();
    let mut rankings: Vec<Ranking> = Vec::new();

    for n in 1..=cmd.inputs.len() {
        let outcome = common::ingest_all(&cmd.inputs[..n])?;
        let input = common::load_ladder(&cmd.inputs[n - 1])?;
        let id = store.create_ranking(input.season_id, input.data_time);
        store.save(id, input.data_time, &outcome.records)?;
        rankings.push(Ranking {
            id,
            season_id: input.season_id,
            data_time: input.data_time,
            updated_at: input.data_time,
        });
    }

    let entries = team_history(&store, &rankings, cmd.team_id)?;
    if entries.is_empty() {
        println!("team {} never appears in the given snapshots", cmd.team_id);
        return Ok(());
    }

    let mut table = prettytable::Table::init(vec![prettytable::row![
        "Ranking", "Season", "Version", "Mode", "Ladder Rank", "MMR", "W", "L"
    ]]);
    for entry in &entries {
        table.add_row(prettytable::row![
            entry.ranking_id,
            entry.season_id,
            entry.record.version,
            entry.record.mode,
            entry.record.ladder_rank,
            entry.record.mmr,
            entry.record.wins,
            entry.record.losses
        ]);
    }
    println!("{table}");
    Ok(())
}
