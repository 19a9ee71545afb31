//! Shared plumbing the subcommands use to turn a list of ladder snapshot files into a
//! ranked, in-memory ladder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ladder_core::identity::MemoryIdentityStore;
use ladder_core::{LadderInput, Merger, TeamRank};

/// Parses one ladder snapshot file as a [`LadderInput`].
pub fn load_ladder(path: &Path) -> anyhow::Result<LadderInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading ladder snapshot {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing ladder snapshot {}", path.display()))
}

/// The live ranking rebuilt from a sequence of snapshots, plus the `(version, mode)` season
/// lookup the snapshots established (needed by [`ladder_core::rank_compute::recompute`]).
pub struct IngestOutcome {
    /// Fully ranked, identity-ordered records.
    pub records: Vec<TeamRank>,
    /// Last season_id seen for each `(version, mode)` slice.
    pub season_of: HashMap<(i8, i8), u32>,
}

/// Folds every snapshot in `paths`, in order, into a fresh [`Merger`], then recomputes ranks.
pub fn ingest_all(paths: &[PathBuf]) -> anyhow::Result<IngestOutcome> {
    let merger = Merger::new();
    let mut store = MemoryIdentityStore::new();
    let mut season_of = HashMap::new();

    for path in paths {
        let input = load_ladder(path)?;
        season_of.insert((input.version, input.mode), input.season_id);
        let stats = merger.merge(&mut store, &input)?;
        tracing::info!(
            path = %path.display(),
            players_inserted = stats.players_inserted,
            teams_inserted = stats.teams_inserted,
            players_updated = stats.players_updated,
            teams_updated = stats.teams_updated,
            "ingested ladder snapshot"
        );
    }

    let mut records = merger.snapshot();
    ladder_core::rank_compute::recompute(&mut records, |v, m| {
        *season_of.get(&(v, m)).unwrap_or(&0)
    });
    Ok(IngestOutcome { records, season_of })
}
