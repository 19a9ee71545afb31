use std::path::PathBuf;

use anyhow::Context;
use ladder_core::stats;

use crate::common;

/// Folds one or more ladder snapshot files into a ranking and writes it to disk as a blob,
/// optionally alongside its stats aggregate.
#[derive(clap::Args)]
pub struct IngestCmd {
    /// Ladder snapshot JSON files, applied in the given order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the encoded ranking blob.
    #[arg(long)]
    out: PathBuf,

    /// Where to write the ranking's stats text blob, if wanted.
    #[arg(long)]
    stats_out: Option<PathBuf>,
}

pub fn ingest(cmd: IngestCmd) -> anyhow::Result<()> {
    let outcome = common::ingest_all(&cmd.inputs)?;

    let blob = ladder_core::codec::encode_blob(&outcome.records)?;
    std::fs::write(&cmd.out, &blob)
        .with_context(|| format!("writing ranking blob to {}", cmd.out.display()))?;

    if let Some(stats_out) = &cmd.stats_out {
        let buckets = stats::compute_stats(&outcome.records);
        let text = stats::encode_stats(&buckets);
        std::fs::write(stats_out, text)
            .with_context(|| format!("writing ranking stats to {}", stats_out.display()))?;
    }

    println!(
        "wrote {} records ({} bytes) to {}",
        outcome.records.len(),
        blob.len(),
        cmd.out.display()
    );
    Ok(())
}
