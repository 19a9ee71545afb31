use std::path::PathBuf;

use anyhow::Context;
use ladder_core::codec;
use ladder_core::stats;

/// Reads a previously written ranking blob (and optionally its stats blob) and prints a
/// summary without loading it into a server.
#[derive(clap::Args)]
pub struct InspectCmd {
    /// Path to a ranking blob written by `ingest`.
    blob: PathBuf,

    /// Path to the matching stats blob, if any.
    #[arg(long)]
    stats: Option<PathBuf>,
}

pub fn inspect(cmd: InspectCmd) -> anyhow::Result<()> {
    let bytes = std::fs::read(&cmd.blob)
        .with_context(|| format!("reading ranking blob {}", cmd.blob.display()))?;
    let header = codec::decode_header(&bytes)?;
    println!("version: {}", header.version);
    println!("count:   {}", header.count);
    println!("bytes:   {}", bytes.len());

    if let Some(stats_path) = &cmd.stats {
        let text = std::fs::read_to_string(stats_path)
            .with_context(|| format!("reading ranking stats {}", stats_path.display()))?;
        let buckets = stats::decode_stats(&text)?;
        let mut table = prettytable::Table::init(vec![prettytable::row![
            "Buckets", "Records", "Wins", "Losses", "Points"
        ]]);
        let records: u64 = buckets.iter().map(|b| b.count).sum();
        let wins: u64 = buckets.iter().map(|b| b.wins).sum();
        let losses: u64 = buckets.iter().map(|b| b.losses).sum();
        let points: f64 = buckets.iter().map(|b| b.points).sum();
        table.add_row(prettytable::row![buckets.len(), records, wins, losses, points]);
        println!("{table}");
    }

    Ok(())
}
