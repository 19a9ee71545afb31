//! The ranking-stats aggregate: per-`(mode, version, region, league, race)` counts, and its
//! whitespace-delimited text wire codec.

use std::collections::BTreeMap;

use crate::error::{LadderError, LadderResult};
use crate::types::{StatsBucket, TeamRank};

const STATS_VERSION: u32 = 1;

/// Computes the stats aggregate over a ranking's records, grouped by
/// `(mode, version, region, league, race)` in ascending key order (the canonical order the
/// text codec relies on to avoid serialising the key tuple itself).
pub fn compute_stats(records: &[TeamRank]) -> Vec<StatsBucket> {
    let mut buckets: BTreeMap<(i8, i8, i8, i8, i8), StatsBucket> = BTreeMap::new();
    for r in records {
        let key = (r.mode, r.version, r.region, r.league, r.race0);
        let bucket = buckets.entry(key).or_default();
        bucket.count += 1;
        bucket.wins += r.wins as u64;
        bucket.losses += r.losses as u64;
        bucket.points += r.points as f64;
    }
    buckets.into_values().collect()
}

/// Serialises stats as `"{version} {len}"` followed by `len` space-delimited
/// `"{count} {wins} {losses} {points}"` tuples.
pub fn encode_stats(buckets: &[StatsBucket]) -> String {
    let mut out = format!("{STATS_VERSION} {}", buckets.len());
    for b in buckets {
        out.push_str(&format!(" {} {} {} {}", b.count, b.wins, b.losses, b.points));
    }
    out
}

/// Parses a stats text blob, validating the version field.
pub fn decode_stats(text: &str) -> LadderResult<Vec<StatsBucket>> {
    let mut tokens = text.split_whitespace();
    let version: u32 = tokens
        .next()
        .ok_or_else(|| crate::bug!("empty ranking stats blob"))?
        .parse()
        .map_err(|_| crate::bug!("malformed ranking stats version"))?;
    if version != STATS_VERSION {
        return Err(LadderError::UnsupportedVersion(version));
    }
    let len: usize = tokens
        .next()
        .ok_or_else(|| crate::bug!("ranking stats blob missing length"))?
        .parse()
        .map_err(|_| crate::bug!("malformed ranking stats length"))?;

    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let count = next_u64(&mut tokens)?;
        let wins = next_u64(&mut tokens)?;
        let losses = next_u64(&mut tokens)?;
        let points: f64 = tokens
            .next()
            .ok_or_else(|| crate::bug!("ranking stats blob truncated"))?
            .parse()
            .map_err(|_| crate::bug!("malformed ranking stats points"))?;
        out.push(StatsBucket {
            count,
            wins,
            losses,
            points,
        });
    }
    Ok(out)
}

fn next_u64<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> LadderResult<u64> {
    tokens
        .next()
        .ok_or_else(|| crate::bug!("ranking stats blob truncated"))?
        .parse()
        .map_err(|_| crate::bug!("malformed ranking stats integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_blob_round_trips() {
        let buckets = vec![
            StatsBucket {
                count: 3,
                wins: 10,
                losses: 4,
                points: 12.5,
            },
            StatsBucket {
                count: 1,
                wins: 0,
                losses: 0,
                points: 0.0,
            },
        ];
        let text = encode_stats(&buckets);
        let decoded = decode_stats(&text).unwrap();
        assert_eq!(decoded, buckets);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let err = decode_stats("2 0").unwrap_err();
        assert!(matches!(err, LadderError::UnsupportedVersion(2)));
    }
}
