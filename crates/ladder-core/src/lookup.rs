//! Random-access lookup of one team's record(s) in a persisted ranking blob, via binary
//! search reading only small windows instead of materialising the whole blob.

use crate::error::{LadderError, LadderResult};
use crate::store::RankingStore;
use crate::types::{RACE_ANY, RACE_BEST, RACE_COUNT, RACE_LO, TeamRank};

const WINDOW: usize = 4;
const MAX_ITERATIONS: u32 = 32;

/// Finds every record for `team_id` in `ranking_id`, restricted to the run sharing the
/// highest matching version. Returns an empty vector if the team has no record in this
/// ranking. Fails with [`LadderError::SearchLoop`] if the search doesn't converge within
/// 32 iterations, which guards against a corrupted or unsorted blob.
pub fn find_team_rank(
    store: &dyn RankingStore,
    ranking_id: u64,
    team_id: u64,
) -> LadderResult<Vec<TeamRank>> {
    let header = store.load_header(ranking_id)?;
    if header.count == 0 {
        return Ok(Vec::new());
    }

    let mut imin: i64 = 0;
    let mut imax: i64 = header.count as i64 - 1;
    let mut iterations = 0u32;

    loop {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(LadderError::SearchLoop {
                team_id: team_id as u32,
                ranking_id: ranking_id as u32,
                iterations,
            });
        }
        if imin > imax {
            return Ok(Vec::new());
        }

        let imid = imin + (imax - imin) / 2;
        let window = store.load_window(ranking_id, header.version, imid as usize, WINDOW)?;
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let first = window.first().unwrap();
        let last = window.last().unwrap();

        if first.team_id > team_id {
            imax = imid - 1;
            continue;
        }
        if last.team_id < team_id {
            imin = imid + window.len() as i64;
            continue;
        }

        let hit_lo = window.iter().position(|r| r.team_id == team_id);
        let hit_hi = window.iter().rposition(|r| r.team_id == team_id);
        let (hit_lo, hit_hi) = match (hit_lo, hit_hi) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => {
                // team_id lies strictly between window[0] and window[last]: narrow and retry.
                imax = imid - 1;
                imin = imin.max(imid - (WINDOW as i64));
                continue;
            }
        };

        let hit = &window[hit_hi];
        let is_race_keyed = hit.race3 == RACE_BEST || hit.race3 == RACE_ANY;
        let back_extend = if is_race_keyed {
            (hit.race0 - RACE_LO) as i64
        } else {
            0
        };
        let forward_versions = (header.version as i64 - hit.version as i64).max(0);
        let forward_extend = if is_race_keyed {
            forward_versions * RACE_COUNT as i64
        } else {
            forward_versions
        };

        let run_min = (imid + hit_lo as i64 - back_extend).max(0);
        let run_max = (imid + hit_hi as i64 + forward_extend).min(header.count as i64 - 1);

        let run = if run_min >= imid && run_max <= imid + window.len() as i64 - 1 {
            window[(run_min - imid) as usize..=(run_max - imid) as usize].to_vec()
        } else {
            let width = (run_max - run_min + 1) as usize;
            store.load_window(ranking_id, header.version, run_min as usize, width)?
        };

        let matches: Vec<TeamRank> = run.into_iter().filter(|r| r.team_id == team_id).collect();
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        let max_version = matches.iter().map(|r| r.version).max().unwrap();
        return Ok(matches.into_iter().filter(|r| r.version == max_version).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRankingStore;

    fn rec(team_id: u64, version: i8, race0: i8, race3: i8) -> TeamRank {
        TeamRank {
            team_id,
            data_time: 0.0,
            version,
            region: 1,
            mode: 11,
            league: 1,
            tier: 1,
            ladder_id: 0,
            join_time: 0.0,
            source_id: 0,
            mmr: 3000,
            points: 0.0,
            wins: 0,
            losses: 0,
            race0,
            race1: -1,
            race2: -1,
            race3,
            ladder_rank: 0,
            ladder_count: 0,
            league_rank: 0,
            league_count: 0,
            region_rank: 0,
            region_count: 0,
            world_rank: 0,
            world_count: 0,
        }
    }

    #[test]
    fn finds_a_present_team() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 0.0);
        let records = vec![
            rec(1, 1, 0, -1),
            rec(2, 1, 0, -1),
            rec(3, 1, 0, -1),
            rec(4, 1, 0, -1),
            rec(5, 1, 0, -1),
        ];
        store.save(id, 0.0, &records).unwrap();
        let found = find_team_rank(&store, id, 3).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].team_id, 3);
    }

    #[test]
    fn returns_empty_for_an_absent_team() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 0.0);
        store.save(id, 0.0, &[rec(1, 1, 0, -1), rec(5, 1, 0, -1)]).unwrap();
        let found = find_team_rank(&store, id, 3).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn finds_highest_version_run_when_multiple_versions_present() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 0.0);
        let records = vec![
            rec(7, 1, 0, -1),
            rec(7, 2, 0, -1),
            rec(7, 3, 0, -1),
            rec(8, 3, 0, -1),
        ];
        store.save(id, 0.0, &records).unwrap();
        let found = find_team_rank(&store, id, 7).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, 3);
    }
}
