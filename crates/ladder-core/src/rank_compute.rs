//! Recomputes ladder/league/region/world ranks across the live team-rank vector, and marks
//! the best-race record for 1v1 teams.

use std::cmp::Ordering;

use crate::comparators::{CmpTr, compare_team_id_version_race};
use crate::types::{MODE_SOLO, RACE_ANY, RACE_BEST, SortKey, TeamRank, is_mmr_era};

/// Recomputes `{ladder,league,region,world}_{rank,count}` and the 1v1 best-race marker over
/// `records`, then restores identity order for persistence.
///
/// `season_of` resolves a record's season id (the live vector doesn't carry season_id
/// itself — it is a property of the ladder the record was last updated from — so callers
/// thread it through via this lookup, keyed by `(version, mode)`).
pub fn recompute(records: &mut [TeamRank], season_of: impl Fn(i8, i8) -> u32) {
    records.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| a.mode.cmp(&b.mode))
            .then_with(|| {
                let cmp = strict_cmp_for(a.version, a.mode, &season_of);
                cmp.compare(a, b)
            })
    });

    let mut start = 0usize;
    while start < records.len() {
        let (version, mode) = (records[start].version, records[start].mode);
        let mut end = start;
        while end < records.len() && records[end].version == version && records[end].mode == mode {
            end += 1;
        }
        recompute_group(&mut records[start..end], season_of(version, mode));
        start = end;
    }

    records.sort_by(compare_team_id_version_race);
}

fn strict_cmp_for(version: i8, mode: i8, season_of: &impl Fn(i8, i8) -> u32) -> CmpTr {
    let season_id = season_of(version, mode);
    CmpTr::strict(if is_mmr_era(season_id) {
        SortKey::Mmr
    } else {
        SortKey::LadderRank
    })
}

/// Assigns dense ranks (under `cmp`) to the subsequence of `group` named by `indices`,
/// which must already be in `cmp`-sorted relative order (true of any subsequence of a
/// sorted slice), writing through `count`/`rank` field accessors.
fn assign_dense_ranks(
    group: &mut [TeamRank],
    indices: &[usize],
    cmp: &CmpTr,
    rank_of: impl Fn(&mut TeamRank) -> &mut u32,
    count_of: impl Fn(&mut TeamRank) -> &mut u32,
) {
    let count = indices.len() as u32;
    let mut pos = 0u32;
    let mut last: Option<usize> = None;
    for &idx in indices {
        pos += 1;
        let differs = last
            .map(|prev| cmp.compare(&group[prev], &group[idx]) != Ordering::Equal)
            .unwrap_or(true);
        let rank = if differs {
            pos
        } else {
            *rank_of(&mut group[last.unwrap()])
        };
        *rank_of(&mut group[idx]) = rank;
        *count_of(&mut group[idx]) = count;
        last = Some(idx);
    }
}

fn recompute_group(group: &mut [TeamRank], season_id: u32) {
    let cmp = CmpTr::strict(if is_mmr_era(season_id) {
        SortKey::Mmr
    } else {
        SortKey::LadderRank
    });

    // `group` arrives sorted by the strict key; any filtered subsequence preserves that
    // relative order, so bucketing by (region, league) or by region alone still yields
    // cmp-sorted index lists without re-sorting.
    let mut by_region_league: std::collections::HashMap<(i8, i8), Vec<usize>> =
        std::collections::HashMap::new();
    let mut by_region: std::collections::HashMap<i8, Vec<usize>> = std::collections::HashMap::new();
    for (idx, rec) in group.iter().enumerate() {
        by_region_league
            .entry((rec.region, rec.league))
            .or_default()
            .push(idx);
        by_region.entry(rec.region).or_default().push(idx);
    }

    for indices in by_region_league.values() {
        assign_dense_ranks(
            group,
            indices,
            &cmp,
            |r| &mut r.league_rank,
            |r| &mut r.league_count,
        );
    }
    for indices in by_region.values() {
        assign_dense_ranks(
            group,
            indices,
            &cmp,
            |r| &mut r.region_rank,
            |r| &mut r.region_count,
        );
    }
    let world_indices: Vec<usize> = (0..group.len()).collect();
    assign_dense_ranks(
        group,
        &world_indices,
        &cmp,
        |r| &mut r.world_rank,
        |r| &mut r.world_count,
    );

    if group.first().is_some_and(|r| r.mode == MODE_SOLO) {
        mark_best_race(group, &cmp);
    }
}

fn mark_best_race(group: &mut [TeamRank], cmp: &CmpTr) {
    let mut by_team: std::collections::HashMap<u64, Vec<usize>> = std::collections::HashMap::new();
    for (idx, rec) in group.iter().enumerate() {
        by_team.entry(rec.team_id).or_default().push(idx);
    }
    for indices in by_team.values() {
        if indices.len() == 1 {
            group[indices[0]].race3 = RACE_BEST;
            continue;
        }
        let best = *indices
            .iter()
            .min_by(|&&a, &&b| cmp.compare(&group[a], &group[b]))
            .unwrap();
        for &idx in indices {
            group[idx].race3 = if idx == best { RACE_BEST } else { RACE_ANY };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(team_id: u64, region: i8, league: i8, mmr: i16, race0: i8) -> TeamRank {
        TeamRank {
            team_id,
            data_time: 0.0,
            version: 5,
            region,
            mode: MODE_SOLO,
            league,
            tier: 1,
            ladder_id: 0,
            join_time: 0.0,
            source_id: 0,
            mmr,
            points: 0.0,
            wins: 0,
            losses: 0,
            race0,
            race1: -1,
            race2: -1,
            race3: -1,
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
    fn world_count_is_sum_of_region_counts_and_region_of_league_counts() {
        let mut records = vec![
            rec(1, 1, 0, 3500, 0),
            rec(2, 1, 0, 3000, 0),
            rec(3, 2, 0, 2900, 0),
        ];
        recompute(&mut records, |_, _| 28);
        let world_count = records[0].world_count;
        assert_eq!(world_count, 3);
        let region1_count: u32 = records
            .iter()
            .filter(|r| r.region == 1)
            .map(|r| r.region_count)
            .next()
            .unwrap();
        assert_eq!(region1_count, 2);
    }

    #[test]
    fn dense_ranks_share_ties() {
        let mut records = vec![rec(1, 1, 0, 3000, 0), rec(2, 1, 0, 3000, 0), rec(3, 1, 0, 2000, 0)];
        recompute(&mut records, |_, _| 28);
        let r1 = records.iter().find(|r| r.team_id == 1).unwrap();
        let r2 = records.iter().find(|r| r.team_id == 2).unwrap();
        let r3 = records.iter().find(|r| r.team_id == 3).unwrap();
        assert_eq!(r1.world_rank, r2.world_rank);
        assert_eq!(r3.world_rank, 3);
    }

    #[test]
    fn exactly_one_best_race_per_team() {
        let mut records = vec![rec(1, 1, 0, 3500, 0), rec(1, 1, 0, 3400, 1)];
        recompute(&mut records, |_, _| 29);
        let best_count = records.iter().filter(|r| r.race3 == RACE_BEST).count();
        assert_eq!(best_count, 1);
        let best = records.iter().find(|r| r.race3 == RACE_BEST).unwrap();
        assert_eq!(best.mmr, 3500);
    }
}
