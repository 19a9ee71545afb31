//! The hot read path: the server's in-memory served ranking, paged/filtered/sorted ladder
//! queries, clan queries, and per-team cross-ranking history.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::comparators::{CmpTr, Filters, compare_version_mode_world_rank};
use crate::error::LadderResult;
use crate::lookup::find_team_rank;
use crate::store::RankingStore;
use crate::types::{LOTV, MMR_SEASON, MODE_SOLO, NO_MMR, Ranking, SortKey, TeamRank};

/// Minimum interval between unforced reload checks against the store.
pub const RELOAD_POLL_SECS: f64 = 60.0;

/// One row of a served ladder/clan page, the shape the external API advertises.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TeamRow {
    /// Dense rank under the requested sort, relative to the page's span.
    pub rank: u32,
    /// The team id.
    pub team_id: u64,
    /// Region.
    pub region: i8,
    /// League.
    pub league: i8,
    /// Tier.
    pub tier: i8,
    /// MMR, or [`NO_MMR`] if unrated.
    pub mmr: i16,
    /// Points-based score.
    pub points: f32,
    /// Win count.
    pub wins: u32,
    /// Loss count.
    pub losses: u32,
    /// Win rate as a percentage in `[0, 100]`.
    pub win_rate_pct: f64,
    /// Unix seconds of the snapshot this record came from.
    pub data_time: f64,
    /// Member 0 race.
    pub m0_race: i8,
    /// Member 1 race.
    pub m1_race: i8,
    /// Member 2 race.
    pub m2_race: i8,
    /// Member 3 race (or the 1v1 best-race marker).
    pub m3_race: i8,
}

impl From<(&TeamRank, u32)> for TeamRow {
    fn from((r, rank): (&TeamRank, u32)) -> Self {
        Self {
            rank,
            team_id: r.team_id,
            region: r.region,
            league: r.league,
            tier: r.tier,
            mmr: r.mmr,
            points: r.points,
            wins: r.wins,
            losses: r.losses,
            win_rate_pct: r.win_rate() * 100.0,
            data_time: r.data_time,
            m0_race: r.race0,
            m1_race: r.race1,
            m2_race: r.race2,
            m3_race: r.race3,
        }
    }
}

/// Pagination input: either an absolute offset, or "find this team and center the page on
/// it" via `offset = -1` with `team_id` set.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// `-1` means "locate `team_id` and offset ten rows before it".
    pub offset: i64,
    /// Used only when `offset == -1`.
    pub team_id: u64,
    /// Maximum rows to return.
    pub limit: usize,
}

/// A page of ladder or clan rows, plus the span's total count after filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The resolved starting offset (meaningful when the caller passed `offset = -1`).
    pub offset: usize,
    /// Emitted rows.
    pub rows: Vec<TeamRow>,
}

struct ServedState {
    records: Vec<TeamRank>,
    last_checked: f64,
    ranking_id: Option<u64>,
    updated_at: f64,
}

/// Owns the most recently published ranking's records in memory, sorted by
/// `(version, mode, world_rank)`. Guarded by one mutex held for the duration of every
/// query, per the concurrency model: the dominant cost is sorting a span, measured in
/// milliseconds, so serialising reads is an acceptable trade for simplicity.
pub struct LadderHandler {
    state: Mutex<ServedState>,
    /// Records with `data_time` older than this many days are dropped on load.
    pub keep_api_data_days: f64,
}

impl LadderHandler {
    /// Creates a handler with nothing loaded yet.
    pub fn new(keep_api_data_days: f64) -> Self {
        Self {
            state: Mutex::new(ServedState {
                records: Vec::new(),
                last_checked: f64::NEG_INFINITY,
                ranking_id: None,
                updated_at: f64::NEG_INFINITY,
            }),
            keep_api_data_days,
        }
    }

    /// Checks the store for a newer ranking and reloads if the latest ranking id or its
    /// `updated_at` changed. Skips the store round-trip unless `force` is set or more than
    /// [`RELOAD_POLL_SECS`] have elapsed since the last check.
    pub fn refresh(&self, store: &dyn RankingStore, now: f64, force: bool) -> LadderResult<bool> {
        let mut state = self.state.lock();
        if !force && now - state.last_checked < RELOAD_POLL_SECS {
            return Ok(false);
        }
        state.last_checked = now;

        let Some(latest) = store.latest_ranking()? else {
            return Ok(false);
        };
        if state.ranking_id == Some(latest.id) && state.updated_at == latest.updated_at {
            return Ok(false);
        }

        let min_data_time = now - self.keep_api_data_days * 86_400.0;
        let mut records = store.load_all(latest.id, min_data_time)?;
        records.sort_by(compare_version_mode_world_rank);

        state.records = records;
        state.ranking_id = Some(latest.id);
        state.updated_at = latest.updated_at;
        tracing::info!(ranking_id = latest.id, "reloaded served ranking");
        Ok(true)
    }

    /// Runs a ladder query: filter the `(version, mode)` span, sort, paginate, and assign
    /// dense ranks relative to the page.
    pub fn ladder(
        &self,
        version: i8,
        mode: i8,
        filters: Filters,
        key: SortKey,
        reverse: bool,
        pagination: Pagination,
    ) -> Page {
        let state = self.state.lock();
        let span_start = state
            .records
            .partition_point(|r| (r.version, r.mode) < (version, mode));
        let span_end = state
            .records
            .partition_point(|r| (r.version, r.mode) <= (version, mode));
        let mut span: Vec<TeamRank> = state.records[span_start..span_end].to_vec();
        drop(state);

        let cmp = CmpTr {
            key,
            reverse,
            strict: false,
            filters,
        };
        span.sort_by(|a, b| cmp.compare(a, b));

        let narrow_start = span.iter().position(|r| cmp.use_record(r)).unwrap_or(span.len());
        let narrow_end = span[narrow_start..]
            .iter()
            .position(|r| !cmp.use_record(r))
            .map(|i| narrow_start + i)
            .unwrap_or(span.len());
        let narrowed = &span[narrow_start..narrow_end];

        let mut offset = pagination.offset;
        if offset == -1 && pagination.team_id != 0 {
            if let Some(pos) = narrowed.iter().position(|r| r.team_id == pagination.team_id) {
                offset = (pos as i64 - 10).max(0);
            } else {
                offset = 0;
            }
        }
        let offset = offset.clamp(0, narrowed.len() as i64) as usize;

        let mut rows = Vec::new();
        if offset < narrowed.len() {
            let strict_cmp = CmpTr {
                key,
                reverse,
                strict: true,
                filters,
            };

            let base_rank = if offset == 0 {
                1
            } else {
                let mut back = offset;
                while back > 0
                    && strict_cmp.compare(&narrowed[back - 1], &narrowed[offset]) == std::cmp::Ordering::Equal
                {
                    back -= 1;
                }
                (back + 1) as u32
            };

            let mut rank = base_rank;
            for (i, rec) in narrowed[offset..].iter().take(pagination.limit).enumerate() {
                if i > 0 {
                    let prev = &narrowed[offset + i - 1];
                    if strict_cmp.compare(prev, rec) != std::cmp::Ordering::Equal {
                        rank = (offset + i) as u32 + 1;
                    }
                }
                rows.push(TeamRow::from((rec, rank)));
            }
        }

        Page { offset, rows }
    }

    /// Gathers the (LotV, 1v1) records whose team id is in `team_ids`, applying the same
    /// filter/sort path as [`LadderHandler::ladder`] starting at offset 0, rank 0.
    pub fn clan(&self, team_ids: &HashSet<u64>, key: SortKey, reverse: bool) -> Page {
        let state = self.state.lock();
        let mut matched: Vec<TeamRank> = state
            .records
            .iter()
            .filter(|r| r.version == LOTV && r.mode == MODE_SOLO && team_ids.contains(&r.team_id))
            .copied()
            .collect();
        drop(state);

        let cmp = CmpTr {
            key,
            reverse,
            strict: false,
            filters: Filters::default(),
        };
        matched.sort_by(|a, b| cmp.compare(a, b));
        let matched: Vec<TeamRank> = matched.into_iter().filter(|r| cmp.use_record(r)).collect();

        let strict_cmp = CmpTr {
            key,
            reverse,
            strict: true,
            filters: Filters::default(),
        };
        let mut rows = Vec::new();
        let mut rank = 0u32;
        for (i, rec) in matched.iter().enumerate() {
            let differs = i == 0 || strict_cmp.compare(&matched[i - 1], rec) != std::cmp::Ordering::Equal;
            if differs {
                rank = i as u32 + 1;
            }
            rows.push(TeamRow::from((rec, rank)));
        }
        Page { offset: 0, rows }
    }
}

/// One entry of a team's history across all historical rankings it appears in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    /// The ranking this entry came from.
    pub ranking_id: u64,
    /// Season the ranking belongs to.
    pub season_id: u32,
    /// The matched record.
    pub record: TeamRank,
}

/// For each ranking in `rankings`, looks up `team_id` via [`find_team_rank`] and keeps the
/// entry only if it passes the season/MMR gate: records from before [`MMR_SEASON`] are
/// accepted unconditionally (MMR wasn't tracked yet); from [`MMR_SEASON`] onward, only
/// rated (`mmr != NO_MMR`) records are kept.
pub fn team_history(
    store: &dyn RankingStore,
    rankings: &[Ranking],
    team_id: u64,
) -> LadderResult<Vec<HistoryEntry>> {
    let mut out = Vec::new();
    for ranking in rankings {
        let matches = find_team_rank(store, ranking.id, team_id)?;
        for record in matches {
            let accepted = ranking.season_id < MMR_SEASON || record.mmr != NO_MMR;
            if accepted {
                out.push(HistoryEntry {
                    ranking_id: ranking.id,
                    season_id: ranking.season_id,
                    record,
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRankingStore;

    fn rec(team_id: u64, version: i8, mode: i8, world_rank: u32, mmr: i16) -> TeamRank {
        TeamRank {
            team_id,
            data_time: 1000.0,
            version,
            region: 1,
            mode,
            league: 3,
            tier: 1,
            ladder_id: 0,
            join_time: 0.0,
            source_id: 0,
            mmr,
            points: 0.0,
            wins: 10,
            losses: 5,
            race0: 0,
            race1: -1,
            race2: -1,
            race3: 9,
            ladder_rank: 1,
            ladder_count: 1,
            league_rank: 1,
            league_count: 1,
            region_rank: 1,
            region_count: 1,
            world_rank,
            world_count: 3,
        }
    }

    fn handler_with(records: Vec<TeamRank>) -> LadderHandler {
        let handler = LadderHandler::new(365.0);
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 2_000_000.0);
        store.save(id, 2_000_000.0, &records).unwrap();
        handler.refresh(&store, 2_000_000.0, true).unwrap();
        handler
    }

    #[test]
    fn ladder_query_paginates_and_assigns_dense_rank() {
        let handler = handler_with(vec![
            rec(1, 5, 11, 1, 3500),
            rec(2, 5, 11, 2, 3000),
            rec(3, 5, 11, 3, 2800),
        ]);
        let page = handler.ladder(
            5,
            11,
            Filters::default(),
            SortKey::Mmr,
            false,
            Pagination {
                offset: 0,
                team_id: 0,
                limit: 10,
            },
        );
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[0].rank, 1);
        assert_eq!(page.rows[0].team_id, 1);
        assert_eq!(page.rows[2].rank, 3);
    }

    #[test]
    fn clan_query_skips_teams_outside_the_id_set() {
        let handler = handler_with(vec![
            rec(1, LOTV, MODE_SOLO, 1, 3500),
            rec(2, LOTV, MODE_SOLO, 2, 3000),
            rec(3, LOTV, MODE_SOLO, 3, 2800),
        ]);
        let ids: HashSet<u64> = [1, 3].into_iter().collect();
        let page = handler.clan(&ids, SortKey::Mmr, false);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].rank, 1);
        assert_eq!(page.rows[1].rank, 2);
    }

    #[test]
    fn clan_query_excludes_teams_outside_lotv_1v1() {
        let handler = handler_with(vec![
            rec(1, LOTV, MODE_SOLO, 1, 3500),
            rec(2, 5, MODE_SOLO, 2, 3000),
            rec(2, LOTV, 12, 1, 3100),
        ]);
        let ids: HashSet<u64> = [1, 2].into_iter().collect();
        let page = handler.clan(&ids, SortKey::Mmr, false);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].team_id, 1);
    }

    #[test]
    fn ladder_query_past_the_end_returns_no_rows() {
        let handler = handler_with(vec![
            rec(1, 5, 11, 1, 3500),
            rec(2, 5, 11, 2, 3000),
            rec(3, 5, 11, 3, 2800),
        ]);
        let page = handler.ladder(
            5,
            11,
            Filters::default(),
            SortKey::Mmr,
            false,
            Pagination {
                offset: 3,
                team_id: 0,
                limit: 10,
            },
        );
        assert!(page.rows.is_empty());
        assert_eq!(page.offset, 3);
    }
}
