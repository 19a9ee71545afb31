//! Total/partial orderings over [`TeamRank`] records: the canonical on-disk identity order,
//! the display order records are re-sorted to after a blob load, and the parametrised
//! user-facing sort used by the query engine.

use std::cmp::Ordering;

use crate::types::{NO_MMR, NOT_SET, SortKey, TeamRank};

/// The canonical on-disk order: `(team_id, version, race0)` ascending. Every persisted blob
/// is sorted this way, which is what makes [`crate::lookup::find_team_rank`]'s binary search
/// possible.
pub fn compare_team_id_version_race(a: &TeamRank, b: &TeamRank) -> Ordering {
    a.team_id
        .cmp(&b.team_id)
        .then_with(|| a.version.cmp(&b.version))
        .then_with(|| a.race0.cmp(&b.race0))
}

/// The order records are restored to after a blob load, before being served:
/// `(version, mode, world_rank)` ascending.
pub fn compare_version_mode_world_rank(a: &TeamRank, b: &TeamRank) -> Ordering {
    a.version
        .cmp(&b.version)
        .then_with(|| a.mode.cmp(&b.mode))
        .then_with(|| a.world_rank.cmp(&b.world_rank))
}

/// Pre-filter values for [`CmpTr`]: `None` means "not set" (the wire sentinel is
/// [`NOT_SET`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct Filters {
    /// Restrict to one region.
    pub region: Option<i8>,
    /// Restrict to one league.
    pub league: Option<i8>,
    /// Restrict to one race (matched against `race0`).
    pub race: Option<i8>,
}

impl Filters {
    /// Builds filters from raw wire values, treating [`NOT_SET`] as "not set".
    pub fn from_raw(region: i32, league: i32, race: i32) -> Self {
        Self {
            region: (region != NOT_SET).then_some(region as i8),
            league: (league != NOT_SET).then_some(league as i8),
            race: (race != NOT_SET).then_some(race as i8),
        }
    }
}

/// The parametrised user-facing sort/filter predicate.
///
/// Used both as a sort comparator ([`CmpTr::compare`]) and as a filter predicate
/// ([`CmpTr::use_record`]). `strict` controls whether equal-key records compare as `Equal`
/// (the mode rank computation needs, so ties can be detected) or get display tiebreaks
/// applied (the mode the query engine needs for a stable user-facing order).
#[derive(Debug, Clone, Copy)]
pub struct CmpTr {
    /// Sort field.
    pub key: SortKey,
    /// Flips the primary key comparison only; tiebreaks are never reversed.
    pub reverse: bool,
    /// When true, ties under the primary key compare as `Equal` with no further tiebreak.
    pub strict: bool,
    /// Region/league/race pre-filters.
    pub filters: Filters,
}

impl CmpTr {
    /// A strict comparator with no filters, used by the rank computer and the merger.
    pub fn strict(key: SortKey) -> Self {
        Self {
            key,
            reverse: false,
            strict: true,
            filters: Filters::default(),
        }
    }

    /// Whether `record` passes this comparator's filters. The [`SortKey::Mmr`] key
    /// additionally rejects unrated records.
    pub fn use_record(&self, record: &TeamRank) -> bool {
        if let Some(region) = self.filters.region {
            if record.region != region {
                return false;
            }
        }
        if let Some(league) = self.filters.league {
            if record.league != league {
                return false;
            }
        }
        if let Some(race) = self.filters.race {
            if record.race0 != race {
                return false;
            }
        }
        if self.key == SortKey::Mmr && record.mmr == NO_MMR {
            return false;
        }
        true
    }

    /// Orders `a` and `b`. Set filters take precedence over the sort key: region ascending,
    /// league descending (so higher league sorts first), race ascending.
    pub fn compare(&self, a: &TeamRank, b: &TeamRank) -> Ordering {
        if self.filters.region.is_some() {
            let o = a.region.cmp(&b.region);
            if o != Ordering::Equal {
                return o;
            }
        }
        if self.filters.league.is_some() {
            let o = b.league.cmp(&a.league);
            if o != Ordering::Equal {
                return o;
            }
        }
        if self.filters.race.is_some() {
            let o = a.race0.cmp(&b.race0);
            if o != Ordering::Equal {
                return o;
            }
        }
        self.compare_key(a, b)
    }

    fn apply_reverse(&self, o: Ordering) -> Ordering {
        if self.reverse { o.reverse() } else { o }
    }

    fn compare_key(&self, a: &TeamRank, b: &TeamRank) -> Ordering {
        match self.key {
            SortKey::LadderRank => {
                let primary = b
                    .league
                    .cmp(&a.league)
                    .then_with(|| a.tier.cmp(&b.tier))
                    .then_with(|| b.points.total_cmp(&a.points));
                let primary = self.apply_reverse(primary);
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                b.wins
                    .cmp(&a.wins)
                    .then_with(|| a.losses.cmp(&b.losses))
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
            SortKey::Mmr => {
                let primary = self.apply_reverse(b.mmr.cmp(&a.mmr));
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                b.wins
                    .cmp(&a.wins)
                    .then_with(|| a.losses.cmp(&b.losses))
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
            SortKey::Played => {
                let primary =
                    self.apply_reverse((b.wins + b.losses).cmp(&(a.wins + a.losses)));
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                b.mmr
                    .cmp(&a.mmr)
                    .then_with(|| b.wins.cmp(&a.wins))
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
            SortKey::Wins => {
                let primary = self.apply_reverse(b.wins.cmp(&a.wins));
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                b.mmr
                    .cmp(&a.mmr)
                    .then_with(|| a.losses.cmp(&b.losses))
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
            SortKey::Losses => {
                let primary = self.apply_reverse(b.losses.cmp(&a.losses));
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                a.wins
                    .cmp(&b.wins)
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
            SortKey::WinRate => {
                let primary = self.apply_reverse(b.win_rate().total_cmp(&a.win_rate()));
                if self.strict || primary != Ordering::Equal {
                    return primary;
                }
                b.wins
                    .cmp(&a.wins)
                    .then_with(|| a.losses.cmp(&b.losses))
                    .then_with(|| b.mmr.cmp(&a.mmr))
                    .then_with(|| a.team_id.cmp(&b.team_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(team_id: u64, mmr: i16, wins: u32, losses: u32) -> TeamRank {
        TeamRank {
            team_id,
            data_time: 0.0,
            version: 1,
            region: 1,
            mode: 11,
            league: 3,
            tier: 1,
            ladder_id: 0,
            join_time: 0.0,
            source_id: 0,
            mmr,
            points: 0.0,
            wins,
            losses,
            race0: 0,
            race1: -1,
            race2: -1,
            race3: 9,
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
    fn identity_order_sorts_by_team_then_version_then_race() {
        let mut a = rec(2, 0, 0, 0);
        a.version = 1;
        a.race0 = 1;
        let mut b = rec(2, 0, 0, 0);
        b.version = 1;
        b.race0 = 0;
        assert_eq!(compare_team_id_version_race(&b, &a), Ordering::Less);
    }

    #[test]
    fn mmr_sort_is_descending() {
        let cmp = CmpTr::strict(SortKey::Mmr);
        let a = rec(1, 3500, 0, 0);
        let b = rec(2, 3000, 0, 0);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn strict_comparator_reports_equal_on_tie() {
        let cmp = CmpTr::strict(SortKey::Mmr);
        let a = rec(1, 3500, 10, 2);
        let b = rec(2, 3500, 0, 0);
        assert_eq!(cmp.compare(&a, &b), Ordering::Equal);
    }

    #[test]
    fn non_strict_tiebreaks_on_wins_then_team_id() {
        let cmp = CmpTr {
            key: SortKey::Mmr,
            reverse: false,
            strict: false,
            filters: Filters::default(),
        };
        let a = rec(1, 3500, 10, 2);
        let b = rec(2, 3500, 5, 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn mmr_key_filters_out_unrated_records() {
        let cmp = CmpTr::strict(SortKey::Mmr);
        let mut r = rec(1, NO_MMR, 0, 0);
        r.mmr = NO_MMR;
        assert!(!cmp.use_record(&r));
    }

    #[test]
    fn reverse_flips_primary_but_not_tiebreak() {
        let cmp = CmpTr {
            key: SortKey::Wins,
            reverse: true,
            strict: false,
            filters: Filters::default(),
        };
        let a = rec(1, 0, 5, 1);
        let b = rec(2, 0, 10, 1);
        // reversed: fewer wins sorts first
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }
}
