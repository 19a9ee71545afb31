//! Folds one ladder snapshot into the in-memory ranking: identity resolution, the sorted
//! merge into the live team-rank vector, and the player/team cache update rules.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::comparators::{CmpTr, compare_team_id_version_race};
use crate::error::LadderResult;
use crate::identity::{self, IdentityStore};
use crate::types::{
    MODE_SOLO, Player, PlayerKey, SortKey, Team, TeamKey, TeamRank, is_mmr_era,
    is_separate_race_mmr_era,
};

/// One member of a submitted team, as carried in a [`LadderInput`].
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LadderMember {
    /// Upstream blizzard id.
    pub bid: u64,
    /// Realm within the ladder's region.
    pub realm: i8,
    /// Display name.
    pub name: String,
    /// Ladder tag.
    pub tag: String,
    /// Clan name.
    pub clan: String,
    /// Race played.
    pub race: i8,
    /// MMR rating, or [`crate::types::NO_MMR`].
    pub mmr: i16,
    /// Points-based score.
    pub points: f32,
    /// Win count.
    pub wins: u32,
    /// Loss count.
    pub losses: u32,
    /// Time this member joined the ladder.
    pub join_time: f32,
}

/// One ladder snapshot to fold into the ranking. `members` is team-major: `team_size`
/// consecutive members form one team submission.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LadderInput {
    /// Upstream ladder id.
    pub ladder_id: u32,
    /// Upstream source id.
    pub source_id: u32,
    /// Region this ladder belongs to.
    pub region: i8,
    /// Game mode.
    pub mode: i8,
    /// League.
    pub league: i8,
    /// Tier within the league.
    pub tier: i8,
    /// Game version.
    pub version: i8,
    /// Season id (controls MMR-era sort key and update-rule branches).
    pub season_id: u32,
    /// Unix seconds this snapshot was taken at.
    pub data_time: f64,
    /// Number of members per team (1 for 1v1).
    pub team_size: usize,
    /// Team-major member list.
    pub members: Vec<LadderMember>,
}

/// Counts returned by [`Merger::merge`], used by callers to detect idempotent re-ingests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Players newly inserted by this merge.
    pub players_inserted: usize,
    /// Teams newly inserted by this merge.
    pub teams_inserted: usize,
    /// Player records whose cached fields changed.
    pub players_updated: usize,
    /// Team records whose cached fields changed.
    pub teams_updated: usize,
}

struct State {
    live: Vec<TeamRank>,
    player_cache: HashMap<PlayerKey, Player>,
    team_cache: HashMap<TeamKey, Team>,
}

/// Owns the live, identity-ordered team-rank vector and the player/team identity caches,
/// all behind one mutex held across identity resolution, merge, and cache updates so no
/// concurrent ingest can interleave with in-memory mutation.
pub struct Merger {
    state: Mutex<State>,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

impl Merger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                live: Vec::new(),
                player_cache: HashMap::new(),
                team_cache: HashMap::new(),
            }),
        }
    }

    /// Returns a clone of the current live vector, in identity order.
    pub fn snapshot(&self) -> Vec<TeamRank> {
        self.state.lock().live.clone()
    }

    /// Replaces the live vector wholesale, e.g. after loading a persisted ranking.
    pub fn load_into(&self, records: Vec<TeamRank>) {
        self.state.lock().live = records;
    }

    /// Folds `ladder` into the live ranking. Holds the merger's mutex for the whole
    /// operation: identity resolution, the sorted merge, and cache updates.
    pub fn merge(&self, store: &mut dyn IdentityStore, ladder: &LadderInput) -> LadderResult<MergeStats> {
        let mut state = self.state.lock();
        let State {
            live,
            player_cache,
            team_cache,
        } = &mut *state;

        let players_before = player_cache.len();
        let teams_before = team_cache.len();

        let player_keys: Vec<PlayerKey> = ladder
            .members
            .iter()
            .map(|m| PlayerKey {
                region: ladder.region,
                bid: m.bid,
                realm: m.realm,
            })
            .collect();
        let player_ids = identity::resolve_players(player_cache, store, &player_keys)?;

        let mut team_entries: Vec<(TeamKey, u64, [i8; 4])> = Vec::new();
        for chunk_idx in 0..ladder.members.len() / ladder.team_size {
            let start = chunk_idx * ladder.team_size;
            let chunk_ids = &player_ids[start..start + ladder.team_size];
            let chunk_members = &ladder.members[start..start + ladder.team_size];
            let pairs: Vec<(u64, i8)> = chunk_ids
                .iter()
                .zip(chunk_members)
                .map(|(&id, m)| (id, m.race))
                .collect();
            let (ids, races) = Team::normalize(&pairs, ladder.team_size);
            let key = TeamKey {
                mode: ladder.mode,
                members: ids,
            };
            team_entries.push((key, 0, races));
        }
        let team_keys: Vec<TeamKey> = team_entries.iter().map(|(k, ..)| *k).collect();
        let team_ids = identity::resolve_teams(team_cache, store, &team_keys, ladder.team_size)?;
        for (entry, id) in team_entries.iter_mut().zip(team_ids) {
            entry.1 = id;
        }

        let mut ladder_vec: Vec<TeamRank> = Vec::with_capacity(team_entries.len());
        for (chunk_idx, (_, team_id, races)) in team_entries.iter().enumerate() {
            let start = chunk_idx * ladder.team_size;
            let rep = &ladder.members[start];
            ladder_vec.push(TeamRank {
                team_id: *team_id,
                data_time: ladder.data_time,
                version: ladder.version,
                region: ladder.region,
                mode: ladder.mode,
                league: ladder.league,
                tier: ladder.tier,
                ladder_id: ladder.ladder_id,
                join_time: rep.join_time,
                source_id: ladder.source_id,
                mmr: rep.mmr,
                points: rep.points,
                wins: rep.wins,
                losses: rep.losses,
                race0: races[0],
                race1: races[1],
                race2: races[2],
                race3: races[3],
                ladder_rank: 0,
                ladder_count: 0,
                league_rank: 0,
                league_count: 0,
                region_rank: 0,
                region_count: 0,
                world_rank: 0,
                world_count: 0,
            });
        }

        let strict_key = if is_mmr_era(ladder.season_id) {
            SortKey::Mmr
        } else {
            SortKey::LadderRank
        };
        let cmp = CmpTr::strict(strict_key);

        let mut ranked_order: Vec<usize> = (0..ladder_vec.len()).collect();
        ranked_order.sort_by(|&a, &b| cmp.compare(&ladder_vec[a], &ladder_vec[b]));

        let mut seen_team_ids = std::collections::HashSet::new();
        let mut distinct_count = 0u32;
        let mut rank_by_index = vec![0u32; ladder_vec.len()];
        let mut last_distinct: Option<usize> = None;
        for &idx in &ranked_order {
            let team_id = ladder_vec[idx].team_id;
            let is_new_team = seen_team_ids.insert(team_id);
            if is_new_team {
                distinct_count += 1;
                let differs = last_distinct
                    .map(|prev| cmp.compare(&ladder_vec[prev], &ladder_vec[idx]) != std::cmp::Ordering::Equal)
                    .unwrap_or(true);
                if differs {
                    rank_by_index[idx] = distinct_count;
                } else {
                    rank_by_index[idx] = rank_by_index[last_distinct.unwrap()];
                }
                last_distinct = Some(idx);
            } else {
                // a later race-keyed submission of an already-seen team shares its rank.
                let first = ladder_vec
                    .iter()
                    .position(|r| r.team_id == team_id)
                    .unwrap();
                rank_by_index[idx] = rank_by_index[first];
            }
        }
        for (idx, rec) in ladder_vec.iter_mut().enumerate() {
            rec.ladder_rank = rank_by_index[idx];
            rec.ladder_count = distinct_count;
        }

        // Carry each record's originating chunk index through the resort so the
        // keep-both special case below can mark exactly that chunk's cache update as
        // skipped, rather than every chunk sharing its team_id.
        let mut tagged: Vec<(TeamRank, usize)> = ladder_vec
            .iter()
            .copied()
            .zip(0..)
            .collect();
        tagged.sort_by(|a, b| compare_team_id_version_race(&a.0, &b.0));

        let solo_separate_race_era =
            ladder.mode == MODE_SOLO && is_separate_race_mmr_era(ladder.season_id);

        let mut merged: Vec<TeamRank> = Vec::with_capacity(live.len() + tagged.len());
        let mut skip_chunks: std::collections::HashSet<usize> = std::collections::HashSet::new();

        let mut i = 0usize;
        let mut j = 0usize;
        while i < live.len() && j < tagged.len() {
            let (l, chunk) = tagged[j];
            let t = live[i];
            let tv_cmp = l.team_id.cmp(&t.team_id).then(l.version.cmp(&t.version));
            match tv_cmp {
                std::cmp::Ordering::Less => {
                    merged.push(l);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    let keep_both = solo_separate_race_era
                        && t.race0 != l.race0
                        && l.ladder_rank >= t.ladder_rank;
                    if keep_both {
                        merged.push(t);
                        merged.push(l);
                        skip_chunks.insert(chunk);
                    } else {
                        merged.push(l);
                    }
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(t);
                    i += 1;
                }
            }
        }
        merged.extend_from_slice(&live[i..]);
        while j < tagged.len() {
            merged.push(tagged[j].0);
            j += 1;
        }
        merged.sort_by(compare_team_id_version_race);
        *live = merged;

        let mut players_updated = 0usize;
        let mut teams_updated = 0usize;
        let mut updated_players = Vec::new();
        let mut updated_teams = Vec::new();

        for (chunk_idx, (key, team_id, races)) in team_entries.iter().enumerate() {
            if skip_chunks.contains(&chunk_idx) {
                continue;
            }
            let start = chunk_idx * ladder.team_size;
            let new_team = Team {
                id: Some(*team_id),
                key: *key,
                region: ladder.region,
                season_id: ladder.season_id,
                version: ladder.version,
                league: ladder.league,
                races: *races,
                last_seen: ladder.data_time,
            };
            if let Some(old) = team_cache.get(key).cloned() {
                let updated = update_team(&old, &new_team, ladder.mode);
                if updated != old {
                    team_cache.insert(*key, updated.clone());
                    updated_teams.push(updated);
                    teams_updated += 1;
                }
            } else {
                team_cache.insert(*key, new_team.clone());
                updated_teams.push(new_team);
            }

            for m in &ladder.members[start..start + ladder.team_size] {
                let pkey = PlayerKey {
                    region: ladder.region,
                    bid: m.bid,
                    realm: m.realm,
                };
                let new_player = Player {
                    id: player_cache.get(&pkey).and_then(|p| p.id),
                    key: pkey,
                    name: m.name.clone(),
                    tag: m.tag.clone(),
                    clan: m.clan.clone(),
                    season_id: ladder.season_id,
                    race: m.race,
                    league: ladder.league,
                    mode: ladder.mode,
                    last_seen: ladder.data_time,
                };
                if let Some(old) = player_cache.get(&pkey).cloned() {
                    let updated = update_player(&old, &new_player);
                    if updated != old {
                        player_cache.insert(pkey, updated.clone());
                        updated_players.push(updated);
                        players_updated += 1;
                    }
                }
            }
        }

        if !updated_players.is_empty() {
            store.update_players(&updated_players)?;
        }
        if !updated_teams.is_empty() {
            store.update_teams(&updated_teams)?;
        }

        let players_inserted = player_cache.len() - players_before;
        let teams_inserted = team_cache.len() - teams_before;
        tracing::info!(
            players_inserted,
            teams_inserted,
            players_updated,
            teams_updated,
            "merged ladder snapshot"
        );

        Ok(MergeStats {
            players_inserted,
            teams_inserted,
            players_updated,
            teams_updated,
        })
    }
}

/// Applies the player cache update rules (§4.5.1): season adoption, the "never downgrade
/// from 1v1" rule, and the empty-name-never-overwrites workaround.
pub fn update_player(old: &Player, new: &Player) -> Player {
    let mut result = old.clone();
    let name_changed = new.name != old.name || new.tag != old.tag || new.clan != old.clan;
    if new.season_id >= old.season_id && name_changed && !new.name.is_empty() {
        result.name = new.name.clone();
        result.tag = new.tag.clone();
        result.clan = new.clan.clone();
    }
    if new.season_id > old.season_id {
        result.season_id = new.season_id;
        result.race = new.race;
        result.league = new.league;
        result.mode = new.mode;
    } else if new.season_id == old.season_id {
        let old_is_solo = old.mode == MODE_SOLO;
        let new_is_solo = new.mode == MODE_SOLO;
        if !old_is_solo && new_is_solo {
            result.mode = new.mode;
            result.race = new.race;
            result.league = new.league;
        } else if old_is_solo && new_is_solo {
            if new.league > old.league {
                result.league = new.league;
            }
        } else if old_is_solo && !new_is_solo {
            // never downgrade from 1v1
        } else if new.mode == old.mode {
            if new.league != old.league || new.race != old.race {
                result.league = new.league;
                result.race = new.race;
            }
        } else if new.league > old.league {
            result.mode = new.mode;
            result.league = new.league;
            result.race = new.race;
        }
    }
    result.last_seen = result.last_seen.max(new.last_seen);
    result
}

/// Applies the team cache update rules (§4.5.1): season/version adoption and the 1v1
/// league-only-upgrade special case.
pub fn update_team(old: &Team, new: &Team, mode: i8) -> Team {
    let mut result = old.clone();
    if new.season_id > old.season_id {
        result.season_id = new.season_id;
        result.version = new.version;
        result.league = new.league;
        result.races = new.races;
    } else if new.season_id == old.season_id {
        if new.version > old.version {
            result.version = new.version;
            result.league = new.league;
            result.races = new.races;
        } else if new.version == old.version {
            if mode == MODE_SOLO {
                if new.league > old.league {
                    result.league = new.league;
                    result.races[0] = new.races[0];
                }
            } else if new.league != old.league || new.races != old.races {
                result.league = new.league;
                result.races = new.races;
            }
        }
    }
    result.last_seen = result.last_seen.max(new.last_seen);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;

    fn one_member(bid: u64, mmr: i16, wins: u32, losses: u32) -> LadderMember {
        LadderMember {
            bid,
            realm: 1,
            name: format!("p{bid}"),
            tag: String::new(),
            clan: String::new(),
            race: 1,
            mmr,
            points: 0.0,
            wins,
            losses,
            join_time: 0.0,
        }
    }

    fn solo_ladder(season_id: u32, members: Vec<LadderMember>) -> LadderInput {
        LadderInput {
            ladder_id: 1,
            source_id: 1,
            region: 1,
            mode: MODE_SOLO,
            league: 0,
            tier: 1,
            version: 5,
            season_id,
            data_time: 1000.0,
            team_size: 1,
            members,
        }
    }

    #[test]
    fn one_v_one_ladder_inserts_players_and_teams_and_assigns_dense_ranks() {
        let merger = Merger::new();
        let mut store = MemoryIdentityStore::new();
        let ladder = solo_ladder(
            28,
            vec![
                one_member(100, 3500, 50, 10),
                one_member(101, 3000, 30, 20),
                one_member(102, 2800, 20, 30),
            ],
        );
        let stats = merger.merge(&mut store, &ladder).unwrap();
        assert_eq!(stats.players_inserted, 3);
        assert_eq!(stats.teams_inserted, 3);

        let live = merger.snapshot();
        assert_eq!(live.len(), 3);
        let mut ranks: Vec<u32> = live.iter().map(|r| r.ladder_rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn reapplying_the_same_ladder_inserts_nothing_new() {
        let merger = Merger::new();
        let mut store = MemoryIdentityStore::new();
        let ladder = solo_ladder(28, vec![one_member(100, 3500, 50, 10)]);
        merger.merge(&mut store, &ladder).unwrap();
        let stats = merger.merge(&mut store, &ladder).unwrap();
        assert_eq!(stats.players_inserted, 0);
        assert_eq!(stats.teams_inserted, 0);
    }

    #[test]
    fn never_downgrades_player_from_one_v_one() {
        let old = Player {
            id: Some(1),
            key: PlayerKey {
                region: 1,
                bid: 1,
                realm: 1,
            },
            name: "a".into(),
            tag: String::new(),
            clan: String::new(),
            season_id: 28,
            race: 1,
            league: 3,
            mode: MODE_SOLO,
            last_seen: 0.0,
        };
        let mut new = old.clone();
        new.mode = 7;
        new.league = 5;
        let updated = update_player(&old, &new);
        assert_eq!(updated.mode, MODE_SOLO);
    }

    #[test]
    fn empty_name_never_overwrites() {
        let old = Player {
            id: Some(1),
            key: PlayerKey {
                region: 1,
                bid: 1,
                realm: 1,
            },
            name: "keepme".into(),
            tag: "tag".into(),
            clan: "clan".into(),
            season_id: 28,
            race: 1,
            league: 3,
            mode: MODE_SOLO,
            last_seen: 0.0,
        };
        let mut new = old.clone();
        new.name = String::new();
        new.tag = String::new();
        let updated = update_player(&old, &new);
        assert_eq!(updated.name, "keepme");
    }
}
