//! Get-or-insert identity resolution for players and teams, against a persistent store the
//! merger keeps a cache in front of.

use std::collections::{HashMap, HashSet};

use crate::error::LadderResult;
use crate::types::{Player, PlayerKey, Team, TeamKey};

/// The persistent collaborator [`crate::merger::Merger`] resolves identities against.
///
/// A production implementation backs this with SQL tables; [`MemoryIdentityStore`] is an
/// in-memory stand-in used by tests and the CLI's file-backed demo mode.
pub trait IdentityStore {
    /// Looks up existing ids for the given keys and inserts the rest, returning the full
    /// id for every key in `keys` (existing and newly inserted alike).
    fn get_or_insert_players(&mut self, keys: &[PlayerKey]) -> LadderResult<Vec<u64>>;
    /// Same as [`IdentityStore::get_or_insert_players`] but for team keys; `team_size` is
    /// the number of member slots that participate in the identity key.
    fn get_or_insert_teams(
        &mut self,
        keys: &[TeamKey],
        team_size: usize,
    ) -> LadderResult<Vec<u64>>;
    /// Persists updated player records (fields changed by the merger's update rules).
    fn update_players(&mut self, players: &[Player]) -> LadderResult<()>;
    /// Persists updated team records.
    fn update_teams(&mut self, teams: &[Team]) -> LadderResult<()>;
}

/// An in-memory [`IdentityStore`], keyed the same way the real store would be.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    players: HashMap<PlayerKey, u64>,
    teams: HashMap<TeamKey, u64>,
    next_player_id: u64,
    next_team_id: u64,
}

impl MemoryIdentityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get_or_insert_players(&mut self, keys: &[PlayerKey]) -> LadderResult<Vec<u64>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let id = *self.players.entry(*key).or_insert_with(|| {
                self.next_player_id += 1;
                self.next_player_id
            });
            out.push(id);
        }
        Ok(out)
    }

    fn get_or_insert_teams(&mut self, keys: &[TeamKey], _team_size: usize) -> LadderResult<Vec<u64>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let id = *self.teams.entry(*key).or_insert_with(|| {
                self.next_team_id += 1;
                self.next_team_id
            });
            out.push(id);
        }
        Ok(out)
    }

    fn update_players(&mut self, _players: &[Player]) -> LadderResult<()> {
        Ok(())
    }

    fn update_teams(&mut self, _teams: &[Team]) -> LadderResult<()> {
        Ok(())
    }
}

/// Resolves a batch of player keys against a cache-then-store lookup, consuming resolved
/// keys from `unknown` as it goes so the caller can tell which keys were cache hits.
pub fn resolve_players(
    cache: &mut HashMap<PlayerKey, Player>,
    store: &mut dyn IdentityStore,
    keys: &[PlayerKey],
) -> LadderResult<Vec<u64>> {
    let mut unknown: Vec<PlayerKey> = Vec::new();
    let mut seen = HashSet::new();
    for key in keys {
        if !cache.contains_key(key) && seen.insert(*key) {
            unknown.push(*key);
        }
    }
    if !unknown.is_empty() {
        let ids = store.get_or_insert_players(&unknown)?;
        for (key, id) in unknown.iter().zip(ids) {
            cache.entry(*key).or_insert_with(|| Player {
                id: Some(id),
                key: *key,
                name: String::new(),
                tag: String::new(),
                clan: String::new(),
                season_id: 0,
                race: -1,
                league: -1,
                mode: -1,
                last_seen: 0.0,
            });
        }
    }
    Ok(keys
        .iter()
        .map(|k| cache[k].id.expect("resolved above"))
        .collect())
}

/// Resolves a batch of team keys, same cache-then-store pattern as
/// [`resolve_players`].
pub fn resolve_teams(
    cache: &mut HashMap<TeamKey, Team>,
    store: &mut dyn IdentityStore,
    keys: &[TeamKey],
    team_size: usize,
) -> LadderResult<Vec<u64>> {
    let mut unknown: Vec<TeamKey> = Vec::new();
    let mut seen = HashSet::new();
    for key in keys {
        if !cache.contains_key(key) && seen.insert(*key) {
            unknown.push(*key);
        }
    }
    if !unknown.is_empty() {
        let ids = store.get_or_insert_teams(&unknown, team_size)?;
        for (key, id) in unknown.iter().zip(ids) {
            cache.entry(*key).or_insert_with(|| Team {
                id: Some(id),
                key: *key,
                region: -1,
                season_id: 0,
                version: -1,
                league: -1,
                races: [-1; 4],
                last_seen: 0.0,
            });
        }
    }
    Ok(keys
        .iter()
        .map(|k| cache[k].id.expect("resolved above"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_resolve_to_the_same_id() {
        let mut store = MemoryIdentityStore::new();
        let mut cache = HashMap::new();
        let key = PlayerKey {
            region: 1,
            bid: 42,
            realm: 1,
        };
        let first = resolve_players(&mut cache, &mut store, &[key]).unwrap();
        let second = resolve_players(&mut cache, &mut store, &[key]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_keys_get_distinct_ids() {
        let mut store = MemoryIdentityStore::new();
        let mut cache = HashMap::new();
        let a = PlayerKey {
            region: 1,
            bid: 1,
            realm: 1,
        };
        let b = PlayerKey {
            region: 1,
            bid: 2,
            realm: 1,
        };
        let ids = resolve_players(&mut cache, &mut store, &[a, b]).unwrap();
        assert_ne!(ids[0], ids[1]);
    }
}
