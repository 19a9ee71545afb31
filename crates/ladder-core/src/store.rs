//! Reads and writes the ranking blob: header-only reads, full loads, and the windowed
//! substring reads [`crate::lookup::find_team_rank`] needs.

use std::collections::HashMap;

use crate::codec::{self, HEADER_SIZE, RankingHeader};
use crate::error::{LadderError, LadderResult};
use crate::types::{Ranking, TeamRank};

/// The persistent collaborator the ranking blob and ranking-stats blob live behind.
///
/// A production implementation stores blobs as a SQL `BLOB`/bytea column and uses
/// `substring(data FROM start FOR len)` for [`RankingStore::load_window`]; [`MemoryRankingStore`]
/// is an in-memory stand-in used by tests and the CLI.
pub trait RankingStore {
    /// Reads just the header of a ranking's blob.
    fn load_header(&self, ranking_id: u64) -> LadderResult<RankingHeader>;
    /// Reads every record, dropping those with `data_time < min_data_time`.
    fn load_all(&self, ranking_id: u64, min_data_time: f64) -> LadderResult<Vec<TeamRank>>;
    /// Reads up to `count` records starting at `start_index`, without materialising records
    /// before the window. Returns fewer than `count` records if the window overruns the
    /// blob.
    fn load_window(
        &self,
        ranking_id: u64,
        codec_version: u32,
        start_index: usize,
        count: usize,
    ) -> LadderResult<Vec<TeamRank>>;
    /// Encodes and persists `records` as the blob for `ranking_id`.
    fn save(&mut self, ranking_id: u64, now: f64, records: &[TeamRank]) -> LadderResult<()>;
    /// Lists rankings with `season_id >= from_season`, ordered by `data_time` ascending.
    fn list_rankings(&self, from_season: u32) -> LadderResult<Vec<Ranking>>;
    /// The most recently produced ranking.
    fn latest_ranking(&self) -> LadderResult<Option<Ranking>>;
    /// Persists a ranking-stats text blob alongside a ranking's team-rank blob.
    fn save_stats(&mut self, ranking_id: u64, text: &str) -> LadderResult<()>;
    /// Reads back a ranking-stats text blob.
    fn load_stats(&self, ranking_id: u64) -> LadderResult<Option<String>>;
}

struct StoredRanking {
    meta: Ranking,
    blob: Vec<u8>,
    stats: Option<String>,
}

/// An in-memory [`RankingStore`].
#[derive(Default)]
pub struct MemoryRankingStore {
    rankings: HashMap<u64, StoredRanking>,
    next_id: u64,
}

impl MemoryRankingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new ranking id with the given season, returning the assigned id.
    pub fn create_ranking(&mut self, season_id: u32, data_time: f64) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.rankings.insert(
            id,
            StoredRanking {
                meta: Ranking {
                    id,
                    season_id,
                    data_time,
                    updated_at: data_time,
                },
                blob: Vec::new(),
                stats: None,
            },
        );
        id
    }

    fn get(&self, ranking_id: u64) -> LadderResult<&StoredRanking> {
        self.rankings
            .get(&ranking_id)
            .ok_or_else(|| crate::bug!("unknown ranking id {ranking_id}"))
    }
}

impl RankingStore for MemoryRankingStore {
    fn load_header(&self, ranking_id: u64) -> LadderResult<RankingHeader> {
        codec::decode_header(&self.get(ranking_id)?.blob)
    }

    fn load_all(&self, ranking_id: u64, min_data_time: f64) -> LadderResult<Vec<TeamRank>> {
        let blob = &self.get(ranking_id)?.blob;
        let header = codec::decode_header(blob)?;
        let records = codec::decode_all(header.version, header.count, &blob[HEADER_SIZE..])?;
        Ok(records
            .into_iter()
            .filter(|r| r.data_time >= min_data_time)
            .collect())
    }

    fn load_window(
        &self,
        ranking_id: u64,
        codec_version: u32,
        start_index: usize,
        count: usize,
    ) -> LadderResult<Vec<TeamRank>> {
        let blob = &self.get(ranking_id)?.blob;
        let rec_size = codec::record_size(codec_version)?;
        let start = HEADER_SIZE + rec_size * start_index;
        if start >= blob.len() {
            return Ok(Vec::new());
        }
        let end = (start + rec_size * count).min(blob.len());
        let available = (end - start) / rec_size;
        let body = &blob[start..start + available * rec_size];
        codec::decode_all(codec_version, available as u32, body)
    }

    fn save(&mut self, ranking_id: u64, now: f64, records: &[TeamRank]) -> LadderResult<()> {
        let blob = codec::encode_blob(records)?;
        if blob.len() > i32::MAX as usize {
            return Err(LadderError::BlobTooLarge(blob.len()));
        }
        let entry = self
            .rankings
            .get_mut(&ranking_id)
            .ok_or_else(|| crate::bug!("unknown ranking id {ranking_id}"))?;
        entry.blob = blob;
        entry.meta.updated_at = now;
        tracing::info!(ranking_id, record_count = records.len(), "saved ranking blob");
        Ok(())
    }

    fn list_rankings(&self, from_season: u32) -> LadderResult<Vec<Ranking>> {
        let mut out: Vec<Ranking> = self
            .rankings
            .values()
            .map(|r| r.meta)
            .filter(|r| r.season_id >= from_season)
            .collect();
        out.sort_by(|a, b| a.data_time.total_cmp(&b.data_time));
        Ok(out)
    }

    fn latest_ranking(&self) -> LadderResult<Option<Ranking>> {
        Ok(self
            .rankings
            .values()
            .map(|r| r.meta)
            .max_by(|a, b| a.data_time.total_cmp(&b.data_time)))
    }

    fn save_stats(&mut self, ranking_id: u64, text: &str) -> LadderResult<()> {
        let entry = self
            .rankings
            .get_mut(&ranking_id)
            .ok_or_else(|| crate::bug!("unknown ranking id {ranking_id}"))?;
        entry.stats = Some(text.to_owned());
        Ok(())
    }

    fn load_stats(&self, ranking_id: u64) -> LadderResult<Option<String>> {
        Ok(self.get(ranking_id)?.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(team_id: u64, version: i8) -> TeamRank {
        TeamRank {
            team_id,
            data_time: 1000.0,
            version,
            region: 1,
            mode: 11,
            league: 1,
            tier: 1,
            ladder_id: 1,
            join_time: 0.0,
            source_id: 0,
            mmr: 3000,
            points: 0.0,
            wins: 1,
            losses: 0,
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
            world_rank: 1,
            world_count: 1,
        }
    }

    #[test]
    fn save_and_load_all_round_trips() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 1000.0);
        let records = vec![rec(1, 1), rec(2, 1), rec(3, 1)];
        store.save(id, 1001.0, &records).unwrap();
        let loaded = store.load_all(id, 0.0).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn load_window_reads_only_the_requested_slice() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 1000.0);
        let records = vec![rec(1, 1), rec(2, 1), rec(3, 1), rec(4, 1)];
        store.save(id, 1001.0, &records).unwrap();
        let window = store.load_window(id, 2, 1, 2).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].team_id, 2);
        assert_eq!(window[1].team_id, 3);
    }

    #[test]
    fn load_window_past_the_end_returns_a_short_result() {
        let mut store = MemoryRankingStore::new();
        let id = store.create_ranking(28, 1000.0);
        store.save(id, 1001.0, &[rec(1, 1)]).unwrap();
        let window = store.load_window(id, 2, 0, 10).unwrap();
        assert_eq!(window.len(), 1);
    }
}
