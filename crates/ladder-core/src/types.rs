//! Sentinels and the core record/entity types shared by every other module.

/// Magic number at the start of every persisted ranking blob.
pub const MAGIC: u32 = 0xD00D_6A3E;

/// Sentinel meaning "this filter slot is not set".
pub const NOT_SET: i32 = -64;
/// Sentinel meaning "no MMR has been recorded for this record".
pub const NO_MMR: i16 = -32768;
/// Marks a 1v1 race-keyed record that is not the team's best race.
pub const RACE_ANY: i8 = 8;
/// Marks the 1v1 race-keyed record that represents the team's best race.
pub const RACE_BEST: i8 = 9;

/// First season whose sort key is MMR rather than league/tier/points.
pub const MMR_SEASON: u32 = 28;
/// First season where 1v1 teams may carry one race-keyed record per race.
pub const SEPARATE_RACE_MMR_SEASON: u32 = 29;
/// The mode value identifying 1v1 ladders.
pub const MODE_SOLO: i8 = 11;
/// Game version identifying "Legacy of the Void", the version clan queries are pinned to.
pub const LOTV: i8 = 2;

/// Lower bound of the race domain, used by the binary-search run-extension math.
pub const RACE_LO: i8 = 0;
/// Upper bound of the race domain.
pub const RACE_HI: i8 = 3;
/// Number of distinct playable races.
pub const RACE_COUNT: u32 = 4;

/// A player identity key: (region, blizzard id, realm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerKey {
    /// The region the player was first observed in.
    pub region: i8,
    /// The upstream blizzard id.
    pub bid: u64,
    /// The realm within the region.
    pub realm: i8,
}

/// A player's persistent record, as cached by the merger and identity resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// The store-assigned id; `None` until resolved.
    pub id: Option<u64>,
    /// The identity key.
    pub key: PlayerKey,
    /// Display name.
    pub name: String,
    /// Ladder tag.
    pub tag: String,
    /// Clan name.
    pub clan: String,
    /// Last season this player was sighted in.
    pub season_id: u32,
    /// Race observed for this player's dominant mode.
    pub race: i8,
    /// League observed for this player's dominant mode.
    pub league: i8,
    /// The mode this player's cached standing belongs to.
    pub mode: i8,
    /// Unix timestamp of the last sighting.
    pub last_seen: f64,
}

/// A team identity key: (mode, canonicalised member ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamKey {
    /// The mode the team plays in.
    pub mode: i8,
    /// Member ids, canonical order, 0 = unused slot.
    pub members: [u64; 4],
}

/// A team's persistent record, as cached by the merger and identity resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    /// The store-assigned id; `None` until resolved.
    pub id: Option<u64>,
    /// The identity key.
    pub key: TeamKey,
    /// Region the team was most recently observed playing in.
    pub region: i8,
    /// Last season this team was sighted in.
    pub season_id: u32,
    /// Game version of the last sighting.
    pub version: i8,
    /// League of the last sighting.
    pub league: i8,
    /// Per-position races, in member order, padded with -1.
    pub races: [i8; 4],
    /// Unix timestamp of the last sighting.
    pub last_seen: f64,
}

impl Team {
    /// Sorts `(member_id, race)` pairs ascending by id for positions below `team_size`,
    /// padding positions at or above `team_size` with the null sentinel `(0, -1)`. Applied
    /// before lookup/insert so member order is canonical regardless of ingest order.
    pub fn normalize(members: &[(u64, i8)], team_size: usize) -> ([u64; 4], [i8; 4]) {
        let mut pairs: Vec<(u64, i8)> = members[..team_size.min(members.len())].to_vec();
        pairs.sort_by_key(|&(id, _)| id);
        let mut ids = [0u64; 4];
        let mut races = [-1i8; 4];
        for (i, (id, race)) in pairs.into_iter().enumerate().take(4) {
            ids[i] = id;
            races[i] = race;
        }
        (ids, races)
    }
}

/// The atomic unit of ranking data: one team's standing in one (version, mode) slice.
///
/// This is the in-memory shape; [`crate::codec`] handles its versioned wire encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamRank {
    /// The team id, as resolved through [`crate::identity::IdentityStore`].
    pub team_id: u64,
    /// Unix seconds of the snapshot this record came from.
    pub data_time: f64,
    /// Game version.
    pub version: i8,
    /// Region.
    pub region: i8,
    /// Mode.
    pub mode: i8,
    /// League.
    pub league: i8,
    /// Tier within the league; lower is higher standing.
    pub tier: i8,
    /// Upstream ladder id this record was sourced from.
    pub ladder_id: u32,
    /// Time the team joined this ladder.
    pub join_time: f32,
    /// Upstream source id.
    pub source_id: u32,
    /// MMR rating, or [`NO_MMR`] if unrated. Only meaningful from codec v2 onward.
    pub mmr: i16,
    /// Points-based score.
    pub points: f32,
    /// Win count.
    pub wins: u32,
    /// Loss count.
    pub losses: u32,
    /// Per-position races. For 1v1, `race3` doubles as the best-race marker.
    pub race0: i8,
    /// See [`TeamRank::race0`].
    pub race1: i8,
    /// See [`TeamRank::race0`].
    pub race2: i8,
    /// For 1v1: [`RACE_BEST`] or [`RACE_ANY`]. For other modes: member 3's race or sentinel.
    pub race3: i8,
    /// Rank within the ladder this record was computed from.
    pub ladder_rank: u32,
    /// Size of that ladder.
    pub ladder_count: u32,
    /// Rank within (version, mode, region, league).
    pub league_rank: u32,
    /// Size of that league slice.
    pub league_count: u32,
    /// Rank within (version, mode, region).
    pub region_rank: u32,
    /// Size of that region slice.
    pub region_count: u32,
    /// Rank within (version, mode).
    pub world_rank: u32,
    /// Size of that world slice.
    pub world_count: u32,
}

impl TeamRank {
    /// Win rate as a fraction in `[0, 1]`; `0` when no games have been played.
    pub fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.0
        } else {
            self.wins as f64 / total as f64
        }
    }

    /// Whether this is a 1v1 record.
    pub fn is_solo(&self) -> bool {
        self.mode == MODE_SOLO
    }
}

/// A published ranking's metadata entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    /// Store-assigned id.
    pub id: u64,
    /// Season this ranking belongs to.
    pub season_id: u32,
    /// Unix seconds this ranking was produced at.
    pub data_time: f64,
    /// Last modification timestamp, used by [`crate::query::LadderHandler`]'s reload check.
    pub updated_at: f64,
}

/// Per-`(mode, version, region, league, race)` aggregate counted alongside rank computation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsBucket {
    /// Number of records in this bucket.
    pub count: u64,
    /// Total wins.
    pub wins: u64,
    /// Total losses.
    pub losses: u64,
    /// Total points.
    pub points: f64,
}

/// Which field a user-facing sort orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// League/tier/points composite.
    LadderRank,
    /// Total games played.
    Played,
    /// Win count.
    Wins,
    /// Loss count.
    Losses,
    /// Win ratio.
    WinRate,
    /// MMR rating.
    Mmr,
}

/// Whether `season_id` falls in the MMR era (sort key MMR instead of league/tier/points).
pub fn is_mmr_era(season_id: u32) -> bool {
    season_id >= MMR_SEASON
}

/// Whether `season_id` allows a 1v1 team to carry one race-keyed record per race.
pub fn is_separate_race_mmr_era(season_id: u32) -> bool {
    season_id >= SEPARATE_RACE_MMR_SEASON
}
