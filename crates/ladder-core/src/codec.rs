//! Bit-exact read/write of the ranking blob header and fixed-width team-rank records.
//!
//! Records are always written in the latest (v2) layout; older versions are only ever
//! decoded, never encoded, and are upconverted to the v2 shape on read. Byte order is the
//! host's: the magic number lets a reader reject a foreign-endian blob instead of silently
//! misreading it.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::error::{LadderError, LadderResult};
use crate::types::{MAGIC, NO_MMR, TeamRank};

/// Size in bytes of the blob header.
pub const HEADER_SIZE: usize = 12;
/// Size in bytes of a v0 record.
pub const RECORD_SIZE_V0: usize = 84;
/// Size in bytes of a v1 record.
pub const RECORD_SIZE_V1: usize = 77;
/// Size in bytes of a v2 record.
pub const RECORD_SIZE_V2: usize = 79;

/// Returns the on-disk record width for a given blob codec version (1 or 2).
pub fn record_size(version: u32) -> LadderResult<usize> {
    match version {
        1 => Ok(RECORD_SIZE_V1),
        2 => Ok(RECORD_SIZE_V2),
        other => Err(LadderError::UnsupportedVersion(other)),
    }
}

/// The header of a persisted ranking blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingHeader {
    /// Codec version of the records that follow (1 or 2).
    pub version: u32,
    /// Number of records in the blob.
    pub count: u32,
}

/// Decodes and validates a blob header, failing with [`LadderError::BadMagic`] if the magic
/// doesn't match and [`LadderError::UnsupportedVersion`] if the version isn't 1 or 2.
pub fn decode_header(bytes: &[u8]) -> LadderResult<RankingHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(LadderError::Truncated {
            needed: HEADER_SIZE,
            got: bytes.len(),
        });
    }
    let mut cursor = Cursor::new(bytes);
    let magic = cursor.read_u32::<NativeEndian>().unwrap();
    if magic != MAGIC {
        return Err(LadderError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = cursor.read_u32::<NativeEndian>().unwrap();
    if !(1..=2).contains(&version) {
        return Err(LadderError::UnsupportedVersion(version));
    }
    let count = cursor.read_u32::<NativeEndian>().unwrap();
    Ok(RankingHeader { version, count })
}

/// Encodes a blob header. `version` must be 1 or 2.
pub fn encode_header(header: RankingHeader) -> LadderResult<[u8; HEADER_SIZE]> {
    if !(1..=2).contains(&header.version) {
        return Err(LadderError::UnsupportedVersion(header.version));
    }
    let mut out = [0u8; HEADER_SIZE];
    let mut cursor = Cursor::new(&mut out[..]);
    cursor.write_u32::<NativeEndian>(MAGIC).unwrap();
    cursor.write_u32::<NativeEndian>(header.version).unwrap();
    cursor.write_u32::<NativeEndian>(header.count).unwrap();
    Ok(out)
}

/// Encodes a single record in the latest (v2) wire layout.
pub fn encode(record: &TeamRank) -> [u8; RECORD_SIZE_V2] {
    let mut out = [0u8; RECORD_SIZE_V2];
    let mut c = Cursor::new(&mut out[..]);
    write_v2_body(&mut c, record);
    out
}

fn write_v2_body(c: &mut Cursor<&mut [u8]>, r: &TeamRank) {
    c.write_u32::<NativeEndian>(r.team_id as u32).unwrap();
    c.write_f64::<NativeEndian>(r.data_time).unwrap();
    c.write_i8(r.version).unwrap();
    c.write_i8(r.region).unwrap();
    c.write_i8(r.mode).unwrap();
    c.write_i8(r.league).unwrap();
    c.write_i8(r.tier).unwrap();
    c.write_u32::<NativeEndian>(r.ladder_id).unwrap();
    c.write_f32::<NativeEndian>(r.join_time).unwrap();
    c.write_u32::<NativeEndian>(r.source_id).unwrap();
    c.write_i16::<NativeEndian>(r.mmr).unwrap();
    c.write_f32::<NativeEndian>(r.points).unwrap();
    c.write_u32::<NativeEndian>(r.wins).unwrap();
    c.write_u32::<NativeEndian>(r.losses).unwrap();
    c.write_i8(r.race0).unwrap();
    c.write_i8(r.race1).unwrap();
    c.write_i8(r.race2).unwrap();
    c.write_i8(r.race3).unwrap();
    c.write_u32::<NativeEndian>(r.ladder_rank).unwrap();
    c.write_u32::<NativeEndian>(r.ladder_count).unwrap();
    c.write_u32::<NativeEndian>(r.league_rank).unwrap();
    c.write_u32::<NativeEndian>(r.league_count).unwrap();
    c.write_u32::<NativeEndian>(r.region_rank).unwrap();
    c.write_u32::<NativeEndian>(r.region_count).unwrap();
    c.write_u32::<NativeEndian>(r.world_rank).unwrap();
    c.write_u32::<NativeEndian>(r.world_count).unwrap();
}

fn need(bytes: &[u8], n: usize) -> LadderResult<()> {
    if bytes.len() < n {
        Err(LadderError::Truncated {
            needed: n,
            got: bytes.len(),
        })
    } else {
        Ok(())
    }
}

/// Decodes a v2 record, the only version whose on-wire shape matches the in-memory struct
/// exactly.
pub fn decode_v2(bytes: &[u8]) -> LadderResult<TeamRank> {
    need(bytes, RECORD_SIZE_V2)?;
    let mut c = Cursor::new(bytes);
    let team_id = c.read_u32::<NativeEndian>().unwrap() as u64;
    let data_time = c.read_f64::<NativeEndian>().unwrap();
    let version = c.read_i8().unwrap();
    let region = c.read_i8().unwrap();
    let mode = c.read_i8().unwrap();
    let league = c.read_i8().unwrap();
    let tier = c.read_i8().unwrap();
    let ladder_id = c.read_u32::<NativeEndian>().unwrap();
    let join_time = c.read_f32::<NativeEndian>().unwrap();
    let source_id = c.read_u32::<NativeEndian>().unwrap();
    let mmr = c.read_i16::<NativeEndian>().unwrap();
    let points = c.read_f32::<NativeEndian>().unwrap();
    let wins = c.read_u32::<NativeEndian>().unwrap();
    let losses = c.read_u32::<NativeEndian>().unwrap();
    let race0 = c.read_i8().unwrap();
    let race1 = c.read_i8().unwrap();
    let race2 = c.read_i8().unwrap();
    let race3 = c.read_i8().unwrap();
    let ladder_rank = c.read_u32::<NativeEndian>().unwrap();
    let ladder_count = c.read_u32::<NativeEndian>().unwrap();
    let league_rank = c.read_u32::<NativeEndian>().unwrap();
    let league_count = c.read_u32::<NativeEndian>().unwrap();
    let region_rank = c.read_u32::<NativeEndian>().unwrap();
    let region_count = c.read_u32::<NativeEndian>().unwrap();
    let world_rank = c.read_u32::<NativeEndian>().unwrap();
    let world_count = c.read_u32::<NativeEndian>().unwrap();
    Ok(TeamRank {
        team_id,
        data_time,
        version,
        region,
        mode,
        league,
        tier,
        ladder_id,
        join_time,
        source_id,
        mmr,
        points,
        wins,
        losses,
        race0,
        race1,
        race2,
        race3,
        ladder_rank,
        ladder_count,
        league_rank,
        league_count,
        region_rank,
        region_count,
        world_rank,
        world_count,
    })
}

/// Decodes a v1 record and upconverts it: `mmr` is set to [`NO_MMR`], every other field
/// carries over unchanged.
pub fn decode_v1(bytes: &[u8]) -> LadderResult<TeamRank> {
    need(bytes, RECORD_SIZE_V1)?;
    let mut c = Cursor::new(bytes);
    let team_id = c.read_u32::<NativeEndian>().unwrap() as u64;
    let data_time = c.read_f64::<NativeEndian>().unwrap();
    let version = c.read_i8().unwrap();
    let region = c.read_i8().unwrap();
    let mode = c.read_i8().unwrap();
    let league = c.read_i8().unwrap();
    let tier = c.read_i8().unwrap();
    let ladder_id = c.read_u32::<NativeEndian>().unwrap();
    let join_time = c.read_f32::<NativeEndian>().unwrap();
    let source_id = c.read_u32::<NativeEndian>().unwrap();
    let points = c.read_f32::<NativeEndian>().unwrap();
    let wins = c.read_u32::<NativeEndian>().unwrap();
    let losses = c.read_u32::<NativeEndian>().unwrap();
    let race0 = c.read_i8().unwrap();
    let race1 = c.read_i8().unwrap();
    let race2 = c.read_i8().unwrap();
    let race3 = c.read_i8().unwrap();
    let ladder_rank = c.read_u32::<NativeEndian>().unwrap();
    let ladder_count = c.read_u32::<NativeEndian>().unwrap();
    let league_rank = c.read_u32::<NativeEndian>().unwrap();
    let league_count = c.read_u32::<NativeEndian>().unwrap();
    let region_rank = c.read_u32::<NativeEndian>().unwrap();
    let region_count = c.read_u32::<NativeEndian>().unwrap();
    let world_rank = c.read_u32::<NativeEndian>().unwrap();
    let world_count = c.read_u32::<NativeEndian>().unwrap();
    Ok(TeamRank {
        team_id,
        data_time,
        version,
        region,
        mode,
        league,
        tier,
        ladder_id,
        join_time,
        source_id,
        mmr: NO_MMR,
        points,
        wins,
        losses,
        race0,
        race1,
        race2,
        race3,
        ladder_rank,
        ladder_count,
        league_rank,
        league_count,
        region_rank,
        region_count,
        world_rank,
        world_count,
    })
}

/// Decodes a v0 record and upconverts it: trailing `active_rank`/`active_count` are
/// discarded, `tier` is set to `0`, `mmr` is set to [`NO_MMR`].
pub fn decode_v0(bytes: &[u8]) -> LadderResult<TeamRank> {
    need(bytes, RECORD_SIZE_V0)?;
    let mut c = Cursor::new(bytes);
    let team_id = c.read_u32::<NativeEndian>().unwrap() as u64;
    let data_time = c.read_f64::<NativeEndian>().unwrap();
    let version = c.read_i8().unwrap();
    let region = c.read_i8().unwrap();
    let mode = c.read_i8().unwrap();
    let league = c.read_i8().unwrap();
    let ladder_id = c.read_u32::<NativeEndian>().unwrap();
    let join_time = c.read_f32::<NativeEndian>().unwrap();
    let source_id = c.read_u32::<NativeEndian>().unwrap();
    let points = c.read_f32::<NativeEndian>().unwrap();
    let wins = c.read_u32::<NativeEndian>().unwrap();
    let losses = c.read_u32::<NativeEndian>().unwrap();
    let race0 = c.read_i8().unwrap();
    let race1 = c.read_i8().unwrap();
    let race2 = c.read_i8().unwrap();
    let race3 = c.read_i8().unwrap();
    let ladder_rank = c.read_u32::<NativeEndian>().unwrap();
    let ladder_count = c.read_u32::<NativeEndian>().unwrap();
    let league_rank = c.read_u32::<NativeEndian>().unwrap();
    let league_count = c.read_u32::<NativeEndian>().unwrap();
    let region_rank = c.read_u32::<NativeEndian>().unwrap();
    let region_count = c.read_u32::<NativeEndian>().unwrap();
    let world_rank = c.read_u32::<NativeEndian>().unwrap();
    let world_count = c.read_u32::<NativeEndian>().unwrap();
    // trailing active_rank/active_count: present on disk, not carried into the in-memory shape.
    let _active_rank = c.read_u32::<NativeEndian>().unwrap();
    let _active_count = c.read_u32::<NativeEndian>().unwrap();
    Ok(TeamRank {
        team_id,
        data_time,
        version,
        region,
        mode,
        league,
        tier: 0,
        ladder_id,
        join_time,
        source_id,
        mmr: NO_MMR,
        points,
        wins,
        losses,
        race0,
        race1,
        race2,
        race3,
        ladder_rank,
        ladder_count,
        league_rank,
        league_count,
        region_rank,
        region_count,
        world_rank,
        world_count,
    })
}

/// Decodes one record according to the blob's codec version, always yielding the latest
/// ([`TeamRank`]) struct shape.
pub fn decode(version: u32, bytes: &[u8]) -> LadderResult<TeamRank> {
    match version {
        1 => decode_v1(bytes),
        2 => decode_v2(bytes),
        other => Err(LadderError::UnsupportedVersion(other)),
    }
}

/// Decodes a whole blob body (`count` consecutive records at the given version).
pub fn decode_all(version: u32, count: u32, body: &[u8]) -> LadderResult<Vec<TeamRank>> {
    let size = record_size(version)?;
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let start = i * size;
        let end = start + size;
        need(body, end)?;
        out.push(decode(version, &body[start..end])?);
    }
    Ok(out)
}

/// Encodes a full blob: header followed by `records.len()` v2 records.
pub fn encode_blob(records: &[TeamRank]) -> LadderResult<Vec<u8>> {
    if records.len() > i32::MAX as usize {
        return Err(LadderError::BlobTooLarge(records.len() * RECORD_SIZE_V2));
    }
    let header = encode_header(RankingHeader {
        version: 2,
        count: records.len() as u32,
    })?;
    let mut out = Vec::with_capacity(HEADER_SIZE + records.len() * RECORD_SIZE_V2);
    out.write_all(&header).unwrap();
    for r in records {
        out.write_all(&encode(r)).unwrap();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TeamRank {
        TeamRank {
            team_id: 42,
            data_time: 1_700_000_000.5,
            version: 5,
            region: 1,
            mode: 11,
            league: 3,
            tier: 2,
            ladder_id: 99,
            join_time: 123.5,
            source_id: 7,
            mmr: 3500,
            points: 12.5,
            wins: 10,
            losses: 4,
            race0: 1,
            race1: -1,
            race2: -1,
            race3: 9,
            ladder_rank: 1,
            ladder_count: 8,
            league_rank: 2,
            league_count: 20,
            region_rank: 5,
            region_count: 100,
            world_rank: 9,
            world_count: 1000,
        }
    }

    #[test]
    fn v2_round_trips() {
        let r = sample();
        let bytes = encode(&r);
        let back = decode_v2(&bytes).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn v1_upconverts_mmr_to_no_mmr() {
        let r = sample();
        // Build a v1 buffer by hand: same fields minus mmr.
        let mut buf = Vec::new();
        buf.write_u32::<NativeEndian>(r.team_id as u32).unwrap();
        buf.write_f64::<NativeEndian>(r.data_time).unwrap();
        buf.write_i8(r.version).unwrap();
        buf.write_i8(r.region).unwrap();
        buf.write_i8(r.mode).unwrap();
        buf.write_i8(r.league).unwrap();
        buf.write_i8(r.tier).unwrap();
        buf.write_u32::<NativeEndian>(r.ladder_id).unwrap();
        buf.write_f32::<NativeEndian>(r.join_time).unwrap();
        buf.write_u32::<NativeEndian>(r.source_id).unwrap();
        buf.write_f32::<NativeEndian>(r.points).unwrap();
        buf.write_u32::<NativeEndian>(r.wins).unwrap();
        buf.write_u32::<NativeEndian>(r.losses).unwrap();
        buf.write_i8(r.race0).unwrap();
        buf.write_i8(r.race1).unwrap();
        buf.write_i8(r.race2).unwrap();
        buf.write_i8(r.race3).unwrap();
        buf.write_u32::<NativeEndian>(r.ladder_rank).unwrap();
        buf.write_u32::<NativeEndian>(r.ladder_count).unwrap();
        buf.write_u32::<NativeEndian>(r.league_rank).unwrap();
        buf.write_u32::<NativeEndian>(r.league_count).unwrap();
        buf.write_u32::<NativeEndian>(r.region_rank).unwrap();
        buf.write_u32::<NativeEndian>(r.region_count).unwrap();
        buf.write_u32::<NativeEndian>(r.world_rank).unwrap();
        buf.write_u32::<NativeEndian>(r.world_count).unwrap();
        assert_eq!(buf.len(), RECORD_SIZE_V1);

        let back = decode_v1(&buf).unwrap();
        assert_eq!(back.mmr, NO_MMR);
        assert_eq!(back.team_id, r.team_id);
        assert_eq!(back.points, r.points);
        assert_eq!(back.wins, r.wins);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let header = encode_header(RankingHeader {
            version: 2,
            count: 0,
        })
        .unwrap();
        let mut corrupted = header;
        corrupted[0] ^= 0xFF;
        let err = decode_header(&corrupted).unwrap_err();
        assert!(matches!(err, LadderError::BadMagic { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut header = encode_header(RankingHeader {
            version: 2,
            count: 0,
        })
        .unwrap();
        header[4..8].copy_from_slice(&7u32.to_ne_bytes());
        let err = decode_header(&header).unwrap_err();
        assert!(matches!(err, LadderError::UnsupportedVersion(7)));
    }

    #[test]
    fn blob_round_trips_through_decode_all() {
        let records = vec![sample(), sample()];
        let blob = encode_blob(&records).unwrap();
        let header = decode_header(&blob).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.count, 2);
        let decoded = decode_all(header.version, header.count, &blob[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, records);
    }
}
