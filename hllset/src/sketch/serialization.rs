// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Binary blob formats for the persisted structures.
//!
//! Every blob opens with a four-byte preamble (preamble length, serial
//! version, per-structure family id, flags), followed by little-endian
//! fields. Encoding and decoding are exact inverses: `encode` then `decode`
//! reproduces bit-identical structures.

use std::io::Cursor;
use std::io::Read;

use byteorder::LE;
use byteorder::ReadBytesExt;

use crate::error::Error;
use crate::hash::DIGEST_SIZE_BYTES;
use crate::sketch::RANK_WIDTH;
use crate::sketch::RawEvidenceBlock;
use crate::sketch::SketchDigest;
use crate::sketch::SketchRegistry;
use crate::sketch::TokenHash;
use crate::sketch::evidence::CELL_WIDTH_BYTES;

pub(crate) const PREAMBLE_BYTES: u8 = 4;
pub(crate) const SERIAL_VERSION: u8 = 1;

pub(crate) const DIGEST_MAP_FAMILY_ID: u8 = 1;
pub(crate) const TOKEN_LOG_FAMILY_ID: u8 = 2;
pub(crate) const REGISTER_TABLE_FAMILY_ID: u8 = 3;
pub(crate) const RAW_EVIDENCE_FAMILY_ID: u8 = 4;
pub(crate) const ENTITY_ROW_FAMILY_ID: u8 = 5;

pub(crate) const FLAGS_IS_EMPTY: u8 = 1 << 0;

fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
    move |_| Error::insufficient_data(tag)
}

fn encode_preamble(bytes: &mut Vec<u8>, family_id: u8, is_empty: bool) {
    bytes.push(PREAMBLE_BYTES);
    bytes.push(SERIAL_VERSION);
    bytes.push(family_id);
    bytes.push(if is_empty { FLAGS_IS_EMPTY } else { 0 });
}

fn decode_preamble(
    cursor: &mut Cursor<&[u8]>,
    family_id: u8,
    name: &'static str,
) -> Result<u8, Error> {
    let preamble_bytes = cursor.read_u8().map_err(make_error("preamble_bytes"))?;
    let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
    let family = cursor.read_u8().map_err(make_error("family_id"))?;
    let flags = cursor.read_u8().map_err(make_error("flags"))?;

    if family != family_id {
        return Err(Error::invalid_family(family_id, family, name));
    }
    if serial_version != SERIAL_VERSION {
        return Err(Error::unsupported_serial_version(
            SERIAL_VERSION,
            serial_version,
        ));
    }
    if preamble_bytes != PREAMBLE_BYTES {
        return Err(Error::corrupt(format!(
            "invalid preamble length: expected {PREAMBLE_BYTES}, got {preamble_bytes}"
        )));
    }
    Ok(flags)
}

fn checked_len(parts: &[usize]) -> Result<usize, Error> {
    parts
        .iter()
        .try_fold(1usize, |acc, &part| acc.checked_mul(part))
        .ok_or_else(|| Error::corrupt("declared shape overflows usize"))
}

pub(crate) fn encode_digest_map(registry: &SketchRegistry) -> Vec<u8> {
    let entries = registry.entries();
    let mut bytes =
        Vec::with_capacity(PREAMBLE_BYTES as usize + 8 + entries.len() * (DIGEST_SIZE_BYTES + 8));
    encode_preamble(&mut bytes, DIGEST_MAP_FAMILY_ID, entries.is_empty());
    if entries.is_empty() {
        return bytes;
    }
    bytes.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for (digest, id) in entries {
        bytes.extend_from_slice(digest.as_bytes());
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_digest_map(bytes: &[u8]) -> Result<SketchRegistry, Error> {
    let mut cursor = Cursor::new(bytes);
    let flags = decode_preamble(&mut cursor, DIGEST_MAP_FAMILY_ID, "sketch_digest_map")?;
    if (flags & FLAGS_IS_EMPTY) != 0 {
        return Ok(SketchRegistry::new());
    }

    let count = cursor.read_u64::<LE>().map_err(make_error("count"))?;
    let count = usize::try_from(count)
        .map_err(|_| Error::corrupt("digest map entry count overflows usize"))?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let mut digest = [0u8; DIGEST_SIZE_BYTES];
        cursor.read_exact(&mut digest).map_err(make_error("digest"))?;
        let id = cursor.read_u64::<LE>().map_err(make_error("sketch_id"))?;
        entries.push((SketchDigest::from_bytes(digest), id));
    }
    SketchRegistry::from_entries(entries)
}

pub(crate) fn encode_token_log(log: &[TokenHash]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PREAMBLE_BYTES as usize + 8 + log.len() * 12);
    encode_preamble(&mut bytes, TOKEN_LOG_FAMILY_ID, log.is_empty());
    if log.is_empty() {
        return bytes;
    }
    bytes.extend_from_slice(&(log.len() as u64).to_le_bytes());
    for entry in log {
        bytes.extend_from_slice(&entry.token_id.to_le_bytes());
        bytes.extend_from_slice(&entry.hash.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_token_log(bytes: &[u8]) -> Result<Vec<TokenHash>, Error> {
    let mut cursor = Cursor::new(bytes);
    let flags = decode_preamble(&mut cursor, TOKEN_LOG_FAMILY_ID, "token_hash_log")?;
    if (flags & FLAGS_IS_EMPTY) != 0 {
        return Ok(Vec::new());
    }

    let count = cursor.read_u64::<LE>().map_err(make_error("count"))?;
    let count = usize::try_from(count)
        .map_err(|_| Error::corrupt("token log entry count overflows usize"))?;
    let mut log = Vec::with_capacity(count);
    for _ in 0..count {
        let token_id = cursor.read_u64::<LE>().map_err(make_error("token_id"))?;
        let hash = cursor.read_u32::<LE>().map_err(make_error("token_hash"))?;
        log.push(TokenHash { token_id, hash });
    }
    Ok(log)
}

pub(crate) fn encode_register_table(num_bins: usize, num_rows: usize, cells: &[u64]) -> Vec<u8> {
    debug_assert_eq!(cells.len(), num_rows * num_bins);
    let mut bytes = Vec::with_capacity(PREAMBLE_BYTES as usize + 12 + cells.len() * 8);
    encode_preamble(&mut bytes, REGISTER_TABLE_FAMILY_ID, num_rows == 0);
    bytes.extend_from_slice(&(num_bins as u32).to_le_bytes());
    if num_rows == 0 {
        return bytes;
    }
    bytes.extend_from_slice(&(num_rows as u64).to_le_bytes());
    for cell in cells {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_register_table(bytes: &[u8]) -> Result<(usize, usize, Vec<u64>), Error> {
    let mut cursor = Cursor::new(bytes);
    let flags = decode_preamble(&mut cursor, REGISTER_TABLE_FAMILY_ID, "register_table")?;
    let num_bins = cursor.read_u32::<LE>().map_err(make_error("num_bins"))? as usize;
    if (flags & FLAGS_IS_EMPTY) != 0 {
        return Ok((num_bins, 0, Vec::new()));
    }

    let num_rows = cursor.read_u64::<LE>().map_err(make_error("num_rows"))?;
    let num_rows =
        usize::try_from(num_rows).map_err(|_| Error::corrupt("row count overflows usize"))?;
    let len = checked_len(&[num_rows, num_bins])?;
    let mut cells = Vec::with_capacity(len);
    for _ in 0..len {
        cells.push(cursor.read_u64::<LE>().map_err(make_error("cells"))?);
    }
    Ok((num_bins, num_rows, cells))
}

pub(crate) fn encode_raw_evidence(block: &RawEvidenceBlock) -> Vec<u8> {
    let cells = block.cells();
    let mut bytes = Vec::with_capacity(PREAMBLE_BYTES as usize + 14 + cells.len() * 8);
    encode_preamble(&mut bytes, RAW_EVIDENCE_FAMILY_ID, block.num_tokens() == 0);
    bytes.push(block.cell_width());
    bytes.push(RANK_WIDTH as u8);
    bytes.extend_from_slice(&(block.num_bins() as u32).to_le_bytes());
    bytes.extend_from_slice(&(block.num_tokens() as u64).to_le_bytes());
    for cell in cells {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_raw_evidence(bytes: &[u8]) -> Result<RawEvidenceBlock, Error> {
    let mut cursor = Cursor::new(bytes);
    decode_preamble(&mut cursor, RAW_EVIDENCE_FAMILY_ID, "raw_evidence")?;
    let cell_width = cursor.read_u8().map_err(make_error("cell_width"))?;
    let rank_width = cursor.read_u8().map_err(make_error("rank_width"))?;
    let num_bins = cursor.read_u32::<LE>().map_err(make_error("num_bins"))? as usize;
    let num_tokens = cursor.read_u64::<LE>().map_err(make_error("num_tokens"))?;
    let num_tokens =
        usize::try_from(num_tokens).map_err(|_| Error::corrupt("token count overflows usize"))?;

    if cell_width != CELL_WIDTH_BYTES {
        return Err(Error::type_mismatch(CELL_WIDTH_BYTES, cell_width));
    }
    if rank_width as usize != RANK_WIDTH {
        return Err(Error::corrupt(format!(
            "invalid rank width: expected {RANK_WIDTH}, got {rank_width}"
        )));
    }

    let len = checked_len(&[RANK_WIDTH, num_bins, num_tokens])?;
    let mut cells = Vec::with_capacity(len);
    for _ in 0..len {
        cells.push(cursor.read_u64::<LE>().map_err(make_error("cells"))?);
    }
    Ok(RawEvidenceBlock::from_parts(
        num_bins, num_tokens, cells, cell_width,
    ))
}

pub(crate) fn encode_register_row(row: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PREAMBLE_BYTES as usize + 4 + row.len() * 8);
    encode_preamble(&mut bytes, ENTITY_ROW_FAMILY_ID, row.is_empty());
    bytes.extend_from_slice(&(row.len() as u32).to_le_bytes());
    for cell in row {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_register_row(bytes: &[u8]) -> Result<Vec<u64>, Error> {
    let mut cursor = Cursor::new(bytes);
    decode_preamble(&mut cursor, ENTITY_ROW_FAMILY_ID, "entity_row")?;
    let len = cursor.read_u32::<LE>().map_err(make_error("row_len"))? as usize;
    let mut row = Vec::with_capacity(len);
    for _ in 0..len {
        row.push(cursor.read_u64::<LE>().map_err(make_error("cells"))?);
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_digest_map_round_trip() {
        let mut registry = SketchRegistry::new();
        registry.resolve_or_create(SketchDigest::of_row(&[1]));
        registry.resolve_or_create(SketchDigest::of_row(&[2]));
        let bytes = encode_digest_map(&registry);
        let decoded = decode_digest_map(&bytes).unwrap();
        assert_eq!(decoded, registry);
        assert_eq!(encode_digest_map(&decoded), bytes);
    }

    #[test]
    fn test_digest_map_empty_round_trip() {
        let bytes = encode_digest_map(&SketchRegistry::new());
        assert!(decode_digest_map(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_token_log_round_trip() {
        let log = vec![
            TokenHash {
                token_id: 5,
                hash: 0x74a318d5,
            },
            TokenHash {
                token_id: 7,
                hash: 0x4bea2543,
            },
        ];
        let bytes = encode_token_log(&log);
        assert_eq!(decode_token_log(&bytes).unwrap(), log);
    }

    #[test]
    fn test_register_table_round_trip() {
        let cells = vec![0u64, 1, 2, 3, 4, 5, 6, 7];
        let bytes = encode_register_table(4, 2, &cells);
        let (num_bins, num_rows, decoded) = decode_register_table(&bytes).unwrap();
        assert_eq!(num_bins, 4);
        assert_eq!(num_rows, 2);
        assert_eq!(decoded, cells);
    }

    #[test]
    fn test_raw_evidence_round_trip() {
        let mut block = RawEvidenceBlock::zeroed(4, 2);
        block.set(3, 1, 0, 0xabcd);
        let bytes = encode_raw_evidence(&block);
        assert_eq!(decode_raw_evidence(&bytes).unwrap(), block);
    }

    #[test]
    fn test_register_row_round_trip() {
        let row = vec![9u64, 0, 4, 2];
        let bytes = encode_register_row(&row);
        assert_eq!(decode_register_row(&bytes).unwrap(), row);
    }

    #[test]
    fn test_family_mismatch() {
        let bytes = encode_token_log(&[]);
        let err = decode_digest_map(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode_token_log(&[]);
        bytes[1] = 99;
        let err = decode_token_log(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_truncated_payload() {
        let log = vec![TokenHash {
            token_id: 1,
            hash: 2,
        }];
        let mut bytes = encode_token_log(&log);
        bytes.truncate(bytes.len() - 2);
        let err = decode_token_log(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_wrong_cell_width_is_type_mismatch() {
        let block = RawEvidenceBlock::zeroed(4, 1);
        let mut bytes = encode_raw_evidence(&block);
        // byte 4 is the recorded cell width
        bytes[4] = 4;
        let err = decode_raw_evidence(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
