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

//! Deterministic token hashing and bin/rank extraction.
//!
//! Every token id maps to a fixed 32-bit hash derived from a cryptographic
//! digest, so sketches built from the same token stream are reproducible
//! across processes and over time. The hash splits into a bin index (top
//! `p` bits) and a rank (count of trailing zero bits), the two coordinates
//! a sketch register accumulates.

use md5::Md5;
use sha1::Digest;
use sha1::Sha1;

/// Width of a token hash in bits.
pub const HASH_BITS: u32 = 32;

/// Size of a register-row digest in bytes (SHA-1).
pub const DIGEST_SIZE_BYTES: usize = 20;

/// Hash a token id to its deterministic 32-bit value.
///
/// The hash is the low 32 bits of the MD5 digest of the token id's decimal
/// string form, interpreting the digest as a big-endian integer. It is a
/// pure function of the token id: identical ids produce identical hashes in
/// every process.
///
/// # Examples
///
/// ```
/// # use hllset::hash::token_hash;
/// assert_eq!(token_hash(5), token_hash(5));
/// ```
pub fn token_hash(token_id: u64) -> u32 {
    let digest = Md5::digest(token_id.to_string().as_bytes());
    u32::from_be_bytes([digest[12], digest[13], digest[14], digest[15]])
}

/// Split a token hash into its bin index and rank.
///
/// The bin index is the top `precision` bits of the hash; the rank is the
/// count of trailing zero bits. The rank is defined from the *trailing* end
/// of the hash, not the leading end, and downstream register merging assumes
/// exactly that. A zero hash has no set bit and yields rank 0.
///
/// `precision` must be in `1..=16`; [`crate::sketch::SketchStore`]
/// construction enforces the range.
pub fn bin_and_rank(hash: u32, precision: u8) -> (u32, u32) {
    debug_assert!((1..=16).contains(&precision));
    let bin = hash >> (HASH_BITS - precision as u32);
    let rank = if hash == 0 { 0 } else { hash.trailing_zeros() };
    (bin, rank)
}

/// SHA-1 digest of a register row's binary representation.
///
/// Cells are fed to the digest in order as little-endian 64-bit words, so
/// rows with identical cell values always produce identical digests. The
/// digest is computed over the freshly built candidate row, before any
/// merge, and is never recomputed afterwards.
pub fn row_digest(row: &[u64]) -> [u8; DIGEST_SIZE_BYTES] {
    let mut hasher = Sha1::new();
    for cell in row {
        hasher.update(cell.to_le_bytes());
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_reference_hashes() {
        // Reference vectors pinned against the MD5-of-decimal-string scheme.
        assert_eq!(token_hash(0), 0xf98764da);
        assert_eq!(token_hash(1), 0x6f75849b);
        assert_eq!(token_hash(2), 0xcc14862c);
        assert_eq!(token_hash(5), 0x74a318d5);
        assert_eq!(token_hash(7), 0x4bea2543);
        assert_eq!(token_hash(1164), 0x9c60d000);
    }

    #[test]
    fn test_bin_and_rank() {
        // token 2: hash 0xcc14862c, top 4 bits 0xc, two trailing zeros
        assert_eq!(bin_and_rank(0xcc14862c, 4), (12, 2));
        // token 1164: hash 0x9c60d000, twelve trailing zeros
        assert_eq!(bin_and_rank(0x9c60d000, 4), (9, 12));
        // a hash with only the top bit set has the maximum rank
        assert_eq!(bin_and_rank(0x80000000, 4), (8, 31));
    }

    #[test]
    fn test_rank_is_trailing_not_leading() {
        // 0x00000001 would have 31 *leading* zeros; its rank must be 0.
        assert_eq!(bin_and_rank(0x00000001, 4), (0, 0));
    }

    #[test]
    fn test_zero_hash_rank_is_zero() {
        assert_eq!(bin_and_rank(0, 4), (0, 0));
    }

    #[test]
    fn test_wider_precision() {
        // p=16: bin is the top 16 bits
        assert_eq!(bin_and_rank(0xcc14862c, 16), (0xcc14, 2));
    }

    #[test]
    fn test_row_digest_reference() {
        let zero_row = [0u64; 16];
        assert_eq!(
            hex(&row_digest(&zero_row)),
            "0ae4f711ef5d6e9d26c611fd2c8c8ac45ecbf9e7"
        );
    }

    #[test]
    fn test_row_digest_sensitivity() {
        let mut row = [0u64; 16];
        let base = row_digest(&row);
        row[3] = 1;
        assert_ne!(row_digest(&row), base);
        row[3] = 0;
        assert_eq!(row_digest(&row), base);
    }
}
