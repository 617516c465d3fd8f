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

//! Pure candidate construction for one document's token stream.
//!
//! Everything here is computed without touching shared state; the store
//! commits a finished [`Candidate`] into all four persisted structures in
//! one step, so a build can never leave them partially updated.

use crate::hash::bin_and_rank;
use crate::hash::token_hash;
use crate::sketch::RawEvidenceBlock;
use crate::sketch::SketchDigest;
use crate::sketch::TokenHash;

/// The not-yet-committed output of hashing one document.
pub(crate) struct Candidate {
    /// Zero-initialized row with each token's rank OR'd into its bin.
    pub(crate) row: Vec<u64>,
    /// Evidence slice shaped `[32, 2^p, token_count]`.
    pub(crate) evidence: RawEvidenceBlock,
    /// Replacement token-hash log, in input order.
    pub(crate) log: Vec<TokenHash>,
    /// SHA-1 digest of `row`, computed before any merge.
    pub(crate) digest: SketchDigest,
}

impl Candidate {
    /// Hash every token and accumulate the candidate structures.
    ///
    /// Ranks are combined into register cells with bitwise OR, not max;
    /// this is the accumulation policy the whole system is built around.
    pub(crate) fn from_tokens(precision: u8, token_ids: &[u64]) -> Self {
        let num_bins = 1usize << precision;
        let mut row = vec![0u64; num_bins];
        let mut evidence = RawEvidenceBlock::zeroed(num_bins, token_ids.len());
        let mut log = Vec::with_capacity(token_ids.len());

        for (position, &token_id) in token_ids.iter().enumerate() {
            let hash = token_hash(token_id);
            let (bin, rank) = bin_and_rank(hash, precision);
            row[bin as usize] |= rank as u64;
            evidence.set(rank as usize, bin as usize, position, hash as u64);
            log.push(TokenHash { token_id, hash });
        }

        let digest = SketchDigest::of_row(&row);
        Candidate {
            row,
            evidence,
            log,
            digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference coordinates for p=4 (see hash module tests):
    //   token 0  -> hash 0xf98764da, bin 15, rank 1
    //   token 2  -> hash 0xcc14862c, bin 12, rank 2
    //   token 11 -> hash 0x82652dca, bin  8, rank 1

    #[test]
    fn test_candidate_row_accumulation() {
        let candidate = Candidate::from_tokens(4, &[0, 2, 11]);
        let mut expected = vec![0u64; 16];
        expected[15] = 1;
        expected[12] = 2;
        expected[8] = 1;
        assert_eq!(candidate.row, expected);
    }

    #[test]
    fn test_candidate_self_or_is_noop() {
        // The same token twice ORs the same rank into the same bin.
        let once = Candidate::from_tokens(4, &[2]);
        let twice = Candidate::from_tokens(4, &[2, 2]);
        assert_eq!(once.row, twice.row);
        assert_eq!(once.digest, twice.digest);
    }

    #[test]
    fn test_candidate_log_order() {
        let candidate = Candidate::from_tokens(4, &[11, 0]);
        assert_eq!(candidate.log.len(), 2);
        assert_eq!(candidate.log[0].token_id, 11);
        assert_eq!(candidate.log[0].hash, 0x82652dca);
        assert_eq!(candidate.log[1].token_id, 0);
        assert_eq!(candidate.log[1].hash, 0xf98764da);
    }

    #[test]
    fn test_candidate_evidence_placement() {
        let candidate = Candidate::from_tokens(4, &[0, 2, 11]);
        assert_eq!(candidate.evidence.num_tokens(), 3);
        assert_eq!(candidate.evidence.get(1, 15, 0), 0xf98764da);
        assert_eq!(candidate.evidence.get(2, 12, 1), 0xcc14862c);
        assert_eq!(candidate.evidence.get(1, 8, 2), 0x82652dca);
        // a cell off any token's coordinates stays zero
        assert_eq!(candidate.evidence.get(1, 15, 1), 0);
    }

    #[test]
    fn test_empty_document() {
        let candidate = Candidate::from_tokens(4, &[]);
        assert_eq!(candidate.row, vec![0u64; 16]);
        assert_eq!(candidate.evidence.num_tokens(), 0);
        assert!(candidate.log.is_empty());
        assert_eq!(candidate.digest, SketchDigest::of_row(&vec![0u64; 16]));
    }

    #[test]
    fn test_distinct_streams_can_share_a_digest() {
        // Tokens 1 and 3 both carry rank 0, so they leave the row unchanged
        // wherever another token already set their bins.
        let left = Candidate::from_tokens(4, &[2, 2, 0]);
        let right = Candidate::from_tokens(4, &[0, 1, 2, 3]);
        assert_eq!(left.row, right.row);
        assert_eq!(left.digest, right.digest);
    }
}
