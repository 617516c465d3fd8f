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

//! Raw per-token hash evidence retained alongside the register table.

use crate::sketch::RANK_WIDTH;

/// Recorded width of an evidence cell in bytes.
pub(crate) const CELL_WIDTH_BYTES: u8 = 8;

/// A three-dimensional block of raw hash evidence shaped
/// `[rank, bin, token]`.
///
/// Cell `[r, b, i]` holds the raw 32-bit hash of the i-th processed token
/// when that token's rank is `r` and bin index is `b`, and zero otherwise.
/// The block is strictly additive: it grows only along the token axis and
/// is never shrunk or compacted. It exists for audit and debug
/// reconstruction; sketch semantics never read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvidenceBlock {
    num_bins: usize,
    num_tokens: usize,
    /// Flat cells in `[rank][bin][token]` order, token index fastest.
    cells: Vec<u64>,
    /// Cell width recorded with the block; always 8 for blocks built here,
    /// preserved verbatim from persisted form otherwise.
    pub(crate) cell_width: u8,
}

impl RawEvidenceBlock {
    /// Create an empty block (zero tokens) for the given bin count.
    pub(crate) fn new(num_bins: usize) -> Self {
        Self::zeroed(num_bins, 0)
    }

    /// Create a zero-filled block covering `num_tokens` token positions.
    pub(crate) fn zeroed(num_bins: usize, num_tokens: usize) -> Self {
        Self {
            num_bins,
            num_tokens,
            cells: vec![0; RANK_WIDTH * num_bins * num_tokens],
            cell_width: CELL_WIDTH_BYTES,
        }
    }

    /// Reassemble a block from its persisted parts.
    pub(crate) fn from_parts(
        num_bins: usize,
        num_tokens: usize,
        cells: Vec<u64>,
        cell_width: u8,
    ) -> Self {
        debug_assert_eq!(cells.len(), RANK_WIDTH * num_bins * num_tokens);
        Self {
            num_bins,
            num_tokens,
            cells,
            cell_width,
        }
    }

    /// Number of bins per rank slice.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Length of the token axis: the cumulative count of tokens processed
    /// since the block was created or loaded.
    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    /// Recorded cell width in bytes.
    pub fn cell_width(&self) -> u8 {
        self.cell_width
    }

    /// The cell at `[rank, bin, token]`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn get(&self, rank: usize, bin: usize, token: usize) -> u64 {
        assert!(rank < RANK_WIDTH && bin < self.num_bins && token < self.num_tokens);
        self.cells[self.index(rank, bin, token)]
    }

    /// All cells of one `[rank, bin]` lane across the token axis.
    ///
    /// This is the audit readout: every raw hash ever observed with the
    /// given rank and bin, at its original token position, zeros elsewhere.
    pub fn hashes_at(&self, rank: usize, bin: usize) -> Vec<u64> {
        assert!(rank < RANK_WIDTH && bin < self.num_bins);
        let start = self.index(rank, bin, 0);
        self.cells[start..start + self.num_tokens].to_vec()
    }

    /// Raw flat cells, `[rank][bin][token]` order.
    pub(crate) fn cells(&self) -> &[u64] {
        &self.cells
    }

    pub(crate) fn set(&mut self, rank: usize, bin: usize, token: usize, value: u64) {
        let index = self.index(rank, bin, token);
        self.cells[index] = value;
    }

    /// Concatenate `other` onto the token axis.
    ///
    /// A zero-width incoming slice is a no-op; when this block itself has
    /// zero width the incoming slice replaces it outright.
    pub(crate) fn append(&mut self, other: RawEvidenceBlock) {
        debug_assert_eq!(self.num_bins, other.num_bins);
        if other.num_tokens == 0 {
            return;
        }
        if self.num_tokens == 0 {
            *self = other;
            return;
        }

        let total = self.num_tokens + other.num_tokens;
        let mut cells = vec![0u64; RANK_WIDTH * self.num_bins * total];
        for rank in 0..RANK_WIDTH {
            for bin in 0..self.num_bins {
                let lane = rank * self.num_bins + bin;
                let dst = lane * total;
                let src_old = lane * self.num_tokens;
                let src_new = lane * other.num_tokens;
                cells[dst..dst + self.num_tokens]
                    .copy_from_slice(&self.cells[src_old..src_old + self.num_tokens]);
                cells[dst + self.num_tokens..dst + total]
                    .copy_from_slice(&other.cells[src_new..src_new + other.num_tokens]);
            }
        }
        self.cells = cells;
        self.num_tokens = total;
    }

    fn index(&self, rank: usize, bin: usize, token: usize) -> usize {
        (rank * self.num_bins + bin) * self.num_tokens + token
    }
}
