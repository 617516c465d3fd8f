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

//! Named persistable sketch handles and set algebra over register rows.
//!
//! An [`Entity`] binds an owned copy of one register row to an external
//! identifier for persistence through a [`KeyValueStore`]. Entities never
//! alias store internals; set-algebra functions return new rows rather
//! than mutating their inputs.
//!
//! # Usage
//!
//! ```rust
//! # use hllset::entity::Entity;
//! # use hllset::kv::MemoryKvStore;
//! # use hllset::sketch::SketchStore;
//! let mut store = SketchStore::new(4).unwrap();
//! let result = store.build(&[0, 2, 11]);
//! let row = store.row(result.sketch_id).unwrap().to_vec();
//!
//! let mut kv = MemoryKvStore::new();
//! Entity::new(row, "doc-1").save(&mut kv).unwrap();
//! let loaded = Entity::load(&kv, "doc-1").unwrap().unwrap();
//! assert_eq!(loaded.row(), store.row(result.sketch_id).unwrap());
//! assert!(Entity::load(&kv, "doc-2").unwrap().is_none());
//! ```

use crate::error::Error;
use crate::kv::KeyValueStore;
use crate::sketch::CELL_WIDTH_BYTES;
use crate::sketch::RANK_WIDTH;
use crate::sketch::RawEvidenceBlock;
use crate::sketch::serialization::decode_register_row;
use crate::sketch::serialization::encode_register_row;

/// A named handle binding one register row to an external identifier.
///
/// References to other entities form a non-owning association graph and
/// are modeled as identifiers (adjacency by id) rather than direct
/// cross-references. They are process-local metadata: persistence stores
/// only the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    row: Vec<u64>,
    identifier: String,
    references: Vec<String>,
}

impl Entity {
    /// Bind a register row to an external identifier.
    pub fn new(row: Vec<u64>, identifier: impl Into<String>) -> Self {
        Self {
            row,
            identifier: identifier.into(),
            references: Vec::new(),
        }
    }

    /// The bound register row.
    pub fn row(&self) -> &[u64] {
        &self.row
    }

    /// The external identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identifiers of referenced entities, in insertion order.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Append a non-owning association to another entity.
    ///
    /// No cycle detection is performed and no ownership is implied; the
    /// association records the other entity's identifier only.
    pub fn add_reference(&mut self, other: &Entity) {
        self.references.push(other.identifier.clone());
    }

    /// Persist the row under this entity's identifier.
    ///
    /// Transport failures surface as `PersistenceUnavailable`; the caller
    /// decides whether to retry.
    pub fn save(&self, kv: &mut dyn KeyValueStore) -> Result<(), Error> {
        kv.set(&self.identifier, &encode_register_row(&self.row))
    }

    /// Retrieve the entity persisted under `identifier`.
    ///
    /// Returns `Ok(None)` when the key is absent; a present but malformed
    /// payload fails with `CorruptState`.
    pub fn load(kv: &dyn KeyValueStore, identifier: &str) -> Result<Option<Entity>, Error> {
        let Some(bytes) = kv.get(identifier)? else {
            return Ok(None);
        };
        let row = decode_register_row(&bytes)?;
        Ok(Some(Entity::new(row, identifier)))
    }
}

fn check_shape(left: &[u64], right: &[u64]) -> Result<(), Error> {
    if left.len() != right.len() {
        return Err(Error::shape_mismatch(left.len(), right.len()));
    }
    Ok(())
}

/// Element-wise union (bitwise OR) of two register rows.
///
/// Returns a new row; fails with `ShapeMismatch` when the rows differ in
/// length.
///
/// # Examples
///
/// ```
/// # use hllset::entity::union;
/// let merged = union(&[1, 2], &[2, 4]).unwrap();
/// assert_eq!(merged, vec![3, 6]);
/// ```
pub fn union(left: &[u64], right: &[u64]) -> Result<Vec<u64>, Error> {
    check_shape(left, right)?;
    Ok(left.iter().zip(right).map(|(a, b)| a | b).collect())
}

/// Element-wise intersection (bitwise AND) of two register rows.
///
/// Returns a new row; fails with `ShapeMismatch` when the rows differ in
/// length.
pub fn intersection(left: &[u64], right: &[u64]) -> Result<Vec<u64>, Error> {
    check_shape(left, right)?;
    Ok(left.iter().zip(right).map(|(a, b)| a & b).collect())
}

/// Recover, per bin, the highest rank any raw evidence cell supports.
///
/// For each bin the scan walks every rank slice and token position and
/// takes the maximum trailing-zero count over nonzero cells. That count is
/// the position of the first set bit in the bit-reversed 64-bit cell, and
/// for a stored hash it is exactly the rank the hash was filed under. This
/// recovers a max-rank estimate from raw evidence independently of the
/// OR-accumulated register row.
///
/// Fails with `TypeMismatch` when the block's recorded cell width is not
/// 64-bit.
pub fn estimate_rank_per_bin(block: &RawEvidenceBlock) -> Result<Vec<u32>, Error> {
    if block.cell_width() != CELL_WIDTH_BYTES {
        return Err(Error::type_mismatch(CELL_WIDTH_BYTES, block.cell_width()));
    }

    let mut ranks = vec![0u32; block.num_bins()];
    for bin in 0..block.num_bins() {
        for rank in 0..RANK_WIDTH {
            for token in 0..block.num_tokens() {
                let cell = block.get(rank, bin, token);
                if cell != 0 {
                    ranks[bin] = ranks[bin].max(cell.trailing_zeros());
                }
            }
        }
    }
    Ok(ranks)
}
