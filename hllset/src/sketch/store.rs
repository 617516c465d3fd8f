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

//! The owned store holding every persisted sketch structure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Error;
use crate::sketch::BuildResult;
use crate::sketch::MAX_PRECISION;
use crate::sketch::MIN_PRECISION;
use crate::sketch::RawEvidenceBlock;
use crate::sketch::SketchId;
use crate::sketch::SketchRegistry;
use crate::sketch::TokenHash;
use crate::sketch::builder::Candidate;
use crate::sketch::serialization::decode_digest_map;
use crate::sketch::serialization::decode_raw_evidence;
use crate::sketch::serialization::decode_register_table;
use crate::sketch::serialization::decode_token_log;
use crate::sketch::serialization::encode_digest_map;
use crate::sketch::serialization::encode_raw_evidence;
use crate::sketch::serialization::encode_register_table;
use crate::sketch::serialization::encode_token_log;

/// Blob name of the persisted digest → id map.
pub const DIGEST_MAP_BLOB: &str = "sketch_digest_map";
/// Blob name of the persisted token-hash log.
pub const TOKEN_HASH_LOG_BLOB: &str = "token_hash_log";
/// Blob name of the persisted register table.
pub const REGISTER_TABLE_BLOB: &str = "register_table";
/// Blob name of the persisted raw evidence block.
pub const RAW_EVIDENCE_BLOB: &str = "raw_evidence";

/// The single handle owning all four persisted structures: the digest
/// registry, the token-hash log of the most recent document, the register
/// table, and the raw evidence block.
///
/// Every mutating operation takes `&mut self`, so exclusive access is a
/// compile-time property; callers parallelizing construction across
/// documents must serialize access to one store (or partition work across
/// stores and merge rows afterwards).
///
/// # Usage
///
/// ```rust
/// # use hllset::sketch::SketchStore;
/// let mut store = SketchStore::with_default_precision();
/// let result = store.build(&[0, 2, 11]);
/// assert_eq!(result.sketch_id, 1);
/// assert_eq!(store.num_rows(), 1);
/// assert_eq!(store.evidence().num_tokens(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchStore {
    precision: u8,
    num_bins: usize,
    registry: SketchRegistry,
    token_log: Vec<TokenHash>,
    /// Register table cells, row-major with stride `num_bins`.
    registers: Vec<u64>,
    num_rows: usize,
    evidence: RawEvidenceBlock,
}

fn bins_for_precision(precision: u8) -> Result<usize, Error> {
    if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        return Err(Error::invalid_input(format!(
            "precision must be in {MIN_PRECISION}..={MAX_PRECISION}, got {precision}"
        )));
    }
    Ok(1usize << precision)
}

impl SketchStore {
    /// Create an empty store with the given precision parameter.
    ///
    /// Fails with `InvalidInput` if `precision` is outside
    /// [`MIN_PRECISION`]`..=`[`MAX_PRECISION`].
    pub fn new(precision: u8) -> Result<Self, Error> {
        let num_bins = bins_for_precision(precision)?;
        Ok(Self {
            precision,
            num_bins,
            registry: SketchRegistry::new(),
            token_log: Vec::new(),
            registers: Vec::new(),
            num_rows: 0,
            evidence: RawEvidenceBlock::new(num_bins),
        })
    }

    /// Create an empty store with the default precision
    /// ([`crate::sketch::DEFAULT_PRECISION`], 16 bins).
    pub fn with_default_precision() -> Self {
        // default precision is always in range
        Self::new(crate::sketch::DEFAULT_PRECISION).unwrap_or_else(|_| unreachable!())
    }

    /// The configured precision parameter.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Number of bins per register row (`2^precision`).
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Number of rows in the register table, equal to the highest assigned
    /// sketch id.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// The digest registry.
    pub fn registry(&self) -> &SketchRegistry {
        &self.registry
    }

    /// The token-hash log of the most recently built document.
    pub fn token_log(&self) -> &[TokenHash] {
        &self.token_log
    }

    /// The raw evidence block accumulated across all builds.
    pub fn evidence(&self) -> &RawEvidenceBlock {
        &self.evidence
    }

    /// The register row for a sketch id, or `None` for an unassigned id.
    pub fn row(&self, id: SketchId) -> Option<&[u64]> {
        if id == 0 || id as usize > self.num_rows {
            return None;
        }
        let start = (id as usize - 1) * self.num_bins;
        Some(&self.registers[start..start + self.num_bins])
    }

    /// Build the sketch for one document's token stream and commit it.
    ///
    /// The candidate row, evidence slice, and replacement token-hash log
    /// are fully constructed before the first mutation, then committed
    /// together: the log is overwritten, the digest resolved to an id
    /// (assigning the next sequential id on first sight), the register
    /// table grown with zero rows up to the id, the candidate OR-merged
    /// into the id's row, and the evidence slice appended along the token
    /// axis. Building is deterministic: the same tokens against the same
    /// prior state yield the same digest, id, and rows.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hllset::sketch::SketchStore;
    /// let mut store = SketchStore::new(4).unwrap();
    /// let result = store.build(&[5, 5, 7]);
    /// assert_eq!(result.sketch_id, 1);
    /// assert_eq!(result.token_hashes.len(), 3);
    /// ```
    pub fn build(&mut self, token_ids: &[u64]) -> BuildResult {
        let Candidate {
            row,
            evidence,
            log,
            digest,
        } = Candidate::from_tokens(self.precision, token_ids);
        let token_hashes = log.iter().map(|entry| entry.hash).collect();

        let sketch_id = self.registry.resolve_or_create(digest);
        self.token_log = log;
        self.grow_rows_to(sketch_id as usize);
        let start = (sketch_id as usize - 1) * self.num_bins;
        for (cell, candidate) in self.registers[start..start + self.num_bins].iter_mut().zip(&row) {
            *cell |= *candidate;
        }
        self.evidence.append(evidence);

        BuildResult {
            digest,
            sketch_id,
            token_hashes,
        }
    }

    fn grow_rows_to(&mut self, rows: usize) {
        if rows > self.num_rows {
            self.registers.resize(rows * self.num_bins, 0);
            self.num_rows = rows;
        }
    }

    /// Serialize every structure to its named blob.
    ///
    /// The four names form the fixed persisted layout; each blob is
    /// independently decodable by [`SketchStore::from_blobs`].
    pub fn to_blobs(&self) -> [(&'static str, Vec<u8>); 4] {
        [
            (DIGEST_MAP_BLOB, encode_digest_map(&self.registry)),
            (TOKEN_HASH_LOG_BLOB, encode_token_log(&self.token_log)),
            (
                REGISTER_TABLE_BLOB,
                encode_register_table(self.num_bins, self.num_rows, &self.registers),
            ),
            (RAW_EVIDENCE_BLOB, encode_raw_evidence(&self.evidence)),
        ]
    }

    /// Reassemble a store from persisted blobs.
    ///
    /// Any absent blob starts its structure empty; that is the normal
    /// first-run state, not an error. Present blobs must decode cleanly
    /// and agree with each other: a register table shorter than the digest
    /// map's highest id, or a bin count differing from `2^precision`,
    /// fails with `CorruptState` rather than guessing.
    pub fn from_blobs(
        precision: u8,
        digest_map: Option<&[u8]>,
        token_hash_log: Option<&[u8]>,
        register_table: Option<&[u8]>,
        raw_evidence: Option<&[u8]>,
    ) -> Result<Self, Error> {
        let num_bins = bins_for_precision(precision)?;

        let registry = match digest_map {
            Some(bytes) => decode_digest_map(bytes)?,
            None => SketchRegistry::new(),
        };
        let token_log = match token_hash_log {
            Some(bytes) => decode_token_log(bytes)?,
            None => Vec::new(),
        };
        let (table_bins, num_rows, registers) = match register_table {
            Some(bytes) => decode_register_table(bytes)?,
            None => (num_bins, 0, Vec::new()),
        };
        let evidence = match raw_evidence {
            Some(bytes) => decode_raw_evidence(bytes)?,
            None => RawEvidenceBlock::new(num_bins),
        };

        if table_bins != num_bins {
            return Err(Error::corrupt("register table bin count does not match precision")
                .with_context("expected", num_bins)
                .with_context("actual", table_bins));
        }
        if evidence.num_bins() != num_bins {
            return Err(Error::corrupt("evidence bin count does not match precision")
                .with_context("expected", num_bins)
                .with_context("actual", evidence.num_bins()));
        }
        if registry_exceeds_table(&registry, num_rows) {
            return Err(
                Error::corrupt("register table shorter than the digest map's highest id")
                    .with_context("rows", num_rows)
                    .with_context("max_id", registry.len()),
            );
        }

        Ok(Self {
            precision,
            num_bins,
            registry,
            token_log,
            registers,
            num_rows,
            evidence,
        })
    }

    /// Write the four named blobs as files in a directory.
    ///
    /// The directory is created if missing. Filesystem failures surface as
    /// `PersistenceUnavailable` and are not retried.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), Error> {
        fs::create_dir_all(dir).map_err(|err| {
            Error::persistence(format!("cannot create store directory: {err}"))
                .with_context("path", dir.display())
        })?;
        for (name, bytes) in self.to_blobs() {
            fs::write(dir.join(name), &bytes).map_err(|err| {
                Error::persistence(format!("cannot write blob: {err}")).with_context("blob", name)
            })?;
        }
        Ok(())
    }

    /// Load a store from a directory written by [`SketchStore::save_to_dir`].
    ///
    /// Absent files start the corresponding structure empty, so loading
    /// from an empty or missing directory yields an empty store.
    pub fn load_from_dir(dir: &Path, precision: u8) -> Result<Self, Error> {
        fn read_blob(dir: &Path, name: &'static str) -> Result<Option<Vec<u8>>, Error> {
            match fs::read(dir.join(name)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(Error::persistence(format!("cannot read blob: {err}"))
                    .with_context("blob", name)),
            }
        }

        let digest_map = read_blob(dir, DIGEST_MAP_BLOB)?;
        let token_hash_log = read_blob(dir, TOKEN_HASH_LOG_BLOB)?;
        let register_table = read_blob(dir, REGISTER_TABLE_BLOB)?;
        let raw_evidence = read_blob(dir, RAW_EVIDENCE_BLOB)?;
        Self::from_blobs(
            precision,
            digest_map.as_deref(),
            token_hash_log.as_deref(),
            register_table.as_deref(),
            raw_evidence.as_deref(),
        )
    }
}

fn registry_exceeds_table(registry: &SketchRegistry, num_rows: usize) -> bool {
    // ids are gapless from 1, so the highest id equals the entry count
    registry.len() > num_rows
}
