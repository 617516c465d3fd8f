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

//! Content-addressed assignment of stable sketch identifiers.

use std::collections::HashMap;

use crate::error::Error;
use crate::sketch::SketchDigest;
use crate::sketch::SketchId;

/// The sole source of [`SketchId`] assignment: a digest → id map.
///
/// The registry is append-only. Ids are sequential counters starting at 1,
/// not derived from the digest itself, so distinct digests can never collide
/// in id space; identical digests always resolve to the same id. There is no
/// deletion and no renumbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SketchRegistry {
    ids: HashMap<SketchDigest, SketchId>,
}

impl SketchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct digests registered.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no digest has been registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Look up the id of a digest without assigning one.
    pub fn get(&self, digest: &SketchDigest) -> Option<SketchId> {
        self.ids.get(digest).copied()
    }

    /// Resolve a digest to its id, assigning the next sequential id on
    /// first sight.
    ///
    /// This is the registry's only mutating operation.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hllset::sketch::SketchDigest;
    /// # use hllset::sketch::SketchRegistry;
    /// let mut registry = SketchRegistry::new();
    /// let digest = SketchDigest::of_row(&[0u64; 16]);
    /// assert_eq!(registry.resolve_or_create(digest), 1);
    /// assert_eq!(registry.resolve_or_create(digest), 1);
    /// ```
    pub fn resolve_or_create(&mut self, digest: SketchDigest) -> SketchId {
        let next = self.ids.len() as SketchId + 1;
        *self.ids.entry(digest).or_insert(next)
    }

    /// All registered entries, ordered by id.
    ///
    /// The ordering makes serialization deterministic.
    pub fn entries(&self) -> Vec<(SketchDigest, SketchId)> {
        let mut entries: Vec<_> = self.ids.iter().map(|(d, id)| (*d, *id)).collect();
        entries.sort_by_key(|&(_, id)| id);
        entries
    }

    /// Rebuild a registry from persisted entries.
    ///
    /// Entries must carry gapless ids `1..=n` in order; anything else means
    /// the persisted map was damaged and loading fails with `CorruptState`.
    pub(crate) fn from_entries(entries: Vec<(SketchDigest, SketchId)>) -> Result<Self, Error> {
        let mut ids = HashMap::with_capacity(entries.len());
        for (position, (digest, id)) in entries.into_iter().enumerate() {
            let expected = position as SketchId + 1;
            if id != expected {
                return Err(Error::corrupt("digest map ids must be gapless from 1")
                    .with_context("expected", expected)
                    .with_context("actual", id));
            }
            if ids.insert(digest, id).is_some() {
                return Err(Error::corrupt("digest map contains a duplicate digest")
                    .with_context("digest", digest));
            }
        }
        Ok(Self { ids })
    }
}
