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

//! # HllSet Token Sketch Library
//!
//! This library builds and persists approximate-cardinality sketches
//! (HyperLogLog-style register rows) over streams of already-tokenized
//! identifiers. Whole sketches are deduplicated by content digest into a
//! stable integer identifier space, the raw per-token hash evidence is
//! retained for audit reconstruction, and persisted sketches support union,
//! intersection, and per-bin max-rank extraction.
//!
//! The library is divided into modules that constitute distinct groups of
//! functionality:
//!
//! - [`hash`]: deterministic token hashing and bin/rank extraction
//! - [`sketch`]: sketch construction, the digest registry, and the owned
//!   store holding all persisted structures
//! - [`entity`]: named persistable sketch handles and set algebra
//! - [`kv`]: the key-value collaborator seam used by entity persistence
//! - [`tokenizer`]: the tokenizer collaborator seam supplying token ids
//! - [`error`]: the error type shared by all fallible operations

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod entity;
pub mod error;
pub mod hash;
pub mod kv;
pub mod sketch;
pub mod tokenizer;
