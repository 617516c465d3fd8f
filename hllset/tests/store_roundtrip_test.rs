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

use hllset::error::ErrorKind;
use hllset::sketch::REGISTER_TABLE_BLOB;
use hllset::sketch::SketchStore;
use hllset::sketch::TOKEN_HASH_LOG_BLOB;

fn populated_store() -> SketchStore {
    let mut store = SketchStore::new(4).unwrap();
    store.build(&[0, 2, 11]);
    store.build(&[1164]);
    store.build(&[2, 2, 0]);
    store
}

#[test]
fn test_blob_round_trip_is_bit_exact() {
    let store = populated_store();
    let [(_, digest_map), (_, token_log), (_, table), (_, evidence)] = store.to_blobs();
    let loaded = SketchStore::from_blobs(
        4,
        Some(&digest_map),
        Some(&token_log),
        Some(&table),
        Some(&evidence),
    )
    .unwrap();
    assert_eq!(loaded, store);

    // re-serializing the loaded store reproduces identical bytes
    let [(_, digest_map2), (_, token_log2), (_, table2), (_, evidence2)] = loaded.to_blobs();
    assert_eq!(digest_map2, digest_map);
    assert_eq!(token_log2, token_log);
    assert_eq!(table2, table);
    assert_eq!(evidence2, evidence);
}

#[test]
fn test_empty_store_round_trip() {
    let store = SketchStore::new(4).unwrap();
    let [(_, a), (_, b), (_, c), (_, d)] = store.to_blobs();
    let loaded = SketchStore::from_blobs(4, Some(&a), Some(&b), Some(&c), Some(&d)).unwrap();
    assert_eq!(loaded, store);
}

#[test]
fn test_absent_blobs_start_empty() {
    let store = SketchStore::from_blobs(4, None, None, None, None).unwrap();
    assert!(store.registry().is_empty());
    assert!(store.token_log().is_empty());
    assert_eq!(store.num_rows(), 0);
    assert_eq!(store.evidence().num_tokens(), 0);
}

#[test]
fn test_loaded_store_continues_id_assignment() {
    let store = populated_store();
    let [(_, a), (_, b), (_, c), (_, d)] = store.to_blobs();
    let mut loaded =
        SketchStore::from_blobs(4, Some(&a), Some(&b), Some(&c), Some(&d)).unwrap();

    // a known digest still resolves to its old id
    assert_eq!(loaded.build(&[0, 2, 11]).sketch_id, 1);
    // a fresh digest gets the next id after the three loaded ones
    assert_eq!(loaded.build(&[467]).sketch_id, 4);
}

#[test]
fn test_dir_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sketches");
    let store = populated_store();
    store.save_to_dir(&path).unwrap();

    let loaded = SketchStore::load_from_dir(&path, 4).unwrap();
    assert_eq!(loaded, store);
}

#[test]
fn test_load_from_missing_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = SketchStore::load_from_dir(&dir.path().join("never-written"), 4).unwrap();
    assert!(store.registry().is_empty());
    assert_eq!(store.num_rows(), 0);
}

#[test]
fn test_absent_token_log_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sketches");
    let store = populated_store();
    store.save_to_dir(&path).unwrap();
    std::fs::remove_file(path.join(TOKEN_HASH_LOG_BLOB)).unwrap();

    let loaded = SketchStore::load_from_dir(&path, 4).unwrap();
    assert!(loaded.token_log().is_empty());
    assert_eq!(loaded.registry().len(), store.registry().len());
}

#[test]
fn test_missing_register_table_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sketches");
    populated_store().save_to_dir(&path).unwrap();
    std::fs::remove_file(path.join(REGISTER_TABLE_BLOB)).unwrap();

    let err = SketchStore::load_from_dir(&path, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptState);
}

#[test]
fn test_precision_mismatch_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sketches");
    populated_store().save_to_dir(&path).unwrap();

    let err = SketchStore::load_from_dir(&path, 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptState);
}

#[test]
fn test_truncated_blob_is_corrupt() {
    let store = populated_store();
    let [_, _, (_, table), _] = store.to_blobs();
    let truncated = &table[..table.len() - 3];
    let err = SketchStore::from_blobs(4, None, None, Some(truncated), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptState);
}
