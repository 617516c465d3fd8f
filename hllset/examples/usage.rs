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

use hllset::entity::Entity;
use hllset::entity::estimate_rank_per_bin;
use hllset::entity::union;
use hllset::kv::MemoryKvStore;
use hllset::sketch::SketchStore;
use hllset::tokenizer::Tokenizer;

/// Whitespace tokenizer over a fixed vocabulary. A real deployment would
/// wrap an external byte-pair-encoding tokenizer behind the same trait.
struct VocabTokenizer {
    vocab: Vec<&'static str>,
}

impl Tokenizer for VocabTokenizer {
    fn encode(&self, text: &str) -> Vec<u64> {
        text.split_whitespace()
            .filter_map(|word| self.vocab.iter().position(|&v| v == word))
            .map(|index| index as u64)
            .collect()
    }

    fn decode(&self, token_ids: &[u64]) -> String {
        token_ids
            .iter()
            .filter_map(|&id| self.vocab.get(id as usize).copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn main() {
    let tokenizer = VocabTokenizer {
        vocab: vec![
            "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
        ],
    };

    // Build a sketch per document; identical documents dedup to one id.
    let mut store = SketchStore::with_default_precision();
    for text in [
        "the quick brown fox",
        "the lazy dog",
        "the quick brown fox",
    ] {
        let token_ids = tokenizer.encode(text);
        let result = store.build(&token_ids);
        println!(
            "{text:?} -> sketch id {} (digest {})",
            result.sketch_id, result.digest
        );
    }
    println!(
        "{} distinct sketches over {} tokens",
        store.registry().len(),
        store.evidence().num_tokens()
    );

    // Bind rows to identifiers and persist them through the KV seam.
    let mut kv = MemoryKvStore::new();
    let first = store.row(1).expect("row 1 was just built").to_vec();
    let second = store.row(2).expect("row 2 was just built").to_vec();
    Entity::new(first, "doc:fox").save(&mut kv).expect("save");
    Entity::new(second, "doc:dog").save(&mut kv).expect("save");

    let fox = Entity::load(&kv, "doc:fox").expect("load").expect("present");
    let dog = Entity::load(&kv, "doc:dog").expect("load").expect("present");
    let merged = union(fox.row(), dog.row()).expect("same shape");
    println!("union row: {merged:?}");

    // Recover per-bin max ranks from the raw evidence.
    let ranks = estimate_rank_per_bin(store.evidence()).expect("64-bit cells");
    println!("max rank per bin: {ranks:?}");
}
