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

//! The tokenizer collaborator seam supplying token id sequences.
//!
//! The core consumes token id sequences and never depends on tokenizer
//! internals; real implementations wrap an external byte-pair-encoding
//! vocabulary and live outside this crate.

/// Text ↔ token id conversion as the sketch pipeline sees it.
pub trait Tokenizer {
    /// Convert text into the token id sequence a sketch is built from.
    fn encode(&self, text: &str) -> Vec<u64>;

    /// Convert a token id sequence back into text.
    fn decode(&self, token_ids: &[u64]) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::SketchStore;

    /// Whitespace tokenizer over a fixed vocabulary, enough to drive the
    /// pipeline end to end.
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

    #[test]
    fn test_encode_decode_round_trip() {
        let tokenizer = VocabTokenizer {
            vocab: vec!["the", "quick", "brown", "fox"],
        };
        let ids = tokenizer.encode("the quick brown fox");
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(tokenizer.decode(&ids), "the quick brown fox");
    }

    #[test]
    fn test_encoded_stream_drives_build() {
        let tokenizer = VocabTokenizer {
            vocab: vec!["the", "quick", "brown", "fox"],
        };
        let mut store = SketchStore::new(4).unwrap();
        let ids = tokenizer.encode("quick brown quick");
        let result = store.build(&ids);
        assert_eq!(result.sketch_id, 1);
        assert_eq!(result.token_hashes.len(), 3);
    }
}
