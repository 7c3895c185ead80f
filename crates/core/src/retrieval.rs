use crate::models::{Chunk, ScoredChunk};
use regex::{Regex, RegexBuilder};
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 3;

const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '?', '!', ';', ':', '(', ')', '"', '\''];

/// Lowercases the query, drops tokens of two characters or fewer and removes
/// punctuation from what remains.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .filter(|token| token.chars().count() > 2)
        .map(|token| token.replace(STRIPPED_PUNCTUATION, ""))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Keyword-frequency scorer over an in-memory chunk sequence.
#[derive(Debug, Clone, Copy)]
pub struct KeywordScorer {
    pub top_k: usize,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl KeywordScorer {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn retrieve(&self, query: &str, chunks: &[Chunk]) -> Vec<ScoredChunk> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let matchers = query_terms(query)
            .iter()
            .filter_map(|term| literal_matcher(term))
            .collect::<Vec<_>>();
        if matchers.is_empty() {
            return Vec::new();
        }

        let mut scored = chunks
            .iter()
            .filter_map(|chunk| {
                let score = score_text(&chunk.text, &matchers);
                (score > 0).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect::<Vec<_>>();

        // stable: equal scores keep document order
        scored.sort_by(|left, right| right.score.cmp(&left.score));
        scored.truncate(self.top_k);

        debug!(
            query,
            terms = matchers.len(),
            hits = scored.len(),
            "scored handbook chunks"
        );
        scored
    }

    pub fn retrieve_texts(&self, query: &str, chunks: &[Chunk]) -> Vec<String> {
        self.retrieve(query, chunks)
            .into_iter()
            .map(|scored| scored.chunk.text)
            .collect()
    }
}

fn literal_matcher(term: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()
}

fn score_text(text: &str, matchers: &[Regex]) -> u64 {
    matchers
        .iter()
        .map(|matcher| matcher.find_iter(text).count() as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                chunk_id: format!("chunk-{index}"),
                index,
                text: (*text).to_string(),
            })
            .collect()
    }

    #[test]
    fn query_terms_drop_short_tokens_and_punctuation() {
        assert_eq!(
            query_terms("What is the (Vacation) policy?"),
            vec!["what", "the", "vacation", "policy"]
        );
        assert!(query_terms("a an is").is_empty());
        assert!(query_terms("??? ...").is_empty());
    }

    #[test]
    fn stop_length_query_returns_nothing() {
        let scorer = KeywordScorer::default();
        assert!(scorer.retrieve("a an is", &chunks(&["a an is"])).is_empty());
    }

    #[test]
    fn empty_chunk_set_returns_nothing() {
        assert!(KeywordScorer::default().retrieve("vacation", &[]).is_empty());
    }

    #[test]
    fn results_are_ordered_by_score_and_zero_scores_dropped() {
        let scorer = KeywordScorer::default();
        let result = scorer.retrieve_texts("cat", &chunks(&["cat cat cat", "cat", "dog"]));
        assert_eq!(result, vec!["cat cat cat", "cat"]);
    }

    #[test]
    fn ties_keep_document_order() {
        let scorer = KeywordScorer::default();
        let result = scorer.retrieve_texts("leave", &chunks(&["sick leave", "dog", "Leave early"]));
        assert_eq!(result, vec!["sick leave", "Leave early"]);
    }

    #[test]
    fn at_most_top_k_chunks_are_returned() {
        let scorer = KeywordScorer::default();
        let corpus = chunks(&["bonus", "bonus bonus", "bonus", "bonus bonus bonus", "bonus"]);
        let result = scorer.retrieve("bonus", &corpus);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].score, 3);
        assert_eq!(result[1].score, 2);
        assert_eq!(result[2].chunk.index, 0);
    }

    #[test]
    fn scores_sum_across_terms_case_insensitively() {
        let scorer = KeywordScorer::default();
        let result = scorer.retrieve("Holiday schedule", &chunks(&["HOLIDAY holiday Schedule"]));
        assert_eq!(result[0].score, 3);
    }

    #[test]
    fn matches_are_substrings_without_overlap() {
        let scorer = KeywordScorer::default();
        let result = scorer.retrieve("aaa", &chunks(&["aaaaaaa", "policy"]));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].score, 2);
    }

    #[test]
    fn metacharacters_are_matched_literally() {
        let scorer = KeywordScorer::default();
        let corpus = chunks(&["we use c++ and c#", "ccccc", "[urgent] escalate"]);

        let result = scorer.retrieve_texts("c++", &corpus);
        assert_eq!(result, vec!["we use c++ and c#"]);

        let result = scorer.retrieve_texts("[urgent]", &corpus);
        assert_eq!(result, vec!["[urgent] escalate"]);
    }
}
