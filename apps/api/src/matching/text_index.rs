//! Character n-gram TF–IDF index over case experience texts.
//!
//! Tokenization pads every whitespace-separated word with a space on each side and
//! takes n-grams (2..=4 chars) inside each padded word. IDF is smoothed
//! (`ln((1 + n) / (1 + df)) + 1`) and vectors are L2-normalized, so cosine
//! similarity is a plain dot product. The index is built once per corpus load and
//! never mutated afterwards.

use std::collections::HashMap;

use crate::matching::similarity::NEUTRAL;

const MIN_N: usize = 2;
const MAX_N: usize = 4;
const MAX_FEATURES: usize = 1000;

/// Sparse L2-normalized vector, sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector(Vec<(u32, f64)>);

impl SparseVector {
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.0.len() && j < other.0.len() {
            let (a_id, a_w) = self.0[i];
            let (b_id, b_w) = other.0[j];
            match a_id.cmp(&b_id) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Splits lowercased text into word-bounded character n-grams.
fn char_ngrams(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut grams = Vec::new();

    for word in lowered.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();

        for n in MIN_N..=MAX_N {
            if padded.len() <= n {
                // Word no longer than n: counted once as a whole.
                grams.push(padded.iter().collect());
                break;
            }
            for window in padded.windows(n) {
                grams.push(window.iter().collect());
            }
        }
    }

    grams
}

fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for gram in char_ngrams(text) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone)]
pub struct TextIndex {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
    /// One entry per corpus document; `None` when the document had no text.
    documents: Vec<Option<SparseVector>>,
}

impl TextIndex {
    /// Fits the vocabulary and IDF weights over `texts` and vectorizes each one.
    /// Returns `None` when every text is blank.
    pub fn fit<S: AsRef<str>>(texts: &[S]) -> Option<Self> {
        if texts.iter().all(|t| t.as_ref().trim().is_empty()) {
            return None;
        }

        let doc_counts: Vec<HashMap<String, u32>> =
            texts.iter().map(|t| term_counts(t.as_ref())).collect();

        let mut corpus_freq: HashMap<&str, u64> = HashMap::new();
        let mut doc_freq: HashMap<&str, u32> = HashMap::new();
        for counts in &doc_counts {
            for (gram, count) in counts {
                *corpus_freq.entry(gram.as_str()).or_insert(0) += u64::from(*count);
                *doc_freq.entry(gram.as_str()).or_insert(0) += 1;
            }
        }

        // Keep the most frequent n-grams; ties broken lexically so the vocabulary is stable.
        let mut ranked: Vec<(&str, u64)> = corpus_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(MAX_FEATURES);
        let mut terms: Vec<&str> = ranked.into_iter().map(|(gram, _)| gram).collect();
        terms.sort_unstable();

        let n_docs = texts.len() as f64;
        let idf: Vec<f64> = terms
            .iter()
            .map(|term| {
                let df = f64::from(doc_freq.get(term).copied().unwrap_or(0));
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary: HashMap<String, u32> = terms
            .iter()
            .enumerate()
            .map(|(id, term)| ((*term).to_string(), id as u32))
            .collect();

        let mut index = Self {
            vocabulary,
            idf,
            documents: Vec::new(),
        };
        index.documents = texts
            .iter()
            .zip(&doc_counts)
            .map(|(text, counts)| {
                if text.as_ref().trim().is_empty() {
                    None
                } else {
                    Some(index.vectorize(counts))
                }
            })
            .collect();

        Some(index)
    }

    fn vectorize(&self, counts: &HashMap<String, u32>) -> SparseVector {
        let mut entries: Vec<(u32, f64)> = counts
            .iter()
            .filter_map(|(gram, count)| {
                self.vocabulary
                    .get(gram)
                    .map(|id| (*id, f64::from(*count) * self.idf[*id as usize]))
            })
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        SparseVector(entries)
    }

    /// Vectorizes query text against the fitted vocabulary.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize(&term_counts(text))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Cosine similarity between a query vector and document `doc`.
    /// Blank or unknown documents score `NEUTRAL`.
    pub fn similarity(&self, query: &SparseVector, doc: usize) -> f64 {
        match self.documents.get(doc) {
            Some(Some(vector)) => query.dot(vector).clamp(0.0, 1.0),
            _ => NEUTRAL,
        }
    }
}
