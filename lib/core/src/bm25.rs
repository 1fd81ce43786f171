//! Per-run BM25 lexical scoring.
//!
//! The corpus is the candidate set of the current ranking run, rebuilt
//! per invocation; raw BM25 magnitudes are corpus-relative, so scores are
//! min-max scaled into `[0, 1]` over that run's candidate set rather than
//! against any absolute scale.

use ahash::AHashMap;

use crate::normalize::tokenize;

/// BM25 over one run's candidate documents.
#[derive(Debug, Clone)]
pub struct Bm25Corpus {
    // doc index -> term -> term frequency
    doc_term_freqs: Vec<AHashMap<String, u32>>,
    doc_lengths: Vec<u32>,
    // term -> document frequency
    term_dfs: AHashMap<String, u32>,
    avgdl: f32,
    k1: f32, // term frequency saturation parameter
    b: f32,  // length normalization parameter
}

impl Bm25Corpus {
    pub fn from_documents<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut doc_term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut term_dfs: AHashMap<String, u32> = AHashMap::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            let mut freqs: AHashMap<String, u32> = AHashMap::new();
            for token in &tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *term_dfs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lengths.push(tokens.len() as u32);
            doc_term_freqs.push(freqs);
        }

        let total: u32 = doc_lengths.iter().sum();
        let avgdl = if doc_lengths.is_empty() {
            0.0
        } else {
            total as f32 / doc_lengths.len() as f32
        };

        Self { doc_term_freqs, doc_lengths, term_dfs, avgdl, k1: 1.5, b: 0.75 }
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Raw (unscaled) BM25 relevance of every document against the query,
    /// in document order. Empty query or all-empty corpus yields zeros.
    pub fn raw_scores(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_term_freqs.len()];
        if self.doc_term_freqs.is_empty() || self.avgdl <= 0.0 {
            return scores;
        }
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return scores;
        }
        let total_docs = self.doc_term_freqs.len() as f32;

        for term in &query_terms {
            let df = self.term_dfs.get(term).copied().unwrap_or(0) as f32;
            if df <= 0.0 {
                continue;
            }
            let idf = ((total_docs - df + 0.5) / (df + 0.5)).ln().max(0.0);
            for (idx, freqs) in self.doc_term_freqs.iter().enumerate() {
                if let Some(&tf) = freqs.get(term) {
                    scores[idx] += self.score_term(tf, self.doc_lengths[idx], idf);
                }
            }
        }
        scores
    }

    /// Per-run `[0, 1]` lexical scores: raw BM25 min-max scaled over the
    /// candidate set.
    pub fn scaled_scores(&self, query: &str) -> Vec<f32> {
        min_max_scale(&self.raw_scores(query))
    }

    fn score_term(&self, tf: u32, doc_len: u32, idf: f32) -> f32 {
        let tf = tf as f32;
        let doc_len = doc_len as f32;
        // idf * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * (doc_len / avgdl)))
        let numerator = tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_len / self.avgdl));
        idf * (numerator / denominator)
    }
}

/// Min-max scale into `[0, 1]`. A degenerate spread collapses to all-0.0
/// when nothing scored above zero, else all-1.0.
pub fn min_max_scale(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max - min < 1e-9 {
        let fill = if max <= 0.0 { 0.0 } else { 1.0 };
        return vec![fill; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Terms appearing in both query and document, ranked by term-frequency
/// overlap (query tf x doc tf) descending, ties alphabetical, capped at
/// `k`. Used for explanation payloads.
pub fn top_overlap_terms(query: &str, document: &str, k: usize) -> Vec<String> {
    let query_tokens = tokenize(query);
    let doc_tokens = tokenize(document);
    if query_tokens.is_empty() || doc_tokens.is_empty() {
        return Vec::new();
    }
    let mut q_counts: AHashMap<&str, u32> = AHashMap::new();
    for tok in &query_tokens {
        *q_counts.entry(tok).or_insert(0) += 1;
    }
    let mut d_counts: AHashMap<&str, u32> = AHashMap::new();
    for tok in &doc_tokens {
        *d_counts.entry(tok).or_insert(0) += 1;
    }

    let mut overlap: Vec<(String, u32)> = q_counts
        .iter()
        .filter_map(|(term, qtf)| d_counts.get(term).map(|dtf| ((*term).to_string(), qtf * dtf)))
        .collect();
    overlap.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    overlap.truncate(k);
    overlap.into_iter().map(|(term, _)| term).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_document_outscores_unrelated() {
        let docs = vec![
            "eurusd knock-out hedging around central-bank event".to_string(),
            "copper miners dividend equity basket".to_string(),
            "eurusd forward points".to_string(),
        ];
        let corpus = Bm25Corpus::from_documents(&docs);
        let scores = corpus.scaled_scores("eurusd knock-out hedging");
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn empty_query_scores_all_zero() {
        let corpus = Bm25Corpus::from_documents(&["some document".to_string()]);
        assert_eq!(corpus.scaled_scores(""), vec![0.0]);
    }

    #[test]
    fn empty_corpus_yields_empty_scores() {
        let corpus = Bm25Corpus::from_documents::<String>(&[]);
        assert!(corpus.is_empty());
        assert!(corpus.scaled_scores("anything").is_empty());
    }

    #[test]
    fn degenerate_spread_collapses_deterministically() {
        assert_eq!(min_max_scale(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(min_max_scale(&[2.5, 2.5]), vec![1.0, 1.0]);
        assert_eq!(min_max_scale(&[]), Vec::<f32>::new());
    }

    #[test]
    fn top_overlap_terms_ranks_by_joint_frequency() {
        let terms = top_overlap_terms(
            "eurusd eurusd digital event",
            "eurusd digital eurusd pricing digital digital",
            2,
        );
        // eurusd: 2x2=4, digital: 1x3=3
        assert_eq!(terms, vec!["eurusd".to_string(), "digital".to_string()]);
    }

    #[test]
    fn top_overlap_terms_cap_and_tie_order() {
        let terms = top_overlap_terms("b a c", "a b c", 2);
        assert_eq!(terms, vec!["a".to_string(), "b".to_string()]);
    }
}
