//! Text normalization.
//!
//! Canonicalizes raw note/idea text into a stable token stream: lowercase,
//! punctuation stripped, domain stopwords removed (tenor tokens like `3m`
//! or `10y` are always kept), and synonym/acronym substitution applied
//! longest-match-first so multi-word surface forms win over single tokens.
//! Pure and deterministic: identical input always yields identical output.

use crate::taxonomy::TaxonomySnapshot;

/// Generic tokens that carry no desk signal. Short domain tokens (KI, KO,
/// RR, FX) survive because they are not listed here.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "for", "of", "on", "in", "with", "at", "by", "from",
    "is", "are", "be", "that", "this", "it", "as", "we", "they", "client", "pm", "desk",
];

/// Split text into lowercase tokens over the `[a-z0-9_+\-/]` alphabet.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '-' | '/') {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Numeric tenor tokens (`3m`, `10y`, `6m`, `2w`, `30d`) are preserved
/// even when they collide with stopword or length filters.
pub fn is_tenor_token(token: &str) -> bool {
    if token.len() < 2 {
        return false;
    }
    let (digits, unit) = token.split_at(token.len() - 1);
    matches!(unit, "d" | "w" | "m" | "y") && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Synonym-aware text normalizer. Construct once per taxonomy snapshot and
/// reuse; it holds no mutable state.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Surface token sequence -> canonical token sequence, longest surface
    /// first so phrase matches beat single-token matches.
    phrases: Vec<(Vec<String>, Vec<String>)>,
}

impl Normalizer {
    pub fn new(synonym_pairs: &[(String, String)]) -> Self {
        let mut phrases: Vec<(Vec<String>, Vec<String>)> = synonym_pairs
            .iter()
            .filter_map(|(surface, canonical)| {
                let surface_tokens = tokenize(surface);
                if surface_tokens.is_empty() {
                    return None;
                }
                Some((surface_tokens, tokenize(canonical)))
            })
            .collect();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        phrases.dedup_by(|a, b| a.0 == b.0);
        Self { phrases }
    }

    pub fn from_taxonomy(snapshot: &TaxonomySnapshot) -> Self {
        Self::new(&snapshot.synonym_pairs())
    }

    /// Normalize into a token list.
    pub fn normalize_tokens(&self, text: &str) -> Vec<String> {
        let replaced = self.replace_phrases(tokenize(text));
        replaced
            .into_iter()
            .filter(|tok| {
                if is_tenor_token(tok) {
                    return true;
                }
                if is_stopword(tok) {
                    return false;
                }
                tok.len() > 1 || tok.bytes().all(|b| b.is_ascii_digit())
            })
            .collect()
    }

    /// Normalize into canonical text. Idempotent:
    /// `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, text: &str) -> String {
        self.normalize_tokens(text).join(" ")
    }

    fn replace_phrases(&self, tokens: Vec<String>) -> Vec<String> {
        if self.phrases.is_empty() {
            return tokens;
        }
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let mut matched = false;
            for (surface, canonical) in &self.phrases {
                let end = i + surface.len();
                if end <= tokens.len() && tokens[i..end] == surface[..] {
                    out.extend(canonical.iter().cloned());
                    i = end;
                    matched = true;
                    break;
                }
            }
            if !matched {
                out.push(tokens[i].clone());
                i += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::default_snapshot;

    fn normalizer() -> Normalizer {
        Normalizer::from_taxonomy(&default_snapshot())
    }

    #[test]
    fn applies_domain_synonyms() {
        let n = normalizer();
        let out = n.normalize("Client likes KI structures in 3m NDF around cb meetings");
        assert!(out.contains("knock-in"));
        assert!(out.contains("3m"));
        assert!(out.contains("central-bank"));
        assert!(!out.contains("client"));
    }

    #[test]
    fn removes_generic_noise_but_keeps_tenors() {
        let n = Normalizer::default();
        let out = n.normalize("The client and the PM are in discussion for this 6m idea");
        assert!(!out.contains("client"));
        assert!(!out.contains("pm"));
        assert!(out.contains("discussion"));
        assert!(out.contains("6m"));
    }

    #[test]
    fn multi_word_phrase_wins_over_single_token() {
        let n = normalizer();
        // "knock out" must be replaced as a phrase, not left as "knock" + "out".
        let out = n.normalize("looking at knock out pricing");
        assert!(out.contains("knock-out"));
        assert!(!out.split_whitespace().any(|t| t == "knock"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let n = normalizer();
        let inputs = [
            "Client likes KI KO RR structures",
            "3m EURUSD digital around ECB, dual digital too",
            "",
            "   ",
            "The PM hedges 10y exposure",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn tenor_tokens_recognized() {
        assert!(is_tenor_token("3m"));
        assert!(is_tenor_token("10y"));
        assert!(is_tenor_token("2w"));
        assert!(is_tenor_token("30d"));
        assert!(!is_tenor_token("m"));
        assert!(!is_tenor_token("3x"));
        assert!(!is_tenor_token("abc"));
    }

    #[test]
    fn empty_and_whitespace_input_yield_empty_output() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \t\n"), "");
    }
}
