//! Text normalizer: scraped-text cleanup, normalization, Indonesian-aware
//! tokenization, and memoized stemming.
//!
//! Pipeline per review: `clean_scraped` → `normalize` → `tokenize` → `stem`.
//! The stem cache is an explicit object handed in by reference; a cold, warm
//! or absent cache always produces the same stems.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::lexicon::Lexicon;

/// Everything that is neither a word character, whitespace, hyphen, nor emoji.
static STRIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[^\w\s\-\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0F}\x{200D}]",
    )
    .expect("strip regex")
});
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static HYPHEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("hyphen regex"));
/// Words, keeping hyphenated compounds (`benar-benar`) whole.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\w+(?:-\w+)*").expect("tokenizer regex"));
/// Informal reduplication shorthand: `baik2` for `baik-baik`.
static REDUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\p{Alphabetic}{2,})2$").expect("reduplication regex"));
/// Enclitics sometimes written hyphenated (`seller-nya`).
const CLITICS: &[&str] = &["nya", "ku", "mu", "lah", "kah", "pun"];

/// Derived per-review text; `tokens` and `stems` are index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub normalized: String,
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Append-only memo of `token → stem`, safe to share across threads.
#[derive(Debug, Default)]
pub struct StemCache {
    inner: RwLock<HashMap<String, String>>,
}

impl StemCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<F>(&self, token: &str, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        {
            let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = guard.get(token) {
                return hit.clone();
            }
        }
        let stem = compute();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(token.to_string())
            .or_insert_with(|| stem.clone());
        stem
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Decode HTML entities and drop stray tags left over from DOM scraping.
pub fn clean_scraped(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    TAG_RE.replace_all(&decoded, " ").into_owned()
}

/// Lowercase, strip everything but word characters, whitespace, emoji and
/// word-joining hyphens, collapse whitespace runs, trim.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lower, "");
    let joined = HYPHEN_RE.replace_all(&stripped, |caps: &Captures<'_>| {
        let Some(m) = caps.get(0) else {
            return "";
        };
        let before = stripped[..m.start()].chars().next_back();
        let after = stripped[m.end()..].chars().next();
        if before.is_some_and(char::is_alphanumeric) && after.is_some_and(char::is_alphanumeric) {
            "-"
        } else {
            ""
        }
    });
    WS_RE.replace_all(&joined, " ").trim().to_string()
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    lexicon: Arc<Lexicon>,
}

impl Normalizer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Word tokens of already-normalized text, with informal spellings
    /// expanded and reduplication reduced to its base. Emoji are not tokens;
    /// they are scored from the raw text.
    ///
    /// A hyphenated token the lexicon knows (`benar-benar`) stays whole;
    /// other reduplications (`murah-murah`) become their base, hyphenated
    /// enclitics rejoin their word, and remaining compounds split at the hyphen.
    pub fn tokenize(&self, normalized: &str) -> Vec<String> {
        let mut out = Vec::new();
        for m in TOKEN_RE.find_iter(normalized) {
            let tok = m.as_str();
            if !tok.contains('-') || self.lexicon.stemmer().is_root(tok) {
                out.push(self.word(tok));
                continue;
            }
            let parts: Vec<&str> = tok.split('-').collect();
            if parts.iter().all(|p| *p == parts[0]) {
                out.push(self.word(parts[0]));
            } else {
                let mut words: Vec<String> = Vec::with_capacity(parts.len());
                for part in parts {
                    match words.last_mut() {
                        Some(prev) if CLITICS.contains(&part) => prev.push_str(part),
                        _ => words.push(part.to_string()),
                    }
                }
                out.extend(words.iter().map(|w| self.word(w)));
            }
        }
        out
    }

    /// One unhyphenated word: `baik2` shorthand reduced, slang expanded.
    fn word(&self, tok: &str) -> String {
        let tok = REDUP_RE
            .captures(tok)
            .and_then(|c| c.get(1))
            .map_or(tok, |base| base.as_str());
        self.lexicon.expand_slang(tok).to_string()
    }

    /// Root form of one token. Memoized in `cache` (keyed by the lowercased
    /// token) when one is supplied.
    pub fn stem(&self, token: &str, cache: Option<&StemCache>) -> String {
        let key = token.to_lowercase();
        match cache {
            Some(cache) => cache.get_or_insert_with(&key, || self.lexicon.stemmer().stem(&key)),
            None => self.lexicon.stemmer().stem(&key),
        }
    }

    pub fn process(&self, text: &str, cache: Option<&StemCache>) -> NormalizedText {
        let normalized = normalize(text);
        let tokens = self.tokenize(&normalized);
        let stems = tokens.iter().map(|t| self.stem(t, cache)).collect();
        NormalizedText {
            normalized,
            tokens,
            stems,
        }
    }
}
