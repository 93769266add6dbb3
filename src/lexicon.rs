//! Indonesian review lexicon: polarity words, modifiers, bigram phrases,
//! emoji weights, and topical context keywords.
//!
//! The data is embedded (`data/lexicon_id.json`) and frozen once built; every
//! lookup is total, a missing key simply means "no contribution".
//!
//! Single-word entries double as stemmer roots, so an inflected review token
//! (`barangnya`, `dikirim`) reduces onto the spelling the tables use.

use anyhow::Context as _;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::stemmer::Stemmer;

static EMBEDDED: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    let raw = include_str!("../data/lexicon_id.json");
    Arc::new(Lexicon::from_json_str(raw).expect("valid embedded review lexicon"))
});

/// Topical tag detected through keyword membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Product,
    Service,
    Shipping,
    Price,
    Packaging,
}

impl Context {
    /// Detection order: the first context whose keywords contain a stem wins.
    pub const ALL: [Context; 5] = [
        Context::Product,
        Context::Service,
        Context::Shipping,
        Context::Price,
        Context::Packaging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Context::Product => "product",
            Context::Service => "service",
            Context::Shipping => "shipping",
            Context::Price => "price",
            Context::Packaging => "packaging",
        }
    }

    /// Words that tie a bigram phrase to this context for the phrase boost.
    pub fn phrase_markers(self) -> &'static [&'static str] {
        match self {
            Context::Product => &["original", "asli"],
            Context::Service => &["respon"],
            Context::Shipping => &["sampai"],
            Context::Packaging => &["packing"],
            Context::Price => &[],
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of the lexicon JSON.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawLexicon {
    #[serde(default)]
    positive_words: Vec<String>,
    #[serde(default)]
    negative_words: Vec<String>,
    #[serde(default)]
    intensifiers: Vec<String>,
    #[serde(default)]
    negations: Vec<String>,
    #[serde(default)]
    bigram_phrases: HashMap<String, f64>,
    #[serde(default)]
    emoji_sentiment: HashMap<String, f64>,
    #[serde(default)]
    context_keywords: HashMap<String, Vec<String>>,
    #[serde(default)]
    slang: HashMap<String, String>,
    #[serde(default)]
    roots: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
    intensifiers: HashSet<String>,
    negations: HashSet<String>,
    bigrams: HashMap<String, f64>,
    /// Sorted by key so emoji scoring is deterministic.
    emoji: Vec<(String, f64)>,
    contexts: Vec<(Context, HashSet<String>)>,
    slang: HashMap<String, String>,
    stemmer: Stemmer,
}

impl Lexicon {
    /// Shared handle to the embedded Indonesian lexicon.
    pub fn embedded() -> Arc<Lexicon> {
        Arc::clone(&EMBEDDED)
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let raw: RawLexicon = serde_json::from_str(raw).context("parsing lexicon JSON")?;
        Ok(Self::build(raw))
    }

    fn build(raw: RawLexicon) -> Self {
        let lower = |s: &String| s.trim().to_lowercase();
        let index = |words: &[String]| -> HashSet<String> {
            words.iter().map(lower).filter(|w| !w.is_empty()).collect()
        };

        let positive = index(&raw.positive_words);
        let negative = index(&raw.negative_words);
        let intensifiers = index(&raw.intensifiers);
        let negations = index(&raw.negations);

        let contexts: Vec<(Context, HashSet<String>)> = Context::ALL
            .iter()
            .map(|ctx| {
                let words = raw
                    .context_keywords
                    .get(ctx.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                (*ctx, index(words))
            })
            .collect();

        let mut bigrams = HashMap::with_capacity(raw.bigram_phrases.len());
        for (phrase, weight) in &raw.bigram_phrases {
            let words = phrase
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>();
            if words.len() == 2 && weight.is_finite() {
                bigrams.insert(words.join(" "), *weight);
            }
        }

        // Every single-word entry is a root, so inflected review tokens reduce
        // onto the exact spelling the tables use.
        let mut roots: HashSet<String> = index(&raw.roots);
        for set in [&positive, &negative, &intensifiers, &negations] {
            roots.extend(set.iter().filter(|w| !w.contains(' ')).cloned());
        }
        for (_, words) in &contexts {
            roots.extend(words.iter().filter(|w| !w.contains(' ')).cloned());
        }
        for phrase in bigrams.keys() {
            roots.extend(phrase.split(' ').map(str::to_string));
        }
        let stemmer = Stemmer::new(roots);

        let mut emoji: Vec<(String, f64)> = raw
            .emoji_sentiment
            .into_iter()
            .filter(|(k, w)| !k.is_empty() && w.is_finite())
            .collect();
        emoji.sort_by(|a, b| a.0.cmp(&b.0));

        let slang = raw
            .slang
            .iter()
            .map(|(k, v)| (lower(k), lower(v)))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();

        Self {
            positive,
            negative,
            intensifiers,
            negations,
            bigrams,
            emoji,
            contexts,
            slang,
            stemmer,
        }
    }

    #[inline]
    pub fn is_positive(&self, word: &str) -> bool {
        self.positive.contains(word)
    }

    #[inline]
    pub fn is_negative(&self, word: &str) -> bool {
        self.negative.contains(word)
    }

    #[inline]
    pub fn is_intensifier(&self, word: &str) -> bool {
        self.intensifiers.contains(word)
    }

    #[inline]
    pub fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word)
    }

    /// Weight of a two-word phrase ("a b"), if registered.
    pub fn bigram_weight(&self, phrase: &str) -> Option<f64> {
        self.bigrams.get(phrase).copied()
    }

    /// Weight of a single emoji key, if registered.
    pub fn emoji_weight(&self, emoji: &str) -> Option<f64> {
        self.emoji
            .iter()
            .find_map(|(k, w)| (k == emoji).then_some(*w))
    }

    pub fn emoji_entries(&self) -> &[(String, f64)] {
        &self.emoji
    }

    /// First context (in [`Context::ALL`] order) whose keywords contain `stem`.
    pub fn context_of(&self, stem: &str) -> Option<Context> {
        self.contexts
            .iter()
            .find_map(|(ctx, words)| words.contains(stem).then_some(*ctx))
    }

    /// Canonical spelling of an informal token (`bgt` → `banget`).
    pub fn expand_slang<'a>(&'a self, token: &'a str) -> &'a str {
        self.slang.get(token).map(String::as_str).unwrap_or(token)
    }

    pub fn stemmer(&self) -> &Stemmer {
        &self.stemmer
    }
}
