//! Sentiment scorer.
//!
//! Three independent signals per text, blended by plain average:
//! - a general-purpose label score over the normalized text ([`GeneralSentiment`]),
//! - the rule engine over stems ([`RuleScorer`]): bigrams before single words,
//!   context boosts, and one negation/intensifier multiplier,
//! - the emoji score over the raw text.

use anyhow::{bail, Context as _};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::RuleWeights;
use crate::lexicon::{Context, Lexicon};
use crate::normalize::NormalizedText;

static INDONESIAN_LABELS: Lazy<Arc<LabelScorer>> = Lazy::new(|| {
    let raw = include_str!("../data/general_labels_id.json");
    Arc::new(LabelScorer::from_json_str(raw).expect("valid general sentiment labels"))
});

/// Output of the rule engine for one stem sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleScore {
    /// Token/bigram sum times the final multiplier.
    pub score: f64,
    /// `score / max(1, stems)`.
    pub normalized: f64,
    /// `normalized * (1 + factor * active contexts)`.
    pub comparative: f64,
    pub contexts: BTreeSet<Context>,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct RuleScorer {
    lexicon: Arc<Lexicon>,
    weights: RuleWeights,
}

impl RuleScorer {
    pub fn new(lexicon: Arc<Lexicon>, weights: RuleWeights) -> Self {
        Self { lexicon, weights }
    }

    pub fn weights(&self) -> &RuleWeights {
        &self.weights
    }

    /// Contexts marked by the stems; each stem marks at most one.
    pub fn detect_contexts(&self, stems: &[String]) -> BTreeSet<Context> {
        stems
            .iter()
            .filter_map(|s| self.lexicon.context_of(s))
            .collect()
    }

    fn bigram_boost(&self, phrase: &str, contexts: &BTreeSet<Context>) -> f64 {
        let related = contexts
            .iter()
            .any(|ctx| ctx.phrase_markers().iter().any(|m| phrase.contains(m)));
        if related {
            self.weights.bigram_context_boost
        } else {
            1.0
        }
    }

    /// Modifier set by the stem preceding the current position, if any.
    fn modifier(&self, prev: &str, has_context: bool) -> Option<f64> {
        let w = &self.weights;
        if self.lexicon.is_negation(prev) {
            Some(if has_context {
                w.negation_with_context
            } else {
                w.negation_plain
            })
        } else if self.lexicon.is_intensifier(prev) {
            Some(if has_context {
                w.intensifier_with_context
            } else {
                w.intensifier_plain
            })
        } else {
            None
        }
    }

    pub fn score(&self, stems: &[String]) -> RuleScore {
        if stems.is_empty() {
            return RuleScore {
                multiplier: 1.0,
                ..RuleScore::default()
            };
        }

        let contexts = self.detect_contexts(stems);
        let has_context = !contexts.is_empty();

        let mut sum = 0.0;
        // Last modifier seen wins; applied once to the whole sum.
        let mut multiplier = 1.0;
        let mut i = 0;
        while i < stems.len() {
            if i > 0 {
                if let Some(m) = self.modifier(&stems[i - 1], has_context) {
                    multiplier = m;
                }
            }

            let stem = stems[i].as_str();
            if let Some(next) = stems.get(i + 1) {
                let phrase = format!("{stem} {next}");
                if let Some(weight) = self.lexicon.bigram_weight(&phrase) {
                    sum += weight * self.bigram_boost(&phrase, &contexts);
                    i += 2;
                    continue;
                }
            }

            let base = if self.lexicon.is_positive(stem) {
                1.0
            } else if self.lexicon.is_negative(stem) {
                -1.0
            } else {
                0.0
            };
            if base != 0.0 {
                let boost = if self.lexicon.context_of(stem).is_some() {
                    self.weights.token_context_boost
                } else {
                    1.0
                };
                sum += base * boost;
            }
            i += 1;
        }

        let score = sum * multiplier;
        let normalized = score / stems.len().max(1) as f64;
        let comparative =
            normalized * (1.0 + self.weights.context_comparative_factor * contexts.len() as f64);
        RuleScore {
            score,
            normalized,
            comparative,
            contexts,
            multiplier,
        }
    }
}

/// Sum of `occurrences × weight` over every registered emoji key.
///
/// Keys are counted independently, so `👍👍` contributes both as the pair and
/// as two single thumbs.
pub fn emoji_score(lexicon: &Lexicon, raw_text: &str) -> f64 {
    lexicon
        .emoji_entries()
        .iter()
        .map(|(key, weight)| raw_text.matches(key.as_str()).count() as f64 * weight)
        .sum()
}

/// General-purpose sentiment over normalized text (blend component "a").
pub trait GeneralSentiment: Send + Sync {
    fn score(&self, normalized: &str) -> f64;
    fn name(&self) -> &'static str;
}

/// Label table summed over whitespace tokens.
#[derive(Debug, Clone, Default)]
pub struct LabelScorer {
    labels: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RawLabels {
    #[serde(default)]
    positive: Vec<String>,
    #[serde(default)]
    negative: Vec<String>,
    #[serde(default)]
    intensifiers_positive: Vec<String>,
    #[serde(default)]
    intensifiers_negative: Vec<String>,
    #[serde(default)]
    negators: Vec<String>,
}

impl LabelScorer {
    /// The embedded Indonesian label table.
    pub fn indonesian() -> Arc<LabelScorer> {
        Arc::clone(&INDONESIAN_LABELS)
    }

    /// Groups are registered in order, later groups overriding earlier ones:
    /// positive +2, negative −2, positive intensifiers +1, negative
    /// intensifiers −1, negators −1.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let raw: RawLabels = serde_json::from_str(raw).context("parsing general labels JSON")?;
        let groups = [
            (raw.positive, 2.0),
            (raw.negative, -2.0),
            (raw.intensifiers_positive, 1.0),
            (raw.intensifiers_negative, -1.0),
            (raw.negators, -1.0),
        ];
        let mut labels = HashMap::new();
        for (words, weight) in groups {
            for w in words {
                let w = w.trim().to_lowercase();
                if !w.is_empty() {
                    labels.insert(w, weight);
                }
            }
        }
        Ok(Self { labels })
    }

    pub fn label(&self, word: &str) -> Option<f64> {
        self.labels.get(word).copied()
    }
}

impl GeneralSentiment for LabelScorer {
    fn score(&self, normalized: &str) -> f64 {
        normalized
            .split_whitespace()
            .filter_map(|tok| self.label(tok))
            .sum()
    }

    fn name(&self) -> &'static str {
        "labels-id"
    }
}

/// Every component of one text's score, plus the blend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub general: f64,
    pub rule: f64,
    pub emoji: f64,
    /// Average of `general`, `rule`, and `emoji`.
    pub blended: f64,
    pub rule_comparative: f64,
    /// `blended / max(1, token_count)`.
    pub comparative: f64,
    pub contexts: BTreeSet<Context>,
    pub token_count: usize,
}

#[derive(Clone)]
pub struct SentimentScorer {
    lexicon: Arc<Lexicon>,
    rules: RuleScorer,
    general: Arc<dyn GeneralSentiment>,
}

impl std::fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentScorer")
            .field("rules", &self.rules.weights)
            .field("general", &self.general.name())
            .finish()
    }
}

impl SentimentScorer {
    pub fn new(
        lexicon: Arc<Lexicon>,
        weights: RuleWeights,
        general: Arc<dyn GeneralSentiment>,
    ) -> Self {
        Self {
            rules: RuleScorer::new(Arc::clone(&lexicon), weights),
            lexicon,
            general,
        }
    }

    pub fn rules(&self) -> &RuleScorer {
        &self.rules
    }

    /// Score already-normalized text; `raw` feeds the emoji signal.
    pub fn score(&self, text: &NormalizedText, raw: &str) -> anyhow::Result<ScoreBreakdown> {
        let general = self.general.score(&text.normalized);
        let rule = self.rules.score(&text.stems);
        let emoji = emoji_score(&self.lexicon, raw);

        let blended = (general + rule.score + emoji) / 3.0;
        let comparative = blended / text.stems.len().max(1) as f64;

        for (name, v) in [
            ("general", general),
            ("rule", rule.score),
            ("emoji", emoji),
            ("blended", blended),
        ] {
            if !v.is_finite() {
                bail!("non-finite {name} score ({v}) from {}", self.general.name());
            }
        }

        Ok(ScoreBreakdown {
            general,
            rule: rule.score,
            emoji,
            blended,
            rule_comparative: rule.comparative,
            comparative,
            contexts: rule.contexts,
            token_count: text.tokens.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn stems(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn rules() -> RuleScorer {
        RuleScorer::new(Lexicon::embedded(), RuleWeights::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_stems_score_zero() {
        let r = rules().score(&[]);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.comparative, 0.0);
        assert!(r.contexts.is_empty());
    }

    #[test]
    fn bigram_is_not_double_counted() {
        let r = rules().score(&stems(&["sangat", "bagus"]));
        // Bigram weight 2, not intensifier × single word.
        assert!(approx(r.score, 2.0), "{r:?}");
        assert!(approx(r.multiplier, 1.0));
        assert!(approx(r.normalized, 1.0));
    }

    #[test]
    fn last_modifier_wins() {
        // negation (before "suka") then intensifier (before "keren")
        let r = rules().score(&stems(&["tidak", "suka", "banget", "keren"]));
        assert!(approx(r.multiplier, 1.1));
        assert!(approx(r.score, 2.2), "{r:?}");

        let r = rules().score(&stems(&["sangat", "suka", "tidak", "keren"]));
        assert!(approx(r.multiplier, -1.2));
        assert!(approx(r.score, -2.4), "{r:?}");
    }

    #[test]
    fn context_keyword_token_is_boosted() {
        let r = rules().score(&stems(&["harga", "murah"]));
        assert_eq!(r.contexts.iter().copied().collect::<Vec<_>>(), vec![Context::Price]);
        assert!(approx(r.score, 1.2));
        assert!(approx(r.normalized, 0.6));
        assert!(approx(r.comparative, 0.66));
    }

    #[test]
    fn bigram_tied_to_active_context_is_boosted() {
        let r = rules().score(&stems(&["respon", "cepat"]));
        assert!(r.contexts.contains(&Context::Service));
        assert!(approx(r.score, 1.8), "{r:?}");
    }

    #[test]
    fn negation_uses_context_multiplier_when_context_active() {
        // "tidak" before "bagus"; "barang" marks product.
        let r = rules().score(&stems(&["barang", "tidak", "bagus"]));
        // "tidak bagus" is itself a bigram (−1.5); the modifier set at i=1
        // comes from "barang", which is not a modifier.
        assert!(approx(r.score, -1.5), "{r:?}");

        let r = rules().score(&stems(&["barang", "tidak", "rapi"]));
        assert!(approx(r.multiplier, -1.3));
        assert!(approx(r.score, -1.3), "{r:?}");

        let r = rules().score(&stems(&["tidak", "rapi"]));
        assert!(approx(r.multiplier, -1.2));
    }

    #[test]
    fn emoji_keys_counted_independently() {
        let lex = Lexicon::embedded();
        assert!(approx(emoji_score(&lex, "mantap 👍👍 😍"), 6.0));
        assert!(approx(emoji_score(&lex, "😡 😡"), -4.0));
        assert_eq!(emoji_score(&lex, "tanpa emoji"), 0.0);
    }

    #[test]
    fn labels_later_groups_override() {
        let labels = LabelScorer::indonesian();
        assert_eq!(labels.label("bagus"), Some(2.0));
        assert_eq!(labels.label("kurang"), Some(-2.0));
        // both intensifier groups list it; the negative one is registered last
        assert_eq!(labels.label("sangat"), Some(-1.0));
        assert_eq!(labels.label("sekali"), Some(1.0));
        assert_eq!(labels.label("tidak"), Some(-1.0));
        assert!(approx(labels.score("produk bagus sekali pelayanan ramah"), 5.0));
    }

    #[test]
    fn blend_averages_three_components() {
        let lex = Lexicon::embedded();
        let normalizer = Normalizer::new(Arc::clone(&lex));
        let scorer = SentimentScorer::new(lex, RuleWeights::default(), LabelScorer::indonesian());
        let raw = "produk bagus sekali, pelayanan ramah";
        let text = normalizer.process(raw, None);
        let b = scorer.score(&text, raw).unwrap();
        assert!(approx(b.general, 5.0));
        assert!(approx(b.rule, 2.6), "{b:?}");
        assert_eq!(b.emoji, 0.0);
        assert!(approx(b.blended, 7.6 / 3.0));
        assert!(approx(b.comparative, 7.6 / 3.0 / 5.0));
        assert!(b.contexts.contains(&Context::Product));
        assert!(b.contexts.contains(&Context::Service));
    }

    struct Broken;

    impl GeneralSentiment for Broken {
        fn score(&self, _normalized: &str) -> f64 {
            f64::NAN
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn non_finite_component_is_an_error() {
        let lex = Lexicon::embedded();
        let normalizer = Normalizer::new(Arc::clone(&lex));
        let scorer = SentimentScorer::new(lex, RuleWeights::default(), Arc::new(Broken));
        let text = normalizer.process("bagus", None);
        assert!(scorer.score(&text, "bagus").is_err());
    }
}
