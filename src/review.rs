//! Review aggregator: one scored result per `{text, kendala?}` record.
//!
//! The body and the complaint (`kendala`) are scored through the same
//! pipeline. A serious complaint overrides a positive body; a mild one only
//! moderates it. Final scores are clamped and classified three ways.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::{ComparativeMode, ScoringConfig};
use crate::lexicon::Lexicon;
use crate::metrics::{anon_hash, record_review};
use crate::normalize::{clean_scraped, NormalizedText, Normalizer, StemCache};
use crate::sentiment::{GeneralSentiment, LabelScorer, ScoreBreakdown, SentimentScorer};

static POSITIVE_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:sangat (?:bagus|puas|recommended|rekomen)|worth it|kualitas (?:bagus|baik|oke)|pelayanan (?:bagus|baik|oke)|pengiriman cepat|harga (?:sesuai|worth|oke|ok))\b",
    )
    .expect("positive phrase regex")
});

static NEGATIVE_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:tidak (?:bagus|puas|recommended|rekomen|sesuai|worth)|kurang (?:bagus|puas|sesuai)|kualitas (?:buruk|jelek)|pelayanan (?:buruk|jelek|lambat)|pengiriman (?:lambat|lama)|harga (?:mahal|tidak sesuai|tidak worth))\b",
    )
    .expect("negative phrase regex")
});

/// Damaged or missing goods. Only checked in `kendala`.
static COMPLAINT_PATTERNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:rusak|cacat|pecah|penyok|bocor|palsu|tidak sampai|salah kirim|salah alamat|belum sampai)\b",
    )
    .expect("complaint pattern regex")
});

/// Words allowed between a negator and the complaint it negates
/// (`tidak ada yang rusak`).
const NEGATION_FILLERS: &[&str] = &["ada", "yang"];

static DEFAULT_ANALYZER: Lazy<ReviewAnalyzer> =
    Lazy::new(|| ReviewAnalyzer::indonesian(ScoringConfig::default()));

/// Scraped review record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kendala: Option<String>,
}

impl RawReview {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kendala: None,
        }
    }

    pub fn with_kendala(mut self, kendala: impl Into<String>) -> Self {
        self.kendala = Some(kendala.into());
        self
    }

    /// Non-blank complaint text, if any.
    pub fn complaint(&self) -> Option<&str> {
        self.kendala.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// How the final score was assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBreakdown {
    pub body: ScoreBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kendala: Option<ScoreBreakdown>,
    /// Net body phrase bonus applied (+bonus, −bonus, or 0).
    pub phrase_adjustment: f64,
    pub positive_phrase: bool,
    pub negative_phrase: bool,
    pub kendala_negative_phrase: bool,
    /// True when a serious complaint forced the score to at most −1.
    pub kendala_override: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAnalysisResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kendala: Option<String>,
    pub score: f64,
    pub comparative: f64,
    pub is_positive: bool,
    pub is_negative: bool,
    #[serde(default = "neutral")]
    pub polarity: Polarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ReviewBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn neutral() -> Polarity {
    Polarity::Neutral
}

impl ReviewAnalysisResult {
    /// Zero-score result carrying a human-readable reason.
    pub fn degenerate(text: impl Into<String>, kendala: Option<String>, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kendala,
            score: 0.0,
            comparative: 0.0,
            is_positive: false,
            is_negative: false,
            polarity: Polarity::Neutral,
            breakdown: None,
            error: Some(error.into()),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PhraseHits {
    positive: bool,
    negative: bool,
    complaint: bool,
}

fn phrase_hits(text: &NormalizedText, lexicon: &Lexicon) -> PhraseHits {
    // Token form catches surface phrases, stem form catches inflected ones.
    let tokens = text.tokens.join(" ");
    let stems = text.stems.join(" ");
    PhraseHits {
        positive: POSITIVE_PHRASES.is_match(&tokens) || POSITIVE_PHRASES.is_match(&stems),
        negative: NEGATIVE_PHRASES.is_match(&tokens) || NEGATIVE_PHRASES.is_match(&stems),
        complaint: complaint_hit(&text.tokens, lexicon) || complaint_hit(&text.stems, lexicon),
    }
}

/// A complaint pattern not preceded by a negator (`tidak rusak` is praise).
fn complaint_hit(words: &[String], lexicon: &Lexicon) -> bool {
    let joined = words.join(" ");
    COMPLAINT_PATTERNS.find_iter(&joined).any(|m| {
        // Words never contain spaces, so spaces before the match index it.
        let at = joined[..m.start()].matches(' ').count();
        !negated_at(words, at, lexicon)
    })
}

fn negated_at(words: &[String], at: usize, lexicon: &Lexicon) -> bool {
    words[..at.min(words.len())]
        .iter()
        .rev()
        .find(|w| !NEGATION_FILLERS.contains(&w.as_str()))
        .is_some_and(|w| lexicon.is_negation(w))
}

#[derive(Debug)]
pub struct ReviewAnalyzer {
    normalizer: Normalizer,
    scorer: SentimentScorer,
    cache: StemCache,
    config: ScoringConfig,
}

impl ReviewAnalyzer {
    pub fn new(
        lexicon: Arc<Lexicon>,
        general: Arc<dyn GeneralSentiment>,
        config: ScoringConfig,
    ) -> Self {
        let config = config.sanitized();
        Self {
            normalizer: Normalizer::new(Arc::clone(&lexicon)),
            scorer: SentimentScorer::new(lexicon, config.rules.clone(), general),
            cache: StemCache::new(),
            config,
        }
    }

    /// Embedded Indonesian lexicon and label table.
    pub fn indonesian(config: ScoringConfig) -> Self {
        Self::new(Lexicon::embedded(), LabelScorer::indonesian(), config)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn stem_cache(&self) -> &StemCache {
        &self.cache
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Cleaned text (for emoji) and its normalized form.
    fn prepare(&self, raw: &str) -> (String, NormalizedText) {
        let cleaned = clean_scraped(raw);
        let text = self.normalizer.process(&cleaned, Some(&self.cache));
        (cleaned, text)
    }

    fn try_analyze(&self, review: &RawReview) -> anyhow::Result<ReviewAnalysisResult> {
        if review.text.trim().is_empty() {
            anyhow::bail!("review text is empty");
        }
        let agg = &self.config.aggregate;

        let (body_clean, body_text) = self.prepare(&review.text);
        let body = self.scorer.score(&body_text, &body_clean)?;
        let lexicon = self.normalizer.lexicon();
        let body_hits = phrase_hits(&body_text, lexicon);
        let body_negated = body_text.tokens.iter().any(|t| lexicon.is_negation(t));

        let mut score = body.blended;
        let mut phrase_adjustment = 0.0;
        if body_hits.positive && !body_negated {
            phrase_adjustment += agg.phrase_bonus;
        }
        if body_hits.negative {
            phrase_adjustment -= agg.phrase_bonus;
        }
        score += phrase_adjustment;

        let complaint = review.complaint();
        let mut kendala_override = false;
        let mut kendala_phrase = false;
        let kendala = match complaint {
            Some(k) => {
                let (k_clean, k_text) = self.prepare(k);
                let k_score = self.scorer.score(&k_text, &k_clean)?;
                let hits = phrase_hits(&k_text, lexicon);
                kendala_phrase = hits.negative || hits.complaint;
                if kendala_phrase || k_score.blended < agg.kendala_serious_below {
                    score = score.min(-1.0);
                    kendala_override = true;
                } else {
                    score += k_score.blended;
                }
                Some(k_score)
            }
            None => None,
        };

        let score = score.clamp(-agg.score_bound, agg.score_bound);
        if !score.is_finite() {
            anyhow::bail!("non-finite final score");
        }

        let comparative = match agg.comparative {
            ComparativeMode::Tokens => score / body_text.len().max(1) as f64,
            ComparativeMode::Characters => {
                let chars = review.text.chars().count()
                    + complaint.map_or(0, |k| k.chars().count());
                score / chars.max(1) as f64
            }
        };

        let negative_phrase = body_hits.negative || kendala_phrase;
        let kendala_blended = kendala.as_ref().map(|k| k.blended);
        let is_positive =
            score > 0.0 && !negative_phrase && kendala_blended.map_or(true, |k| k >= 0.0);
        let is_negative = score < 0.0 || negative_phrase || kendala_blended.is_some_and(|k| k < 0.0);
        let polarity = if is_negative {
            Polarity::Negative
        } else if is_positive {
            Polarity::Positive
        } else {
            Polarity::Neutral
        };

        Ok(ReviewAnalysisResult {
            text: review.text.clone(),
            kendala: review.kendala.clone(),
            score,
            comparative,
            is_positive,
            is_negative,
            polarity,
            breakdown: Some(ReviewBreakdown {
                body,
                kendala,
                phrase_adjustment,
                positive_phrase: body_hits.positive,
                negative_phrase: body_hits.negative,
                kendala_negative_phrase: kendala_phrase,
                kendala_override,
            }),
            error: None,
        })
    }

    /// Never fails: internal errors yield a degenerate result.
    pub fn analyze_review(&self, review: &RawReview) -> ReviewAnalysisResult {
        let id = anon_hash(&review.text);
        let result = match self.try_analyze(review) {
            Ok(res) => {
                debug!(
                    target: "review",
                    %id,
                    score = res.score,
                    polarity = ?res.polarity,
                    kendala = review.complaint().is_some(),
                    "review scored"
                );
                res
            }
            Err(e) => {
                warn!(target: "review", %id, error = %e, "degenerate review result");
                ReviewAnalysisResult::degenerate(review.text.clone(), review.kendala.clone(), e.to_string())
            }
        };
        record_review(&result);
        result
    }

    /// Order-preserving, one result per input.
    pub fn analyze_reviews(&self, reviews: &[RawReview]) -> Vec<ReviewAnalysisResult> {
        reviews.iter().map(|r| self.analyze_review(r)).collect()
    }

    /// Accepts loosely-typed JSON (`{"text": ..., "kendala": ...}`); a missing or
    /// non-string `text` yields a degenerate result instead of an error.
    pub fn analyze_json(&self, value: &serde_json::Value) -> ReviewAnalysisResult {
        match review_from_json(value) {
            Ok(review) => self.analyze_review(&review),
            Err(rejected) => {
                record_review(&rejected);
                rejected
            }
        }
    }
}

/// Typed review from loosely-typed JSON, or the degenerate result it maps to.
pub fn review_from_json(value: &serde_json::Value) -> Result<RawReview, ReviewAnalysisResult> {
    let kendala = value
        .get("kendala")
        .and_then(|k| k.as_str())
        .map(str::to_string);
    let (text, reason) = match value.get("text") {
        Some(serde_json::Value::String(text)) => {
            return Ok(RawReview {
                text: text.clone(),
                kendala,
            })
        }
        Some(other) => (other.to_string(), "review text must be a string"),
        None => (String::new(), "review text is missing"),
    };
    warn!(target: "review", reason, "rejected review input");
    Err(ReviewAnalysisResult::degenerate(text, kendala, reason))
}

/// Score a batch in chunks on the blocking pool with bounded concurrency.
///
/// Output order equals input order. A chunk whose task fails degrades only its
/// own reviews.
pub async fn analyze_reviews_concurrent(
    analyzer: Arc<ReviewAnalyzer>,
    reviews: Vec<RawReview>,
) -> Vec<ReviewAnalysisResult> {
    let batch = &analyzer.config.batch;
    let chunk_size = batch.chunk_size.max(1);
    let sem = Arc::new(Semaphore::new(batch.max_in_flight.max(1)));
    let chunks: Vec<Vec<RawReview>> = reviews.chunks(chunk_size).map(<[_]>::to_vec).collect();

    let mut set = JoinSet::new();
    for (idx, chunk) in chunks.iter().cloned().enumerate() {
        let analyzer = Arc::clone(&analyzer);
        let sem = Arc::clone(&sem);
        set.spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(p) => p,
                Err(e) => return (idx, Err(e.to_string())),
            };
            let scored =
                tokio::task::spawn_blocking(move || analyzer.analyze_reviews(&chunk)).await;
            (idx, scored.map_err(|e| e.to_string()))
        });
    }

    let mut slots: Vec<Option<Vec<ReviewAnalysisResult>>> = vec![None; chunks.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, Ok(results))) => slots[idx] = Some(results),
            Ok((idx, Err(e))) => warn!(target: "review", chunk = idx, error = %e, "batch chunk failed"),
            Err(e) => warn!(target: "review", error = %e, "batch task failed"),
        }
    }

    slots
        .into_iter()
        .zip(chunks)
        .flat_map(|(slot, chunk)| {
            slot.unwrap_or_else(|| {
                chunk
                    .into_iter()
                    .map(|r| ReviewAnalysisResult::degenerate(r.text, r.kendala, "batch task failed"))
                    .collect()
            })
        })
        .collect()
}

/// Analyze one review with the default Indonesian analyzer.
pub fn analyze_review(review: &RawReview) -> ReviewAnalysisResult {
    DEFAULT_ANALYZER.analyze_review(review)
}

/// Analyze many reviews with the default Indonesian analyzer, in input order.
pub fn analyze_reviews(reviews: &[RawReview]) -> Vec<ReviewAnalysisResult> {
    DEFAULT_ANALYZER.analyze_reviews(reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analyzer() -> ReviewAnalyzer {
        ReviewAnalyzer::indonesian(ScoringConfig::default())
    }

    #[test]
    fn empty_text_is_degenerate() {
        let a = analyzer();
        for text in ["", "   "] {
            let res = a.analyze_review(&RawReview::new(text));
            assert_eq!(res.score, 0.0);
            assert_eq!(res.comparative, 0.0);
            assert!(res.error.is_some());
            assert_eq!(res.polarity, Polarity::Neutral);
        }
    }

    #[test]
    fn positive_body_without_complaint() {
        let res = analyzer().analyze_review(&RawReview::new("produk bagus sekali, pelayanan ramah"));
        assert!(res.score > 0.0, "{res:?}");
        assert!(res.is_positive);
        assert!(!res.is_negative);
        assert_eq!(res.polarity, Polarity::Positive);
        assert!(res.error.is_none());
    }

    #[test]
    fn serious_complaint_overrides_positive_body() {
        let res = analyzer()
            .analyze_review(&RawReview::new("barang oke").with_kendala("barang rusak saat sampai"));
        assert!(res.score <= -1.0, "{res:?}");
        assert!(res.is_negative);
        assert!(!res.is_positive);
        let b = res.breakdown.unwrap();
        assert!(b.kendala_override);
        assert!(b.kendala_negative_phrase);
    }

    #[test]
    fn negated_damage_word_in_body_is_not_a_complaint() {
        let a = analyzer();
        let res = a.analyze_review(&RawReview::new("barang bagus tidak rusak sama sekali"));
        let b = res.breakdown.as_ref().unwrap();
        assert!(!b.negative_phrase, "{res:?}");
        assert_eq!(b.phrase_adjustment, 0.0);
        assert!(!res.is_negative, "{res:?}");

        let res = a.analyze_review(&RawReview::new("produk asli bukan palsu"));
        let b = res.breakdown.as_ref().unwrap();
        assert!(!b.negative_phrase);
        assert_eq!(b.phrase_adjustment, 0.0);
        assert!(res.score > -1.0, "{res:?}");
    }

    #[test]
    fn damage_words_only_count_in_kendala() {
        let res = analyzer().analyze_review(&RawReview::new("kemasan sedikit rusak"));
        assert!(!res.breakdown.unwrap().negative_phrase);
    }

    #[test]
    fn negated_kendala_is_not_serious() {
        let a = analyzer();
        for kendala in ["tidak ada yang rusak", "tidak rusak", "gak ada yg pecah"] {
            let res = a.analyze_review(&RawReview::new("barang oke").with_kendala(kendala));
            let b = res.breakdown.as_ref().unwrap();
            assert!(!b.kendala_negative_phrase, "{kendala}: {res:?}");
            assert!(!b.kendala_override, "{kendala}: {res:?}");
        }
        // A negator elsewhere in the sentence does not excuse the damage.
        let res = a.analyze_review(&RawReview::new("barang oke").with_kendala("tidak puas, kaca pecah"));
        assert!(res.breakdown.unwrap().kendala_override);
    }

    #[test]
    fn mild_complaint_is_added() {
        let res = analyzer()
            .analyze_review(&RawReview::new("barang oke").with_kendala("warna sedikit beda"));
        let b = res.breakdown.as_ref().unwrap();
        assert!(!b.kendala_override);
        let k = b.kendala.as_ref().unwrap().blended;
        assert!((res.score - (b.body.blended + b.phrase_adjustment + k)).abs() < 1e-9);
    }

    #[test]
    fn blank_kendala_counts_as_absent() {
        let a = analyzer();
        let with_blank = a.analyze_review(&RawReview::new("barang oke").with_kendala("  "));
        let without = a.analyze_review(&RawReview::new("barang oke"));
        assert_eq!(with_blank.score, without.score);
        assert!(with_blank.breakdown.unwrap().kendala.is_none());
    }

    #[test]
    fn positive_phrase_bonus_requires_no_negator() {
        let a = analyzer();
        let res = a.analyze_review(&RawReview::new("pengiriman cepat"));
        assert_eq!(res.breakdown.as_ref().unwrap().phrase_adjustment, 2.0);

        let res = a.analyze_review(&RawReview::new("pengiriman cepat tapi tidak rapi"));
        assert_eq!(res.breakdown.as_ref().unwrap().phrase_adjustment, 0.0);
    }

    #[test]
    fn score_is_clamped() {
        let res = analyzer().analyze_review(&RawReview::new(
            "sangat bagus sangat puas mantap keren 😍😍😍😍😍😍 💯💯💯",
        ));
        assert_eq!(res.score, 5.0);
        let res = analyzer().analyze_review(&RawReview::new(
            "jelek rusak palsu kecewa buruk 😡😡😡😡😡 🤬🤬🤬",
        ));
        assert_eq!(res.score, -5.0);
        assert!(res.is_negative);
    }

    #[test]
    fn comparative_by_tokens_by_default() {
        let res = analyzer().analyze_review(&RawReview::new("barang oke"));
        assert!((res.comparative - res.score / 2.0).abs() < 1e-9);
    }

    #[test]
    fn comparative_by_characters_when_configured() {
        let mut cfg = ScoringConfig::default();
        cfg.aggregate.comparative = ComparativeMode::Characters;
        let a = ReviewAnalyzer::indonesian(cfg);
        let res = a.analyze_review(&RawReview::new("barang oke").with_kendala("lama"));
        // 10 + 4 characters
        assert!((res.comparative - res.score / 14.0).abs() < 1e-9);
    }

    #[test]
    fn non_string_json_text_is_degenerate() {
        let a = analyzer();
        let res = a.analyze_json(&json!({"text": 42}));
        assert_eq!(res.score, 0.0);
        assert!(res.error.unwrap().contains("string"));
        let res = a.analyze_json(&json!({"kendala": "rusak"}));
        assert!(res.is_degenerate());
        let res = a.analyze_json(&json!({"text": "bagus", "kendala": null}));
        assert!(!res.is_degenerate());
    }

    #[test]
    fn html_is_cleaned_before_scoring() {
        let a = analyzer();
        let plain = a.analyze_review(&RawReview::new("barang bagus & murah"));
        let html = a.analyze_review(&RawReview::new("barang <b>bagus</b> &amp; murah"));
        assert_eq!(plain.score, html.score);
    }
}
