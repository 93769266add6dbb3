//! Recommendation engine: cohort statistics, pros/cons bullets, and a
//! five-level tier over a set of scored reviews.
//!
//! Pure function of its input; an empty input has no recommendation at all,
//! which is distinct from every tier.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SummaryLocale;
use crate::metrics::record_summary;
use crate::review::ReviewAnalysisResult;

/// Scores above this count as "very satisfied".
const HIGH_POSITIVE_ABOVE: f64 = 2.0;
/// Scores below this count as serious complaints.
const SERIOUS_BELOW: f64 = -2.0;
const MAX_COMMON_ISSUES: usize = 2;

/// Ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    HighlyRecommended,
    Recommended,
    FairlyRecommended,
    RecommendedWithCaveats,
    NotRecommended,
}

impl RecommendationTier {
    pub fn label(self, locale: SummaryLocale) -> &'static str {
        use RecommendationTier::*;
        match (self, locale) {
            (HighlyRecommended, SummaryLocale::En) => "Highly Recommended",
            (Recommended, SummaryLocale::En) => "Recommended",
            (FairlyRecommended, SummaryLocale::En) => "Fairly Recommended",
            (RecommendedWithCaveats, SummaryLocale::En) => "Recommended with Caveats",
            (NotRecommended, SummaryLocale::En) => "Not Recommended",
            (HighlyRecommended, SummaryLocale::Id) => "Sangat Direkomendasikan",
            (Recommended, SummaryLocale::Id) => "Direkomendasikan",
            (FairlyRecommended, SummaryLocale::Id) => "Cukup Direkomendasikan",
            (RecommendedWithCaveats, SummaryLocale::Id) => "Direkomendasikan dengan Catatan",
            (NotRecommended, SummaryLocale::Id) => "Kurang Direkomendasikan",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub tier: RecommendationTier,
    /// Tier text in the summary locale.
    pub label: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub positive_percentage: f64,
    pub high_positive_percentage: f64,
    pub positive_to_negative_ratio: f64,
    /// Ratio with one decimal, as shown to shoppers.
    pub ratio_display: String,
    /// Recurring complaints, most frequent first (at most two).
    pub common_issues: Vec<String>,
    pub stats: ReviewStats,
}

/// Exact-text kendala groups seen more than once, most frequent first.
/// Ties keep first-seen order.
fn common_issues(results: &[ReviewAnalysisResult]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for k in results.iter().filter_map(|r| r.kendala.as_deref()) {
        if k.is_empty() {
            continue;
        }
        let n = counts.entry(k).or_insert(0);
        if *n == 0 {
            order.push(k);
        }
        *n += 1;
    }
    let mut repeated: Vec<(&str, usize)> = order
        .into_iter()
        .map(|k| (k, counts[k]))
        .filter(|(_, n)| *n > 1)
        .collect();
    repeated.sort_by(|a, b| b.1.cmp(&a.1));
    repeated
        .into_iter()
        .take(MAX_COMMON_ISSUES)
        .map(|(k, _)| k.to_string())
        .collect()
}

fn pick_tier(ratio: f64, positive_pct: f64, high_pct: f64, stats: &ReviewStats) -> RecommendationTier {
    if ratio >= 3.0 || positive_pct >= 80.0 || high_pct >= 30.0 {
        RecommendationTier::HighlyRecommended
    } else if ratio >= 2.0 || positive_pct >= 60.0 || high_pct >= 20.0 {
        RecommendationTier::Recommended
    } else if ratio >= 1.5 || positive_pct >= 40.0 || high_pct >= 10.0 {
        RecommendationTier::FairlyRecommended
    } else if stats.positive > stats.negative || positive_pct >= 20.0 {
        RecommendationTier::RecommendedWithCaveats
    } else {
        RecommendationTier::NotRecommended
    }
}

/// Summary with English text; `None` for an empty input.
pub fn summarize(results: &[ReviewAnalysisResult]) -> Option<RecommendationSummary> {
    summarize_with_locale(results, SummaryLocale::En)
}

pub fn summarize_with_locale(
    results: &[ReviewAnalysisResult],
    locale: SummaryLocale,
) -> Option<RecommendationSummary> {
    if results.is_empty() {
        return None;
    }

    let total = results.len();
    let positive = results.iter().filter(|r| r.score > 0.0).count();
    let negative = results.iter().filter(|r| r.score < 0.0).count();
    let stats = ReviewStats {
        positive,
        negative,
        neutral: total - positive - negative,
        total,
    };

    let high_positive = results
        .iter()
        .filter(|r| r.score > HIGH_POSITIVE_ABOVE)
        .count();
    let serious = results.iter().filter(|r| r.score < SERIOUS_BELOW).count();
    let positive_percentage = positive as f64 / total as f64 * 100.0;
    let high_positive_percentage = high_positive as f64 / total as f64 * 100.0;
    let ratio = if negative == 0 {
        positive as f64
    } else {
        positive as f64 / negative as f64
    };

    let issues = common_issues(results);
    let id = locale == SummaryLocale::Id;

    let mut pros = Vec::new();
    if ratio >= 2.0 {
        pros.push(if id {
            "Review positif 2x lebih banyak dari negatif".to_string()
        } else {
            "Positive reviews are at least twice the negative ones".to_string()
        });
    }
    if ratio >= 3.0 {
        pros.push(if id {
            "Review positif sangat dominan".to_string()
        } else {
            "Positive reviews are dominant".to_string()
        });
    }
    if high_positive > 0 {
        pros.push(if id {
            format!("{high_positive} pembeli sangat puas dengan produk")
        } else {
            format!("{high_positive} buyers very satisfied with the product")
        });
    }
    if positive_percentage >= 80.0 {
        pros.push(if id {
            "Tingkat kepuasan pembeli sangat tinggi".to_string()
        } else {
            "Very high buyer satisfaction".to_string()
        });
    }
    if negative == 0 && positive > 0 {
        pros.push(if id {
            "Belum ada review negatif".to_string()
        } else {
            "No negative reviews yet".to_string()
        });
    }

    let mut cons = Vec::new();
    if !issues.is_empty() {
        let joined = issues.join(", ");
        cons.push(if id {
            format!("Kendala yang sering muncul: {joined}")
        } else {
            format!("Frequent issues: {joined}")
        });
    }
    if negative as f64 > total as f64 * 0.4 {
        cons.push(if id {
            "Cukup banyak review negatif".to_string()
        } else {
            "Quite many negative reviews".to_string()
        });
    }
    if serious > 0 {
        let alarming = serious as f64 > positive as f64 * 0.5;
        cons.push(match (alarming, id) {
            (true, true) => format!("Perhatian: {serious} keluhan serius"),
            (false, true) => format!("Ada {serious} keluhan serius"),
            (true, false) => format!("Attention: {serious} serious complaints"),
            (false, false) => format!("There are {serious} serious complaints"),
        });
    }

    let tier = pick_tier(ratio, positive_percentage, high_positive_percentage, &stats);
    record_summary(tier);

    Some(RecommendationSummary {
        tier,
        label: tier.label(locale).to_string(),
        pros,
        cons,
        positive_percentage,
        high_positive_percentage,
        positive_to_negative_ratio: ratio,
        ratio_display: format!("{ratio:.1}"),
        common_issues: issues,
        stats,
    })
}

/// Reviews scoring below zero, most negative first.
pub fn negative_reviews(results: &[ReviewAnalysisResult]) -> Vec<&ReviewAnalysisResult> {
    let mut out: Vec<&ReviewAnalysisResult> = results.iter().filter(|r| r.score < 0.0).collect();
    out.sort_by(|a, b| a.score.total_cmp(&b.score));
    out
}
