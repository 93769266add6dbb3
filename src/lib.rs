// src/lib.rs
//! Indonesian product-review sentiment scoring.
//!
//! `{text, kendala?}` records go through normalization and stemming, a blended
//! lexicon/rule/emoji scorer, and a complaint-aware aggregator; the scored set
//! then yields a purchase recommendation.

pub mod api;
pub mod config;
pub mod lexicon;
pub mod metrics;
pub mod normalize;
pub mod recommendation;
pub mod review;
pub mod sentiment;
pub mod stemmer;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::{ComparativeMode, ScoringConfig, SummaryLocale};
pub use crate::lexicon::{Context, Lexicon};
pub use crate::recommendation::{
    negative_reviews, summarize, summarize_with_locale, RecommendationSummary, RecommendationTier,
    ReviewStats,
};
pub use crate::review::{
    analyze_review, analyze_reviews, analyze_reviews_concurrent, Polarity, RawReview,
    ReviewAnalysisResult, ReviewAnalyzer,
};
