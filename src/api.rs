use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::recommendation::{summarize_with_locale, RecommendationSummary};
use crate::review::{
    analyze_reviews_concurrent, review_from_json, ReviewAnalysisResult, ReviewAnalyzer,
};

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<RwLock<Arc<ReviewAnalyzer>>>,
}

impl AppState {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            analyzer: Arc::new(RwLock::new(Arc::new(ReviewAnalyzer::indonesian(config)))),
        }
    }

    /// Config from `$REVIEW_SCORING_CONFIG_PATH`, `config/scoring.toml`, or defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(ScoringConfig::load_default()?))
    }

    /// Current analyzer; requests in flight keep the one they started with.
    pub fn analyzer(&self) -> Arc<ReviewAnalyzer> {
        let guard = self.analyzer.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn swap(&self, config: ScoringConfig) {
        let fresh = Arc::new(ReviewAnalyzer::indonesian(config));
        let mut guard = self.analyzer.write().unwrap_or_else(PoisonError::into_inner);
        *guard = fresh;
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/batch", post(analyze_batch))
        .route("/summarize", post(summarize))
        .route("/recommend", post(recommend))
        .route("/admin/reload-config", get(admin_reload_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn analyze(State(state): State<AppState>, Json(body): Json<Value>) -> Json<ReviewAnalysisResult> {
    Json(state.analyzer().analyze_json(&body))
}

/// Invalid items become degenerate results in place; valid ones go through the
/// concurrent batch runner. Output order equals input order.
async fn score_items(analyzer: Arc<ReviewAnalyzer>, items: Vec<Value>) -> Vec<ReviewAnalysisResult> {
    let mut slots: Vec<Option<ReviewAnalysisResult>> = Vec::with_capacity(items.len());
    let mut valid_idx = Vec::new();
    let mut valid = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match review_from_json(item) {
            Ok(review) => {
                valid_idx.push(i);
                valid.push(review);
                slots.push(None);
            }
            Err(rejected) => slots.push(Some(rejected)),
        }
    }

    let scored = analyze_reviews_concurrent(analyzer, valid).await;
    for (i, res) in valid_idx.into_iter().zip(scored) {
        slots[i] = Some(res);
    }
    slots
        .into_iter()
        .map(|s| s.unwrap_or_else(|| ReviewAnalysisResult::degenerate("", None, "missing batch result")))
        .collect()
}

async fn analyze_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<Value>>,
) -> Json<Vec<ReviewAnalysisResult>> {
    Json(score_items(state.analyzer(), items).await)
}

async fn summarize(
    State(state): State<AppState>,
    Json(results): Json<Vec<ReviewAnalysisResult>>,
) -> Json<Option<RecommendationSummary>> {
    let locale = state.analyzer().config().summary.locale;
    Json(summarize_with_locale(&results, locale))
}

#[derive(serde::Serialize)]
struct RecommendResp {
    results: Vec<ReviewAnalysisResult>,
    summary: Option<RecommendationSummary>,
}

async fn recommend(State(state): State<AppState>, Json(items): Json<Vec<Value>>) -> Json<RecommendResp> {
    let analyzer = state.analyzer();
    let locale = analyzer.config().summary.locale;
    let results = score_items(analyzer, items).await;
    let summary = summarize_with_locale(&results, locale);
    Json(RecommendResp { results, summary })
}

async fn admin_reload_config(State(state): State<AppState>) -> String {
    match ScoringConfig::load_default() {
        Ok(cfg) => {
            state.swap(cfg);
            info!("scoring config reloaded");
            "reloaded".to_string()
        }
        Err(e) => {
            warn!(error = %e, "scoring config reload failed");
            format!("failed: {e:#}")
        }
    }
}
