use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::lexicon::Lexicon;
use crate::recommendation::RecommendationTier;
use crate::review::ReviewAnalysisResult;

static GLOBAL: OnceCell<Metrics> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe the series.
    /// Later calls return the same instance.
    pub fn install() -> anyhow::Result<&'static Metrics> {
        GLOBAL.get_or_try_init(|| {
            // Use default buckets to avoid API differences across crate versions.
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
            describe();
            gauge!("lexicon_stem_roots").set(Lexicon::embedded().stemmer().root_count() as f64);
            Ok(Self { handle })
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("reviews_analyzed_total", "Reviews scored, degenerate ones included.");
    describe_counter!(
        "reviews_degenerate_total",
        "Reviews that produced a degenerate zero-score result."
    );
    describe_counter!("summaries_total", "Recommendation summaries computed, by tier.");
    describe_histogram!("review_score", "Final clamped review score.");
    describe_gauge!("lexicon_stem_roots", "Roots known to the stemmer.");
}

pub(crate) fn record_review(res: &ReviewAnalysisResult) {
    counter!("reviews_analyzed_total").increment(1);
    if res.is_degenerate() {
        counter!("reviews_degenerate_total").increment(1);
    } else {
        histogram!("review_score").record(res.score);
    }
}

pub(crate) fn record_summary(tier: RecommendationTier) {
    let tier = format!("{tier:?}").to_ascii_lowercase();
    counter!("summaries_total", "tier" => tier).increment(1);
}

/// Short anonymized id for log lines; raw review text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_stable_and_short() {
        let a = anon_hash("barang bagus");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("barang bagus"));
        assert_ne!(a, anon_hash("barang jelek"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
