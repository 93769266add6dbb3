// src/config.rs
//! Scoring configuration: every tunable constant of the rule engine, the
//! aggregator, the summary text, and the batch runner.
//!
//! Loaded from TOML. Missing keys fall back to defaults; out-of-range values
//! are sanitized back to defaults instead of failing the load.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SCORING_CONFIG_PATH: &str = "REVIEW_SCORING_CONFIG_PATH";
pub const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";

fn default_context_boost() -> f64 {
    1.2
}
fn default_negation_context() -> f64 {
    -1.3
}
fn default_negation_plain() -> f64 {
    -1.2
}
fn default_intensifier_context() -> f64 {
    1.3
}
fn default_intensifier_plain() -> f64 {
    1.1
}
fn default_context_comparative_factor() -> f64 {
    0.1
}
fn default_phrase_bonus() -> f64 {
    2.0
}
fn default_kendala_serious_below() -> f64 {
    -1.0
}
fn default_score_bound() -> f64 {
    5.0
}
fn default_chunk_size() -> usize {
    10
}
fn default_max_in_flight() -> usize {
    4
}

/// Rule-engine weights (token/bigram scan, modifiers, comparative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleWeights {
    /// Multiplier for a bigram tied to an active context.
    #[serde(default = "default_context_boost")]
    pub bigram_context_boost: f64,
    /// Multiplier for a polar single token that is itself a context keyword.
    #[serde(default = "default_context_boost")]
    pub token_context_boost: f64,
    #[serde(default = "default_negation_context")]
    pub negation_with_context: f64,
    #[serde(default = "default_negation_plain")]
    pub negation_plain: f64,
    #[serde(default = "default_intensifier_context")]
    pub intensifier_with_context: f64,
    #[serde(default = "default_intensifier_plain")]
    pub intensifier_plain: f64,
    /// Comparative grows by this much per distinct active context.
    #[serde(default = "default_context_comparative_factor")]
    pub context_comparative_factor: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            bigram_context_boost: default_context_boost(),
            token_context_boost: default_context_boost(),
            negation_with_context: default_negation_context(),
            negation_plain: default_negation_plain(),
            intensifier_with_context: default_intensifier_context(),
            intensifier_plain: default_intensifier_plain(),
            context_comparative_factor: default_context_comparative_factor(),
        }
    }
}

/// Length measure the per-review comparative score is divided by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparativeMode {
    /// Final score / max(1, body token count).
    #[default]
    Tokens,
    /// Final score / character length of body plus kendala.
    Characters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Added for a positive body phrase, subtracted for a negative one.
    #[serde(default = "default_phrase_bonus")]
    pub phrase_bonus: f64,
    /// A kendala scoring strictly below this is a serious complaint.
    #[serde(default = "default_kendala_serious_below")]
    pub kendala_serious_below: f64,
    /// Final scores are clamped to `[-score_bound, score_bound]`.
    #[serde(default = "default_score_bound")]
    pub score_bound: f64,
    #[serde(default)]
    pub comparative: ComparativeMode,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            phrase_bonus: default_phrase_bonus(),
            kendala_serious_below: default_kendala_serious_below(),
            score_bound: default_score_bound(),
            comparative: ComparativeMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLocale {
    #[default]
    En,
    Id,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub locale: SummaryLocale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Chunks scored at the same time.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub rules: RuleWeights,
    #[serde(default)]
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl ScoringConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScoringConfig = toml::from_str(s).context("parsing scoring config TOML")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading scoring config from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("loading scoring config from {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $REVIEW_SCORING_CONFIG_PATH
    /// 2) config/scoring.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SCORING_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!(
                "{ENV_SCORING_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            ));
        }
        let default_p = PathBuf::from(DEFAULT_SCORING_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default())
    }

    /// Replace values that would break scoring invariants with defaults.
    pub fn sanitized(mut self) -> Self {
        let r = &mut self.rules;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(r.bigram_context_boost) {
            r.bigram_context_boost = default_context_boost();
        }
        if !positive(r.token_context_boost) {
            r.token_context_boost = default_context_boost();
        }
        // Negators must flip the sign, intensifiers must keep it.
        if !(r.negation_with_context.is_finite() && r.negation_with_context < 0.0) {
            r.negation_with_context = default_negation_context();
        }
        if !(r.negation_plain.is_finite() && r.negation_plain < 0.0) {
            r.negation_plain = default_negation_plain();
        }
        if !positive(r.intensifier_with_context) {
            r.intensifier_with_context = default_intensifier_context();
        }
        if !positive(r.intensifier_plain) {
            r.intensifier_plain = default_intensifier_plain();
        }
        if !(r.context_comparative_factor.is_finite() && r.context_comparative_factor >= 0.0) {
            r.context_comparative_factor = default_context_comparative_factor();
        }

        let a = &mut self.aggregate;
        if !(a.phrase_bonus.is_finite() && a.phrase_bonus >= 0.0) {
            a.phrase_bonus = default_phrase_bonus();
        }
        if !a.kendala_serious_below.is_finite() {
            a.kendala_serious_below = default_kendala_serious_below();
        }
        if !positive(a.score_bound) {
            a.score_bound = default_score_bound();
        }

        let b = &mut self.batch;
        if b.chunk_size == 0 {
            b.chunk_size = default_chunk_size();
        }
        if b.max_in_flight == 0 {
            b.max_in_flight = default_max_in_flight();
        }
        self
    }
}
