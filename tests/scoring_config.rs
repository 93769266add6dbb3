// tests/scoring_config.rs
use review_sentiment_analyzer::config::{
    ComparativeMode, ScoringConfig, SummaryLocale, ENV_SCORING_CONFIG_PATH,
};
use std::{env, fs};

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("scoring.toml");
    fs::write(
        &p,
        r#"
[rules]
negation_with_context = -1.5

[summary]
locale = "id"
"#,
    )
    .unwrap();
    let cfg = ScoringConfig::load_from_file(&p).unwrap();
    assert_eq!(cfg.rules.negation_with_context, -1.5);
    assert_eq!(cfg.rules.negation_plain, -1.2);
    assert_eq!(cfg.summary.locale, SummaryLocale::Id);
}

#[test]
fn missing_file_is_an_error_with_path() {
    let err = ScoringConfig::load_from_file("definitely/not/here.toml").unwrap_err();
    assert!(format!("{err:#}").contains("definitely/not/here.toml"));
}

#[test]
fn shipped_config_matches_defaults() {
    let cfg = ScoringConfig::load_from_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/scoring.toml"
    ))
    .unwrap();
    assert_eq!(cfg, ScoringConfig::default());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_SCORING_CONFIG_PATH);

    // 1) Nothing on disk -> defaults
    assert_eq!(ScoringConfig::load_default().unwrap(), ScoringConfig::default());

    // 2) Fallback ./config/scoring.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("scoring.toml"),
        "[aggregate]\ncomparative = \"characters\"\n",
    )
    .unwrap();
    let c = ScoringConfig::load_default().unwrap();
    assert_eq!(c.aggregate.comparative, ComparativeMode::Characters);

    // 3) Env var wins
    let p_env = tmp.path().join("custom.toml");
    fs::write(&p_env, "[batch]\nchunk_size = 3\n").unwrap();
    env::set_var(ENV_SCORING_CONFIG_PATH, &p_env);
    let c = ScoringConfig::load_default().unwrap();
    assert_eq!(c.batch.chunk_size, 3);
    assert_eq!(c.aggregate.comparative, ComparativeMode::Tokens);

    // 4) Env var pointing nowhere is an error
    env::set_var(ENV_SCORING_CONFIG_PATH, tmp.path().join("missing.toml"));
    assert!(ScoringConfig::load_default().is_err());

    env::remove_var(ENV_SCORING_CONFIG_PATH);
    env::set_current_dir(old).unwrap();
}
