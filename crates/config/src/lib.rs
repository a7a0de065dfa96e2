use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Retrieval tuning, spec §6 environment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// `RETRIEVAL_K` — size of each arm's (lexical/dense) candidate list
    /// before fusion.
    pub k: usize,
    /// `FUSION_C` — RRF constant.
    pub fusion_c: f32,
    /// `AUTHORITY_BOOST` — multiplier applied to `.edu`/`.gov` sources.
    pub authority_boost: f32,
    /// `SCORE_FLOOR` — minimum fused+boosted score to survive Stage C.
    pub score_floor: f32,
    /// `TOP_N` — number of candidates returned to the Router.
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 50,
            fusion_c: 60.0,
            authority_boost: 1.5,
            score_floor: 0.3,
            top_n: 8,
        }
    }
}

impl RetrievalConfig {
    /// The widened parameters a handler retries with once after a
    /// validator rejection (spec §4.4: "widen retrieval (k=12,
    /// threshold 0.25)").
    pub fn widened(&self) -> Self {
        Self {
            k: 12,
            fusion_c: self.fusion_c,
            authority_boost: self.authority_boost,
            score_floor: 0.25,
            top_n: self.top_n,
        }
    }
}

/// Validator thresholds, spec §4.6 / §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// `CITATION_COVERAGE_FLOOR`
    pub citation_coverage_floor: f32,
    /// `MIN_AUTHORITATIVE_SOURCES`
    pub min_authoritative_sources: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            citation_coverage_floor: 0.90,
            min_authoritative_sources: 3,
        }
    }
}

/// Handler retry policy, spec §4.4 / §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// `HANDLER_RETRY_LIMIT`
    pub retry_limit: u8,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self { retry_limit: 1 }
    }
}

/// Engine-wide parameters not owned by a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `CURRENT_YEAR` — temporal guardrail comparison. Defaults to the
    /// process clock's year at config-load time (a later `CURRENT_YEAR`
    /// env override always wins, see [`AppConfig::load_from`]).
    pub current_year: i32,
    /// Per-request deadline (spec §5 "Cancellation/timeout"). Exceeding
    /// it before a handler returns yields an `INSUFFICIENT_EVIDENCE`
    /// abstention rather than a technical error.
    pub request_deadline_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            current_year: chrono::Utc::now().format("%Y").to_string().parse().unwrap_or(2024),
            request_deadline_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub retrieval: RetrievalConfig,
    pub validator: ValidatorConfig,
    pub handler: HandlerConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("CURRENT_YEAR") {
            if let Ok(year) = value.parse() {
                config.engine.current_year = year;
            }
        }
        if let Ok(value) = env::var("RETRIEVAL_K") {
            if let Ok(k) = value.parse() {
                config.retrieval.k = k;
            }
        }
        if let Ok(value) = env::var("FUSION_C") {
            if let Ok(c) = value.parse() {
                config.retrieval.fusion_c = c;
            }
        }
        if let Ok(value) = env::var("AUTHORITY_BOOST") {
            if let Ok(b) = value.parse() {
                config.retrieval.authority_boost = b;
            }
        }
        if let Ok(value) = env::var("SCORE_FLOOR") {
            if let Ok(f) = value.parse() {
                config.retrieval.score_floor = f;
            }
        }
        if let Ok(value) = env::var("TOP_N") {
            if let Ok(n) = value.parse() {
                config.retrieval.top_n = n;
            }
        }
        if let Ok(value) = env::var("CITATION_COVERAGE_FLOOR") {
            if let Ok(f) = value.parse() {
                config.validator.citation_coverage_floor = f;
            }
        }
        if let Ok(value) = env::var("MIN_AUTHORITATIVE_SOURCES") {
            if let Ok(n) = value.parse() {
                config.validator.min_authoritative_sources = n;
            }
        }
        if let Ok(value) = env::var("HANDLER_RETRY_LIMIT") {
            if let Ok(n) = value.parse() {
                config.handler.retry_limit = n;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_env_parameters() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.k, 50);
        assert_eq!(config.retrieval.fusion_c, 60.0);
        assert_eq!(config.retrieval.authority_boost, 1.5);
        assert_eq!(config.retrieval.score_floor, 0.3);
        assert_eq!(config.retrieval.top_n, 8);
        assert_eq!(config.validator.citation_coverage_floor, 0.90);
        assert_eq!(config.validator.min_authoritative_sources, 3);
        assert_eq!(config.handler.retry_limit, 1);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/path/meridian.toml").unwrap();
        assert_eq!(config.retrieval.top_n, 8);
    }

    #[test]
    fn widened_retrieval_matches_spec_retry_parameters() {
        let widened = RetrievalConfig::default().widened();
        assert_eq!(widened.k, 12);
        assert_eq!(widened.score_floor, 0.25);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = std::env::temp_dir().join(format!("meridian-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.retrieval.top_n = 12;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.top_n, 12);

        fs::remove_dir_all(&dir).ok();
    }
}
