use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{PageSize, Percentile};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Columns the scoring model needs; the upload gate rejects files without them.
pub const DEFAULT_REQUIRED_COLUMNS: &[&str] = &[
    "PRCTR", "BSCHL", "HKONT", "WAERS", "BUKRS", "KTOSL", "DMBTR", "WRBTR",
];

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub service: ServiceConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SCORELENS_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("SCORELENS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            service: ServiceConfig::from_env_profiled(p)?,
            upload: UploadConfig::from_env_profiled(p),
            session: SessionConfig::from_env_profiled(p)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        let service = &self.service;
        tracing::info!("  service:  url={}, timeout={}s", service.base_url, service.timeout_secs);
        tracing::info!(
            "  fields:   score={}, prediction={}",
            service.score_field,
            service.prediction_field
        );
        tracing::info!(
            "  upload:   max_bytes={}, required={}",
            self.upload.max_bytes,
            self.upload.required_columns.join(",")
        );
        tracing::info!(
            "  session:  page_size={}, percentile={}, debounce={}ms",
            self.session.default_page_size,
            self.session.default_percentile,
            self.session.debounce_ms
        );
    }

    /// Return a redacted view safe for display (credentials in the URL are dropped).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "service": {
                "url": self.service.redacted_url(),
                "timeout_secs": self.service.timeout_secs,
                "score_field": self.service.score_field,
                "prediction_field": self.service.prediction_field,
            },
            "upload": {
                "max_bytes": self.upload.max_bytes,
                "required_columns": self.upload.required_columns,
            },
            "session": {
                "default_page_size": self.session.default_page_size.get(),
                "default_percentile": self.session.default_percentile.get(),
                "debounce_ms": self.session.debounce_ms,
            },
        })
    }
}

// ── Scoring service ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Response field carrying the anomaly score.
    pub score_field: String,
    /// Response field carrying the 0/1 prediction.
    pub prediction_field: String,
    /// Size of the body chunks used for upload progress reporting.
    pub upload_chunk_bytes: usize,
}

impl ServiceConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let base_url = profiled_env_or(p, "SCORE_API_URL", "http://localhost:8000");
        validate_url(&base_url)?;
        Ok(Self {
            base_url,
            timeout_secs: profiled_env_u64(p, "SCORE_API_TIMEOUT_SECS", 120),
            score_field: profiled_env_or(p, "SCORE_FIELD", "anomaly_scored"),
            prediction_field: profiled_env_or(p, "PREDICTION_FIELD", "is_anomaly"),
            upload_chunk_bytes: profiled_env_u64(p, "UPLOAD_CHUNK_BYTES", 64 * 1024).max(1)
                as usize,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without user credentials.
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.base_url) {
            Ok(mut url) => {
                let _ = url.set_username("");
                let _ = url.set_password(None);
                url.to_string()
            }
            Err(_) => self.base_url.clone(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
            score_field: "anomaly_scored".to_string(),
            prediction_field: "is_anomaly".to_string(),
            upload_chunk_bytes: 64 * 1024,
        }
    }
}

/// Check that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ── Upload gate ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub required_columns: Vec<String>,
}

impl UploadConfig {
    fn from_env_profiled(p: &str) -> Self {
        let required_columns = match profiled_env_opt(p, "REQUIRED_COLUMNS") {
            Some(list) => list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            None => default_required_columns(),
        };
        Self {
            max_bytes: profiled_env_u64(p, "UPLOAD_MAX_BYTES", 10 * 1024 * 1024),
            required_columns,
        }
    }
}

fn default_required_columns() -> Vec<String> {
    DEFAULT_REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            required_columns: default_required_columns(),
        }
    }
}

// ── Session defaults ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub default_page_size: PageSize,
    pub default_percentile: Percentile,
    /// Quiet window before a draft percentile is committed.
    pub debounce_ms: u64,
}

impl SessionConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let page_size = profiled_env_u64(p, "DEFAULT_PAGE_SIZE", 20);
        let percentile = profiled_env_or(p, "DEFAULT_PERCENTILE", "95")
            .parse::<f64>()
            .map_err(|e| ConfigError::Other(format!("DEFAULT_PERCENTILE: {e}")))?;
        Ok(Self {
            default_page_size: PageSize::new(page_size as u32)?,
            default_percentile: Percentile::new(percentile)?,
            debounce_ms: profiled_env_u64(p, "PERCENTILE_DEBOUNCE_MS", 250),
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_page_size: PageSize::default(),
            default_percentile: Percentile::default(),
            debounce_ms: 250,
        }
    }
}
