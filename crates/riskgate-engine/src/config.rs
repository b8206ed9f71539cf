//! Engine configuration
//!
//! Configuration is environment-style: every knob has a default and a
//! `RISKGATE_*` environment variable override. Validation happens once at
//! engine construction; it is the only place the engine rejects input.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Velocity window and limit for one counter scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocityScopeConfig {
    /// Counting window in seconds (TTL set on the first increment)
    pub window_secs: u64,

    /// Count above which the velocity score starts growing
    pub limit: i64,
}

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Final score at or above which the decision is manual review
    pub flag_threshold: f64,

    /// Final score at or above which the decision is deny
    pub deny_threshold: f64,

    /// Blend weight for the heuristic score; (1 - alpha) goes to the model
    pub model_alpha: f64,

    /// Final score at or above which an alert is dispatched
    pub alert_threshold: f64,

    /// Path to the trained ranker model JSON (optional)
    pub model_path: Option<PathBuf>,

    /// Per-IP velocity scope
    pub velocity_ip: VelocityScopeConfig,

    /// Per-user velocity scope
    pub velocity_user: VelocityScopeConfig,

    /// IP intelligence API token; lookups are skipped without one
    pub ipinfo_token: Option<String>,

    /// Base URL override for the BIN directory lookup
    pub bin_api_base: Option<String>,
}

impl EngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            flag_threshold: 0.6,
            deny_threshold: 0.85,
            model_alpha: 0.6,
            alert_threshold: 0.9,
            model_path: None,
            velocity_ip: VelocityScopeConfig {
                window_secs: 60,
                limit: 20,
            },
            velocity_user: VelocityScopeConfig {
                window_secs: 300,
                limit: 10,
            },
            ipinfo_token: None,
            bin_api_base: None,
        }
    }

    /// Load configuration from `RISKGATE_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Self {
        let mut config = Self::new();

        config.flag_threshold = env_f64("RISKGATE_FLAG_THRESHOLD", config.flag_threshold);
        config.deny_threshold = env_f64("RISKGATE_DENY_THRESHOLD", config.deny_threshold);
        config.model_alpha = env_f64("RISKGATE_MODEL_ALPHA", config.model_alpha);
        config.alert_threshold = env_f64("RISKGATE_ALERT_THRESHOLD", config.alert_threshold);
        config.model_path = std::env::var("RISKGATE_MODEL_PATH").ok().map(PathBuf::from);
        config.velocity_ip.window_secs =
            env_u64("RISKGATE_VELOCITY_IP_WINDOW_SECS", config.velocity_ip.window_secs);
        config.velocity_ip.limit = env_i64("RISKGATE_VELOCITY_IP_LIMIT", config.velocity_ip.limit);
        config.velocity_user.window_secs = env_u64(
            "RISKGATE_VELOCITY_USER_WINDOW_SECS",
            config.velocity_user.window_secs,
        );
        config.velocity_user.limit =
            env_i64("RISKGATE_VELOCITY_USER_LIMIT", config.velocity_user.limit);
        config.ipinfo_token = std::env::var("RISKGATE_IPINFO_TOKEN").ok();
        config.bin_api_base = std::env::var("RISKGATE_BIN_API_BASE").ok();

        config
    }

    /// Set the flag threshold
    pub fn with_flag_threshold(mut self, threshold: f64) -> Self {
        self.flag_threshold = threshold;
        self
    }

    /// Set the deny threshold
    pub fn with_deny_threshold(mut self, threshold: f64) -> Self {
        self.deny_threshold = threshold;
        self
    }

    /// Set the model blend weight
    pub fn with_model_alpha(mut self, alpha: f64) -> Self {
        self.model_alpha = alpha;
        self
    }

    /// Set the model file path
    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_path = Some(path);
        self
    }

    /// Set the alert threshold
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    /// Set the per-IP velocity scope
    pub fn with_velocity_ip(mut self, scope: VelocityScopeConfig) -> Self {
        self.velocity_ip = scope;
        self
    }

    /// Set the per-user velocity scope
    pub fn with_velocity_user(mut self, scope: VelocityScopeConfig) -> Self {
        self.velocity_user = scope;
        self
    }

    /// Set the IP intelligence token
    pub fn with_ipinfo_token(mut self, token: impl Into<String>) -> Self {
        self.ipinfo_token = Some(token.into());
        self
    }

    /// Validate thresholds and blend weight
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("flag_threshold", self.flag_threshold),
            ("deny_threshold", self.deny_threshold),
            ("model_alpha", self.model_alpha),
            ("alert_threshold", self.alert_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.flag_threshold >= self.deny_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "flag_threshold ({}) must be below deny_threshold ({})",
                self.flag_threshold, self.deny_threshold
            )));
        }
        if self.velocity_ip.limit <= 0 || self.velocity_user.limit <= 0 {
            return Err(EngineError::InvalidConfig(
                "velocity limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
