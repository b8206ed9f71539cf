//! Statistical model loading and blending
//!
//! The model is a logistic regression exported by the offline trainer as
//! a JSON parameter file: feature names, standardization means/stds,
//! coefficients, and an intercept, all index-aligned. It is loaded once
//! at engine construction and pinned behind an explicit, thread-safe
//! reload operation; nothing memoizes it implicitly.

use crate::error::{EngineError, Result};
use riskgate_core::{clamp01, EvaluationContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Logistic regression parameters exported by the trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerModel {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub coefs: Vec<f64>,
    pub intercept: f64,

    /// Trainer metadata (trained_at, n_samples, ...); opaque here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl RankerModel {
    /// Parse and validate a model from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        let model: RankerModel = serde_json::from_str(json)
            .map_err(|e| EngineError::ModelLoad(format!("invalid model JSON: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a JSON parameter file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ModelLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<()> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(EngineError::ModelLoad("model has no features".to_string()));
        }
        if self.means.len() != n || self.stds.len() != n || self.coefs.len() != n {
            return Err(EngineError::ModelLoad(format!(
                "misaligned model arrays: {} names, {} means, {} stds, {} coefs",
                n,
                self.means.len(),
                self.stds.len(),
                self.coefs.len()
            )));
        }
        Ok(())
    }

    /// Model probability for a feature map.
    ///
    /// Features missing from the map default to 0; each feature is
    /// standardized with `(raw - mean) / (std or 1)`.
    pub fn probability(&self, features: &HashMap<String, f64>) -> f64 {
        let mut dot = self.intercept;
        for (i, name) in self.feature_names.iter().enumerate() {
            let raw = features.get(name).copied().unwrap_or(0.0);
            let std = if self.stds[i] == 0.0 { 1.0 } else { self.stds[i] };
            dot += self.coefs[i] * ((raw - self.means[i]) / std);
        }
        sigmoid(dot)
    }
}

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Blend the heuristic score with a model probability.
///
/// `alpha` weighs the heuristic; without a model probability the
/// heuristic passes through unchanged (alpha effectively 1).
pub fn blend(alpha: f64, heuristic: f64, model_probability: Option<f64>) -> f64 {
    match model_probability {
        Some(p) => clamp01(alpha * heuristic + (1.0 - alpha) * p),
        None => heuristic,
    }
}

/// Flatten an evaluation into the feature map the trainer learned on:
/// the amount in major units, the heuristic score, and one
/// `<rule>_score` entry per signal.
pub fn feature_vector(
    ctx: &EvaluationContext,
    heuristic_score: f64,
    signal_scores: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mut features = HashMap::with_capacity(signal_scores.len() + 2);
    // The trainer works in major units; minor units convert only here
    features.insert("amount".to_string(), ctx.amount_minor as f64 / 100.0);
    features.insert("heuristic_score".to_string(), heuristic_score);
    for (name, score) in signal_scores {
        features.insert(format!("{}_score", name), *score);
    }
    features
}

/// Explicitly constructed, injectable model provider with a load-once
/// lifecycle and an explicit reload
pub struct ModelProvider {
    path: Option<PathBuf>,
    model: RwLock<Option<Arc<RankerModel>>>,
}

impl ModelProvider {
    /// Provider with no model; evaluations skip blending
    pub fn disabled() -> Self {
        Self {
            path: None,
            model: RwLock::new(None),
        }
    }

    /// Load the model from `path` once, failing construction on a bad file
    pub fn load(path: PathBuf) -> Result<Self> {
        let model = RankerModel::from_file(&path)?;
        tracing::info!(
            path = %path.display(),
            features = model.feature_names.len(),
            "ranker model loaded"
        );
        Ok(Self {
            path: Some(path),
            model: RwLock::new(Some(Arc::new(model))),
        })
    }

    /// Wrap an already-built model (tests, embedded parameters)
    pub fn from_model(model: RankerModel) -> Self {
        Self {
            path: None,
            model: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Re-read the parameter file. On failure the previous model stays
    /// active and the error is returned to the caller of the explicit
    /// reload; evaluations are never affected.
    pub fn reload(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| EngineError::ModelLoad("no model path configured".to_string()))?;
        let fresh = RankerModel::from_file(path)?;

        let mut guard = self
            .model
            .write()
            .map_err(|e| EngineError::ModelLoad(format!("lock poisoned: {}", e)))?;
        *guard = Some(Arc::new(fresh));

        tracing::info!(path = %path.display(), "ranker model reloaded");
        Ok(())
    }

    /// Currently pinned model, if any
    pub fn current(&self) -> Option<Arc<RankerModel>> {
        self.model.read().ok().and_then(|guard| guard.clone())
    }
}
