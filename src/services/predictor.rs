///! Burnout prediction strategies
///! - rules: fixed scoring table, always available
///! - model: logistic model with weights loaded from JSON at startup
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const RULES_POSITIVE_AT: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictorInput {
    pub mood: i16,
    pub stress: i16,
    pub energy: i16,
    pub sleep_hours: f64,
    pub sleep_quality: i16,
    #[serde(default)]
    pub days_without_rest: i32,
    #[serde(default = "default_work_hours")]
    pub avg_work_hours: f64,
}

fn default_work_hours() -> f64 {
    8.0
}

impl PredictorInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("mood", self.mood),
            ("stress", self.stress),
            ("energy", self.energy),
            ("sleep_quality", self.sleep_quality),
        ] {
            if !(1..=10).contains(&value) {
                return Err(DomainError::OutOfRange {
                    field,
                    min: 1.0,
                    max: 10.0,
                });
            }
        }
        if !(0.0..=24.0).contains(&self.sleep_hours) {
            return Err(DomainError::OutOfRange {
                field: "sleep_hours",
                min: 0.0,
                max: 24.0,
            });
        }
        if !(0..=365).contains(&self.days_without_rest) {
            return Err(DomainError::OutOfRange {
                field: "days_without_rest",
                min: 0.0,
                max: 365.0,
            });
        }
        if !(0.0..=24.0).contains(&self.avg_work_hours) {
            return Err(DomainError::OutOfRange {
                field: "avg_work_hours",
                min: 0.0,
                max: 24.0,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BurnoutPrediction {
    pub at_risk: bool,
    pub probability: f64,
    pub score: f64,
    pub predictor: &'static str,
}

pub trait BurnoutPredictor: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict(&self, input: &PredictorInput) -> BurnoutPrediction;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedPredictor;

impl BurnoutPredictor for RuleBasedPredictor {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn predict(&self, input: &PredictorInput) -> BurnoutPrediction {
        let mut score = 0.0;

        score += match input.mood {
            m if m <= 4 => 2.0,
            m if m <= 6 => 1.0,
            _ => 0.0,
        };
        score += match input.stress {
            s if s >= 8 => 3.0,
            s if s >= 6 => 1.5,
            _ => 0.0,
        };
        score += match input.energy {
            e if e <= 3 => 2.5,
            e if e <= 5 => 1.0,
            _ => 0.0,
        };
        if input.sleep_hours < 5.0 {
            score += 2.0;
        } else if input.sleep_hours < 6.0 {
            score += 1.0;
        }
        if input.sleep_quality <= 4 {
            score += 1.5;
        }

        let probability = (score / 10.0_f64).min(1.0);
        BurnoutPrediction {
            at_risk: probability >= RULES_POSITIVE_AT,
            probability,
            score,
            predictor: self.name(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model threshold must be within (0, 1), got {0}")]
    Threshold(f64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureWeights {
    pub mood: f64,
    pub stress: f64,
    pub energy: f64,
    pub sleep_hours: f64,
    pub sleep_quality: f64,
    pub days_without_rest: f64,
    pub avg_work_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModelPredictor {
    pub bias: f64,
    pub weights: FeatureWeights,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LinearModelPredictor {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(raw)?;
        if !(model.threshold > 0.0 && model.threshold < 1.0) {
            return Err(ModelError::Threshold(model.threshold));
        }
        Ok(model)
    }

    fn logit(&self, input: &PredictorInput) -> f64 {
        let w = &self.weights;
        self.bias
            + w.mood * f64::from(input.mood)
            + w.stress * f64::from(input.stress)
            + w.energy * f64::from(input.energy)
            + w.sleep_hours * input.sleep_hours
            + w.sleep_quality * f64::from(input.sleep_quality)
            + w.days_without_rest * f64::from(input.days_without_rest)
            + w.avg_work_hours * input.avg_work_hours
    }
}

impl BurnoutPredictor for LinearModelPredictor {
    fn name(&self) -> &'static str {
        "model"
    }

    fn predict(&self, input: &PredictorInput) -> BurnoutPrediction {
        let score = self.logit(input);
        let probability = 1.0 / (1.0 + (-score).exp());
        BurnoutPrediction {
            at_risk: probability >= self.threshold,
            probability,
            score,
            predictor: self.name(),
        }
    }
}
