use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};

/// Initial weight for every LF column.
pub const LF_W0: &str = "lf_w0";
/// Initial weight for every feature column.
pub const FEAT_W0: &str = "feat_w0";
/// Non-zero enables class balancing of the training marginals.
pub const CLASS_BALANCE: &str = "class_balance";

/// Named numeric hyperparameters handed to `Learner::train`.
///
/// The learner reads [`LF_W0`], [`FEAT_W0`] and [`CLASS_BALANCE`]; every entry
/// is also forwarded to the models, which look up the names they understand
/// (`rate`, `mu`, `alpha`, `n_iter`, ...) and fall back to their configured
/// defaults otherwise.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Hyperparams(BTreeMap<String, f64>);

impl Hyperparams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v != 0.0)
    }

    /// Read a non-negative integer such as an iteration count.
    pub fn count_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
            Some(v) => Err(LearnError::InvalidHyperparameter {
                name: name.to_string(),
                reason: format!("expected a non-negative integer, got {}", v),
            }),
        }
    }

    /// `self` with every entry of `overrides` replacing its namesake.
    pub fn merged(&self, overrides: &Hyperparams) -> Hyperparams {
        let mut out = self.clone();
        for (k, v) in overrides.iter() {
            out.set(k, v);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the label matrix, features and models are combined.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One model over `[L | F | bias]`.
    Joint,
    /// Generative model on `L`, then a discriminative model on `[F | bias]`.
    #[default]
    Pipelined,
    /// Generative model on `L`, then a model that featurizes raw candidates.
    Representation,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "joint" => Ok(StrategyKind::Joint),
            "pipelined" => Ok(StrategyKind::Pipelined),
            "representation" => Ok(StrategyKind::Representation),
            _ => Err(format!(
                "Unknown strategy: {}. Expected one of joint, pipelined, representation",
                s
            )),
        }
    }
}

/// Supported model types and their default hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    /// Elastic-net logistic regression fit by gradient descent on soft labels.
    LogReg {
        rate: f64,
        mu: f64,
        alpha: f64,
        n_iter: usize,
        tol: f64,
    },
    /// Independent-LF accuracy model fit by expectation maximization.
    LfAccuracy {
        n_iter: usize,
        tol: f64,
        smoothing: f64,
    },
}

impl ModelType {
    pub fn logreg() -> Self {
        ModelType::LogReg {
            rate: 0.01,
            mu: 1e-7,
            alpha: 0.0,
            n_iter: 500,
            tol: 1e-6,
        }
    }

    pub fn lf_accuracy() -> Self {
        ModelType::LfAccuracy {
            n_iter: 100,
            tol: 1e-6,
            smoothing: 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelType::LogReg { .. } => "logreg",
            ModelType::LfAccuracy { .. } => "lf_accuracy",
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::logreg()
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logreg" => Ok(ModelType::logreg()),
            "lf_accuracy" | "em" => Ok(ModelType::lf_accuracy()),
            _ => Err(format!(
                "Unknown model type: {}. Expected logreg or lf_accuracy",
                s
            )),
        }
    }
}

/// Central configuration for one model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Append a constant column to the design matrix and learn an intercept.
    pub bias_term: bool,

    #[serde(flatten)]
    pub model_type: ModelType,
}

impl ModelConfig {
    pub fn new(bias_term: bool, model_type: ModelType) -> Self {
        Self {
            bias_term,
            model_type,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bias_term: false,
            model_type: ModelType::default(),
        }
    }
}

/// Everything needed to build and drive a learner.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LearnerConfig {
    pub strategy: StrategyKind,
    /// Model of LF reliability (two-stage strategies only).
    pub generative: ModelConfig,
    /// End model; in joint mode the only model.
    pub discriminative: ModelConfig,
    /// Marginal above which a candidate is predicted positive.
    pub threshold: f64,
    /// Seed for class balancing.
    pub seed: u64,
    pub hyperparams: Hyperparams,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            generative: ModelConfig::new(false, ModelType::lf_accuracy()),
            discriminative: ModelConfig::new(true, ModelType::logreg()),
            threshold: 0.5,
            seed: 42,
            hyperparams: Hyperparams::new(),
        }
    }
}
