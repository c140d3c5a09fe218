use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use weaklabel_learning::config::{LearnerConfig, StrategyKind};

/// One swept hyperparameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridParam {
    pub name: String,
    pub values: Vec<f64>,
}

/// Parameters for `weaklabel train`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    pub learner: LearnerConfig,
    pub train_data: Option<PathBuf>,
    /// Labelled table for grid search; also the evaluation set when no test
    /// table is given.
    pub dev_data: Option<PathBuf>,
    pub test_data: Option<PathBuf>,
    /// Swept in order, the first parameter varying slowest. Empty disables
    /// the search.
    pub grid: Vec<GridParam>,
    /// Training marginals are written here as `id<TAB>marginal`.
    pub marginals_output: Option<PathBuf>,
    /// Number of highest-weight features to log after training.
    pub top_features: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            train_data: None,
            dev_data: None,
            test_data: None,
            grid: Vec::new(),
            marginals_output: None,
            top_features: 10,
        }
    }
}

/// Load a training configuration from a JSON file.
pub fn load_train_config<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: TrainConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl TrainConfig {
    /// Load `config_path` and apply the command-line overrides of
    /// `weaklabel train`.
    pub fn from_arguments(config_path: &Path, matches: &ArgMatches) -> Result<Self> {
        let mut config = load_train_config(config_path)?;

        if let Some(path) = matches.get_one::<PathBuf>("train_data") {
            config.train_data = Some(path.clone());
        }
        if let Some(path) = matches.get_one::<PathBuf>("dev_data") {
            config.dev_data = Some(path.clone());
        }
        if let Some(path) = matches.get_one::<PathBuf>("test_data") {
            config.test_data = Some(path.clone());
        }
        if let Some(path) = matches.get_one::<PathBuf>("output_file") {
            config.marginals_output = Some(path.clone());
        }
        if let Some(strategy) = matches.get_one::<String>("strategy") {
            config.learner.strategy = strategy
                .parse::<StrategyKind>()
                .map_err(anyhow::Error::msg)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let train = self
            .train_data
            .as_ref()
            .context("No training data: set train_data in the config or pass --train")?;
        validate_table_path(train)?;
        for path in self.dev_data.iter().chain(self.test_data.iter()) {
            validate_table_path(path)?;
        }
        for param in &self.grid {
            if param.values.is_empty() {
                anyhow::bail!("Grid parameter '{}' has no values", param.name);
            }
        }
        Ok(())
    }
}

pub fn validate_table_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path.display()),
    }

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    Ok(())
}
