//! The `stats` and `train` flows of the command-line tool.
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};

use weaklabel_learning::config::StrategyKind;
use weaklabel_learning::grid_search::{GridSearch, GridSearchResult};
use weaklabel_learning::learner::{FeatureWeight, Learner};
use weaklabel_learning::scoring::Scores;
use weaklabel_learning::stats::{LfStat, SummaryStats};
use weaklabel_learning::training_set::TrainingSet;

use crate::config::TrainConfig;
use crate::output::write_marginals;
use crate::votes::{read_vote_table, record_featurizer, VoteTable};

#[derive(Debug, Clone)]
pub struct StatsReport {
    pub summary: SummaryStats,
    pub lfs: Vec<LfStat>,
}

/// Scores of the end model and both vote baselines on one labelled table.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub set: &'static str,
    pub model: Scores,
    pub majority_vote: Scores,
    pub weighted_majority_vote: Scores,
}

#[derive(Debug)]
pub struct TrainReport {
    pub n_train: usize,
    pub grid: Option<GridSearchResult>,
    pub evaluation: Option<EvalReport>,
    pub top_features: Vec<FeatureWeight>,
}

fn read_aligned(path: &Path, lf_names: &[String]) -> Result<VoteTable> {
    let mut table = read_vote_table(path)?;
    table
        .align_to(lf_names)
        .with_context(|| format!("LF columns of {} do not match training", path.display()))?;
    Ok(table)
}

/// Summary statistics of a vote table, plus per-LF accuracies on `dev_path`
/// when given.
pub fn run_stats(votes_path: &Path, dev_path: Option<&Path>) -> Result<StatsReport> {
    let table = read_vote_table(votes_path)?;
    let lfs = table.labeling_functions();
    let lf_names = table.lf_names.clone();
    let ts = TrainingSet::new(table.records, lfs, None)?;

    let lfs = match dev_path {
        Some(path) => {
            let dev = read_aligned(path, &lf_names)?;
            let gold = dev.gold("dev")?;
            ts.lf_stats(Some((&dev.records[..], gold)))?
        }
        None => ts.lf_stats(None)?,
    };
    Ok(StatsReport {
        summary: ts.summary_stats(),
        lfs,
    })
}

/// Build, train and evaluate a learner as described by `config`.
pub fn run_training(config: &TrainConfig) -> Result<TrainReport> {
    config.validate()?;
    let train_path = config
        .train_data
        .as_deref()
        .context("No training data configured")?;
    let train = read_vote_table(train_path)?;
    let lf_names = train.lf_names.clone();
    let dev = config
        .dev_data
        .as_deref()
        .map(|p| read_aligned(p, &lf_names))
        .transpose()?;
    let test = config
        .test_data
        .as_deref()
        .map(|p| read_aligned(p, &lf_names))
        .transpose()?;

    let strategy = config.learner.strategy;
    // The representation model featurizes candidates itself.
    let ts_featurizer = match strategy {
        StrategyKind::Representation => None,
        _ => Some(record_featurizer()),
    };
    let lfs = train.labeling_functions();
    let ts = Rc::new(TrainingSet::new(train.records, lfs, ts_featurizer)?);
    let mut learner = Learner::from_config(Rc::clone(&ts), &config.learner, Some(record_featurizer()))?;

    let hyperparams = &config.learner.hyperparams;
    let threshold = config.learner.threshold;

    let grid = match (config.grid.is_empty(), &dev) {
        (true, _) => None,
        (false, Some(dev)) => {
            let search = GridSearch::new(
                config.grid.iter().map(|p| p.name.clone()).collect(),
                config.grid.iter().map(|p| p.values.clone()).collect(),
            )?;
            let gold = dev.gold("dev")?;
            Some(search.fit(&mut learner, &dev.records, gold, hyperparams, threshold)?)
        }
        (false, None) => {
            log::warn!("Grid search needs dev_data; training once with the base hyperparameters");
            None
        }
    };
    if grid.is_none() {
        learner.train(hyperparams)?;
    }

    let eval_table = match (&test, &dev) {
        (Some(t), _) => Some(("test", t)),
        (None, Some(d)) => Some(("dev", d)),
        (None, None) => None,
    };
    let evaluation = match eval_table {
        Some((set, table)) if table.labels.is_some() => {
            let gold = table.gold(set)?;
            log::info!("Evaluating on the {} table ({} candidates)", set, table.len());
            let model = learner.test(&table.records, gold, threshold)?;
            model.log_report();
            let majority_vote = learner.test_mv(&table.records, gold)?;
            log::info!("Majority vote baseline:");
            majority_vote.log_report();
            let weighted_majority_vote = learner.test_wmv(&table.records, gold)?;
            log::info!("Weighted majority vote baseline:");
            weighted_majority_vote.log_report();
            Some(EvalReport {
                set,
                model,
                majority_vote,
                weighted_majority_vote,
            })
        }
        Some((set, _)) => {
            log::warn!("The {} table has no labels; skipping evaluation", set);
            None
        }
        None => None,
    };

    let top_features = learner.feature_stats(config.top_features)?;
    for f in &top_features {
        log::info!("{:>10.4}  {}", f.weight, f.name);
    }

    if let Some(path) = &config.marginals_output {
        let marginals = learner
            .training_marginals()
            .context("Learner holds no training marginals")?
            .to_vec();
        write_marginals(ts.candidates(), &marginals, path)?;
    }

    Ok(TrainReport {
        n_train: ts.n_candidates(),
        grid,
        evaluation,
        top_features,
    })
}
