//! Exhaustive hyperparameter sweep over a learner.
use std::hash::Hash;

use itertools::Itertools;

use crate::config::Hyperparams;
use crate::error::{LearnError, Result};
use crate::learner::Learner;

/// A Cartesian grid of named hyperparameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRun {
    /// Values in the order of [`GridSearchResult::param_names`].
    pub values: Vec<f64>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchResult {
    pub param_names: Vec<String>,
    pub runs: Vec<GridRun>,
    /// Index into `runs` of the configuration the learner was left with.
    pub best: Option<usize>,
}

impl GridSearchResult {
    pub fn best_run(&self) -> Option<&GridRun> {
        self.best.and_then(|i| self.runs.get(i))
    }

    /// The best configuration as hyperparameters.
    pub fn best_params(&self) -> Option<Hyperparams> {
        self.best_run().map(|run| {
            self.param_names
                .iter()
                .zip(run.values.iter())
                .fold(Hyperparams::new(), |hp, (name, &v)| hp.with(name.clone(), v))
        })
    }

    /// Runs sorted by F1, best first. Equal F1 keeps sweep order.
    pub fn ranked(&self) -> Vec<&GridRun> {
        let mut runs: Vec<&GridRun> = self.runs.iter().collect();
        runs.sort_by(|a, b| b.f1.total_cmp(&a.f1));
        runs
    }

    pub fn log_report(&self) {
        log::info!("{}", "=".repeat(60));
        log::info!("Grid search: {} configurations", self.runs.len());
        log::info!(
            "{}\tprecision\trecall\tf1",
            self.param_names.join("\t")
        );
        for run in &self.runs {
            log::info!(
                "{}\t{:.4}\t{:.4}\t{:.4}",
                run.values.iter().map(|v| v.to_string()).join("\t"),
                run.precision,
                run.recall,
                run.f1
            );
        }
        if let Some(best) = self.best_run() {
            log::info!("{}", "-".repeat(60));
            log::info!("Best F1 {:.4} at {:?}", best.f1, best.values);
        }
        log::info!("{}", "=".repeat(60));
    }
}

impl GridSearch {
    /// `names[i]` takes the values in `values[i]`.
    pub fn new(names: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if names.is_empty() {
            return Err(LearnError::InvalidGrid("no hyperparameter names".to_string()));
        }
        if names.len() != values.len() {
            return Err(LearnError::InvalidGrid(format!(
                "{} names but {} value lists",
                names.len(),
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| v.is_empty()) {
            return Err(LearnError::InvalidGrid(format!(
                "no values for '{}'",
                names[i]
            )));
        }
        if let Some(name) = names.iter().duplicates().next() {
            return Err(LearnError::InvalidGrid(format!("'{}' appears twice", name)));
        }
        Ok(GridSearch { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_configurations(&self) -> usize {
        self.values.iter().map(Vec::len).product()
    }

    /// Every grid point; the first name varies slowest.
    pub fn configurations(&self) -> Vec<Vec<f64>> {
        self.values
            .iter()
            .map(|v| v.iter().copied())
            .multi_cartesian_product()
            .collect()
    }

    /// Train and evaluate `learner` at every grid point.
    ///
    /// Each point is trained from scratch on `base` overlaid with the point's
    /// values and scored on the validation set. The first point with strictly
    /// the highest F1 wins; its weights are restored into `learner` once the
    /// sweep ends.
    pub fn fit<C: Clone + Hash + Eq>(
        &self,
        learner: &mut Learner<C>,
        cv_candidates: &[C],
        cv_gold: &[i32],
        base: &Hyperparams,
        threshold: f64,
    ) -> Result<GridSearchResult> {
        log::info!(
            "Grid search over {} configurations of [{}]",
            self.n_configurations(),
            self.names.join(", ")
        );

        let mut runs = Vec::with_capacity(self.n_configurations());
        let mut best: Option<(usize, f64)> = None;
        let mut best_snapshot = None;

        for (k, values) in self.configurations().into_iter().enumerate() {
            let mut hp = base.clone();
            for (name, &v) in self.names.iter().zip(values.iter()) {
                hp.set(name.clone(), v);
            }
            log::debug!("[{}/{}] {:?}", k + 1, self.n_configurations(), values);

            learner.train(&hp)?;
            let scores = learner.test(cv_candidates, cv_gold, threshold)?;
            log::info!(
                "[{}/{}] {:?}: P={:.4} R={:.4} F1={:.4}",
                k + 1,
                self.n_configurations(),
                values,
                scores.precision,
                scores.recall,
                scores.f1
            );

            let improved = best.map_or(true, |(_, f1)| scores.f1 > f1);
            if improved {
                best = Some((k, scores.f1));
                best_snapshot = Some(learner.snapshot());
            }
            runs.push(GridRun {
                values,
                precision: scores.precision,
                recall: scores.recall,
                f1: scores.f1,
            });
        }

        if let Some(snapshot) = &best_snapshot {
            learner.restore(snapshot)?;
        }
        let result = GridSearchResult {
            param_names: self.names.clone(),
            runs,
            best: best.map(|(k, _)| k),
        };
        result.log_report();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_configurations_first_name_slowest() {
        let grid = GridSearch::new(names(&["mu", "rate"]), vec![vec![1.0, 2.0], vec![0.1, 0.2, 0.3]])
            .unwrap();
        let configs = grid.configurations();
        assert_eq!(grid.n_configurations(), 6);
        assert_eq!(configs[0], vec![1.0, 0.1]);
        assert_eq!(configs[1], vec![1.0, 0.2]);
        assert_eq!(configs[3], vec![2.0, 0.1]);
        assert_eq!(configs[5], vec![2.0, 0.3]);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(matches!(
            GridSearch::new(vec![], vec![]),
            Err(LearnError::InvalidGrid(_))
        ));
        assert!(matches!(
            GridSearch::new(names(&["mu"]), vec![vec![1.0], vec![2.0]]),
            Err(LearnError::InvalidGrid(_))
        ));
        assert!(matches!(
            GridSearch::new(names(&["mu", "rate"]), vec![vec![1.0], vec![]]),
            Err(LearnError::InvalidGrid(_))
        ));
        assert!(matches!(
            GridSearch::new(names(&["mu", "mu"]), vec![vec![1.0], vec![2.0]]),
            Err(LearnError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_result_best_params_and_ranking() {
        let run = |v: f64, f1: f64| GridRun {
            values: vec![v],
            precision: f1,
            recall: f1,
            f1,
        };
        let result = GridSearchResult {
            param_names: names(&["mu"]),
            runs: vec![run(1.0, 0.5), run(2.0, 0.8), run(3.0, 0.8)],
            best: Some(1),
        };
        assert_eq!(result.best_params().unwrap().get("mu"), Some(2.0));
        let ranked = result.ranked();
        assert_eq!(ranked[0].values, vec![2.0]);
        assert_eq!(ranked[1].values, vec![3.0]);
        assert_eq!(ranked[2].values, vec![1.0]);
    }
}
