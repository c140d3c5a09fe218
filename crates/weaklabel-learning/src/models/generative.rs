use ndarray::Array1;

use crate::config::Hyperparams;
use crate::error::{LearnError, Result};
use crate::math::{mat_vec, odds_to_prob, sigmoid, with_rows, SparseMatrix};
use crate::models::classifier_trait::NoiseAwareModel;

/// Generative model of labeling-function reliability.
///
/// Each LF is assumed to vote independently, with the same accuracy `a_j` on
/// positive and negative candidates, and to abstain independently of the
/// true class. Under those assumptions the posterior log-odds of a candidate
/// is `sum_j L_ij * logit(a_j)`, so the weights are the LF log-odds and
/// `marginals` is a logistic link over `L`.
///
/// Fitting is expectation maximization starting from `w0`: the E-step turns
/// the current weights into marginals, the M-step re-estimates each `a_j` as
/// the marginal-weighted agreement rate of LF `j`. `smoothing` pseudo-votes
/// at the initial accuracy `sigmoid(w0_j)` are added to every estimate, so an
/// LF that never overlaps another keeps its initial weight.
#[derive(Debug, Clone)]
pub struct LfAccuracyModel {
    n_iter: usize,
    tol: f64,
    smoothing: f64,
    w: Option<Array1<f64>>,
}

impl LfAccuracyModel {
    /// A model with the same defaults as `ModelType::lf_accuracy()`.
    pub fn new() -> Self {
        Self::with_params(100, 1e-6, 1.0)
    }

    pub fn with_params(n_iter: usize, tol: f64, smoothing: f64) -> Self {
        LfAccuracyModel {
            n_iter,
            tol,
            smoothing,
            w: None,
        }
    }
}

impl Default for LfAccuracyModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-estimate the LF log-odds from per-row positive probabilities.
fn m_step(l: &SparseMatrix, mu: &Array1<f64>, prior: &Array1<f64>, smoothing: f64) -> Array1<f64> {
    let mut agree = Array1::<f64>::zeros(l.cols());
    let mut total = Array1::<f64>::zeros(l.cols());
    with_rows(l, |l| {
        for (i, row) in l.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                // A positive vote agrees with weight mu_i, a negative one with 1 - mu_i.
                agree[j] += v.max(0.0) * mu[i] + (-v).max(0.0) * (1.0 - mu[i]);
                total[j] += v.abs();
            }
        }
    });
    let mut w = Array1::<f64>::zeros(l.cols());
    for j in 0..l.cols() {
        let acc = if total[j] + smoothing > 0.0 {
            (agree[j] + smoothing * prior[j]) / (total[j] + smoothing)
        } else {
            prior[j]
        };
        // Unsmoothed estimates can hit 0 or 1; clamp to keep the logit finite.
        let acc = acc.clamp(1e-6, 1.0 - 1e-6);
        w[j] = (acc / (1.0 - acc)).ln();
    }
    w
}

impl NoiseAwareModel for LfAccuracyModel {
    fn train(
        &mut self,
        x: &SparseMatrix,
        w0: &Array1<f64>,
        marginals: Option<&Array1<f64>>,
        hyperparams: &Hyperparams,
    ) -> Result<()> {
        if w0.len() != x.cols() {
            return Err(LearnError::shape("lf_accuracy initial weights", x.cols(), w0.len()));
        }
        let n_iter = hyperparams.count_or("n_iter", self.n_iter)?;
        let tol = hyperparams.get_or("tol", self.tol);
        let smoothing = hyperparams.get_or("smoothing", self.smoothing);
        if smoothing < 0.0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "smoothing".to_string(),
                reason: format!("must be non-negative, got {}", smoothing),
            });
        }

        if let Some(m) = marginals {
            if m.len() != x.rows() {
                return Err(LearnError::shape("lf_accuracy marginals", x.rows(), m.len()));
            }
            log::debug!("Estimating LF accuracies directly from supplied marginals");
            self.w = Some(m_step(x, m, &odds_to_prob(w0), smoothing));
            return Ok(());
        }

        log::debug!(
            "Fitting LF accuracies by EM on {} candidates x {} LFs",
            x.rows(),
            x.cols()
        );
        let prior = odds_to_prob(w0);
        let mut w = w0.clone();
        for step in 0..n_iter {
            let mu = mat_vec(x, &w)?.mapv(sigmoid);
            let next = m_step(x, &mu, &prior, smoothing);
            let delta = next
                .iter()
                .zip(w.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            w = next;
            if delta < tol {
                log::trace!("EM converged after {} iterations", step + 1);
                break;
            }
        }
        self.w = Some(w);
        Ok(())
    }

    fn marginals(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let w = self
            .w
            .as_ref()
            .ok_or(LearnError::NotTrained("LF accuracy weights"))?;
        Ok(mat_vec(x, w)?.mapv(sigmoid))
    }

    fn weights(&self) -> Option<&Array1<f64>> {
        self.w.as_ref()
    }

    fn set_weights(&mut self, w: Array1<f64>) {
        self.w = Some(w);
    }

    fn name(&self) -> &str {
        "lf_accuracy"
    }
}
