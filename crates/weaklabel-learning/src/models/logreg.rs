use ndarray::Array1;

use crate::config::Hyperparams;
use crate::error::{LearnError, Result};
use crate::math::{mat_vec, sigmoid, with_rows, SparseMatrix};
use crate::models::classifier_trait::NoiseAwareModel;

/// Elastic-net logistic regression trained on soft labels.
///
/// The loss is the mean cross-entropy between `sigmoid(x_i . w)` and the
/// per-row target, plus `mu * ((1 - alpha) / 2 * |w|^2 + alpha * |w|_1)`.
/// The L2 part enters the gradient step and the L1 part is applied as a
/// soft-threshold after it. A trailing bias column is never penalized.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    rate: f64,
    mu: f64,
    alpha: f64,
    n_iter: usize,
    tol: f64,
    bias_term: bool,
    w: Option<Array1<f64>>,
}

struct Fit {
    rate: f64,
    mu: f64,
    alpha: f64,
    n_iter: usize,
    tol: f64,
}

impl LogisticRegression {
    /// A model with the same defaults as `ModelType::logreg()`.
    pub fn new(bias_term: bool) -> Self {
        Self::with_params(0.01, 1e-7, 0.0, 500, 1e-6, bias_term)
    }

    pub fn with_params(
        rate: f64,
        mu: f64,
        alpha: f64,
        n_iter: usize,
        tol: f64,
        bias_term: bool,
    ) -> Self {
        LogisticRegression {
            rate,
            mu,
            alpha,
            n_iter,
            tol,
            bias_term,
            w: None,
        }
    }

    fn resolve(&self, hp: &Hyperparams) -> Result<Fit> {
        let fit = Fit {
            rate: hp.get_or("rate", self.rate),
            mu: hp.get_or("mu", self.mu),
            alpha: hp.get_or("alpha", self.alpha),
            n_iter: hp.count_or("n_iter", self.n_iter)?,
            tol: hp.get_or("tol", self.tol),
        };
        if fit.rate.is_nan() || fit.rate <= 0.0 {
            return Err(invalid("rate", format!("must be positive, got {}", fit.rate)));
        }
        if fit.mu < 0.0 {
            return Err(invalid("mu", format!("must be non-negative, got {}", fit.mu)));
        }
        if !(0.0..=1.0).contains(&fit.alpha) {
            return Err(invalid("alpha", format!("must lie in [0, 1], got {}", fit.alpha)));
        }
        Ok(fit)
    }
}

fn invalid(name: &str, reason: String) -> LearnError {
    LearnError::InvalidHyperparameter {
        name: name.to_string(),
        reason,
    }
}

fn soft_threshold(v: f64, t: f64) -> f64 {
    v.signum() * (v.abs() - t).max(0.0)
}

impl NoiseAwareModel for LogisticRegression {
    fn train(
        &mut self,
        x: &SparseMatrix,
        w0: &Array1<f64>,
        marginals: Option<&Array1<f64>>,
        hyperparams: &Hyperparams,
    ) -> Result<()> {
        if w0.len() != x.cols() {
            return Err(LearnError::shape("logreg initial weights", x.cols(), w0.len()));
        }
        let fit = self.resolve(hyperparams)?;

        // Without marginals, rows are labelled by the sign of `x_i . w0`; a
        // zero score stays unlabelled.
        let targets = match marginals {
            Some(m) if m.len() != x.rows() => {
                return Err(LearnError::shape("logreg marginals", x.rows(), m.len()));
            }
            Some(m) => m.clone(),
            None => mat_vec(x, w0)?.mapv(|v| {
                if v > 0.0 {
                    1.0
                } else if v < 0.0 {
                    0.0
                } else {
                    0.5
                }
            }),
        };
        let active: Vec<bool> = targets.iter().map(|&t| t != 0.5).collect();
        let n_active = active.iter().filter(|&&a| a).count();

        let mut w = w0.clone();
        if n_active == 0 {
            log::warn!("All {} training targets are 0.5; keeping initial weights", x.rows());
            self.w = Some(w);
            return Ok(());
        }

        let n_cols = x.cols();
        let penalized = |j: usize| !(self.bias_term && j + 1 == n_cols);
        let l1_step = fit.rate * fit.mu * fit.alpha;
        let l2 = fit.mu * (1.0 - fit.alpha);

        log::debug!(
            "Training logistic regression on {} x {} ({} informative rows), rate={}, mu={}, alpha={}",
            x.rows(),
            n_cols,
            n_active,
            fit.rate,
            fit.mu,
            fit.alpha
        );

        with_rows(x, |x| -> Result<()> {
            for step in 0..fit.n_iter {
                let margins = mat_vec(x, &w)?;
                let mut grad = Array1::<f64>::zeros(n_cols);
                for (i, row) in x.outer_iterator().enumerate() {
                    if !active[i] {
                        continue;
                    }
                    let err = sigmoid(margins[i]) - targets[i];
                    for (j, &v) in row.iter() {
                        grad[j] += err * v;
                    }
                }
                grad /= n_active as f64;

                let mut delta: f64 = 0.0;
                for j in 0..n_cols {
                    let mut next = w[j] - fit.rate * grad[j];
                    if penalized(j) {
                        next -= fit.rate * l2 * w[j];
                        next = soft_threshold(next, l1_step);
                    }
                    delta = delta.max((next - w[j]).abs());
                    w[j] = next;
                }

                if delta < fit.tol {
                    log::trace!("Logistic regression converged after {} steps", step + 1);
                    break;
                }
            }
            Ok(())
        })?;

        self.w = Some(w);
        Ok(())
    }

    fn marginals(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let w = self
            .w
            .as_ref()
            .ok_or(LearnError::NotTrained("logistic regression weights"))?;
        Ok(mat_vec(x, w)?.mapv(sigmoid))
    }

    fn weights(&self) -> Option<&Array1<f64>> {
        self.w.as_ref()
    }

    fn set_weights(&mut self, w: Array1<f64>) {
        self.w = Some(w);
    }

    fn bias_term(&self) -> bool {
        self.bias_term
    }

    fn name(&self) -> &str {
        "logreg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    /// Feature 0 marks positives, feature 1 marks negatives, last column is bias.
    fn separable() -> (SparseMatrix, Array1<f64>) {
        let mut tri = TriMat::new((6, 3));
        for i in 0..6 {
            tri.add_triplet(i, if i < 3 { 0 } else { 1 }, 1.0);
            tri.add_triplet(i, 2, 1.0);
        }
        let y = Array1::from(vec![1.0, 1.0, 0.9, 0.0, 0.1, 0.0]);
        (tri.to_csr(), y)
    }

    #[test]
    fn test_fits_separable_soft_labels() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(true);
        let hp = Hyperparams::new().with("rate", 0.5).with("n_iter", 2000.0);
        model.train(&x, &Array1::zeros(3), Some(&y), &hp).unwrap();

        let w = model.weights().unwrap();
        assert!(w[0] > 0.0);
        assert!(w[1] < 0.0);
        let pred = model.predict(&x, 0.5).unwrap();
        assert_eq!(pred.to_vec(), vec![1, 1, 1, -1, -1, -1]);
    }

    #[test]
    fn test_rows_at_one_half_are_ignored() {
        let (x, _) = separable();
        let y = Array1::from_elem(6, 0.5);
        let mut model = LogisticRegression::new(true);
        let w0 = Array1::from(vec![0.3, -0.2, 0.0]);
        model.train(&x, &w0, Some(&y), &Hyperparams::new()).unwrap();
        assert_eq!(model.weights().unwrap(), &w0);
    }

    #[test]
    fn test_self_labels_from_initial_weights() {
        // Column 0 is a vote column; w0 trusts it, the feature columns start at 0.
        let mut tri = TriMat::new((4, 3));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 0, -1.0);
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 2, 1.0);
        tri.add_triplet(2, 1, 1.0);
        tri.add_triplet(3, 2, 1.0);
        let x: SparseMatrix = tri.to_csr();

        let mut model = LogisticRegression::new(false);
        let w0 = Array1::from(vec![1.0, 0.0, 0.0]);
        let hp = Hyperparams::new().with("rate", 0.5).with("n_iter", 500.0);
        model.train(&x, &w0, None, &hp).unwrap();

        // Rows 2 and 3 carry no vote, so only the learned features decide them.
        let w = model.weights().unwrap();
        assert!(w[1] > 0.0);
        assert!(w[2] < 0.0);
        assert_eq!(model.predict(&x, 0.5).unwrap().to_vec(), vec![1, -1, 1, -1]);
    }

    #[test]
    fn test_l1_penalty_zeroes_weak_weights() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(true);
        let hp = Hyperparams::new()
            .with("rate", 0.5)
            .with("mu", 10.0)
            .with("alpha", 1.0)
            .with("n_iter", 200.0);
        model.train(&x, &Array1::zeros(3), Some(&y), &hp).unwrap();
        let w = model.weights().unwrap();
        assert_eq!(w[0], 0.0);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(false);
        assert!(matches!(
            model.train(&x, &Array1::zeros(2), Some(&y), &Hyperparams::new()),
            Err(LearnError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            model.train(
                &x,
                &Array1::zeros(3),
                Some(&y),
                &Hyperparams::new().with("rate", 0.0)
            ),
            Err(LearnError::InvalidHyperparameter { .. })
        ));
        assert!(matches!(
            model.marginals(&x),
            Err(LearnError::NotTrained(_))
        ));
    }
}
