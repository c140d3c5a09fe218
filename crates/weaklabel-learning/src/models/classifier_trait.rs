use ndarray::Array1;

use crate::config::Hyperparams;
use crate::error::Result;
use crate::math::SparseMatrix;

/// A model over a design matrix that can learn from soft labels.
///
/// Used both for the generative model of LF reliability (trained on `L`
/// alone, no labels) and for the discriminative end model (trained on
/// `[F | bias]` or `[L | F | bias]`). Labels follow the crate convention:
/// 1 for positive, -1 for negative.
pub trait NoiseAwareModel {
    /// Fit the weights, starting from `w0` (one entry per column of `x`).
    ///
    /// `marginals` are per-row soft targets in [0, 1]; rows at exactly 0.5
    /// carry no information and are ignored. When `None`, the model labels the
    /// rows itself (from `w0`, or by its own unsupervised procedure).
    fn train(
        &mut self,
        x: &SparseMatrix,
        w0: &Array1<f64>,
        marginals: Option<&Array1<f64>>,
        hyperparams: &Hyperparams,
    ) -> Result<()>;

    /// P(positive) for every row of `x`.
    fn marginals(&self, x: &SparseMatrix) -> Result<Array1<f64>>;

    /// Hard {-1, 1} predictions; a marginal must exceed `threshold` to count
    /// as positive.
    fn predict(&self, x: &SparseMatrix, threshold: f64) -> Result<Array1<i32>> {
        Ok(self
            .marginals(x)?
            .mapv(|p| if p > threshold { 1 } else { -1 }))
    }

    /// Current weights, aligned with the training design matrix's columns.
    fn weights(&self) -> Option<&Array1<f64>>;

    fn set_weights(&mut self, w: Array1<f64>);

    /// Whether this model expects a trailing bias column.
    fn bias_term(&self) -> bool {
        false
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "model"
    }
}

/// An end model that consumes raw candidates and learns its own features.
pub trait RepresentationModel<C> {
    fn train(
        &mut self,
        candidates: &[C],
        marginals: &Array1<f64>,
        hyperparams: &Hyperparams,
    ) -> Result<()>;

    fn marginals(&self, candidates: &[C]) -> Result<Array1<f64>>;

    fn predict(&self, candidates: &[C], threshold: f64) -> Result<Array1<i32>> {
        Ok(self
            .marginals(candidates)?
            .mapv(|p| if p > threshold { 1 } else { -1 }))
    }

    fn weights(&self) -> Option<&Array1<f64>>;

    fn set_weights(&mut self, w: Array1<f64>);

    /// Whether the last weight is an intercept rather than a feature weight.
    fn bias_term(&self) -> bool {
        false
    }

    /// Human-readable name of learned feature `index`, when the model has one.
    fn feature_name(&self, _index: usize) -> Option<&str> {
        None
    }

    fn name(&self) -> &str {
        "representation"
    }
}
