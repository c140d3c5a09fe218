use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::NoiseAwareModel;
use crate::models::generative::LfAccuracyModel;
use crate::models::logreg::LogisticRegression;

/// Build a boxed noise-aware model from a `ModelConfig`.
pub fn build_model(params: &ModelConfig) -> Box<dyn NoiseAwareModel> {
    match params.model_type {
        ModelType::LogReg {
            rate,
            mu,
            alpha,
            n_iter,
            tol,
        } => Box::new(LogisticRegression::with_params(
            rate,
            mu,
            alpha,
            n_iter,
            tol,
            params.bias_term,
        )),
        ModelType::LfAccuracy {
            n_iter,
            tol,
            smoothing,
        } => {
            if params.bias_term {
                log::warn!("bias_term is ignored by the lf_accuracy model");
            }
            Box::new(LfAccuracyModel::with_params(n_iter, tol, smoothing))
        }
    }
}

/// Build the concrete logistic regression behind a representation model.
///
/// Representation models need a discriminative model they can own outright,
/// so an `lf_accuracy` selection falls back to logistic regression defaults.
pub fn build_logreg(params: &ModelConfig) -> LogisticRegression {
    match params.model_type {
        ModelType::LogReg {
            rate,
            mu,
            alpha,
            n_iter,
            tol,
        } => LogisticRegression::with_params(rate, mu, alpha, n_iter, tol, params.bias_term),
        ModelType::LfAccuracy { .. } => {
            log::warn!("lf_accuracy cannot featurize candidates; using logistic regression");
            LogisticRegression::new(params.bias_term)
        }
    }
}
