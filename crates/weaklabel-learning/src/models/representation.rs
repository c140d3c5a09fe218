use ndarray::Array1;

use crate::config::{Hyperparams, FEAT_W0};
use crate::error::Result;
use crate::featurize::Featurizer;
use crate::math::{append_ones_column, SparseMatrix};
use crate::models::classifier_trait::{NoiseAwareModel, RepresentationModel};
use crate::models::logreg::LogisticRegression;

/// Representation model that learns its own features from raw candidates.
///
/// The wrapped featurizer is (re)fitted on every `train` call, so the feature
/// vocabulary belongs to the model rather than to the training set. The end
/// model is a logistic regression over `[features | bias]`.
pub struct FeaturizedModel<C> {
    featurizer: Box<dyn Featurizer<C>>,
    model: LogisticRegression,
}

impl<C> FeaturizedModel<C> {
    pub fn new(featurizer: Box<dyn Featurizer<C>>, model: LogisticRegression) -> Self {
        FeaturizedModel { featurizer, model }
    }

    fn design(&self, f: SparseMatrix) -> Result<SparseMatrix> {
        if self.model.bias_term() {
            append_ones_column(&f)
        } else {
            Ok(f)
        }
    }
}

impl<C> RepresentationModel<C> for FeaturizedModel<C> {
    fn train(
        &mut self,
        candidates: &[C],
        marginals: &Array1<f64>,
        hyperparams: &Hyperparams,
    ) -> Result<()> {
        let f = self.featurizer.fit_transform(candidates)?;
        let x = self.design(f)?;
        let mut w0 = Array1::from_elem(x.cols(), hyperparams.get_or(FEAT_W0, 0.0));
        if self.model.bias_term() {
            w0[x.cols() - 1] = 0.0;
        }
        log::debug!(
            "Training representation model on {} candidates, {} learned features",
            candidates.len(),
            self.featurizer.n_features()
        );
        self.model.train(&x, &w0, Some(marginals), hyperparams)
    }

    fn marginals(&self, candidates: &[C]) -> Result<Array1<f64>> {
        let x = self.design(self.featurizer.transform(candidates)?)?;
        self.model.marginals(&x)
    }

    fn weights(&self) -> Option<&Array1<f64>> {
        self.model.weights()
    }

    fn set_weights(&mut self, w: Array1<f64>) {
        self.model.set_weights(w);
    }

    fn bias_term(&self) -> bool {
        self.model.bias_term()
    }

    fn feature_name(&self, index: usize) -> Option<&str> {
        self.featurizer.feature_name(index)
    }

    fn name(&self) -> &str {
        "featurized_logreg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::featurize::FeatureSetFeaturizer;

    #[test]
    fn test_trains_on_raw_candidates() {
        let featurizer = FeatureSetFeaturizer::new(|s: &&'static str| vec![s.to_string()]);
        let mut model = FeaturizedModel::new(Box::new(featurizer), LogisticRegression::new(true));
        let candidates = ["good", "good", "bad", "bad"];
        let marginals = Array1::from(vec![0.9, 1.0, 0.1, 0.0]);
        let hp = Hyperparams::new().with("rate", 0.5).with("n_iter", 1000.0);
        model.train(&candidates, &marginals, &hp).unwrap();

        assert_eq!(model.weights().unwrap().len(), 3);
        assert_eq!(model.feature_name(0), Some("good"));
        let pred = model.predict(&["bad", "good", "unseen"], 0.5).unwrap();
        assert_eq!(pred[0], -1);
        assert_eq!(pred[1], 1);
    }
}
