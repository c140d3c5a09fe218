//! Candidate featurization.
//!
//! A featurizer fits its vocabulary on the training candidates only and
//! reuses it for every other collection, so feature columns line up between
//! training and test matrices.
use std::collections::HashMap;

use sprs::CsMat;

use crate::error::{LearnError, Result};
use crate::math::SparseMatrix;

pub trait Featurizer<C> {
    /// Fit the vocabulary on `candidates` and return their `N x K` features.
    fn fit_transform(&mut self, candidates: &[C]) -> Result<SparseMatrix>;

    /// Featurize `candidates` with the already fitted vocabulary.
    fn transform(&self, candidates: &[C]) -> Result<SparseMatrix>;

    /// Human-readable name of feature column `index`.
    fn feature_name(&self, index: usize) -> Option<&str>;

    fn n_features(&self) -> usize;
}

/// Binary indicator features from a per-candidate list of feature names.
///
/// Names seen during `fit_transform` become columns in first-seen order;
/// names that only appear later are dropped.
pub struct FeatureSetFeaturizer<C> {
    extract: Box<dyn Fn(&C) -> Vec<String>>,
    index: HashMap<String, usize>,
    names: Vec<String>,
    fitted: bool,
}

impl<C> FeatureSetFeaturizer<C> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&C) -> Vec<String> + 'static,
    {
        FeatureSetFeaturizer {
            extract: Box::new(extract),
            index: HashMap::new(),
            names: Vec::new(),
            fitted: false,
        }
    }

    fn encode(&self, candidates: &[C]) -> SparseMatrix {
        let mut indptr = Vec::with_capacity(candidates.len() + 1);
        let mut indices = Vec::new();
        indptr.push(0);

        for candidate in candidates {
            let mut cols: Vec<usize> = (self.extract)(candidate)
                .iter()
                .filter_map(|name| self.index.get(name).copied())
                .collect();
            cols.sort_unstable();
            cols.dedup();
            indices.extend(cols);
            indptr.push(indices.len());
        }

        let data = vec![1.0; indices.len()];
        CsMat::new((candidates.len(), self.names.len()), indptr, indices, data)
    }
}

impl<C> Featurizer<C> for FeatureSetFeaturizer<C> {
    fn fit_transform(&mut self, candidates: &[C]) -> Result<SparseMatrix> {
        self.index.clear();
        self.names.clear();
        for candidate in candidates {
            for name in (self.extract)(candidate) {
                if !self.index.contains_key(&name) {
                    self.index.insert(name.clone(), self.names.len());
                    self.names.push(name);
                }
            }
        }
        self.fitted = true;
        log::debug!(
            "Fitted {} features on {} candidates",
            self.names.len(),
            candidates.len()
        );
        Ok(self.encode(candidates))
    }

    fn transform(&self, candidates: &[C]) -> Result<SparseMatrix> {
        if !self.fitted {
            return Err(LearnError::NotTrained("featurizer vocabulary"));
        }
        Ok(self.encode(candidates))
    }

    fn feature_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn n_features(&self) -> usize {
        self.names.len()
    }
}
