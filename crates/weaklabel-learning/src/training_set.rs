//! The training candidates together with their label and feature matrices.
//!
//! `L` and `F` are computed once, at construction, and never change. Learners
//! share a training set through `Rc` so several strategies can be compared on
//! the same matrices without recomputing or copying them.
use crate::error::{LearnError, Result};
use crate::featurize::Featurizer;
use crate::label_matrix::{apply_lfs, LabelMatrix, LabelingFunction};
use crate::math::SparseMatrix;
use crate::stats::{
    lf_accuracies_or_none, lf_conflicts, lf_coverage, lf_overlaps, lf_vote_counts,
    summary_stats, LfStat, SummaryStats,
};

pub struct TrainingSet<C> {
    candidates: Vec<C>,
    lfs: Vec<LabelingFunction<C>>,
    featurizer: Option<Box<dyn Featurizer<C>>>,
    l: LabelMatrix,
    f: Option<SparseMatrix>,
}

impl<C> TrainingSet<C> {
    /// Apply `lfs` to `candidates` and, when a featurizer is given, fit it on
    /// them.
    pub fn new(
        candidates: Vec<C>,
        lfs: Vec<LabelingFunction<C>>,
        mut featurizer: Option<Box<dyn Featurizer<C>>>,
    ) -> Result<Self> {
        log::info!(
            "Building training set: {} candidates, {} labeling functions",
            candidates.len(),
            lfs.len()
        );
        let l = apply_lfs(&candidates, &lfs)?;
        let f = match featurizer.as_mut() {
            Some(featurizer) => {
                let f = featurizer.fit_transform(&candidates)?;
                if f.rows() != l.rows() {
                    return Err(LearnError::shape("featurizer output rows", l.rows(), f.rows()));
                }
                log::info!("Featurized training set: {} features", f.cols());
                Some(f)
            }
            None => None,
        };

        let set = TrainingSet {
            candidates,
            lfs,
            featurizer,
            l,
            f,
        };
        set.summary_stats().log_report();
        Ok(set)
    }

    pub fn candidates(&self) -> &[C] {
        &self.candidates
    }

    pub fn lfs(&self) -> &[LabelingFunction<C>] {
        &self.lfs
    }

    pub fn lf_names(&self) -> Vec<&str> {
        self.lfs.iter().map(|lf| lf.name()).collect()
    }

    /// Training label matrix `L`.
    pub fn l(&self) -> &LabelMatrix {
        &self.l
    }

    /// Training feature matrix `F`, when a featurizer was supplied.
    pub fn f(&self) -> Option<&SparseMatrix> {
        self.f.as_ref()
    }

    pub fn featurizer(&self) -> Option<&dyn Featurizer<C>> {
        self.featurizer.as_deref()
    }

    pub fn has_featurizer(&self) -> bool {
        self.featurizer.is_some()
    }

    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn n_lfs(&self) -> usize {
        self.lfs.len()
    }

    pub fn n_features(&self) -> usize {
        self.f.as_ref().map_or(0, |f| f.cols())
    }

    /// Label matrix of another candidate collection, with the same LF columns.
    pub fn label_matrix(&self, candidates: &[C]) -> Result<LabelMatrix> {
        apply_lfs(candidates, &self.lfs)
    }

    /// Features of another candidate collection, with the fitted vocabulary.
    pub fn features(&self, candidates: &[C]) -> Result<SparseMatrix> {
        let featurizer = self
            .featurizer
            .as_ref()
            .ok_or(LearnError::MissingCapability("featurizer"))?;
        featurizer.transform(candidates)
    }

    /// `(L, F)` for another candidate collection; `F` is `None` without a
    /// featurizer.
    pub fn transform(&self, candidates: &[C]) -> Result<(LabelMatrix, Option<SparseMatrix>)> {
        let l = self.label_matrix(candidates)?;
        let f = match self.featurizer {
            Some(_) => Some(self.features(candidates)?),
            None => None,
        };
        Ok((l, f))
    }

    pub fn summary_stats(&self) -> SummaryStats {
        summary_stats(&self.l)
    }

    /// One statistics row per LF.
    ///
    /// Coverage, overlaps and conflicts are measured on the training set.
    /// With a labelled dev set, accuracy and vote count are measured on it.
    pub fn lf_stats(&self, dev: Option<(&[C], &[i32])>) -> Result<Vec<LfStat>> {
        let coverage = lf_coverage(&self.l);
        let overlaps = lf_overlaps(&self.l);
        let conflicts = lf_conflicts(&self.l);

        let (accuracy, counts) = match dev {
            Some((candidates, gold)) => {
                if candidates.len() != gold.len() {
                    return Err(LearnError::shape(
                        "lf_stats (dev gold length)",
                        candidates.len(),
                        gold.len(),
                    ));
                }
                let l_dev = self.label_matrix(candidates)?;
                (
                    Some(lf_accuracies_or_none(&l_dev, gold)?),
                    Some(lf_vote_counts(&l_dev)),
                )
            }
            None => (None, None),
        };

        Ok(self
            .lfs
            .iter()
            .enumerate()
            .map(|(j, lf)| LfStat {
                name: lf.name().to_string(),
                j,
                coverage: coverage[j],
                overlaps: overlaps[j],
                conflicts: conflicts[j],
                accuracy: accuracy.as_ref().and_then(|a| a[j]),
                n: counts.as_ref().map(|c| c[j]),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::featurize::FeatureSetFeaturizer;

    fn lfs() -> Vec<LabelingFunction<i32>> {
        vec![
            LabelingFunction::new("lf_positive", |&c: &i32| if c > 0 { 1 } else { 0 }),
            LabelingFunction::new("lf_even", |&c: &i32| if c % 2 == 0 { -1 } else { 0 }),
            LabelingFunction::new("lf_never", |_: &i32| 0),
        ]
    }

    #[test]
    fn test_builds_matrices_eagerly() {
        let featurizer = FeatureSetFeaturizer::new(|c: &i32| vec![format!("mod3={}", c % 3)]);
        let set = TrainingSet::new(vec![1, 2, -3, 4], lfs(), Some(Box::new(featurizer))).unwrap();
        assert_eq!(set.l().shape(), (4, 3));
        assert_eq!(set.n_features(), set.f().unwrap().cols());
        assert_eq!(set.lf_names(), vec!["lf_positive", "lf_even", "lf_never"]);

        let (l, f) = set.transform(&[6, 7]).unwrap();
        assert_eq!(l.shape(), (2, 3));
        assert_eq!(f.unwrap().cols(), set.n_features());
    }

    #[test]
    fn test_features_without_featurizer_is_missing_capability() {
        let set = TrainingSet::new(vec![1, 2], lfs(), None).unwrap();
        assert!(!set.has_featurizer());
        assert!(matches!(
            set.features(&[1]).unwrap_err(),
            LearnError::MissingCapability("featurizer")
        ));
        let (_, f) = set.transform(&[1]).unwrap();
        assert!(f.is_none());
    }

    #[test]
    fn test_lf_stats_with_dev_set() {
        let set = TrainingSet::new(vec![1, 2, -3, 4], lfs(), None).unwrap();
        let dev = [2, 3, -2];
        let gold = [1, 1, -1];
        let stats = set.lf_stats(Some((&dev[..], &gold[..]))).unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].coverage, 0.75);
        assert_eq!(stats[1].coverage, 0.5);
        assert_eq!(stats[1].overlaps, 0.5);
        assert_eq!(stats[1].conflicts, 0.5);
        assert_eq!(stats[0].accuracy, Some(1.0));
        assert_eq!(stats[0].n, Some(2));
        // lf_even votes -1 on 2 (gold 1) and -2 (gold -1).
        assert_eq!(stats[1].accuracy, Some(0.5));
        assert_eq!(stats[2].accuracy, None);
        assert_eq!(stats[2].n, Some(0));
    }

    #[test]
    fn test_lf_stats_without_dev_set() {
        let set = TrainingSet::new(vec![1, 2], lfs(), None).unwrap();
        let stats = set.lf_stats(None).unwrap();
        assert!(stats.iter().all(|s| s.accuracy.is_none() && s.n.is_none()));
    }
}
