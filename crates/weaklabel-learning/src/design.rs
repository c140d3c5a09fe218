//! Design matrix assembly, weight layout and class balancing.
//!
//! Every design matrix has the column layout `[LF columns][feature columns]
//! [optional bias]`; [`WeightLayout`] is the single place that knows how a
//! combined weight vector maps onto those segments.
use ndarray::{s, Array1, ArrayView1};
use rand::Rng;

use crate::error::{LearnError, Result};
use crate::label_matrix::LabelMatrix;
use crate::math::{concat_columns, ones_column, to_f64, SparseMatrix};

/// `[L | F | ones]` for the joint strategy.
pub fn joint_design(l: &LabelMatrix, f: &SparseMatrix, bias: bool) -> Result<SparseMatrix> {
    if l.rows() != f.rows() {
        return Err(LearnError::shape("joint design (L vs F rows)", l.rows(), f.rows()));
    }
    let lf = to_f64(l);
    if bias {
        concat_columns(&[&lf, f, &ones_column(f.rows())])
    } else {
        concat_columns(&[&lf, f])
    }
}

/// `[F | ones]` for the discriminative stage of the two-stage strategies.
pub fn feature_design(f: &SparseMatrix, bias: bool) -> Result<SparseMatrix> {
    if bias {
        concat_columns(&[f, &ones_column(f.rows())])
    } else {
        Ok(f.clone())
    }
}

/// Column layout of a combined weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightLayout {
    pub n_lfs: usize,
    pub n_features: usize,
    pub bias: bool,
}

impl WeightLayout {
    pub fn new(n_lfs: usize, n_features: usize, bias: bool) -> Self {
        WeightLayout {
            n_lfs,
            n_features,
            bias,
        }
    }

    pub fn len(&self) -> usize {
        self.n_lfs + self.n_features + usize::from(self.bias)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initial weights: `lf_w0` on LF columns, `feat_w0` on features, 0 bias.
    pub fn initial_weights(&self, lf_w0: f64, feat_w0: f64) -> Array1<f64> {
        let mut w = Array1::zeros(self.len());
        w.slice_mut(s![..self.n_lfs]).fill(lf_w0);
        w.slice_mut(s![self.n_lfs..self.n_lfs + self.n_features])
            .fill(feat_w0);
        w
    }

    fn check(&self, w: &Array1<f64>) -> Result<()> {
        if w.len() != self.len() {
            return Err(LearnError::shape("weight layout", self.len(), w.len()));
        }
        Ok(())
    }

    pub fn lf_segment<'a>(&self, w: &'a Array1<f64>) -> Result<ArrayView1<'a, f64>> {
        self.check(w)?;
        Ok(w.slice(s![..self.n_lfs]))
    }

    pub fn feature_segment<'a>(&self, w: &'a Array1<f64>) -> Result<ArrayView1<'a, f64>> {
        self.check(w)?;
        Ok(w.slice(s![self.n_lfs..self.n_lfs + self.n_features]))
    }

    /// The trailing bias weight, `None` when the layout has no bias column.
    pub fn bias(&self, w: &Array1<f64>) -> Result<Option<f64>> {
        self.check(w)?;
        Ok(self.bias.then(|| w[self.len() - 1]))
    }

    /// Split into (LF weights, feature weights, bias).
    pub fn split(&self, w: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>, Option<f64>)> {
        Ok((
            self.lf_segment(w)?.to_owned(),
            self.feature_segment(w)?.to_owned(),
            self.bias(w)?,
        ))
    }

    /// Inverse of [`WeightLayout::split`].
    pub fn join(
        &self,
        lf: &Array1<f64>,
        features: &Array1<f64>,
        bias: Option<f64>,
    ) -> Result<Array1<f64>> {
        if lf.len() != self.n_lfs {
            return Err(LearnError::shape("weight layout (LF segment)", self.n_lfs, lf.len()));
        }
        if features.len() != self.n_features {
            return Err(LearnError::shape(
                "weight layout (feature segment)",
                self.n_features,
                features.len(),
            ));
        }
        if bias.is_some() != self.bias {
            return Err(LearnError::shape(
                "weight layout (bias)",
                usize::from(self.bias),
                usize::from(bias.is_some()),
            ));
        }
        let mut w: Vec<f64> = Vec::with_capacity(self.len());
        w.extend(lf.iter());
        w.extend(features.iter());
        w.extend(bias);
        Ok(Array1::from(w))
    }
}

/// What class balancing did to a marginal vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub n_positive: usize,
    pub n_negative: usize,
    /// Majority-class rows whose marginal was reset to 0.5.
    pub n_dropped: usize,
}

/// Balance soft labels in expectation.
///
/// Rows above 0.5 count as positive and rows below as negative. Each row of
/// the larger class is kept with probability `minority / majority`; the rest
/// are reset to exactly 0.5, which the models treat as "no label". With an
/// empty minority class every majority row is reset.
pub fn balance_marginals<R: Rng + ?Sized>(
    marginals: &mut Array1<f64>,
    rng: &mut R,
) -> BalanceSummary {
    let n_positive = marginals.iter().filter(|&&m| m > 0.5).count();
    let n_negative = marginals.iter().filter(|&&m| m < 0.5).count();
    let mut summary = BalanceSummary {
        n_positive,
        n_negative,
        n_dropped: 0,
    };
    if n_positive == n_negative {
        return summary;
    }

    let positive_majority = n_positive > n_negative;
    let keep = n_positive.min(n_negative) as f64 / n_positive.max(n_negative) as f64;
    for m in marginals.iter_mut() {
        let majority = if positive_majority { *m > 0.5 } else { *m < 0.5 };
        if majority && !rng.gen_bool(keep) {
            *m = 0.5;
            summary.n_dropped += 1;
        }
    }
    log::debug!(
        "Class balancing: {} positive, {} negative, {} majority rows reset to 0.5",
        n_positive,
        n_negative,
        summary.n_dropped
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sprs::{CsMat, TriMat};

    #[test]
    fn test_joint_design_layout() {
        let mut l = TriMat::new((2, 2));
        l.add_triplet(0, 0, 1i8);
        l.add_triplet(1, 1, -1i8);
        let l: CsMat<i8> = l.to_csr();
        let mut f = TriMat::new((2, 1));
        f.add_triplet(1, 0, 2.0);
        let f: SparseMatrix = f.to_csr();

        let x = joint_design(&l, &f, true).unwrap();
        assert_eq!(x.shape(), (2, 4));
        assert_eq!(x.get(0, 0), Some(&1.0));
        assert_eq!(x.get(1, 1), Some(&-1.0));
        assert_eq!(x.get(1, 2), Some(&2.0));
        assert_eq!(x.get(0, 3), Some(&1.0));

        let x = joint_design(&l, &f, false).unwrap();
        assert_eq!(x.shape(), (2, 3));
    }

    #[test]
    fn test_joint_design_rejects_row_mismatch() {
        let l: CsMat<i8> = CsMat::zero((3, 1));
        let f: SparseMatrix = CsMat::zero((2, 1));
        assert!(matches!(
            joint_design(&l, &f, false),
            Err(LearnError::ShapeMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_feature_design_appends_bias_last() {
        let f: SparseMatrix = CsMat::zero((3, 2));
        let x = feature_design(&f, true).unwrap();
        assert_eq!(x.shape(), (3, 3));
        assert_eq!(x.get(2, 2), Some(&1.0));
        assert_eq!(feature_design(&f, false).unwrap().shape(), (3, 2));
    }

    #[test]
    fn test_weight_layout_split_join_roundtrip() {
        for &(m, k, bias) in &[(0, 0, false), (0, 3, true), (2, 0, true), (3, 4, false)] {
            let layout = WeightLayout::new(m, k, bias);
            let w = Array1::from_iter((0..layout.len()).map(|i| i as f64 * 0.5 - 1.0));
            let (lf, feats, b) = layout.split(&w).unwrap();
            assert_eq!(lf.len(), m);
            assert_eq!(feats.len(), k);
            assert_eq!(b.is_some(), bias);
            assert_eq!(layout.join(&lf, &feats, b).unwrap(), w);
        }
    }

    #[test]
    fn test_weight_layout_initial_weights() {
        let layout = WeightLayout::new(2, 2, true);
        let w = layout.initial_weights(1.0, 0.25);
        assert_eq!(w.to_vec(), vec![1.0, 1.0, 0.25, 0.25, 0.0]);
        assert!(layout.lf_segment(&Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_balance_marginals_resets_only_majority() {
        let mut m = Array1::from(vec![0.9, 0.8, 0.7, 0.95, 0.6, 0.2, 0.5]);
        let mut rng = StdRng::seed_from_u64(7);
        let summary = balance_marginals(&mut m, &mut rng);
        assert_eq!(summary.n_positive, 5);
        assert_eq!(summary.n_negative, 1);
        assert_eq!(m[5], 0.2);
        assert_eq!(m[6], 0.5);
        let reset = m.iter().take(5).filter(|&&v| v == 0.5).count();
        assert_eq!(reset, summary.n_dropped);
        assert!(summary.n_dropped > 0);
    }

    #[test]
    fn test_balance_marginals_without_minority_resets_all_majority() {
        let mut m = Array1::from(vec![0.9, 0.7, 0.5, 0.6]);
        let mut rng = StdRng::seed_from_u64(3);
        let summary = balance_marginals(&mut m, &mut rng);
        assert_eq!(summary.n_negative, 0);
        assert_eq!(summary.n_dropped, 3);
        assert!(m.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_balance_marginals_is_seeded() {
        let base = Array1::from_iter((0..200).map(|i| if i % 4 == 0 { 0.1 } else { 0.9 }));
        let mut a = base.clone();
        let mut b = base.clone();
        balance_marginals(&mut a, &mut StdRng::seed_from_u64(1));
        balance_marginals(&mut b, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_balanced_input_is_untouched() {
        let mut m = Array1::from(vec![0.9, 0.1]);
        let summary = balance_marginals(&mut m, &mut StdRng::seed_from_u64(3));
        assert_eq!(summary.n_dropped, 0);
        assert_eq!(m.to_vec(), vec![0.9, 0.1]);
    }
}
