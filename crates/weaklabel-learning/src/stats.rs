//! Coverage, overlap, conflict and accuracy diagnostics over a label matrix.
//!
//! All fractions are normalized by the number of candidates `N`; an empty
//! label matrix reports 0.0 everywhere.
use ndarray::Array1;

use crate::error::{LearnError, Result};
use crate::label_matrix::LabelMatrix;
use crate::math::{row_nnz, row_sums, sparse_abs, with_rows};
use crate::scoring::validate_gold;

/// Per-row facts every candidate-level statistic is derived from.
struct RowProfile {
    /// Number of LFs that voted.
    fired: Vec<usize>,
    /// Whether the votes disagree in sign.
    conflicted: Vec<bool>,
}

impl RowProfile {
    fn of(l: &LabelMatrix) -> Self {
        let fired = row_nnz(l);
        let abs_sums = row_sums(&sparse_abs(l));
        let sums = row_sums(l);
        let conflicted = abs_sums
            .iter()
            .zip(sums.iter())
            .map(|(&a, &s)| a != s.abs())
            .collect();
        RowProfile { fired, conflicted }
    }
}

fn fraction(count: usize, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        count as f64 / n as f64
    }
}

/// Fraction of candidates with at least one non-abstain vote.
pub fn coverage(l: &LabelMatrix) -> f64 {
    let fired = row_nnz(l);
    fraction(fired.iter().filter(|&&k| k > 0).count(), l.rows())
}

/// Fraction of candidates with more than one non-abstain vote.
pub fn overlap(l: &LabelMatrix) -> f64 {
    let fired = row_nnz(l);
    fraction(fired.iter().filter(|&&k| k > 1).count(), l.rows())
}

/// Fraction of candidates whose votes disagree in sign.
pub fn conflict(l: &LabelMatrix) -> f64 {
    let profile = RowProfile::of(l);
    fraction(profile.conflicted.iter().filter(|&&c| c).count(), l.rows())
}

/// Count, per column, the rows where the LF fired and `keep(row)` holds.
fn column_counts(l: &LabelMatrix, keep: impl Fn(usize) -> bool) -> Array1<f64> {
    let mut counts = Array1::<f64>::zeros(l.cols());
    with_rows(l, |l| {
        for (i, row) in l.outer_iterator().enumerate() {
            if !keep(i) {
                continue;
            }
            for (j, &v) in row.iter() {
                if v != 0 {
                    counts[j] += 1.0;
                }
            }
        }
    });
    counts
}

fn normalize(counts: Array1<f64>, n: usize) -> Array1<f64> {
    if n == 0 {
        counts
    } else {
        counts / n as f64
    }
}

/// Fraction of candidates each LF labels.
pub fn lf_coverage(l: &LabelMatrix) -> Array1<f64> {
    normalize(column_counts(l, |_| true), l.rows())
}

/// Fraction of candidates on which each LF overlaps with at least one other LF.
pub fn lf_overlaps(l: &LabelMatrix) -> Array1<f64> {
    let fired = row_nnz(l);
    normalize(column_counts(l, |i| fired[i] > 1), l.rows())
}

/// Fraction of candidates on which each LF takes part in a conflict.
pub fn lf_conflicts(l: &LabelMatrix) -> Array1<f64> {
    let profile = RowProfile::of(l);
    normalize(column_counts(l, |i| profile.conflicted[i]), l.rows())
}

/// Per-LF (agreement with gold, number of votes).
fn agreement_counts(l: &LabelMatrix, gold: &[i32]) -> Result<(Array1<f64>, Array1<f64>)> {
    if l.rows() != gold.len() {
        return Err(LearnError::shape("lf_accuracies (gold length)", l.rows(), gold.len()));
    }
    validate_gold(gold)?;

    let mut agreement = Array1::<f64>::zeros(l.cols());
    let mut fired = Array1::<f64>::zeros(l.cols());
    with_rows(l, |l| {
        for (i, row) in l.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                agreement[j] += f64::from(v) * f64::from(gold[i]);
                fired[j] += f64::from(v.abs());
            }
        }
    });
    Ok((agreement, fired))
}

/// Accuracy of each LF against gold labels, in [0, 1].
///
/// `0.5 * ((L[:, j] . gold) / sum |L[:, j]| + 1)`. An LF that never fires
/// has no defined accuracy and fails with [`LearnError::DivisionUndefined`];
/// filter those columns out first, or use [`lf_accuracies_or_none`].
pub fn lf_accuracies(l: &LabelMatrix, gold: &[i32]) -> Result<Array1<f64>> {
    let (agreement, fired) = agreement_counts(l, gold)?;
    if let Some(lf_index) = fired.iter().position(|&n| n == 0.0) {
        return Err(LearnError::DivisionUndefined { lf_index });
    }
    Ok((agreement / fired + 1.0) * 0.5)
}

/// Like [`lf_accuracies`], with `None` for LFs that never fire.
pub fn lf_accuracies_or_none(l: &LabelMatrix, gold: &[i32]) -> Result<Vec<Option<f64>>> {
    let (agreement, fired) = agreement_counts(l, gold)?;
    Ok(agreement
        .iter()
        .zip(fired.iter())
        .map(|(&a, &n)| (n > 0.0).then(|| 0.5 * (a / n + 1.0)))
        .collect())
}

/// Number of non-abstain votes cast by each LF.
pub fn lf_vote_counts(l: &LabelMatrix) -> Vec<usize> {
    column_counts(l, |_| true)
        .iter()
        .map(|&c| c as usize)
        .collect()
}

/// Candidate-level summary of a label matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub n_candidates: usize,
    pub n_lfs: usize,
    pub coverage: f64,
    pub overlap: f64,
    pub conflict: f64,
}

impl SummaryStats {
    pub fn log_report(&self) {
        log::info!("{}", "=".repeat(60));
        log::info!(
            "LF Summary Statistics: {} LFs applied to {} candidates",
            self.n_lfs,
            self.n_candidates
        );
        log::info!("{}", "-".repeat(60));
        log::info!("Coverage (candidates w/ > 0 labels):\t\t{:.2}%", self.coverage * 100.0);
        log::info!("Overlap (candidates w/ > 1 labels):\t\t{:.2}%", self.overlap * 100.0);
        log::info!("Conflict (candidates w/ conflicting labels):\t{:.2}%", self.conflict * 100.0);
        log::info!("{}", "=".repeat(60));
    }
}

pub fn summary_stats(l: &LabelMatrix) -> SummaryStats {
    let profile = RowProfile::of(l);
    let n = l.rows();
    SummaryStats {
        n_candidates: n,
        n_lfs: l.cols(),
        coverage: fraction(profile.fired.iter().filter(|&&k| k > 0).count(), n),
        overlap: fraction(profile.fired.iter().filter(|&&k| k > 1).count(), n),
        conflict: fraction(profile.conflicted.iter().filter(|&&c| c).count(), n),
    }
}

/// One row of the per-LF statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct LfStat {
    pub name: String,
    pub j: usize,
    pub coverage: f64,
    pub overlaps: f64,
    pub conflicts: f64,
    /// Empirical accuracy on a labelled dev set; `None` without one, or when
    /// the LF never fires on it.
    pub accuracy: Option<f64>,
    /// Non-abstain votes on the dev set.
    pub n: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sprs::TriMat;

    fn from_dense(rows: &[&[i8]]) -> LabelMatrix {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut tri = TriMat::new((rows.len(), cols));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0 {
                    tri.add_triplet(i, j, v);
                }
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_candidate_level_stats() {
        let l = from_dense(&[&[1, 0], &[1, -1], &[0, 0]]);
        assert_abs_diff_eq!(coverage(&l), 2.0 / 3.0);
        assert_abs_diff_eq!(overlap(&l), 1.0 / 3.0);
        assert_abs_diff_eq!(conflict(&l), 1.0 / 3.0);

        let summary = summary_stats(&l);
        assert_eq!(summary.n_candidates, 3);
        assert_eq!(summary.n_lfs, 2);
        assert_abs_diff_eq!(summary.coverage, coverage(&l));
        assert_abs_diff_eq!(summary.conflict, conflict(&l));
    }

    #[test]
    fn test_agreeing_overlap_is_not_conflict() {
        let l = from_dense(&[&[1, 1, 0], &[-1, 0, -1]]);
        assert_abs_diff_eq!(overlap(&l), 1.0);
        assert_abs_diff_eq!(conflict(&l), 0.0);
    }

    #[test]
    fn test_lf_level_stats() {
        let l = from_dense(&[&[1, 0, 1], &[1, -1, 0], &[0, 0, 1], &[0, 0, 0]]);
        assert_eq!(lf_coverage(&l).to_vec(), vec![0.5, 0.25, 0.5]);
        assert_eq!(lf_overlaps(&l).to_vec(), vec![0.5, 0.25, 0.25]);
        assert_eq!(lf_conflicts(&l).to_vec(), vec![0.25, 0.25, 0.0]);
        assert_eq!(lf_vote_counts(&l), vec![2, 1, 2]);
    }

    #[test]
    fn test_lf_accuracies() {
        let l = from_dense(&[&[1, 0], &[1, -1], &[0, 0]]);
        let acc = lf_accuracies(&l, &[1, 1, -1]).unwrap();
        assert_abs_diff_eq!(acc[0], 1.0);
        assert_abs_diff_eq!(acc[1], 0.0);
    }

    #[test]
    fn test_lf_accuracies_zero_coverage_is_undefined() {
        let l = from_dense(&[&[1, 0], &[-1, 0]]);
        let err = lf_accuracies(&l, &[1, -1]).unwrap_err();
        assert!(matches!(err, LearnError::DivisionUndefined { lf_index: 1 }));
    }

    #[test]
    fn test_lf_accuracies_or_none_skips_silent_lfs() {
        let l = from_dense(&[&[1, 0], &[-1, 0]]);
        assert_eq!(lf_accuracies_or_none(&l, &[1, 1]).unwrap(), vec![Some(0.5), None]);
    }

    #[test]
    fn test_lf_accuracies_validates_gold() {
        let l = from_dense(&[&[1], &[-1]]);
        assert!(matches!(
            lf_accuracies(&l, &[1, 0]).unwrap_err(),
            LearnError::InvalidLabel { index: 1, value: 0 }
        ));
        assert!(matches!(
            lf_accuracies(&l, &[1]).unwrap_err(),
            LearnError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn test_empty_matrix_reports_zero() {
        let l = from_dense(&[]);
        assert_eq!(coverage(&l), 0.0);
        assert_eq!(overlap(&l), 0.0);
        assert_eq!(conflict(&l), 0.0);
    }
}
