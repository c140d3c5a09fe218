use ndarray::Array1;
use num_traits::{Signed, Zero};
use sprs::CsMat;

use crate::error::{LearnError, Result};

/// Real-valued sparse matrix used for features and design matrices.
pub type SparseMatrix = CsMat<f64>;

/// Run `f` against a row-major (CSR) version of `m`.
///
/// CSR input is passed straight through; CSC input is re-compressed by rows
/// first. Stored values are carried over as-is, so the result is never dense.
pub fn with_rows<N, T, F>(m: &CsMat<N>, f: F) -> T
where
    N: Copy + Default,
    F: FnOnce(&CsMat<N>) -> T,
{
    if m.is_csr() {
        f(m)
    } else {
        f(&m.to_csr())
    }
}

/// Element-wise absolute value of a sparse matrix.
///
/// Only the stored values are touched; the sparsity pattern and the storage
/// order (CSR or CSC) of the input are preserved.
pub fn sparse_abs<N: Copy + Signed>(m: &CsMat<N>) -> CsMat<N> {
    m.map(|v| v.abs())
}

/// Number of non-zero entries in every row.
pub fn row_nnz<N: Copy + Default + Zero>(m: &CsMat<N>) -> Vec<usize> {
    with_rows(m, |m| {
        m.outer_iterator()
            .map(|row| row.iter().filter(|(_, v)| !v.is_zero()).count())
            .collect()
    })
}

/// Sum of every row, accumulated in `f64` so wide vote matrices cannot overflow.
pub fn row_sums<N: Copy + Default + Into<f64>>(m: &CsMat<N>) -> Vec<f64> {
    with_rows(m, |m| {
        m.outer_iterator()
            .map(|row| row.iter().map(|(_, &v)| v.into()).sum())
            .collect()
    })
}

/// Cast a label matrix to `f64` without changing its sparsity pattern.
pub fn to_f64(m: &CsMat<i8>) -> SparseMatrix {
    m.map(|&v| f64::from(v))
}

/// An `n x 1` column of ones, used as the bias column.
pub fn ones_column(n: usize) -> SparseMatrix {
    CsMat::new((n, 1), (0..=n).collect(), vec![0; n], vec![1.0; n])
}

/// Concatenate matrices side by side: `[blocks[0] | blocks[1] | ...]`.
///
/// Column order inside the result follows block order, which is what every
/// weight-vector accessor relies on. All blocks must have the same number of
/// rows. The result is always CSR.
pub fn concat_columns(blocks: &[&SparseMatrix]) -> Result<SparseMatrix> {
    let Some(first) = blocks.first() else {
        return Ok(CsMat::zero((0, 0)));
    };
    let n_rows = first.rows();
    for block in blocks.iter().skip(1) {
        if block.rows() != n_rows {
            return Err(LearnError::shape(
                "concat_columns (row count)",
                n_rows,
                block.rows(),
            ));
        }
    }

    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    Ok(sprs::hstack(&views).to_csr())
}

/// Append a trailing column of ones.
pub fn append_ones_column(m: &SparseMatrix) -> Result<SparseMatrix> {
    let ones = ones_column(m.rows());
    concat_columns(&[m, &ones])
}

/// Sparse matrix times dense vector.
pub fn mat_vec(m: &SparseMatrix, w: &Array1<f64>) -> Result<Array1<f64>> {
    if m.cols() != w.len() {
        return Err(LearnError::shape("mat_vec (weight length)", m.cols(), w.len()));
    }
    Ok(with_rows(m, |m| {
        m.outer_iterator()
            .map(|row| row.iter().map(|(j, &v)| v * w[j]).sum::<f64>())
            .collect()
    }))
}
