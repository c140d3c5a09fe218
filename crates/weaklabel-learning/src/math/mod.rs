//! Sparse-matrix and vector helpers shared by the learning pipeline.
//!
//! Label, feature and design matrices are `sprs::CsMat` values and stay
//! compressed throughout; helpers here accept either CSR or CSC storage and
//! never densify. Dense vectors (weights, marginals) are `ndarray::Array1`.
pub mod sparse;
pub mod vector;

pub use sparse::{
    append_ones_column, concat_columns, mat_vec, ones_column, row_nnz, row_sums, sparse_abs,
    to_f64, with_rows, SparseMatrix,
};
pub use vector::{odds_to_prob, sigmoid, sign_or_negative};
