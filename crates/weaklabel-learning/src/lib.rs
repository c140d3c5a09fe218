//! weaklabel-learning: data programming over labeling-function votes.
//!
//! This crate turns many noisy heuristic labels ("labeling functions") into
//! probabilistic training labels and uses them to train a classifier. It
//! provides the sparse label matrix builder, per-LF diagnostics, design matrix
//! assembly for the joint / pipelined / representation strategies, a
//! [`Learner`](learner::Learner) that drives train / test cycles with a cached
//! test transformation, hyperparameter grid search and scoring.
//!
//! Models and featurizers are traits; the crate ships a logistic regression,
//! an EM-fitted LF accuracy model and a feature-set featurizer as defaults.
pub mod config;
pub mod design;
pub mod error;
pub mod featurize;
pub mod grid_search;
pub mod io;
pub mod label_matrix;
pub mod learner;
pub mod math;
pub mod models;
pub mod scoring;
pub mod stats;
pub mod training_set;

pub use error::{LearnError, Result};
