//! Labeling functions and the label matrix they produce.
//!
//! A labeling function (LF) maps a candidate to a vote in {-1, 0, 1}
//! (negative, abstain, positive). Applying an ordered LF list to a candidate
//! sequence yields the label matrix `L`: one row per candidate, one column per
//! LF, abstains left implicit.
use std::fmt;

use sprs::CsMat;

use crate::error::{LearnError, Result};

/// A single LF vote.
pub type Vote = i8;

pub const POSITIVE: Vote = 1;
pub const ABSTAIN: Vote = 0;
pub const NEGATIVE: Vote = -1;

/// Sparse `N x M` matrix of LF votes, always CSR.
pub type LabelMatrix = CsMat<Vote>;

/// A named heuristic voting on candidates of type `C`.
pub struct LabelingFunction<C> {
    name: String,
    func: Box<dyn Fn(&C) -> Vote>,
}

impl<C> LabelingFunction<C> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&C) -> Vote + 'static,
    {
        LabelingFunction {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Column label used in statistics tables.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, candidate: &C) -> Vote {
        (self.func)(candidate)
    }
}

impl<C> fmt::Debug for LabelingFunction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelingFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Apply every LF to every candidate.
///
/// Column `j` of the result always corresponds to `lfs[j]`, so matrices built
/// from different candidate collections with the same LF slice are directly
/// comparable. Votes outside {-1, 0, 1} are rejected with
/// [`LearnError::InvalidVote`].
pub fn apply_lfs<C>(candidates: &[C], lfs: &[LabelingFunction<C>]) -> Result<LabelMatrix> {
    log::debug!(
        "Applying {} labeling functions to {} candidates",
        lfs.len(),
        candidates.len()
    );

    let mut indptr = Vec::with_capacity(candidates.len() + 1);
    let mut indices = Vec::new();
    let mut votes = Vec::new();
    indptr.push(0);

    for (i, candidate) in candidates.iter().enumerate() {
        for (j, lf) in lfs.iter().enumerate() {
            let vote = lf.apply(candidate);
            match vote {
                ABSTAIN => {}
                POSITIVE | NEGATIVE => {
                    indices.push(j);
                    votes.push(vote);
                }
                other => {
                    return Err(LearnError::InvalidVote {
                        lf_index: j,
                        lf_name: lf.name().to_string(),
                        candidate: i,
                        value: other,
                    })
                }
            }
        }
        indptr.push(indices.len());
    }

    log::trace!("Label matrix holds {} non-abstain votes", votes.len());

    Ok(CsMat::new(
        (candidates.len(), lfs.len()),
        indptr,
        indices,
        votes,
    ))
}
