//! Precision / recall / F1 over {-1, 1} predictions, and set-based
//! entity-level scoring.
//!
//! Every metric here follows one convention: a ratio with an empty
//! denominator is 0, and F1 is 0 whenever precision or recall is 0. That keeps
//! scores inside [0, 1] and comparable during grid search.
use std::collections::HashSet;
use std::hash::Hash;

use crate::error::{LearnError, Result};

/// Check that every gold label is exactly -1 or 1.
pub fn validate_gold(gold: &[i32]) -> Result<()> {
    match gold.iter().position(|&g| g != 1 && g != -1) {
        Some(index) => Err(LearnError::InvalidLabel {
            index,
            value: gold[index],
        }),
        None => Ok(()),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision == 0.0 || recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// TP / FP / TN / FN counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    /// Count outcomes; any prediction other than 1 is a negative prediction
    /// and any gold value other than 1 is a negative label.
    pub fn count(pred: &[i32], gold: &[i32]) -> Self {
        let mut c = Confusion::default();
        for (&p, &g) in pred.iter().zip(gold.iter()) {
            match (p == 1, g == 1) {
                (true, true) => c.tp += 1,
                (true, false) => c.fp += 1,
                (false, false) => c.tn += 1,
                (false, true) => c.fn_ += 1,
            }
        }
        c
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }
}

pub fn precision(pred: &[i32], gold: &[i32]) -> f64 {
    Confusion::count(pred, gold).precision()
}

pub fn recall(pred: &[i32], gold: &[i32]) -> f64 {
    Confusion::count(pred, gold).recall()
}

pub fn f1_score(pred: &[i32], gold: &[i32]) -> f64 {
    Confusion::count(pred, gold).f1()
}

/// Full score report for one test run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
    pub n: usize,
}

impl Scores {
    pub fn from_confusion(c: Confusion) -> Self {
        Scores {
            precision: c.precision(),
            recall: c.recall(),
            f1: c.f1(),
            tp: c.tp,
            fp: c.fp,
            tn: c.tn,
            fn_: c.fn_,
            n: c.tp + c.fp + c.tn + c.fn_,
        }
    }

    pub fn log_report(&self) {
        log::info!("{}", "=".repeat(40));
        log::info!("Test set size:\t{}", self.n);
        log::info!("{}", "-".repeat(40));
        log::info!("Precision:\t{:.4}", self.precision);
        log::info!("Recall:\t\t{:.4}", self.recall);
        log::info!("F1 Score:\t{:.4}", self.f1);
        log::info!("{}", "-".repeat(40));
        log::info!(
            "TP: {} | FP: {} | TN: {} | FN: {}",
            self.tp,
            self.fp,
            self.tn,
            self.fn_
        );
        log::info!("{}", "=".repeat(40));
    }
}

/// Score predictions against gold labels that must lie in {-1, 1}.
pub fn test_scores(pred: &[i32], gold: &[i32]) -> Result<Scores> {
    if pred.len() != gold.len() {
        return Err(LearnError::shape("test_scores (prediction length)", gold.len(), pred.len()));
    }
    validate_gold(gold)?;
    Ok(Scores::from_confusion(Confusion::count(pred, gold)))
}

/// Entity-level outcome sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityScores<K: Hash + Eq> {
    pub tp: HashSet<K>,
    pub fp: HashSet<K>,
    pub fn_: HashSet<K>,
}

impl<K: Hash + Eq> EntityScores<K> {
    pub fn precision(&self) -> f64 {
        ratio(self.tp.len(), self.tp.len() + self.fp.len())
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp.len(), self.tp.len() + self.fn_.len())
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }

    pub fn log_report(&self) {
        log::info!("{}", "=".repeat(40));
        log::info!("Scoring on Entity-Level Gold Data");
        log::info!("{}", "=".repeat(40));
        log::info!("Corpus Precision {:.3}", self.precision());
        log::info!("Corpus Recall    {:.3}", self.recall());
        log::info!("Corpus F1        {:.3}", self.f1());
        log::info!("{}", "-".repeat(40));
        log::info!(
            "TP: {} | FP: {} | FN: {}",
            self.tp.len(),
            self.fp.len(),
            self.fn_.len()
        );
        log::info!("{}", "=".repeat(40));
    }
}

/// Compare predicted entity keys against gold keys by set membership.
pub fn entity_confusion<K, I>(pred: I, gold: &HashSet<K>) -> EntityScores<K>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    let pred: HashSet<K> = pred.into_iter().collect();
    EntityScores {
        tp: pred.intersection(gold).cloned().collect(),
        fp: pred.difference(gold).cloned().collect(),
        fn_: gold.difference(&pred).cloned().collect(),
    }
}
