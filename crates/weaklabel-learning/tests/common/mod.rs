#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use weaklabel_learning::featurize::{FeatureSetFeaturizer, Featurizer};
use weaklabel_learning::label_matrix::LabelingFunction;

/// Ground truth for the synthetic task: even numbers are positive.
pub fn gold(candidates: &[u32]) -> Vec<i32> {
    candidates
        .iter()
        .map(|&c| if c % 2 == 0 { 1 } else { -1 })
        .collect()
}

/// Two accurate but incomplete LFs and one coin-flip LF.
pub fn parity_lfs() -> Vec<LabelingFunction<u32>> {
    vec![
        LabelingFunction::new("lf_even", |&c: &u32| {
            if c % 2 == 0 && c % 5 != 0 {
                1
            } else {
                0
            }
        }),
        LabelingFunction::new("lf_odd", |&c: &u32| {
            if c % 2 == 1 && c % 7 != 0 {
                -1
            } else {
                0
            }
        }),
        LabelingFunction::new("lf_triple", |&c: &u32| if c % 3 == 0 { 1 } else { 0 }),
    ]
}

pub fn parity_features(c: &u32) -> Vec<String> {
    vec![
        format!("parity={}", c % 2),
        format!("mod3={}", c % 3),
    ]
}

pub fn parity_featurizer() -> Box<dyn Featurizer<u32>> {
    Box::new(FeatureSetFeaturizer::new(parity_features))
}

/// An LF that counts how often it is applied.
pub fn counting_lf(calls: Rc<Cell<usize>>) -> LabelingFunction<u32> {
    LabelingFunction::new("lf_counted", move |&c: &u32| {
        calls.set(calls.get() + 1);
        if c % 2 == 0 {
            1
        } else {
            -1
        }
    })
}

/// A featurizer that counts how many candidates it featurizes.
pub fn counting_featurizer(calls: Rc<Cell<usize>>) -> Box<dyn Featurizer<u32>> {
    Box::new(FeatureSetFeaturizer::new(move |c: &u32| {
        calls.set(calls.get() + 1);
        parity_features(c)
    }))
}
