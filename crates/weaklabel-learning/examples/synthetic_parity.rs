use std::rc::Rc;

use weaklabel_learning::config::Hyperparams;
use weaklabel_learning::featurize::FeatureSetFeaturizer;
use weaklabel_learning::grid_search::GridSearch;
use weaklabel_learning::label_matrix::LabelingFunction;
use weaklabel_learning::learner::{Learner, Strategy};
use weaklabel_learning::models::{LfAccuracyModel, LogisticRegression};
use weaklabel_learning::training_set::TrainingSet;

fn gold(candidates: &[u32]) -> Vec<i32> {
    candidates
        .iter()
        .map(|&c| if c % 2 == 0 { 1 } else { -1 })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Synthetic task: even numbers are positive. Two LFs are accurate but
    // miss some candidates, the third is a coin flip.
    let lfs = vec![
        LabelingFunction::new("lf_even", |&c: &u32| if c % 2 == 0 && c % 5 != 0 { 1 } else { 0 }),
        LabelingFunction::new("lf_odd", |&c: &u32| if c % 2 == 1 && c % 7 != 0 { -1 } else { 0 }),
        LabelingFunction::new("lf_triple", |&c: &u32| if c % 3 == 0 { 1 } else { 0 }),
    ];
    let featurizer = FeatureSetFeaturizer::new(|c: &u32| {
        vec![format!("parity={}", c % 2), format!("mod3={}", c % 3)]
    });

    let ts = TrainingSet::new((0..200).collect(), lfs, Some(Box::new(featurizer)))?;
    for stat in ts.lf_stats(None)? {
        println!("{:<10} coverage={:.3} conflicts={:.3}", stat.name, stat.coverage, stat.conflicts);
    }

    let mut learner = Learner::new(
        Rc::new(ts),
        Strategy::Pipelined {
            generative: Box::new(LfAccuracyModel::new()),
            discriminative: Box::new(LogisticRegression::new(true)),
        },
    )?;

    let dev: Vec<u32> = (1000..1100).collect();
    let search = GridSearch::new(
        vec!["rate".to_string(), "mu".to_string()],
        vec![vec![0.01, 0.1], vec![1e-6, 1e-3]],
    )?;
    let result = search.fit(
        &mut learner,
        &dev,
        &gold(&dev),
        &Hyperparams::new().with("n_iter", 1000.0),
        0.5,
    )?;
    println!("Best parameters: {:?}", result.best_params());

    let test: Vec<u32> = (2000..2200).collect();
    let scores = learner.test(&test, &gold(&test), 0.5)?;
    let mv = learner.test_mv(&test, &gold(&test))?;
    println!("Model:         P={:.3} R={:.3} F1={:.3}", scores.precision, scores.recall, scores.f1);
    println!("Majority vote: P={:.3} R={:.3} F1={:.3}", mv.precision, mv.recall, mv.f1);

    for f in learner.feature_stats(4)? {
        println!("{:>8.4}  {}", f.weight, f.name);
    }
    Ok(())
}
