use std::fs;
use std::path::{Path, PathBuf};

use weaklabel_cli::config::{load_train_config, GridParam, TrainConfig};
use weaklabel_cli::run::{run_stats, run_training};
use weaklabel_learning::config::{Hyperparams, StrategyKind};

/// Even ids are positive. Two accurate but incomplete LFs, one coin flip,
/// and two categorical feature columns.
fn write_table(dir: &Path, name: &str, ids: std::ops::Range<u32>, labelled: bool) -> PathBuf {
    let mut out = String::from("id,lf_even,lf_odd,lf_triple,parity,mod3");
    if labelled {
        out.push_str(",label");
    }
    out.push('\n');
    for c in ids {
        let even = if c % 2 == 0 && c % 5 != 0 { "1" } else { "" };
        let odd = if c % 2 == 1 && c % 7 != 0 { "-1" } else { "" };
        let triple = if c % 3 == 0 { "1" } else { "0" };
        out.push_str(&format!("c{},{},{},{},{},{}", c, even, odd, triple, c % 2, c % 3));
        if labelled {
            out.push_str(if c % 2 == 0 { ",1" } else { ",-1" });
        }
        out.push('\n');
    }
    let path = dir.join(name);
    fs::write(&path, out).unwrap();
    path
}

fn config(dir: &Path, strategy: StrategyKind) -> TrainConfig {
    let mut config = TrainConfig {
        train_data: Some(write_table(dir, "train.csv", 0..60, false)),
        test_data: Some(write_table(dir, "test.csv", 100..140, true)),
        ..TrainConfig::default()
    };
    config.learner.strategy = strategy;
    config.learner.hyperparams = Hyperparams::new().with("rate", 0.1).with("n_iter", 1000.0);
    config
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

#[test]
fn test_stats_with_and_without_dev() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_table(dir.path(), "votes.csv", 0..30, false);

    let report = run_stats(&votes, None).unwrap();
    assert_eq!(report.summary.n_candidates, 30);
    assert_eq!(report.summary.n_lfs, 3);
    assert_eq!(report.lfs.len(), 3);
    assert!(report.lfs.iter().all(|s| s.accuracy.is_none()));

    let dev = write_table(dir.path(), "dev.csv", 30..60, true);
    let report = run_stats(&votes, Some(dev.as_path())).unwrap();
    assert_eq!(report.lfs[0].name, "lf_even");
    assert_eq!(report.lfs[0].accuracy, Some(1.0));
    assert_eq!(report.lfs[1].accuracy, Some(1.0));
}

#[test]
fn test_stats_rejects_unlabelled_dev() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_table(dir.path(), "votes.csv", 0..10, false);
    let dev = write_table(dir.path(), "dev.csv", 10..20, false);
    assert!(run_stats(&votes, Some(dev.as_path())).is_err());
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

#[test]
fn test_every_strategy_trains_and_evaluates() {
    for strategy in [StrategyKind::Pipelined, StrategyKind::Joint, StrategyKind::Representation] {
        let dir = tempfile::tempdir().unwrap();
        let report = run_training(&config(dir.path(), strategy)).unwrap();
        assert_eq!(report.n_train, 60);
        let eval = report.evaluation.unwrap();
        assert_eq!(eval.set, "test");
        assert!(eval.model.f1 > 0.9, "{:?}: f1 = {}", strategy, eval.model.f1);
        assert_eq!(eval.majority_vote.n, 40);
        assert!(!report.top_features.is_empty());
    }
}

#[test]
fn test_grid_search_runs_on_dev_and_writes_marginals() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), StrategyKind::Pipelined);
    config.dev_data = Some(write_table(dir.path(), "dev.csv", 200..240, true));
    config.grid = vec![GridParam {
        name: "mu".to_string(),
        values: vec![1e-6, 1e-3],
    }];
    let marginals = dir.path().join("marginals.tsv");
    config.marginals_output = Some(marginals.clone());

    let report = run_training(&config).unwrap();
    let grid = report.grid.unwrap();
    assert_eq!(grid.runs.len(), 2);
    assert!(grid.best.is_some());

    let written = fs::read_to_string(&marginals).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 61);
    assert_eq!(lines[0], "id\tmarginal");
    assert!(lines[1].starts_with("c0\t"));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), StrategyKind::Joint);
    let path = dir.path().join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    assert_eq!(load_train_config(&path).unwrap(), config);
}

#[test]
fn test_mismatched_lf_columns_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), StrategyKind::Pipelined);
    let other = dir.path().join("other.csv");
    fs::write(&other, "id,lf_even,label\nc1,,-1\n").unwrap();
    config.test_data = Some(other);
    let err = run_training(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("do not match training"));
}
