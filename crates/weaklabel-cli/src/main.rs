use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use weaklabel_cli::config::TrainConfig;
use weaklabel_cli::output::format_lf_table;
use weaklabel_cli::run::{run_stats, run_training};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("WEAKLABEL_LOG", "error,weaklabel=info"))
        .init();

    let matches = Command::new("weaklabel")
        .version(clap::crate_version!())
        .about("Weak supervision from labeling-function votes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("stats")
                .about("Print coverage, overlap and conflict statistics of a vote table")
                .arg(
                    Arg::new("votes")
                        .help("Path to the vote table (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dev_data")
                        .long("dev")
                        .help("Labelled vote table used to estimate per-LF accuracies")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("train")
                .about("Train a learner from labeling-function votes and report test scores")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .long("train")
                        .help(
                            "Path to the training vote table. Overrides the training data file \
                             specified in the configuration file.",
                        )
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dev_data")
                        .long("dev")
                        .help("Labelled vote table for grid search and, without --test, evaluation")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("test_data")
                        .long("test")
                        .help("Labelled vote table to evaluate on")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .help("Override the strategy from the JSON config.")
                        .value_parser(["joint", "pipelined", "representation"])
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Write training marginals to this TSV file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("stats", sub_m)) => handle_stats(sub_m),
        Some(("train", sub_m)) => handle_train(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_stats(matches: &ArgMatches) -> Result<()> {
    let votes: &PathBuf = matches
        .get_one("votes")
        .ok_or_else(|| anyhow::anyhow!("missing vote table"))?;
    let dev = matches.get_one::<PathBuf>("dev_data");
    log::info!("[weaklabel::stats] Reading votes from {:?}", votes);

    let report = run_stats(votes, dev.map(PathBuf::as_path))?;
    let s = report.summary;
    println!(
        "{} candidates, {} LFs: coverage {:.4}, overlap {:.4}, conflict {:.4}",
        s.n_candidates, s.n_lfs, s.coverage, s.overlap, s.conflict
    );
    print!("{}", format_lf_table(&report.lfs));
    Ok(())
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: &PathBuf = matches
        .get_one("config")
        .ok_or_else(|| anyhow::anyhow!("missing config path"))?;
    log::info!("[weaklabel::train] Training from config: {:?}", config_path);

    let config = TrainConfig::from_arguments(config_path, matches)?;
    match run_training(&config) {
        Ok(report) => {
            if let Some(eval) = &report.evaluation {
                println!("set\tmethod\tprecision\trecall\tf1");
                for (method, scores) in [
                    ("model", &eval.model),
                    ("mv", &eval.majority_vote),
                    ("wmv", &eval.weighted_majority_vote),
                ] {
                    println!(
                        "{}\t{}\t{:.4}\t{:.4}\t{:.4}",
                        eval.set, method, scores.precision, scores.recall, scores.f1
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
