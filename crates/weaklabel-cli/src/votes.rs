//! Vote tables: one candidate per row, precomputed LF votes as columns.
//!
//! The header must contain an `id` column. A `label` column holds gold labels
//! (-1 / 1) and may be absent for unlabelled data. Columns prefixed `lf_` are
//! LF votes in {-1, 0, 1}; any other column is a categorical feature encoded
//! as a `column=value` indicator. Empty cells are abstains / missing features.
use std::path::Path;

use anyhow::{Context, Result};

use weaklabel_learning::featurize::{FeatureSetFeaturizer, Featurizer};
use weaklabel_learning::label_matrix::{LabelingFunction, Vote, ABSTAIN};

pub const ID_COLUMN: &str = "id";
pub const LABEL_COLUMN: &str = "label";
pub const LF_PREFIX: &str = "lf_";

/// A candidate read from a vote table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteRecord {
    pub id: String,
    /// One vote per LF column, in table order.
    pub votes: Vec<Vote>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VoteTable {
    pub lf_names: Vec<String>,
    pub records: Vec<VoteRecord>,
    pub labels: Option<Vec<i32>>,
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Read a CSV (or `.tsv`) vote table.
pub fn read_vote_table<P: AsRef<Path>>(path: P) -> Result<VoteTable> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open vote table: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let id_col = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .with_context(|| format!("{} has no '{}' column", path.display(), ID_COLUMN))?;
    let label_col = headers.iter().position(|h| h == LABEL_COLUMN);
    let lf_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.starts_with(LF_PREFIX))
        .map(|(i, _)| i)
        .collect();
    let feature_cols: Vec<usize> = (0..headers.len())
        .filter(|i| *i != id_col && Some(*i) != label_col && !lf_cols.contains(i))
        .collect();
    let lf_names: Vec<String> = lf_cols.iter().map(|&i| headers[i].to_string()).collect();

    let mut records = Vec::new();
    let mut labels = label_col.map(|_| Vec::new());

    for (row, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record =
            result.with_context(|| format!("Failed to read {} line {}", path.display(), line))?;

        let votes = lf_cols
            .iter()
            .map(|&i| {
                let cell = &record[i];
                if cell.is_empty() {
                    return Ok(ABSTAIN);
                }
                cell.parse::<Vote>().with_context(|| {
                    format!(
                        "{} line {}: invalid vote '{}' in column {}",
                        path.display(),
                        line,
                        cell,
                        &headers[i]
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let features = feature_cols
            .iter()
            .filter(|&&i| !record[i].is_empty())
            .map(|&i| format!("{}={}", &headers[i], &record[i]))
            .collect();

        if let (Some(col), Some(labels)) = (label_col, labels.as_mut()) {
            let cell = &record[col];
            let label = cell.parse::<i32>().with_context(|| {
                format!("{} line {}: invalid label '{}'", path.display(), line, cell)
            })?;
            labels.push(label);
        }

        records.push(VoteRecord {
            id: record[id_col].to_string(),
            votes,
            features,
        });
    }

    log::info!(
        "Read {} candidates with {} LF columns and {} feature columns from {}",
        records.len(),
        lf_names.len(),
        feature_cols.len(),
        path.display()
    );

    Ok(VoteTable {
        lf_names,
        records,
        labels,
    })
}

impl VoteTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gold labels, or an error naming `what` when the table has none.
    pub fn gold(&self, what: &str) -> Result<&[i32]> {
        self.labels
            .as_deref()
            .with_context(|| format!("The {} table has no '{}' column", what, LABEL_COLUMN))
    }

    /// One LF per vote column, reading the stored vote.
    pub fn labeling_functions(&self) -> Vec<LabelingFunction<VoteRecord>> {
        self.lf_names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                LabelingFunction::new(name.clone(), move |r: &VoteRecord| {
                    r.votes.get(j).copied().unwrap_or(ABSTAIN)
                })
            })
            .collect()
    }

    /// Reorder vote columns to match `lf_names`, so the LFs built from another
    /// table read the right column.
    pub fn align_to(&mut self, lf_names: &[String]) -> Result<()> {
        if self.lf_names == lf_names {
            return Ok(());
        }
        let order = lf_names
            .iter()
            .map(|name| {
                self.lf_names
                    .iter()
                    .position(|n| n == name)
                    .with_context(|| format!("LF column '{}' is missing", name))
            })
            .collect::<Result<Vec<_>>>()?;
        if order.len() != self.lf_names.len() {
            anyhow::bail!(
                "Expected LF columns [{}], found [{}]",
                lf_names.join(", "),
                self.lf_names.join(", ")
            );
        }
        for record in &mut self.records {
            record.votes = order.iter().map(|&k| record.votes[k]).collect();
        }
        self.lf_names = lf_names.to_vec();
        Ok(())
    }
}

/// Indicator featurizer over the `column=value` features of a record.
pub fn record_featurizer() -> Box<dyn Featurizer<VoteRecord>> {
    Box::new(FeatureSetFeaturizer::new(|r: &VoteRecord| r.features.clone()))
}
