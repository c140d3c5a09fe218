//! Entity-level gold CSV reader.
//!
//! Gold files are headerless CSV with four columns per row:
//! `document, part, value, attribute`. Each kept row becomes one key made of
//! the enabled components, upper-cased, ready for
//! [`entity_confusion`](crate::scoring::entity_confusion).
use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Gold entity key: the enabled components of one row, in file order.
pub type GoldKey = Vec<String>;

/// Which rows and components of a gold file to keep.
#[derive(Debug, Clone)]
pub struct GoldReaderConfig {
    pub doc_on: bool,
    pub part_on: bool,
    pub val_on: bool,
    /// Keep only rows whose attribute equals this value.
    pub attribute: Option<String>,
    /// Keep only rows from these (upper-cased) documents.
    pub docs: Option<HashSet<String>>,
    /// Parse values as numbers and key on their integer part.
    pub integerize: bool,
}

impl Default for GoldReaderConfig {
    fn default() -> Self {
        Self {
            doc_on: true,
            part_on: true,
            val_on: true,
            attribute: None,
            docs: None,
            integerize: false,
        }
    }
}

/// Read the gold entity set from `path`.
pub fn read_entity_gold<P: AsRef<Path>>(path: P, config: &GoldReaderConfig) -> Result<HashSet<GoldKey>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open gold file: {}", path.display()))?;

    let mut gold = HashSet::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            format!("Failed to read row {} of {}", row_idx + 1, path.display())
        })?;
        if record.len() != 4 {
            return Err(anyhow!(
                "Expected 4 columns (document, part, value, attribute) at row {} of {}, found {}",
                row_idx + 1,
                path.display(),
                record.len()
            ));
        }
        let (doc, part, value, attr) = (&record[0], &record[1], &record[2], &record[3]);

        let doc = doc.to_uppercase();
        if config.docs.as_ref().is_some_and(|docs| !docs.contains(&doc)) {
            continue;
        }
        if config.attribute.as_deref().is_some_and(|a| a != attr) {
            continue;
        }
        if value.is_empty() {
            continue;
        }

        let mut key = Vec::with_capacity(3);
        if config.doc_on {
            key.push(doc);
        }
        if config.part_on {
            key.push(part.to_uppercase());
        }
        if config.val_on {
            if config.integerize {
                let v: f64 = value.trim().parse().with_context(|| {
                    format!("Invalid numeric value '{}' at row {}", value, row_idx + 1)
                })?;
                key.push((v.trunc() as i64).to_string());
            } else {
                key.push(value.to_uppercase());
            }
        }
        gold.insert(key);
    }

    log::debug!("Read {} gold entities from {}", gold.len(), path.display());
    Ok(gold)
}
