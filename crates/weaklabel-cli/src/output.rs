use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

use weaklabel_learning::stats::LfStat;

use crate::votes::VoteRecord;

/// Write `id<TAB>marginal` rows, one per training candidate.
pub fn write_marginals<P: AsRef<Path>>(
    records: &[VoteRecord],
    marginals: &[f64],
    output_path: P,
) -> Result<()> {
    let path = output_path.as_ref();
    if records.len() != marginals.len() {
        anyhow::bail!(
            "Cannot write {} marginals for {} candidates",
            marginals.len(),
            records.len()
        );
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file));

    writer.write_record(["id", "marginal"])?;
    for (record, p) in records.iter().zip(marginals) {
        let p = format!("{:.6}", p);
        writer.write_record([record.id.as_str(), p.as_str()])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote {} training marginals to {:?}", records.len(), path);
    Ok(())
}

/// Render the per-LF statistics as an aligned text table.
pub fn format_lf_table(stats: &[LfStat]) -> String {
    let width = stats
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    let mut out = format!(
        "{:<width$}  {:>3}  {:>8}  {:>8}  {:>9}  {:>8}  {:>5}\n",
        "name",
        "j",
        "coverage",
        "overlaps",
        "conflicts",
        "accuracy",
        "n",
        width = width
    );
    for s in stats {
        let accuracy = s.accuracy.map_or("-".to_string(), |a| format!("{:.4}", a));
        let n = s.n.map_or("-".to_string(), |n| n.to_string());
        out.push_str(&format!(
            "{:<width$}  {:>3}  {:>8.4}  {:>8.4}  {:>9.4}  {:>8}  {:>5}\n",
            s.name,
            s.j,
            s.coverage,
            s.overlaps,
            s.conflicts,
            accuracy,
            n,
            width = width
        ));
    }
    out
}
