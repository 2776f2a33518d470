use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// One row of the toolkit's `results.csv`
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: u32,
    /// Column name → value, e.g. `metrics/mAP50(B)`
    pub values: BTreeMap<String, f64>,
}

impl EpochMetrics {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    /// Short one-line summary for logs
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("epoch {}", self.epoch)];
        for key in [
            "train/box_loss",
            "metrics/precision(B)",
            "metrics/recall(B)",
            "metrics/mAP50(B)",
            "metrics/mAP50-95(B)",
        ] {
            if let Some(v) = self.get(key) {
                parts.push(format!("{key}={v:.4}"));
            }
        }
        parts.join(" ")
    }
}

/// Read per-epoch rows. Headers are trimmed; non-numeric cells are skipped.
pub fn read_results_csv(path: &Path) -> Result<Vec<EpochMetrics>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let mut epoch = None;
        let mut values = BTreeMap::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header == "epoch" {
                epoch = cell.parse::<u32>().ok();
                continue;
            }
            if let Ok(v) = cell.parse::<f64>() {
                values.insert(header.to_string(), v);
            }
        }
        rows.push(EpochMetrics {
            epoch: epoch.unwrap_or(idx as u32 + 1),
            values,
        });
    }
    Ok(rows)
}
