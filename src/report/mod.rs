//! Tabular reports
//!
//! Flat projection of a batch's records: one row per image, columns for the
//! file locations plus each capture zone in definition order. Persisted as
//! CSV; price enrichment reads this shape back and appends one column.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

use crate::extract::Record;

/// In-memory table: a header row plus data rows, all strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Project records into a table. Zone columns follow `zone_names` order,
    /// which must match the run that produced the records.
    pub fn from_records(records: &[Record], zone_names: &[String]) -> Self {
        let mut headers = vec!["input_path".to_string(), "output_path".to_string()];
        headers.extend(zone_names.iter().cloned());

        let rows = records
            .iter()
            .map(|record| {
                let mut row = vec![
                    record.input_path.display().to_string(),
                    record.output_path.display().to_string(),
                ];
                for name in zone_names {
                    row.push(record.fields.get(name).cloned().unwrap_or_default());
                }
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open CSV {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("failed to read CSV header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result
                .with_context(|| format!("failed to read CSV row of {}", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create CSV {}", path.display()))?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Write the post-scan report CSV into the output directory and return its
/// path. Refuses an empty record set; the caller reports a no-op instead.
pub fn write_scan_report(
    output_dir: &Path,
    records: &[Record],
    zone_names: &[String],
) -> Result<PathBuf> {
    if records.is_empty() {
        bail!("no records to report");
    }

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = output_dir.join(format!("Scanning-Report-{timestamp}.csv"));
    Dataset::from_records(records, zone_names).write_csv(&path)?;
    info!(path = %path.display(), rows = records.len(), "scan report written");
    Ok(path)
}
