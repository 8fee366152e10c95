//! Dataset price enrichment
//!
//! Walks a scan report CSV row by row, looks up the search-key column through
//! a [`PriceProvider`], aggregates the samples under the selected policy, and
//! writes each row (plus the new price column) as it completes. A pacing
//! delay throttles successive searches; cancellation stops before the next
//! search and leaves already-written rows intact.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use tracing::{info, warn};

use super::{representative_price, PricePolicy, PriceProvider};
use crate::report::Dataset;

/// Marker written when a row has no key or a query yields no samples.
pub const NO_RESULT: &str = "N/A";

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub policy: PricePolicy,
    /// Delay between successive search invocations.
    pub pacing: Duration,
    /// Sample cap per query.
    pub max_samples: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            policy: PricePolicy::default(),
            pacing: Duration::from_secs(2),
            max_samples: 10,
        }
    }
}

/// Progress messages from a background enrichment run.
#[derive(Debug, Clone)]
pub enum EnrichProgress {
    /// One row finished; human-readable "<key> -> $<price>" line.
    Row(String),
    /// Run finished (or was cancelled); path of the enriched CSV.
    Done(PathBuf),
    /// Run failed before completing.
    Failed(String),
}

/// Enrich `input` into `<stem>_with_prices.csv` next to it.
///
/// Rows with an empty key get the [`NO_RESULT`] marker without invoking the
/// search step. Rows are flushed as they complete so cancellation keeps
/// partial output.
pub fn enrich_csv(
    input: &Path,
    key_column: &str,
    provider: &dyn PriceProvider,
    opts: &EnrichOptions,
    cancel: &AtomicBool,
    mut progress: impl FnMut(String),
) -> Result<PathBuf> {
    let dataset = Dataset::read_csv(input)?;
    let Some(key_index) = dataset.column_index(key_column) else {
        bail!("column '{key_column}' not found in {}", input.display());
    };

    let output = enriched_path(input);
    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut headers = dataset.headers.clone();
    headers.push(opts.policy.column_name());
    writer.write_record(&headers)?;
    writer.flush()?;

    let mut searched = false;
    for row in &dataset.rows {
        if cancel.load(Ordering::SeqCst) {
            info!("enrichment cancelled; partial output kept");
            break;
        }

        let key = row.get(key_index).map(String::as_str).unwrap_or("");
        let value = if key.is_empty() {
            NO_RESULT.to_string()
        } else {
            if searched {
                thread::sleep(opts.pacing);
            }
            searched = true;

            let samples = provider.search(key, opts.max_samples);
            match representative_price(&samples, opts.policy) {
                Some(price) => format!("{price:.2}"),
                None => NO_RESULT.to_string(),
            }
        };

        if !key.is_empty() {
            progress(format!("{key} -> ${value}"));
        }

        let mut out_row = row.clone();
        out_row.push(value);
        writer.write_record(&out_row)?;
        writer.flush()?;
    }

    Ok(output)
}

/// Run enrichment on a background worker; progress and completion flow back
/// over the returned channel.
pub fn spawn_enrich(
    input: PathBuf,
    key_column: String,
    provider: Box<dyn PriceProvider>,
    opts: EnrichOptions,
    cancel: Arc<AtomicBool>,
) -> Receiver<EnrichProgress> {
    let (tx, rx) = unbounded();

    thread::spawn(move || {
        let result = enrich_csv(&input, &key_column, provider.as_ref(), &opts, &cancel, |line| {
            let _ = tx.send(EnrichProgress::Row(line));
        });
        let message = match result {
            Ok(path) => EnrichProgress::Done(path),
            Err(e) => {
                warn!(error = %e, "enrichment failed");
                EnrichProgress::Failed(e.to_string())
            }
        };
        let _ = tx.send(message);
    });

    rx
}

fn enriched_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    input.with_file_name(format!("{stem}_with_prices.csv"))
}
