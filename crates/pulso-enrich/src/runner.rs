//! Resumable batch enrichment.
//!
//! The runner diffs the raw tweets table against whatever output already
//! exists, classifies only the missing records one at a time, and persists
//! the output after every record so an interruption loses at most the
//! in-flight item. Restarting with the same files picks up where it stopped.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use pulso_core::Table;

use crate::classification::{field_keys, FIELDS};
use crate::classifier::Classifier;
use crate::error::EnrichError;
use crate::sanitize::sanitize;

/// Candidate column in the raw tweets table.
pub const INPUT_CANDIDATE_COLUMN: &str = "candidato";

/// Column used to decide whether a record already has an output row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchKey {
    #[default]
    Text,
    Id,
}

/// What to write when a record cannot be classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Write the record with empty classification cells; it is not retried.
    #[default]
    Placeholder,
    /// Write nothing; the record is picked up again on the next run.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckpointMode {
    /// Atomically replace the whole output file after each record.
    #[default]
    Rewrite,
    /// Append one row per record.
    Append,
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub prefix: String,
    pub match_key: MatchKey,
    pub on_failure: FailurePolicy,
    pub checkpoint: CheckpointMode,
    /// Sleep between consecutive classifier calls.
    pub pace: Duration,
}

impl RunnerSettings {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            prefix: "tw_".to_string(),
            match_key: MatchKey::default(),
            on_failure: FailurePolicy::default(),
            checkpoint: CheckpointMode::default(),
            pace: Duration::from_millis(1000),
        }
    }

    fn text_column(&self) -> String {
        format!("{}texto", self.prefix)
    }

    fn id_column(&self) -> String {
        format!("{}tweet", self.prefix)
    }

    /// Output column order: text, candidate, id, then every classification field.
    #[must_use]
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.text_column(),
            format!("{}candidate", self.prefix),
            self.id_column(),
        ];
        columns.extend(field_keys(&self.prefix));
        columns
    }

    fn match_column(&self) -> String {
        match self.match_key {
            MatchKey::Text => self.text_column(),
            MatchKey::Id => self.id_column(),
        }
    }
}

/// One post awaiting classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub candidate: String,
}

impl Record {
    fn key(&self, match_key: MatchKey) -> &str {
        match match_key {
            MatchKey::Text => &self.text,
            MatchKey::Id => &self.id,
        }
    }

    fn output_row(&self, fields: Vec<String>) -> Vec<String> {
        let mut row = vec![self.text.clone(), self.candidate.clone(), self.id.clone()];
        row.extend(fields);
        row
    }
}

/// The result of diffing the input against existing output.
#[derive(Debug)]
pub struct Plan {
    /// Existing output, normalized to the output columns and deduplicated.
    pub output: Table,
    /// Records still to classify, in input order.
    pub work: Vec<Record>,
    /// Unique-by-text input records.
    pub input_records: usize,
    /// Input records with an empty id, text or candidate.
    pub incomplete: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pending: usize,
    pub classified: usize,
    /// Record-scoped failures written as placeholder rows.
    pub failed: usize,
    /// Record-scoped failures left for a later run.
    pub skipped: usize,
}

/// Load input and output and compute the work set. Touches nothing on disk.
///
/// # Errors
///
/// Returns [`EnrichError::Table`] if the input is missing or lacks the text
/// column, or if either file is unreadable.
pub fn plan(settings: &RunnerSettings) -> Result<Plan, EnrichError> {
    let text_column = settings.text_column();
    let input = Table::read_csv(&settings.input)?.dedup_by(&text_column)?;
    tracing::info!(path = %settings.input.display(), rows = input.len(), "input loaded");

    let columns = settings.output_columns();
    let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    let match_column = settings.match_column();

    let output = match Table::read_csv_dropping_torn_tail(&settings.output)? {
        Some((existing, torn)) => {
            if torn {
                tracing::warn!(
                    path = %settings.output.display(),
                    "dropped incomplete last row left by an interrupted run"
                );
            }
            let output = dedup_nonblank(&existing.select(&column_refs), &match_column)?;
            tracing::info!(
                path = %settings.output.display(),
                rows = output.len(),
                "existing output loaded"
            );
            output
        }
        None => {
            tracing::info!(path = %settings.output.display(), "no existing output; starting empty");
            Table::new(columns.clone())
        }
    };

    let done: HashSet<&str> = output
        .column_values(&match_column)?
        .filter(|v| !v.is_empty())
        .collect();

    let id_column = settings.id_column();
    let projected = input.select(&[
        id_column.as_str(),
        text_column.as_str(),
        INPUT_CANDIDATE_COLUMN,
    ]);
    let mut work = Vec::new();
    let mut incomplete = 0usize;
    for row in projected.rows() {
        let [id, text, candidate] = [&row[0], &row[1], &row[2]];
        if id.is_empty() || text.is_empty() || candidate.is_empty() {
            incomplete += 1;
            continue;
        }
        let record = Record {
            id: id.clone(),
            text: text.clone(),
            candidate: candidate.clone(),
        };
        if !done.contains(record.key(settings.match_key)) {
            work.push(record);
        }
    }

    if incomplete > 0 {
        tracing::warn!(incomplete, "input records with missing values dropped");
    }
    tracing::info!(pending = work.len(), "rows to process");

    Ok(Plan {
        output,
        work,
        input_records: input.len(),
        incomplete,
    })
}

/// Classify every pending record, checkpointing after each one.
///
/// # Errors
///
/// - [`EnrichError::Table`] if loading or checkpointing fails.
/// - [`EnrichError::Aborted`] on a classifier failure that is not scoped to
///   the record (exhausted retries, authentication, unexpected status).
///   Everything checkpointed before the failure stays on disk.
pub async fn run<C: Classifier>(
    classifier: &C,
    settings: &RunnerSettings,
) -> Result<RunSummary, EnrichError> {
    let Plan {
        mut output, work, ..
    } = plan(settings)?;

    let mut summary = RunSummary {
        pending: work.len(),
        ..RunSummary::default()
    };
    if work.is_empty() {
        tracing::info!("nothing to classify");
        return Ok(summary);
    }

    if settings.checkpoint == CheckpointMode::Append {
        // Normalize once so that appended rows line up with the header.
        output.write_csv(&settings.output)?;
    }

    for (i, record) in work.iter().enumerate() {
        if i > 0 && !settings.pace.is_zero() {
            tokio::time::sleep(settings.pace).await;
        }

        tracing::info!(id = %record.id, candidate = %record.candidate, "classifying");
        let text = sanitize(record.text.as_str());
        let row = match classifier.classify(&text, &settings.prefix).await {
            Ok(classification) => {
                summary.classified += 1;
                record.output_row(classification.to_cells())
            }
            Err(err) if err.is_record_scoped() => {
                tracing::error!(id = %record.id, error = %err, "classification failed");
                match settings.on_failure {
                    FailurePolicy::Placeholder => {
                        summary.failed += 1;
                        record.output_row(vec![String::new(); FIELDS.len()])
                    }
                    FailurePolicy::Skip => {
                        summary.skipped += 1;
                        continue;
                    }
                }
            }
            Err(err) => {
                tracing::error!(id = %record.id, error = %err, "classifier unavailable; aborting run");
                return Err(EnrichError::Aborted {
                    processed: summary.classified + summary.failed + summary.skipped,
                    source: err,
                });
            }
        };

        checkpoint(&mut output, row, settings)?;
    }

    tracing::info!(
        classified = summary.classified,
        failed = summary.failed,
        skipped = summary.skipped,
        "enrichment complete"
    );
    Ok(summary)
}

fn checkpoint(
    output: &mut Table,
    row: Vec<String>,
    settings: &RunnerSettings,
) -> Result<(), EnrichError> {
    match settings.checkpoint {
        CheckpointMode::Rewrite => {
            output.push_row(row)?;
            output.write_csv(&settings.output)?;
        }
        CheckpointMode::Append => {
            Table::append_csv_row(&settings.output, output.columns(), &row)?;
            output.push_row(row)?;
        }
    }
    Ok(())
}

/// Keep the first row per non-empty `column` value; rows with an empty key are
/// all kept (e.g. output written before the id column existed).
fn dedup_nonblank(table: &Table, column: &str) -> Result<Table, EnrichError> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| pulso_core::TableError::UnknownColumn(column.to_string()))?;
    let mut seen = HashSet::new();
    let rows = table
        .rows()
        .iter()
        .filter(|row| row[idx].is_empty() || seen.insert(row[idx].as_str()))
        .cloned()
        .collect();
    Ok(Table::from_rows(table.columns().to_vec(), rows)?)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
