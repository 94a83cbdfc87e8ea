//! One pass over the pending screenshots.
//!
//! Sequential: each file goes through reading, routing and persistence
//! before the next one starts. The pending listing is taken once up front.

use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::lifecycle::{LifecycleError, ScreenshotLayout};
use super::reader::RecordReader;
use super::recognition::RecognitionError;
use super::timestamp::{extract_collected_at, TimestampError};
use super::validation::Rejection;
use crate::models::{ApplianceRecord, ProcessingEvent, ScreenshotState};
use crate::store::{StoreError, UsageStore};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("Recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("File lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl BatchError {
    /// Fatal errors stop the whole batch. The others only affect one file,
    /// which stays in the pending directory.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::Lifecycle(e) => !e.is_file_level(),
            Self::Timestamp(_) | Self::Recognition(_) => false,
        }
    }
}

/// What happened to one screenshot.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    pub state: ScreenshotState,
    pub collected_at: NaiveDateTime,
    pub appliances: Vec<ApplianceRecord>,
    pub rejection: Option<Rejection>,
    pub usages_inserted: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub files_seen: usize,
    pub processed: usize,
    pub failed: usize,
    pub usages_inserted: usize,
    pub events_inserted: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

pub fn new_batch_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct BatchRunner {
    reader: RecordReader,
    store: Box<dyn UsageStore>,
    layout: ScreenshotLayout,
}

impl BatchRunner {
    pub fn new(reader: RecordReader, store: Box<dyn UsageStore>, layout: ScreenshotLayout) -> Self {
        Self {
            reader,
            store,
            layout,
        }
    }

    pub fn layout(&self) -> &ScreenshotLayout {
        &self.layout
    }

    /// Drive one pending screenshot to Processed or Failed.
    ///
    /// 1. Capture time from the file name and check no terminal directory
    ///    already holds that name (both before any side effect)
    /// 2. Recognize, assemble and validate
    /// 3. Accepted: insert one usage row per running appliance, move to processed
    ///    Rejected: move to failed
    /// 4. Insert the processing event (both branches)
    pub fn process_file(&self, file_name: &str) -> Result<FileOutcome, BatchError> {
        let collected_at = extract_collected_at(file_name)?;
        self.layout.ensure_unclaimed(file_name)?;
        let pending_path = self.layout.path_of(file_name, ScreenshotState::Pending);
        let reading = self.reader.read(&pending_path)?;

        let (state, usages_inserted) = match &reading.rejection {
            Some(reason) => {
                tracing::warn!(file = file_name, reason = %reason, "Screenshot rejected");
                self.layout.transition(file_name, ScreenshotState::Failed)?;
                (ScreenshotState::Failed, 0)
            }
            None => {
                let mut inserted = 0;
                for record in reading.appliances.iter().filter(|r| r.is_in_use()) {
                    self.store
                        .insert_appliance_use(&record.stamp(file_name, collected_at))?;
                    inserted += 1;
                }
                self.layout.transition(file_name, ScreenshotState::Processed)?;
                (ScreenshotState::Processed, inserted)
            }
        };

        self.store
            .insert_time_update(&ProcessingEvent::new(file_name, collected_at))?;

        tracing::info!(
            file = file_name,
            state = ?state,
            appliances = reading.appliances.len(),
            in_use = usages_inserted,
            "Screenshot processed"
        );

        Ok(FileOutcome {
            file_name: file_name.to_string(),
            state,
            collected_at,
            appliances: reading.appliances,
            rejection: reading.rejection,
            usages_inserted,
        })
    }

    /// Run a full batch over the pending directory.
    pub fn run_batch(&self) -> Result<BatchSummary, BatchError> {
        let start = Instant::now();
        let batch_id = new_batch_id();
        let span = tracing::info_span!("batch", batch_id = %batch_id);
        let _guard = span.enter();

        let files = self.layout.pending_files()?;
        tracing::info!(
            files = files.len(),
            engine = self.reader.engine_name(),
            store = self.store.name(),
            "Batch started"
        );

        let mut summary = BatchSummary {
            batch_id,
            files_seen: files.len(),
            ..BatchSummary::default()
        };

        for file in &files {
            match self.process_file(file) {
                Ok(outcome) => {
                    match outcome.state {
                        ScreenshotState::Processed => summary.processed += 1,
                        ScreenshotState::Failed => summary.failed += 1,
                        ScreenshotState::Pending => {}
                    }
                    summary.usages_inserted += outcome.usages_inserted;
                    summary.events_inserted += 1;
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(file = %file, error = %e, "Aborting batch");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Screenshot left pending");
                    summary.errors.push(format!("{file}: {e}"));
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            errors = summary.errors.len(),
            usages = summary.usages_inserted,
            duration_ms = summary.duration_ms,
            "Batch finished"
        );

        Ok(summary)
    }
}
