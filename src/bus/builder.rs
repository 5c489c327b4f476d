//! Whole-project correlation index construction.
//!
//! Every file is scanned in its own blocking task. Each task sends the
//! file's resolved pairs over a bounded channel to a single consumer, which
//! is the only writer of the index and of progress.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::contract::ContractDetector;
use super::model::{BusTarget, CorrelationIndex, EventTarget};
use super::scanner::scan_file;
use crate::error::{BusError, Result};
use crate::index::FileId;
use crate::indexer::{ProgressReporter, Project};
use crate::languages::Dialect;

/// Share of the progress bar spent enumerating the files of one dialect.
pub const ENUMERATION_FRACTION: f64 = 0.05;

/// Resolved pairs of one scanned file.
#[derive(Debug)]
struct FileResult {
    file: FileId,
    pairs: Vec<(BusTarget, EventTarget)>,
}

pub struct IndexBuilder {
    project: Arc<Project>,
    detector: Arc<ContractDetector>,
    buffer_size: usize,
}

impl IndexBuilder {
    const DEFAULT_BUFFER_SIZE: usize = 256;

    pub fn new(project: Arc<Project>, detector: Arc<ContractDetector>) -> Self {
        Self {
            project,
            detector,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Scans every file and collects the (bus, event) pairs with at least
    /// one resolved call site. Returns [`BusError::Cancelled`] as soon as
    /// `cancel` fires; no partial index is returned.
    pub async fn build(
        &self,
        cancel: CancellationToken,
        progress: ProgressReporter,
    ) -> Result<CorrelationIndex> {
        progress.start();
        let mut files = Vec::with_capacity(self.project.len());
        for dialect in Dialect::ALL {
            let ids = self.project.file_ids_of(dialect);
            tracing::debug!("Enumerated {} {} files", ids.len(), dialect);
            files.extend(ids);
            progress.add_fraction(ENUMERATION_FRACTION);
        }
        progress.set_total_units(files.len());

        if !self.detector.is_available() {
            tracing::info!("Bus interface unavailable; index is empty");
            progress.finish();
            return Ok(CorrelationIndex::new());
        }

        let (tx, mut rx) = mpsc::channel::<FileResult>(self.buffer_size);
        let mut tasks = JoinSet::new();
        for file in files {
            let project = Arc::clone(&self.project);
            let detector = Arc::clone(&self.detector);
            let cancel = cancel.clone();
            let tx = tx.clone();
            tasks.spawn_blocking(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let pairs = resolved_pairs(&project, &detector, file);
                // The receiver is gone only when the build was cancelled.
                let _ = tx.blocking_send(FileResult { file, pairs });
            });
        }
        drop(tx);

        let mut index = CorrelationIndex::new();
        let mut scanned = 0usize;
        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break true,
                result = rx.recv() => match result {
                    Some(result) => {
                        for (bus, event) in &result.pairs {
                            if index.insert(bus, event) {
                                tracing::trace!("New pair {} / {}", bus, event);
                            }
                        }
                        tracing::trace!(
                            "Merged {} pairs from {}",
                            result.pairs.len(),
                            self.project.file(result.file).path.display()
                        );
                        scanned += 1;
                        progress.advance(1);
                    }
                    None => break false,
                },
            }
        };

        if cancelled {
            tracing::info!("Index build cancelled after {} files", scanned);
            tasks.abort_all();
            drop(rx);
            while tasks.join_next().await.is_some() {}
            return Err(BusError::Cancelled);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("File scan task failed: {}", e);
            }
        }

        progress.finish();
        tracing::info!(
            "Indexed {} buses, {} pairs from {} files",
            index.len(),
            index.pair_count(),
            scanned
        );
        Ok(index)
    }
}

/// Resolved (bus, event) pairs of one file; unresolved sites are dropped.
fn resolved_pairs(
    project: &Project,
    detector: &ContractDetector,
    file: FileId,
) -> Vec<(BusTarget, EventTarget)> {
    scan_file(project.context(file), detector)
        .into_iter()
        .filter_map(|site| Some((site.bus?, site.event?)))
        .collect()
}
