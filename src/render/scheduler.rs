//! Parallel rendering of many scrolls on a fixed pool of workers

use crate::config::BatchPolicy;
use crate::library::ScrollStore;
use crate::models::ScrollId;
use crate::render::backend::{RenderBackend, RenderOutcome};
use crate::render::error::{RenderError, RenderResult};
use crate::render::pipeline::render_scroll;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

const BANNER: &str = "############################################################";

/// Outcome of a batch render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,

    /// Scrolls whose image was (re)rendered
    pub rendered: usize,

    /// Scrolls whose image was already fresh
    pub up_to_date: usize,

    /// Scrolls without a source file
    pub missing: Vec<ScrollId>,

    /// Scrolls that failed for any other reason
    pub failed: Vec<ScrollId>,
}

impl BatchSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            rendered: 0,
            up_to_date: 0,
            missing: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Scrolls that have a current image after the batch
    pub fn succeeded(&self) -> usize {
        self.rendered + self.up_to_date
    }

    pub fn is_missing(&self, id: &ScrollId) -> bool {
        self.missing.contains(id)
    }
}

/// Renders batches of scrolls with at most `max_procs` pipelines in flight
pub struct RenderScheduler {
    backend: Arc<dyn RenderBackend>,
    max_procs: usize,
}

impl RenderScheduler {
    pub fn new(backend: Arc<dyn RenderBackend>, max_procs: usize) -> Self {
        Self {
            backend,
            max_procs: max_procs.max(1),
        }
    }

    /// Render a single scroll
    pub async fn render_one(&self, id: &ScrollId) -> RenderResult<RenderOutcome> {
        render_scroll(self.backend.as_ref(), id).await
    }

    /// Render every scroll source file in the library
    pub async fn render_all(
        &self,
        store: &ScrollStore,
        policy: BatchPolicy,
    ) -> RenderResult<BatchSummary> {
        let ids = store
            .list()
            .map_err(|source| RenderError::Library {
                directory: store.directory().to_path_buf(),
                source,
            })?
            .into_iter()
            .map(|stored| stored.id)
            .collect();

        self.render_list(ids, policy).await
    }

    /// Render the given scrolls in parallel, in no particular order.
    ///
    /// Missing scrolls are recorded and skipped. Under `BatchPolicy::FailFast`
    /// any other failure stops handing out work and is returned as
    /// `RenderError::Aborted`; under `KeepGoing` it is logged and recorded.
    pub async fn render_list(
        &self,
        ids: Vec<ScrollId>,
        policy: BatchPolicy,
    ) -> RenderResult<BatchSummary> {
        let started_at = Utc::now();
        let start = std::time::Instant::now();
        let mut summary = BatchSummary::new(started_at);

        if ids.is_empty() {
            return Ok(summary);
        }

        let workers = self.max_procs.min(ids.len());
        info!(scrolls = ids.len(), workers, ?policy, "Starting batch render");

        let queue = Arc::new(Mutex::new(VecDeque::from(ids)));
        let abort = Arc::new(AtomicBool::new(false));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let backend = Arc::clone(&self.backend);
            let queue = Arc::clone(&queue);
            let abort = Arc::clone(&abort);
            let result_tx = result_tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if abort.load(Ordering::SeqCst) {
                        break;
                    }
                    let next = queue.lock().await.pop_front();
                    let Some(id) = next else {
                        break;
                    };

                    // A panicking pipeline must still report its scroll
                    let task = {
                        let backend = Arc::clone(&backend);
                        let id = id.clone();
                        tokio::spawn(async move { render_scroll(backend.as_ref(), &id).await })
                    };
                    let result = match task.await {
                        Ok(result) => result,
                        Err(e) => Err(RenderError::Panicked {
                            id: id.clone(),
                            reason: e.to_string(),
                        }),
                    };
                    if policy == BatchPolicy::FailFast
                        && matches!(&result, Err(e) if !e.is_missing())
                    {
                        abort.store(true, Ordering::SeqCst);
                    }
                    if result_tx.send((id, result)).is_err() {
                        break;
                    }
                }
                debug!(worker, "Render worker finished");
            }));
        }
        drop(result_tx);

        let mut fatal = None;
        while let Some((id, result)) = result_rx.recv().await {
            match result {
                Ok(RenderOutcome::Rendered(_)) => summary.rendered += 1,
                Ok(RenderOutcome::UpToDate) => summary.up_to_date += 1,
                Err(e) if e.is_missing() => {
                    debug!(scroll_id = %id, "Skipping missing scroll");
                    summary.missing.push(id);
                }
                Err(e) => match policy {
                    BatchPolicy::FailFast => {
                        error!(scroll_id = %id, error = %e, "Aborting batch render");
                        summary.failed.push(id.clone());
                        if fatal.is_none() {
                            fatal = Some(RenderError::Aborted {
                                id,
                                source: Box::new(e),
                            });
                        }
                    }
                    BatchPolicy::KeepGoing => {
                        error!("{}\nERROR\n{}\n{}\n{}", BANNER, BANNER, e, BANNER);
                        summary.failed.push(id);
                    }
                },
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Render worker stopped abnormally");
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;

        if let Some(e) = fatal {
            return Err(e);
        }

        info!(
            rendered = summary.rendered,
            up_to_date = summary.up_to_date,
            missing = summary.missing.len(),
            failed = summary.failed.len(),
            duration_ms = summary.duration_ms,
            "Batch render complete"
        );
        Ok(summary)
    }
}
