//! Roster pipeline.
//!
//! A bounded pool of workers pulls roster entries from a shared index and
//! aggregates each character. Results are collected by roster index, so the
//! output order never depends on completion order.
//!
//! Two conditions stop a run early:
//!
//! - A character whose token endpoint is unreachable. The worker that sees
//!   it cancels the run; no other character can succeed against that API.
//! - The optional run timeout.
//!
//! In both cases sources still in flight are recorded as cancelled and
//! entries never started get a record with every source cancelled. The run
//! still returns one record per roster entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use rosterstat_core::{
    AbortReason, CharacterRecord, CoreError, ErrorKind, RosterEntry, RunResult, SourceFailure,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{CharacterAggregator, CharacterOutcome};
use crate::cancel::{self, CancelHandle, CancelSignal};
use crate::context::FetchContext;

/// Upper bound on parallel characters.
pub const MAX_CONCURRENCY: usize = 16;

// ============================================================================
// Roster Pipeline
// ============================================================================

/// Aggregates every character of a roster with bounded concurrency.
#[derive(Debug, Clone)]
pub struct RosterPipeline {
    aggregator: Arc<CharacterAggregator>,
    ctx: Arc<FetchContext>,
}

impl RosterPipeline {
    /// Creates a pipeline.
    pub fn new(aggregator: CharacterAggregator, ctx: FetchContext) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            ctx: Arc::new(ctx),
        }
    }

    /// Returns the fetch context.
    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    /// Runs the pipeline with the concurrency from the context settings.
    ///
    /// # Errors
    ///
    /// See [`RosterPipeline::run`].
    pub async fn run_default(&self, entries: &[RosterEntry]) -> Result<RunResult, CoreError> {
        self.run(entries, self.ctx.settings.concurrency).await
    }

    /// Aggregates every entry with at most `concurrency` characters in flight.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `concurrency` is zero or above
    /// [`MAX_CONCURRENCY`], and [`CoreError::InvalidRosterEntry`] if an entry
    /// lacks a name or realm. Source failures never produce an error.
    #[instrument(skip_all, fields(characters = entries.len(), concurrency = concurrency))]
    pub async fn run(
        &self,
        entries: &[RosterEntry],
        concurrency: usize,
    ) -> Result<RunResult, CoreError> {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(CoreError::InvalidConfig(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {concurrency}"
            )));
        }
        for entry in entries {
            entry.validate()?;
        }

        let started_at = Utc::now();
        info!(characters = entries.len(), concurrency, "Starting roster run");

        let (handle, signal) = cancel::channel();
        let handle = Arc::new(handle);
        let shared: Arc<[RosterEntry]> = entries.into();
        let next = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, CharacterOutcome)>();

        let mut workers = JoinSet::new();
        for worker in 0..concurrency.min(entries.len()) {
            workers.spawn(worker_loop(
                worker,
                Arc::clone(&self.aggregator),
                Arc::clone(&self.ctx),
                Arc::clone(&shared),
                Arc::clone(&next),
                Arc::clone(&handle),
                signal.clone(),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut slots: Vec<Option<CharacterOutcome>> = entries.iter().map(|_| None).collect();
        let run_timeout = self.ctx.settings.run_timeout;
        let deadline = async move {
            match run_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        let mut deadline_fired = false;

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some((index, outcome)) => {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(outcome);
                        }
                    }
                    None => break,
                },
                () = &mut deadline, if !deadline_fired => {
                    deadline_fired = true;
                    let after_secs = run_timeout.map_or(0, |d| d.as_secs());
                    handle.cancel(AbortReason::Timeout { after_secs });
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Roster worker failed");
            }
        }

        let aborted = signal.reason();
        let mut records = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();

        for (entry, slot) in entries.iter().zip(slots) {
            match slot {
                Some(outcome) => {
                    failures.extend(outcome.failures);
                    records.push(outcome.record);
                }
                None => {
                    let message = match &aborted {
                        Some(reason) => format!("not started: {reason}"),
                        None => "not started: worker stopped".to_string(),
                    };
                    let record = CharacterRecord::all_failed(entry, ErrorKind::Cancelled);
                    failures.extend(record.failed_sources.keys().map(|source| SourceFailure {
                        character: entry.name.clone(),
                        server: entry.server_slug.clone(),
                        source: *source,
                        kind: ErrorKind::Cancelled,
                        message: message.clone(),
                    }));
                    records.push(record);
                }
            }
        }

        let result = RunResult {
            records,
            failures,
            aborted,
            started_at,
            finished_at: Utc::now(),
        };

        match &result.aborted {
            Some(reason) => warn!(
                reason = %reason,
                failures = result.failures.len(),
                "Roster run aborted"
            ),
            None => info!(failures = result.failures.len(), "Roster run finished"),
        }

        Ok(result)
    }
}

// ============================================================================
// Worker
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker: usize,
    aggregator: Arc<CharacterAggregator>,
    ctx: Arc<FetchContext>,
    entries: Arc<[RosterEntry]>,
    next: Arc<AtomicUsize>,
    handle: Arc<CancelHandle>,
    signal: CancelSignal,
    tx: mpsc::UnboundedSender<(usize, CharacterOutcome)>,
) {
    loop {
        if signal.is_cancelled() {
            debug!(worker, "Run cancelled, worker stopping");
            return;
        }

        let index = next.fetch_add(1, Ordering::SeqCst);
        let Some(entry) = entries.get(index) else {
            return;
        };

        let outcome = aggregator.aggregate(entry, &ctx, &signal).await;

        if let Some(fatal) = outcome.run_fatal_failure() {
            handle.cancel(AbortReason::AuthProviderDown {
                character: entry.name.clone(),
                source: fatal.source,
                message: fatal.message.clone(),
            });
        }

        if tx.send((index, outcome)).is_err() {
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
