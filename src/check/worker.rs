//! Per-item retry loop
//!
//! A worker keeps attempting its item until the endpoint gives a definitive
//! answer. Faults of any kind and unexpected statuses loop back to another
//! attempt with no backoff growth; the fixed throttle pause follows every
//! attempt, including the final one. Only the optional attempt ceiling or a
//! failed result write end an item without a classification.

use crate::check::attempt::{Attempt, Verifier};
use crate::check::engine::RunProgress;
use crate::check::fault::IsTransient;
use crate::check::sink::{Category, ResultSink};
use crate::proxy::Proxy;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// One item handed to a worker, with its position in the run
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    /// Zero-based position in the input
    pub index: usize,
    pub total: usize,
    pub item: &'a str,
    pub proxy: Option<&'a Proxy>,
}

impl Assignment<'_> {
    /// `[index/total] (percent%)` with a 1-based index
    pub fn progress_label(&self) -> String {
        let percent = if self.total == 0 {
            0.0
        } else {
            (self.index + 1) as f64 / self.total as f64 * 100.0
        };
        format!("[{}/{}] ({:.2}%)", self.index + 1, self.total, percent)
    }
}

/// Final state of an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Live,
    Dead { reason: String },
    /// Stopped without a classification: sink failure or the optional
    /// attempt ceiling
    Abandoned { reason: String },
}

/// What a worker hands back to the engine
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub index: usize,
    pub item: String,
    pub proxy: Option<Proxy>,
    pub verdict: Verdict,
    pub attempts: u32,
    /// Duration of the last attempt, diagnostics excluded
    pub elapsed: Duration,
}

/// State shared by all workers of a run
pub struct WorkerContext<V: ?Sized> {
    pub verifier: std::sync::Arc<V>,
    pub sink: ResultSink,
    pub throttle: Duration,
    pub max_attempts: Option<u32>,
    pub progress: RunProgress,
}

impl<V: Verifier + ?Sized> WorkerContext<V> {
    /// Drive one item to its final verdict
    pub async fn check_item(&self, assignment: Assignment<'_>) -> ItemReport {
        let label = assignment.progress_label();
        let mut attempts = 0u32;
        let mut elapsed;

        let verdict = loop {
            attempts += 1;
            self.verifier.before_attempt(assignment.proxy).await;
            let started = Instant::now();
            let outcome = self.verifier.attempt(assignment.item, assignment.proxy).await;
            elapsed = started.elapsed();

            let settled = match outcome {
                Attempt::Live => Some(self.record(&assignment, &label, Verdict::Live, elapsed).await),
                Attempt::Dead { reason } => Some(
                    self.record(&assignment, &label, Verdict::Dead { reason }, elapsed)
                        .await,
                ),
                Attempt::Indeterminate { status } => {
                    warn!(
                        item = assignment.item,
                        status = status.as_u16(),
                        attempt = attempts,
                        "{} {} => Request failed with status code: {} [Time: {:.2}s]",
                        label,
                        assignment.item,
                        status.as_u16(),
                        elapsed.as_secs_f64()
                    );
                    None
                }
                Attempt::Fault(e) if e.is_transient() => {
                    error!(
                        item = assignment.item,
                        attempt = attempts,
                        error = %e,
                        "Error checking {}. Retrying...",
                        assignment.item
                    );
                    None
                }
                Attempt::Fault(e) => {
                    error!(
                        item = assignment.item,
                        attempt = attempts,
                        error = %e,
                        "Unexpected error checking {}. Retrying...",
                        assignment.item
                    );
                    None
                }
            };

            tokio::time::sleep(self.throttle).await;

            if let Some(verdict) = settled {
                break verdict;
            }
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    warn!(item = assignment.item, attempts, "Attempt ceiling reached, giving up on item");
                    break Verdict::Abandoned {
                        reason: format!("no definitive answer after {} attempts", attempts),
                    };
                }
            }
        };

        ItemReport {
            index: assignment.index,
            item: assignment.item.to_string(),
            proxy: assignment.proxy.cloned(),
            verdict,
            attempts,
            elapsed,
        }
    }

    /// Persist a terminal verdict, then report progress
    async fn record(
        &self,
        assignment: &Assignment<'_>,
        label: &str,
        verdict: Verdict,
        elapsed: Duration,
    ) -> Verdict {
        let (category, line) = match &verdict {
            Verdict::Live => (Category::Live, assignment.item.to_string()),
            Verdict::Dead { reason } => (Category::Dead, format!("{} - {}", assignment.item, reason)),
            Verdict::Abandoned { .. } => return verdict,
        };

        if let Err(e) = self.sink.append(category, &line).await {
            error!(item = assignment.item, error = %e, "Failed to save result");
            return Verdict::Abandoned {
                reason: format!("failed to save result: {}", e),
            };
        }

        let completed = self.progress.record();
        info!(
            category = %category,
            completed,
            total = self.progress.total(),
            "{} [{} - saved to {}] {} [Time: {:.2}s]",
            label,
            category.to_string().to_uppercase(),
            self.sink.path_for(category).display(),
            line,
            elapsed.as_secs_f64()
        );

        verdict
    }
}
