//! Bounded dispatch of items to workers

use crate::check::attempt::{HttpVerifier, Verifier};
use crate::check::sink::ResultSink;
use crate::check::worker::{Assignment, ItemReport, Verdict, WorkerContext};
use crate::config::CheckerConfig;
use crate::error::Result;
use crate::proxy::{self, Proxy};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Count of items that reached a terminal classification. Reporting only.
#[derive(Debug)]
pub struct RunProgress {
    total: usize,
    completed: AtomicUsize,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Record one more terminal item and return the new count
    pub fn record(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Outcome of a full run, reports sorted by input index
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub live: usize,
    pub dead: usize,
    pub reports: Vec<ItemReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn from_reports(mut reports: Vec<ItemReport>, elapsed: Duration) -> Self {
        reports.sort_by_key(|r| r.index);
        let live = reports.iter().filter(|r| r.verdict == Verdict::Live).count();
        let dead = reports
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Dead { .. }))
            .count();

        Self {
            total: reports.len(),
            live,
            dead,
            reports,
            elapsed,
        }
    }

    /// Items that stopped without a classification
    pub fn abandoned(&self) -> impl Iterator<Item = &ItemReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Abandoned { .. }))
    }
}

/// Runs every item through a worker with at most `concurrency` in flight
pub struct Dispatcher<V: ?Sized> {
    verifier: Arc<V>,
    proxies: Vec<Proxy>,
    concurrency: usize,
    throttle: Duration,
    max_attempts: Option<u32>,
    output_dir: PathBuf,
}

impl Dispatcher<HttpVerifier> {
    /// Dispatcher over the HTTP verifier described by `config`
    pub fn from_config(config: &CheckerConfig, proxies: Vec<Proxy>) -> Result<Self> {
        let verifier = HttpVerifier::new(config, &proxies)?;
        Self::with_verifier(config, proxies, Arc::new(verifier))
    }
}

impl<V: Verifier + ?Sized> Dispatcher<V> {
    pub fn with_verifier(config: &CheckerConfig, proxies: Vec<Proxy>, verifier: Arc<V>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            verifier,
            proxies,
            concurrency: config.concurrency,
            throttle: config.throttle,
            max_attempts: config.max_attempts,
            output_dir: config.output_dir.clone(),
        })
    }

    /// Check every item exactly once and wait for all of them to finish
    pub async fn run(&self, items: &[String]) -> RunSummary {
        let total = items.len();
        let started = Instant::now();
        let ctx = WorkerContext {
            verifier: Arc::clone(&self.verifier),
            sink: ResultSink::new(&self.output_dir),
            throttle: self.throttle,
            max_attempts: self.max_attempts,
            progress: RunProgress::new(total),
        };

        info!(
            total,
            threads = self.concurrency,
            proxies = self.proxies.len(),
            output = %self.output_dir.display(),
            "Starting check"
        );

        let ctx = &ctx;
        let proxies = &self.proxies;
        let reports = stream::iter(items.iter().enumerate())
            .map(move |(index, item)| {
                ctx.check_item(Assignment {
                    index,
                    total,
                    item,
                    proxy: proxy::assign(proxies, index),
                })
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let summary = RunSummary::from_reports(reports, started.elapsed());
        info!(
            live = summary.live,
            dead = summary.dead,
            abandoned = summary.abandoned().count(),
            completed = ctx.progress.completed(),
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Check finished"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::attempt::Attempt;
    use crate::proxy::ProxyType;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every call and tracks the peak number of concurrent attempts
    #[derive(Default)]
    struct Instrumented {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<HashMap<String, Option<Proxy>>>,
    }

    #[async_trait]
    impl Verifier for Instrumented {
        async fn attempt(&self, item: &str, proxy: Option<&Proxy>) -> Attempt {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // Later items finish first so completion order differs from input order
            let delay = 20u64.saturating_sub(item.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.seen
                .lock()
                .unwrap()
                .insert(item.to_string(), proxy.cloned());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Attempt::Live
        }
    }

    fn config(dir: &std::path::Path, concurrency: usize) -> CheckerConfig {
        CheckerConfig::new("http://127.0.0.1:9/verify")
            .with_concurrency(concurrency)
            .with_throttle(Duration::from_millis(1))
            .with_ip_lookup_url(None)
            .with_output_dir(dir)
    }

    fn items(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", "u".repeat(i + 1), "@x")).collect()
    }

    #[test]
    fn test_run_progress() {
        let progress = RunProgress::new(3);
        assert_eq!(progress.record(), 1);
        assert_eq!(progress.record(), 2);
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.total(), 3);
    }

    async fn peak_for(concurrency: usize, count: usize) -> usize {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Arc::new(Instrumented::default());
        let dispatcher =
            Dispatcher::with_verifier(&config(dir.path(), concurrency), Vec::new(), Arc::clone(&verifier))
                .unwrap();

        let summary = dispatcher.run(&items(count)).await;
        assert_eq!(summary.live, count);
        verifier.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_peak_concurrency_reaches_thread_count() {
        assert_eq!(peak_for(4, 15).await, 4);
    }

    #[tokio::test]
    async fn test_single_thread_is_serial() {
        assert_eq!(peak_for(1, 6).await, 1);
    }

    #[tokio::test]
    async fn test_fewer_items_than_threads() {
        assert_eq!(peak_for(8, 3).await, 3);
    }

    #[tokio::test]
    async fn test_proxy_rotation_is_index_based() {
        let dir = tempfile::tempdir().unwrap();
        let proxies: Vec<_> = (0..3)
            .map(|i| Proxy::new(format!("10.0.0.{}", i), 8080, ProxyType::Http))
            .collect();
        let verifier = Arc::new(Instrumented::default());
        let dispatcher =
            Dispatcher::with_verifier(&config(dir.path(), 7), proxies.clone(), Arc::clone(&verifier))
                .unwrap();

        let items = items(7);
        let summary = dispatcher.run(&items).await;

        let seen = verifier.seen.lock().unwrap();
        for (index, item) in items.iter().enumerate() {
            assert_eq!(seen[item].as_ref(), Some(&proxies[index % 3]), "item {}", index);
            assert_eq!(summary.reports[index].proxy.as_ref(), Some(&proxies[index % 3]));
        }
    }

    #[tokio::test]
    async fn test_no_proxies_means_direct() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Arc::new(Instrumented::default());
        let dispatcher =
            Dispatcher::with_verifier(&config(dir.path(), 2), Vec::new(), Arc::clone(&verifier)).unwrap();

        dispatcher.run(&items(3)).await;

        assert!(verifier.seen.lock().unwrap().values().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_every_item_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Arc::new(Instrumented::default());
        let dispatcher =
            Dispatcher::with_verifier(&config(dir.path(), 3), Vec::new(), verifier).unwrap();

        let items = items(10);
        let summary = dispatcher.run(&items).await;

        let content = std::fs::read_to_string(dir.path().join("live.txt")).unwrap();
        let mut written: Vec<_> = content.lines().map(str::to_string).collect();
        written.sort();
        let mut expected = items.clone();
        expected.sort();
        assert_eq!(written, expected);
        assert_eq!(summary.abandoned().count(), 0);
        let indices: Vec<_> = summary.reports.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Dispatcher::with_verifier(
            &config(dir.path(), 0),
            Vec::new(),
            Arc::new(Instrumented::default()),
        );
        assert!(result.is_err());
    }
}
