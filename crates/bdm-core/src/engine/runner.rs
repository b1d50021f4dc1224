//! One run: start the pool, dispatch, collect, shut down.

use anyhow::{Context, Result};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::config::RunOptions;
use crate::fetch::{Fetch, HttpFetcher};
use crate::naming::{Namer, NamingPolicy};

use super::collector::{BatchReport, Collector};
use super::control::RunControl;
use super::dispatcher::Dispatcher;
use super::progress::BatchProgress;
use super::worker::Worker;

/// Runs a batch of downloads with a fixed pool of `options.workers` workers.
pub struct BatchRunner<F> {
    options: RunOptions,
    naming: NamingPolicy,
    output_dir: PathBuf,
    fetcher: Arc<F>,
    progress: Option<mpsc::Sender<BatchProgress>>,
}

impl BatchRunner<HttpFetcher> {
    /// Runner backed by libcurl, configured from `options`.
    pub fn http(options: RunOptions, naming: NamingPolicy, output_dir: impl Into<PathBuf>) -> Self {
        let fetcher = HttpFetcher::new(options.fetch_options());
        Self::with_fetcher(options, naming, output_dir, fetcher)
    }
}

impl<F: Fetch> BatchRunner<F> {
    pub fn with_fetcher(
        options: RunOptions,
        naming: NamingPolicy,
        output_dir: impl Into<PathBuf>,
        fetcher: F,
    ) -> Self {
        Self {
            options,
            naming,
            output_dir: output_dir.into(),
            fetcher: Arc::new(fetcher),
            progress: None,
        }
    }

    /// Send a progress snapshot after every collected result.
    pub fn progress(mut self, tx: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Dispatches every non-blank line as a job and waits for all results.
    ///
    /// A read error in `lines` aborts the run: workers are cancelled and outstanding
    /// results are discarded.
    pub async fn run<I>(self, lines: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = io::Result<String>> + Send + 'static,
    {
        let BatchRunner {
            options,
            naming,
            output_dir,
            fetcher,
            progress,
        } = self;
        options.validate().context("invalid run options")?;
        let workers = options.workers;
        let capacity = options.queue_capacity;

        let control = RunControl::new();
        let (result_tx, result_rx) = mpsc::channel(capacity);
        let mut queues = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (job_tx, job_rx) = mpsc::channel(capacity);
            queues.push(job_tx);
            let worker = Worker::new(
                id,
                job_rx,
                result_tx.clone(),
                control.token(),
                Arc::clone(&fetcher),
            );
            handles.push(tokio::spawn(worker.run()));
        }
        drop(result_tx);
        tracing::info!(workers, segmented = options.segmented, "started worker pool");

        let (count_tx, count_rx) = oneshot::channel();
        let collector = tokio::spawn(Collector::new(result_rx, count_rx, progress).collect());

        let dispatcher = Dispatcher::new(queues, Namer::new(naming, output_dir))?;
        let dispatched = tokio::task::spawn_blocking(move || dispatcher.dispatch(lines))
            .await
            .context("dispatcher task failed")
            .and_then(|r| r);
        let submitted = match dispatched {
            Ok(n) => n,
            Err(e) => {
                control.cancel();
                collector.abort();
                return Err(e);
            }
        };
        tracing::info!(submitted, "input fully dispatched");
        // The collector only exits early on error, in which case the count is moot.
        let _ = count_tx.send(submitted);

        let collected = collector.await.context("collector task failed").and_then(|r| r);
        control.cancel();
        let report = collected?;

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("worker task failed: {}", e);
            }
        }
        tracing::info!(
            submitted = report.submitted(),
            failed = report.failed(),
            "run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::ok;
    use crate::engine::{route, Job};
    use crate::fetch::FetchError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    fn options(workers: usize) -> RunOptions {
        RunOptions {
            workers,
            ..RunOptions::default()
        }
    }

    fn urls(n: usize) -> Vec<io::Result<String>> {
        (0..n).map(|i| Ok(format!("http://h/{}.bin", i))).collect()
    }

    #[tokio::test]
    async fn every_submitted_job_produces_one_result() {
        for workers in [1usize, 2, 3, 8] {
            for n in [0usize, 1, 4, 17] {
                let runner = BatchRunner::with_fetcher(
                    options(workers),
                    NamingPolicy::Index,
                    "/out",
                    |j: &Job| ok(j.index as u64),
                );
                let report = runner.run(urls(n)).await.unwrap();
                assert_eq!(report.submitted(), n, "workers {workers} n {n}");
                let indices: HashSet<usize> =
                    report.results().iter().map(|r| r.job.index).collect();
                assert_eq!(indices, (0..n).collect::<HashSet<_>>());
            }
        }
    }

    #[tokio::test]
    async fn each_worker_fetches_in_submission_order() {
        // Within one worker, jobs are fetched in submission order.
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_in = Arc::clone(&order);
        let runner = BatchRunner::with_fetcher(options(2), NamingPolicy::Index, "/out", move |j: &Job| {
            order_in.lock().unwrap().push(j.index);
            ok(0)
        });
        let report = runner.run(urls(4)).await.unwrap();
        assert_eq!(report.submitted(), 4);
        let order = order.lock().unwrap().clone();
        for worker in 0..2 {
            let mine: Vec<usize> = order.iter().copied().filter(|i| route(*i, 2) == worker).collect();
            let mut sorted = mine.clone();
            sorted.sort_unstable();
            assert_eq!(mine, sorted, "worker {worker} processed out of order");
        }
    }

    #[tokio::test]
    async fn failures_are_reported_not_fatal() {
        let runner = BatchRunner::with_fetcher(options(3), NamingPolicy::Index, "/out", |j: &Job| {
            if j.index % 2 == 1 {
                Err(FetchError::Http(404))
            } else {
                ok(1)
            }
        });
        let report = runner.run(urls(6)).await.unwrap();
        assert_eq!(report.submitted(), 6);
        assert_eq!(report.failed(), 3);
        assert!(!report.all_succeeded());
        let failed: Vec<usize> = report.failures().map(|(r, _)| r.job.index).collect();
        assert_eq!(failed, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn read_error_aborts_run() {
        let input = vec![
            Ok("http://h/0".to_string()),
            Ok("http://h/1".to_string()),
            Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
        ];
        let runner = BatchRunner::with_fetcher(options(2), NamingPolicy::Index, "/out", |_: &Job| ok(0));
        let err = runner.run(input).await.unwrap_err();
        assert!(format!("{:#}", err).contains("disk gone"));
    }

    #[tokio::test]
    async fn invalid_options_are_rejected_before_any_fetch() {
        let fetched = Arc::new(Mutex::new(0usize));
        let fetched_in = Arc::clone(&fetched);
        let runner = BatchRunner::with_fetcher(options(0), NamingPolicy::Index, "/out", move |_: &Job| {
            *fetched_in.lock().unwrap() += 1;
            ok(0)
        });
        let err = runner.run(urls(3)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("worker count"));
        assert_eq!(*fetched.lock().unwrap(), 0);

        let opts = RunOptions {
            queue_capacity: 0,
            ..options(2)
        };
        let runner = BatchRunner::with_fetcher(opts, NamingPolicy::Index, "/out", |_: &Job| ok(0));
        assert!(runner.run(urls(1)).await.is_err());
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let (tx, mut rx) = mpsc::channel(64);
        let runner = BatchRunner::with_fetcher(options(2), NamingPolicy::Index, "/out", |_: &Job| {
            std::thread::sleep(Duration::from_millis(5));
            ok(0)
        })
        .progress(tx);
        runner.run(urls(5)).await.unwrap();
        let mut last = None;
        while let Some(p) = rx.recv().await {
            last = Some(p);
        }
        assert_eq!(last.map(|p| p.finished), Some(5));
    }

    #[tokio::test]
    async fn destinations_follow_naming_policy() {
        let runner = BatchRunner::with_fetcher(
            options(2),
            NamingPolicy::Basename,
            "/out",
            |_: &Job| ok(0),
        );
        let input = vec![
            Ok("http://h/a/report.pdf".to_string()),
            Ok("http://h/b/report.pdf".to_string()),
        ];
        let report = runner.run(input).await.unwrap();
        let names: Vec<PathBuf> = report
            .results()
            .iter()
            .map(|r| r.job.destination.clone())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("/out/report.pdf"), PathBuf::from("/out/report-1.pdf")]
        );
    }
}
