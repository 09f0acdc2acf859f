use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, warn};

use super::{Job, Measure, Worker};
use crate::output::{OutputFormat, render};

/// Launches the worker pool, queues the jobs and renders results as they arrive.
pub struct Dispatcher<P> {
    prober: Arc<P>,
    concurrent: usize,
    logger: Dispatch,
}

impl<P: Measure> Dispatcher<P> {
    /// `logger` is attached to every worker task.
    pub fn new(prober: Arc<P>, concurrent: usize, logger: Dispatch) -> Self {
        Self {
            prober,
            concurrent,
            logger,
        }
    }

    /// Measure `url` `total` times and write one rendered line per result to `out`.
    ///
    /// Lines come in completion order. Returns how many results were read,
    /// which is `total` unless blank jobs took every worker out of the pool.
    /// Workers are not joined; once the last result is read they have nothing
    /// observable left to do.
    pub async fn run<W: Write>(
        &self,
        url: &str,
        total: usize,
        format: &OutputFormat,
        out: &mut W,
    ) -> std::io::Result<usize> {
        // Bounded channels need a non-zero capacity, even when there is nothing to send.
        let capacity = total.max(1);
        let (jobs_tx, jobs_rx) = async_channel::bounded(capacity);
        let (results_tx, mut results_rx) = mpsc::channel(capacity);

        debug!(action = "main", concurrent = self.concurrent, "starting workers");
        for id in 0..self.concurrent {
            debug!(action = "main", worker = id, "starting worker");
            let worker = Worker::new(
                id,
                Arc::clone(&self.prober),
                jobs_rx.clone(),
                results_tx.clone(),
            );
            tokio::spawn(worker.run().with_subscriber(self.logger.clone()));
        }
        // Only workers hold these now, so both queues close once every worker is gone.
        drop(jobs_rx);
        drop(results_tx);

        if Job::new(url).is_blank() {
            warn!(action = "main", "URL is blank; every worker that receives it will terminate");
        }
        for _ in 0..total {
            if jobs_tx.send(Job::new(url)).await.is_err() {
                warn!(action = "main", "every worker has exited, no more jobs can be queued");
                break;
            }
        }
        jobs_tx.close();

        let mut received = 0;
        while received < total {
            let Some(result) = results_rx.recv().await else {
                error!(
                    action = "main",
                    received,
                    total,
                    "result queue closed before every job reported"
                );
                break;
            };
            writeln!(out, "{}", render(&result, format))?;
            received += 1;
        }
        out.flush()?;

        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::http_probe::TimingResult;
    use crate::pool::test_support::FakeProber;

    async fn dispatch(
        url: &str,
        total: usize,
        concurrent: usize,
        format: OutputFormat,
    ) -> (usize, String, Arc<FakeProber>) {
        let prober = Arc::new(FakeProber::default());
        let dispatcher = Dispatcher::new(Arc::clone(&prober), concurrent, Dispatch::none());
        let mut out = Vec::new();
        let run = dispatcher.run(url, total, &format, &mut out);
        let received = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("dispatcher finished")
            .expect("write");
        (received, String::from_utf8(out).expect("utf8"), prober)
    }

    #[tokio::test]
    async fn test_reads_exactly_total_results() {
        for (total, concurrent) in [(10, 10), (10, 3), (3, 10), (25, 4)] {
            let (received, out, prober) =
                dispatch("http://example.com", total, concurrent, OutputFormat::JsonLines).await;
            assert_eq!(received, total, "total={total} concurrent={concurrent}");
            assert_eq!(out.lines().count(), total);
            assert_eq!(prober.calls.load(Ordering::SeqCst), total);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_exactly_total_results_in_parallel() {
        let (received, out, _) = dispatch("http://example.com", 200, 16, OutputFormat::Csv).await;
        assert_eq!(received, 200);
        assert_eq!(out.lines().count(), 200);
    }

    #[tokio::test]
    async fn test_zero_total_renders_nothing() {
        let (received, out, prober) =
            dispatch("http://example.com", 0, 4, OutputFormat::JsonLines).await;
        assert_eq!(received, 0);
        assert!(out.is_empty());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_worker_processes_every_job() {
        let (received, _, prober) = dispatch("http://example.com", 7, 1, OutputFormat::Csv).await;
        assert_eq!(received, 7);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_csv_scenario() {
        let (received, out, _) = dispatch("https://example.com", 3, 2, OutputFormat::Csv).await;
        assert_eq!(received, 3);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 6, "line: {line}");
            assert_eq!(fields[0], "https://example.com");
        }
    }

    #[tokio::test]
    async fn test_jsonl_lines_parse_back() {
        let (_, out, _) = dispatch("https://example.com", 4, 2, OutputFormat::JsonLines).await;
        for line in out.lines() {
            let result: TimingResult = serde_json::from_str(line).expect("JSON line");
            assert_eq!(result.url, "https://example.com");
            assert!(result.ttfb <= result.total);
        }
    }

    #[tokio::test]
    async fn test_failed_measurements_are_zero_results() {
        let (received, out, _) = dispatch("http://fail.invalid", 3, 2, OutputFormat::Csv).await;
        assert_eq!(received, 3);
        for line in out.lines() {
            assert_eq!(line, "http://fail.invalid,0ns,0ns,0ns,0ns,0ns");
        }
    }

    async fn dispatch_real(url: &str, total: usize) -> (usize, String) {
        use crate::config::app_config::{setup_resolver, setup_tls_connector};
        use crate::http_probe::Prober;

        let prober = Prober::new(
            setup_resolver(&["127.0.0.1".to_string()]).expect("resolver"),
            setup_tls_connector().expect("tls connector"),
            Duration::from_secs(10),
        );
        let dispatcher = Dispatcher::new(Arc::new(prober), 2, Dispatch::none());
        let mut out = Vec::new();
        let received = dispatcher
            .run(url, total, &OutputFormat::Csv, &mut out)
            .await
            .expect("write");
        (received, String::from_utf8(out).expect("utf8"))
    }

    #[tokio::test]
    async fn test_unreachable_host_with_real_prober() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}/", listener.local_addr().expect("local addr"));
        drop(listener);

        let (received, out) = dispatch_real(&url, 2).await;

        assert_eq!(received, 2);
        assert_eq!(out.lines().count(), 2);
        for line in out.lines() {
            assert_eq!(line, format!("{url},0ns,0ns,0ns,0ns,0ns"));
        }
    }

    #[tokio::test]
    async fn test_unresolvable_host_yields_zero_lines() {
        let url = "https://does-not-exist.invalid/";

        let (received, out) = dispatch_real(url, 3).await;

        assert_eq!(received, 3);
        assert_eq!(out.lines().count(), 3);
        for line in out.lines() {
            assert_eq!(line, format!("{url},0ns,0ns,0ns,0ns,0ns"));
        }
    }

    #[tokio::test]
    async fn test_unknown_format_renders_empty_lines() {
        let (received, out, _) =
            dispatch("http://example.com", 3, 2, OutputFormat::from("xml")).await;
        assert_eq!(received, 3);
        assert_eq!(out, "\n\n\n");
    }

    #[tokio::test]
    async fn test_blank_url_shrinks_pool_without_hanging() {
        let (received, out, prober) = dispatch("   ", 5, 2, OutputFormat::Csv).await;
        // Each worker emits one zero result for its blank job, then the pool is empty.
        assert_eq!(received, 2);
        assert_eq!(out, ",0ns,0ns,0ns,0ns,0ns\n,0ns,0ns,0ns,0ns,0ns\n");
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }
}
