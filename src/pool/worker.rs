use std::sync::Arc;

use tracing::{debug, error, trace};

use super::{JobReceiver, Measure, ResultSender};
use crate::http_probe::{TimingResult, report};

/// Why a worker stopped pulling jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The job queue was closed and drained.
    Exhausted,
    /// A blank job arrived. The worker emitted an all-zero result with an
    /// empty URL and quit; the pool is one worker smaller from here on.
    BlankJob,
    /// Nobody is reading results anymore.
    ResultsClosed,
}

/// Receives jobs, measures them and emits exactly one result per job.
///
/// `Receiving -> Measuring -> Emitting -> Receiving ... -> Terminated`
pub struct Worker<P> {
    id: usize,
    prober: Arc<P>,
    jobs: JobReceiver,
    results: ResultSender,
}

impl<P: Measure> Worker<P> {
    pub fn new(id: usize, prober: Arc<P>, jobs: JobReceiver, results: ResultSender) -> Self {
        Self {
            id,
            prober,
            jobs,
            results,
        }
    }

    pub async fn run(self) -> WorkerExit {
        let worker = self.id;
        trace!(worker, "receiving");
        while let Ok(job) = self.jobs.recv().await {
            if job.is_blank() {
                debug!(worker, "URL is empty, terminating");
                if self.results.send(TimingResult::default()).await.is_err() {
                    return WorkerExit::ResultsClosed;
                }
                return WorkerExit::BlankJob;
            }

            trace!(worker, url = %job.url, "measuring");
            let measured = self.prober.measure(&job.url).await;
            let result = match measured {
                Ok(result) => result,
                Err(err) => {
                    error!(
                        action = "measure",
                        worker,
                        url = %job.url,
                        error = %report(&err),
                        "error making request"
                    );
                    TimingResult::zero(job.url)
                }
            };

            trace!(worker, "emitting");
            if self.results.send(result).await.is_err() {
                debug!(worker, "result queue closed");
                return WorkerExit::ResultsClosed;
            }
            trace!(worker, "receiving");
        }
        debug!(worker, "job queue drained");
        WorkerExit::Exhausted
    }
}
