//! Fan-out/fan-in of measurement jobs.
//!
//! The dispatcher feeds `total` identical jobs into a bounded MPMC job queue
//! (`async-channel`) drained by `concurrent` workers. Workers push one result
//! per job into a bounded MPSC result queue (`tokio::sync::mpsc`) that the
//! dispatcher reads in completion order.
//!
//! A worker that receives a blank job emits a zero result and terminates for
//! good. Enough blank jobs shrink the pool to nothing; the dispatcher then
//! sees the result queue close and stops short of `total`.

pub mod dispatcher;
pub mod worker;

use std::future::Future;

use crate::error::ProbeError;
use crate::http_probe::{Prober, TimingResult};

pub use dispatcher::Dispatcher;
pub use worker::{Worker, WorkerExit};

pub type JobReceiver = async_channel::Receiver<Job>;
pub type ResultSender = tokio::sync::mpsc::Sender<TimingResult>;

/// One measurement to perform.
#[derive(Clone, Debug)]
pub struct Job {
    pub url: String,
}

impl Job {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Empty or whitespace-only URL; terminates the worker that receives it.
    pub fn is_blank(&self) -> bool {
        self.url.trim().is_empty()
    }
}

/// Something that can time a request to a URL.
pub trait Measure: Send + Sync + 'static {
    fn measure(&self, url: &str) -> impl Future<Output = Result<TimingResult, ProbeError>> + Send;
}

impl Measure for Prober {
    fn measure(&self, url: &str) -> impl Future<Output = Result<TimingResult, ProbeError>> + Send {
        Prober::measure(self, url)
    }
}
