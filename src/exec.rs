//! Per-chunk evaluation dispatch.
//!
//! The iteration driver hands a [`CalcExecutor`] one task per output
//! expression for one chunk at a time, map-style, and joins the outcomes
//! before assembling the chunk's record. [`SerialExecutor`] runs the tasks
//! in place; [`ThreadPoolExecutor`] spreads them over a rayon pool, with
//! outcomes collected through a channel and re-ordered by output index.

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;

use crate::column::{Datum, EvalError, EvalResult};

/// One output's evaluation for one chunk.
pub type Task = Box<dyn FnOnce() -> EvalResult<Datum> + Send>;

/// Dispatcher for one chunk's per-output tasks.
pub trait CalcExecutor: Send + Sync {
    /// Submit the tasks, in output declaration order. The returned handle
    /// yields one outcome per task, in the same order.
    fn dispatch(&self, tasks: Vec<Task>) -> Pending;
}

/// Outcomes of one dispatched chunk, joinable exactly once.
pub enum Pending {
    Ready(Vec<EvalResult<Datum>>),
    Channel {
        receiver: channel::Receiver<(usize, EvalResult<Datum>)>,
        count: usize,
    },
}

impl Pending {
    /// Wait for and return all outcomes in task order.
    pub fn join(self) -> Vec<EvalResult<Datum>> {
        match self {
            Pending::Ready(outcomes) => outcomes,
            Pending::Channel { receiver, count } => {
                let mut slots: Vec<Option<EvalResult<Datum>>> =
                    (0..count).map(|_| None).collect();
                for _ in 0..count {
                    match receiver.recv() {
                        Ok((index, outcome)) => slots[index] = Some(outcome),
                        // A worker dropped its sender without reporting.
                        Err(_) => break,
                    }
                }
                slots
                    .into_iter()
                    .map(|slot| {
                        slot.unwrap_or_else(|| {
                            Err(EvalError::failed("executor worker dropped its result"))
                        })
                    })
                    .collect()
            }
        }
    }
}

/// The default executor: runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialExecutor;

impl CalcExecutor for SerialExecutor {
    fn dispatch(&self, tasks: Vec<Task>) -> Pending {
        Pending::Ready(tasks.into_iter().map(|task| task()).collect())
    }
}

/// Executor backed by a rayon thread pool.
#[derive(Clone)]
pub struct ThreadPoolExecutor {
    pool: Arc<rayon::ThreadPool>,
}

impl ThreadPoolExecutor {
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build thread pool: {e}"))?;
        Ok(ThreadPoolExecutor {
            pool: Arc::new(pool),
        })
    }

    /// Share an existing pool instead of building a dedicated one.
    pub fn with_pool(pool: Arc<rayon::ThreadPool>) -> Self {
        ThreadPoolExecutor { pool }
    }
}

impl CalcExecutor for ThreadPoolExecutor {
    fn dispatch(&self, tasks: Vec<Task>) -> Pending {
        let count = tasks.len();
        let (sender, receiver) = channel::bounded(count);
        for (index, task) in tasks.into_iter().enumerate() {
            let sender = sender.clone();
            self.pool.spawn(move || {
                let _ = sender.send((index, task()));
            });
        }
        Pending::Channel { receiver, count }
    }
}
