//! Concurrent scan scheduling.
//!
//! A fixed pool of worker threads drains a task channel and feeds a result
//! channel. Shutdown uses one sentinel per worker enqueued after the real
//! tasks, so every accepted task produces exactly one outcome before any
//! worker exits. Per-task failures (missing data, panics) are reported as
//! `ScanOutcome::Failed` and never abort the scan.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::ScanConfig;
use crate::preprocess::preprocess_windowed;
use crate::record::{ScanOutcome, ScanResult, ScanTask, ScreenRecord};
use crate::rules::{RuleContext, RuleSet};
use crate::{PriceHistory, ScanError};

/// Supplies bar histories for symbols. `None` means the symbol has no
/// usable data; the task is reported failed and the scan moves on.
pub trait Fetch: Send + Sync {
    fn fetch(&self, symbol: &str) -> Option<PriceHistory>;
}

/// Cooperative cancellation flag shared between the caller and the
/// scheduler. Cancelling stops further enqueueing; tasks already queued
/// still run to completion.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum WorkerMessage {
    Job(ScanTask),
    Shutdown,
}

/// Schedules rule evaluation for a task list over a fixed worker pool.
pub struct ScanScheduler {
    config: ScanConfig,
    rules: Arc<RuleSet>,
    fetch: Arc<dyn Fetch>,
}

impl ScanScheduler {
    pub fn new(config: ScanConfig, rules: RuleSet, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            rules: Arc::new(rules),
            fetch,
        }
    }

    fn worker_count(&self) -> usize {
        self.config
            .worker_count
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }

    /// Runs the scan to completion and returns one outcome per accepted
    /// task, in completion order.
    pub fn scan(&self, tasks: Vec<ScanTask>, cancel: &CancelToken) -> Vec<ScanOutcome> {
        self.scan_streaming(tasks, cancel).join()
    }

    /// Starts the scan and hands back a handle whose receiver yields
    /// outcomes as workers finish them.
    pub fn scan_streaming(&self, tasks: Vec<ScanTask>, cancel: &CancelToken) -> ScanHandle {
        let pool_size = self.worker_count();
        let (task_tx, task_rx) = unbounded::<WorkerMessage>();
        let (result_tx, result_rx) = unbounded::<ScanOutcome>();

        let mut workers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let fetch = Arc::clone(&self.fetch);
            let rules = Arc::clone(&self.rules);
            let config = self.config.clone();
            workers.push(thread::spawn(move || {
                worker_loop(task_rx, result_tx, fetch, rules, config)
            }));
        }
        drop(task_rx);
        drop(result_tx);

        let mut enqueued = 0;
        for task in tasks {
            if cancel.is_cancelled() {
                tracing::info!(enqueued, "scan cancelled, dropping remaining tasks");
                break;
            }
            if task_tx.send(WorkerMessage::Job(task)).is_err() {
                break;
            }
            enqueued += 1;
        }
        // one sentinel per worker, after all real tasks
        for _ in 0..pool_size {
            let _ = task_tx.send(WorkerMessage::Shutdown);
        }

        ScanHandle {
            results: result_rx,
            workers,
            enqueued,
        }
    }
}

/// A running scan: outcomes stream out of `results()`; `join()` drains
/// them and waits for the pool to wind down.
pub struct ScanHandle {
    results: Receiver<ScanOutcome>,
    workers: Vec<JoinHandle<()>>,
    enqueued: usize,
}

impl ScanHandle {
    /// Number of tasks accepted before cancellation (if any). Exactly this
    /// many outcomes will be produced.
    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    pub fn results(&self) -> &Receiver<ScanOutcome> {
        &self.results
    }

    pub fn join(self) -> Vec<ScanOutcome> {
        let mut outcomes = Vec::with_capacity(self.enqueued);
        while let Ok(outcome) = self.results.recv() {
            outcomes.push(outcome);
        }
        for worker in self.workers {
            let _ = worker.join();
        }
        outcomes
    }
}

fn worker_loop(
    task_rx: Receiver<WorkerMessage>,
    result_tx: Sender<ScanOutcome>,
    fetch: Arc<dyn Fetch>,
    rules: Arc<RuleSet>,
    config: ScanConfig,
) {
    while let Ok(message) = task_rx.recv() {
        match message {
            WorkerMessage::Job(task) => {
                let symbol = task.symbol.clone();
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| run_task(task, &fetch, &rules, &config)))
                        .unwrap_or_else(|_| {
                            tracing::warn!(%symbol, "task panicked during evaluation");
                            ScanOutcome::Failed {
                                symbol: symbol.clone(),
                                error: ScanError::TaskFault {
                                    symbol,
                                    reason: "panic during evaluation".into(),
                                },
                            }
                        });
                let _ = result_tx.send(outcome);
            }
            WorkerMessage::Shutdown => break,
        }
    }
}

fn run_task(
    task: ScanTask,
    fetch: &Arc<dyn Fetch>,
    rules: &Arc<RuleSet>,
    config: &ScanConfig,
) -> ScanOutcome {
    let Some(history) = fetch.fetch(&task.symbol) else {
        return ScanOutcome::Failed {
            symbol: task.symbol.clone(),
            error: ScanError::MissingData {
                symbol: task.symbol,
            },
        };
    };
    if history.is_empty() {
        return ScanOutcome::Failed {
            symbol: task.symbol.clone(),
            error: ScanError::MissingData {
                symbol: task.symbol,
            },
        };
    }
    let (derived, trimmed) = preprocess_windowed(&history, config);
    let ctx = RuleContext {
        history: &history,
        derived: &derived,
        trimmed: &trimmed,
        config,
    };
    let mut record = ScreenRecord::new(task.symbol.clone());
    let matched = rules.evaluate_all(&ctx, &mut record);
    tracing::debug!(symbol = %task.symbol, matched, "task evaluated");
    ScanOutcome::Completed(ScanResult {
        symbol: task.symbol,
        group: task.group,
        record,
        matched_rules: matched,
        verdict: matched > 0,
    })
}
