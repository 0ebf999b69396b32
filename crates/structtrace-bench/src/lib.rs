//! Concurrent benchmark harness for structtrace.
//!
//! Races several raw (untraced) data-structure implementations over one
//! shared pseudo-random workload, one blocking worker per structure kind.
//! Workers stream partial [`BenchmarkResult`]s at roughly 5% progress
//! granularity and exactly one completed result each; a shared stop flag,
//! polled between dataset elements, cancels the run cooperatively.
//!
//! Delivery rules: a full channel may drop a *progress* update, but
//! completed results go through the blocking path and are never dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub mod targets;

use targets::build_target;

/// Structure kinds the harness can race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchStructureKind {
    HashMap,
    BTree,
    RbTree,
    AvlTree,
}

impl BenchStructureKind {
    /// Every kind the harness knows about.
    pub const ALL: [Self; 4] = [Self::HashMap, Self::BTree, Self::RbTree, Self::AvlTree];
}

impl fmt::Display for BenchStructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HashMap => "hashmap",
            Self::BTree => "btree",
            Self::RbTree => "rbtree",
            Self::AvlTree => "avltree",
        };
        write!(f, "{name}")
    }
}

impl FromStr for BenchStructureKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hashmap" => Ok(Self::HashMap),
            "btree" => Ok(Self::BTree),
            "rbtree" => Ok(Self::RbTree),
            "avltree" => Ok(Self::AvlTree),
            other => bail!("unknown benchmark structure: {other}"),
        }
    }
}

/// Operation a benchmark run applies to every dataset element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchOperation {
    Insert,
    Search,
}

impl fmt::Display for BenchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Search => write!(f, "search"),
        }
    }
}

impl FromStr for BenchOperation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Self::Insert),
            "search" => Ok(Self::Search),
            other => bail!("unknown benchmark operation: {other}"),
        }
    }
}

/// Configuration for one benchmark run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchConfig {
    pub data_size: usize,
    pub structures: Vec<BenchStructureKind>,
    pub operation: BenchOperation,
    /// Workload seed; a fresh one is drawn when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<u64>,
}

/// One progress or final record from a benchmark worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub structure: BenchStructureKind,
    pub operation: BenchOperation,
    pub data_size: usize,
    /// Wall-clock milliseconds since the worker started.
    pub duration: f64,
    /// Partial results: current RSS. Final result: RSS delta over the run.
    pub memory_used: u64,
    pub ops_per_sec: f64,
    /// 0-100.
    pub progress: u8,
    pub completed: bool,
}

/// Best-effort resident-set-size probe for the current process.
///
/// Returns 0 when the process cannot be resolved; memory numbers are
/// advisory and never fail a run.
pub struct MemoryProbe {
    system: sysinfo::System,
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            system: sysinfo::System::new(),
        }
    }

    pub fn rss_bytes(&mut self) -> u64 {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return 0;
        };
        if !self.system.refresh_process(pid) {
            return 0;
        }
        self.system.process(pid).map_or(0, |p| p.memory())
    }
}

/// Drives benchmark runs; at most one run is active at a time.
#[derive(Clone, Default)]
pub struct Runner {
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cooperative cancellation of the active run. Idempotent;
    /// workers notice between dataset elements and exit without a final
    /// result.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Run the configured benchmark, streaming results through `tx`.
    ///
    /// Returns `Ok(false)` without doing anything when a run is already
    /// active (single-flight), `Ok(true)` once an accepted run finishes or
    /// is stopped.
    pub async fn run(&self, config: BenchConfig, tx: mpsc::Sender<BenchmarkResult>) -> Result<bool> {
        if config.data_size == 0 {
            bail!("benchmark data size must be positive");
        }
        if config.structures.is_empty() {
            bail!("benchmark needs at least one structure kind");
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }
        let guard = RunningGuard(Arc::clone(&self.running));
        // The stop signal belongs to this run; arm it fresh.
        self.stop.store(false, Ordering::SeqCst);

        let seed = config.seed.unwrap_or_else(rand::random);
        let data = Arc::new(generate_workload(config.data_size, seed));

        let mut workers = Vec::with_capacity(config.structures.len());
        for kind in config.structures.clone() {
            let data = Arc::clone(&data);
            let stop = Arc::clone(&self.stop);
            let tx = tx.clone();
            let operation = config.operation;
            workers.push(tokio::task::spawn_blocking(move || {
                run_worker(kind, operation, &data, &stop, &tx, seed);
            }));
        }
        for worker in workers {
            worker.await.context("benchmark worker panicked")?;
        }

        drop(guard);
        Ok(true)
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One shared pseudo-random dataset, identical for every worker in a run.
fn generate_workload(size: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bound = (size as i64).saturating_mul(10).max(1);
    (0..size).map(|_| rng.random_range(0..bound)).collect()
}

fn run_worker(
    kind: BenchStructureKind,
    operation: BenchOperation,
    data: &[i64],
    stop: &AtomicBool,
    tx: &mpsc::Sender<BenchmarkResult>,
    seed: u64,
) {
    let mut probe = MemoryProbe::new();
    let start_rss = probe.rss_bytes();
    let started = Instant::now();

    let total = data.len();
    let report_interval = (total / 20).max(1); // ~5% granularity
    let mut target = build_target(kind);
    // Per-worker probe stream; offset so workers do not mirror each other.
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(kind as u64 + 1));

    for (i, &value) in data.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        match operation {
            BenchOperation::Insert => target.insert(value),
            BenchOperation::Search => {
                // Search probes only data this worker has already built.
                target.insert(value);
                let probe_key = data[rng.random_range(0..=i)];
                let _ = target.contains(probe_key);
            }
        }

        if i > 0 && i % report_interval == 0 {
            let progress = ((i * 100) / total) as u8;
            // Progress updates are droppable; a full channel loses this
            // one, never the final result.
            let _ = tx.try_send(BenchmarkResult {
                structure: kind,
                operation,
                data_size: total,
                duration: started.elapsed().as_secs_f64() * 1000.0,
                memory_used: probe.rss_bytes(),
                ops_per_sec: 0.0,
                progress,
                completed: false,
            });
        }
    }

    let elapsed = started.elapsed();
    let end_rss = probe.rss_bytes();
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = if secs > 0.0 { total as f64 / secs } else { 0.0 };
    let _ = tx.blocking_send(BenchmarkResult {
        structure: kind,
        operation,
        data_size: total,
        duration: secs * 1000.0,
        memory_used: end_rss.saturating_sub(start_rss),
        ops_per_sec,
        progress: 100,
        completed: true,
    });
}
