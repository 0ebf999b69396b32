use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use structtrace_bench::{BenchConfig, BenchOperation, BenchStructureKind, Runner};
use structtrace_dispatch::{Dispatcher, OperationRequest, Params, TracedOperation, TracedStructure};

#[derive(Parser, Debug)]
#[command(name = "structtrace")]
#[command(about = "Traced data-structure operations and benchmarks.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply traced operations to a structure, printing one JSON trace per
    /// operation.
    Op {
        /// Structure to operate on: rbtree, avltree or graph.
        structure: TracedStructure,
        /// Operation: insert, search, delete, shortestPath or reset.
        operation: TracedOperation,
        /// Keys for tree operations; one trace is printed per key.
        values: Vec<i64>,
        /// Start node for shortestPath.
        #[arg(long, default_value = "A")]
        start: String,
        /// End node for shortestPath.
        #[arg(long, default_value = "F")]
        end: String,
    },

    /// Race structure implementations over a shared random workload,
    /// streaming JSON progress lines.
    Bench {
        /// Number of elements per structure.
        #[arg(long, default_value_t = 10_000)]
        size: usize,
        /// Comma-separated structure kinds to race.
        #[arg(long, value_delimiter = ',', default_value = "hashmap,btree,rbtree,avltree")]
        structures: Vec<BenchStructureKind>,
        /// Workload operation: insert or search.
        #[arg(long, default_value = "insert")]
        operation: BenchOperation,
        /// Workload seed; random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Stop the run after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Op {
            structure,
            operation,
            values,
            start,
            end,
        } => run_op(structure, operation, values, start, end),
        Command::Bench {
            size,
            structures,
            operation,
            seed,
            timeout_ms,
        } => run_bench(size, structures, operation, seed, timeout_ms).await,
    }
}

fn run_op(
    structure: TracedStructure,
    operation: TracedOperation,
    values: Vec<i64>,
    start: String,
    end: String,
) -> Result<()> {
    let mut dispatcher = Dispatcher::new();

    // Tree operations take one key each; everything else runs once.
    let per_value = matches!(
        operation,
        TracedOperation::Insert | TracedOperation::Search | TracedOperation::Delete
    ) && structure != TracedStructure::Graph;
    let values = if per_value && !values.is_empty() {
        values.into_iter().map(Some).collect()
    } else {
        vec![values.first().copied()]
    };

    for value in values {
        let request = OperationRequest {
            structure,
            operation,
            params: Params {
                value,
                start: Some(start.clone()),
                end: Some(end.clone()),
            },
        };
        let result = dispatcher.handle(&request)?;
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

async fn run_bench(
    size: usize,
    structures: Vec<BenchStructureKind>,
    operation: BenchOperation,
    seed: Option<u64>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let runner = Runner::new();
    let (tx, mut rx) = mpsc::channel(100);

    if let Some(ms) = timeout_ms {
        let runner = runner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            runner.stop();
        });
    }

    let printer = tokio::spawn(async move {
        while let Some(result) = rx.recv().await {
            match serde_json::to_string(&result) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("ERROR: could not serialize result: {err}"),
            }
        }
    });

    let config = BenchConfig {
        data_size: size,
        structures,
        operation,
        seed,
    };
    runner.run(config, tx).await?;
    printer.await.context("result printer failed")?;
    Ok(())
}
