use std::{fs, path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use packed_csr::{
    ascii_graph::AsciiGraphBuilder, AdjacencyError, Aggregation, CompressionConfig, CompressionStrategy,
    ImmutableAdjacency, ParallelBuilder, Result,
};

#[derive(Parser, Debug)]
struct CsrArgs {
    /// Source ASCII graph
    source_name: PathBuf,
    /// Configuration file in the java-properties format
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compression strategy: packed, varlong or mixed
    #[arg(long)]
    strategy: Option<CompressionStrategy>,
    /// Number of workers
    #[arg(long)]
    concurrency: Option<usize>,
    /// Writes the compressed lists to this file
    #[arg(long)]
    export: Option<PathBuf>,
    /// Writes the compression statistics as JSON to this file
    #[arg(long)]
    stats_json: Option<PathBuf>,
    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log: String,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AdjacencyError::Config(format!("Invalid log level: {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| AdjacencyError::Config("Logging already initialized".into()))
}

/// Returns the number of nodes whose decompressed list differs from the source.
fn verify<G: ImmutableAdjacency, C: ImmutableAdjacency>(source: &G, compressed: &C, aggregation: Aggregation) -> usize {
    (0..source.node_count() as u64)
        .filter(|&node| {
            let mut expected = source.successors(node).into_vec();
            if aggregation.resolve() != Aggregation::None {
                expected.dedup();
            }
            compressed.degree(node) as usize != expected.len() || *compressed.successors(node) != *expected
        })
        .count()
}

fn run(args: CsrArgs) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => CompressionConfig::from_file(path)?,
        None => CompressionConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    let load = Instant::now();
    let graph = AsciiGraphBuilder::<u64>::new().load_ascii(&args.source_name)?.build();
    info!(
        nodes = graph.num_nodes(),
        arcs = graph.num_arcs(),
        weighted = graph.is_weighted(),
        elapsed_ms = load.elapsed().as_millis() as u64,
        "graph loaded"
    );

    let aggregation = config.aggregation;
    let build = Instant::now();
    let lists = ParallelBuilder::new(config).build(&graph)?;
    info!(elapsed_ms = build.elapsed().as_millis() as u64, "graph compressed");

    let mismatches = verify(&graph, &lists, aggregation);
    if mismatches > 0 {
        error!(mismatches, "decompressed lists differ from the source");
    }

    let stats = lists.stats();
    info!(
        packed_nodes = stats.packed_nodes,
        varlong_nodes = stats.varlong_nodes,
        bits_per_relationship = stats.bits_per_relationship,
        "compression statistics"
    );

    if let Some(path) = &args.stats_json {
        let json = serde_json::to_string_pretty(&stats).map_err(|e| AdjacencyError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
    }
    if let Some(path) = &args.export {
        let blob = lists.to_bytes()?;
        fs::write(path, &blob)?;
        info!(bytes = blob.len(), path = %path.display(), "lists exported");
    }

    Ok(mismatches == 0)
}

fn main() -> ExitCode {
    let args = CsrArgs::parse();

    if let Err(e) = init_logging(&args.log) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "build failed");
            ExitCode::FAILURE
        }
    }
}
