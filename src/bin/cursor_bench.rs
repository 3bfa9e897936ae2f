use std::{hint::black_box, path::PathBuf, time::Instant};

use clap::Parser;
use rand::Rng;

use packed_csr::{ascii_graph::AsciiGraphBuilder, CompressionStrategy, ParallelBuilder, NOT_FOUND};

#[derive(Parser, Debug)]
struct BenchArgs {
    /// Source ASCII graph
    source_name: PathBuf,
    /// Number of random queries per run
    #[arg(long, default_value_t = 1_000_000)]
    queries: usize,
    /// Number of runs
    #[arg(long, default_value_t = 3)]
    runs: usize,
}

fn gen_queries(n_queries: usize, range_size: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..n_queries)
        .map(|_| rng.gen_range(0..range_size) as u64)
        .collect()
}

fn main() {
    let args = BenchArgs::parse();

    let graph = AsciiGraphBuilder::<u64>::new()
        .load_ascii(&args.source_name)
        .unwrap_or_else(|e| panic!("Failed loading {}: {}", args.source_name.display(), e))
        .build();
    assert!(graph.num_nodes() > 0, "The graph has no nodes");

    let queries = gen_queries(args.queries, graph.num_nodes());
    let total_queries = (args.queries * args.runs).max(1) as f64;

    for strategy in [CompressionStrategy::DeltaVarLong, CompressionStrategy::Packed, CompressionStrategy::Mixed] {
        let lists = ParallelBuilder::default()
            .set_strategy(strategy)
            .build(&graph)
            .unwrap_or_else(|e| panic!("Failed compressing with {}: {}", strategy, e));
        let adjacency = lists.adjacency();

        let mut cursor = adjacency.raw_adjacency_cursor();
        let total = Instant::now();
        for _ in 0..args.runs {
            for &query in queries.iter() {
                cursor.init(query);
                for target in cursor.by_ref() {
                    black_box(target);
                }
            }
        }
        let avg_query = total.elapsed().as_nanos() as f64 / total_queries;
        println!("{}: full scan {}ns per query", strategy, avg_query);

        let total = Instant::now();
        for _ in 0..args.runs {
            for &query in queries.iter() {
                cursor.init(query);
                black_box(cursor.advance(query) != NOT_FOUND);
            }
        }
        let avg_query = total.elapsed().as_nanos() as f64 / total_queries;
        println!("{}: advance {}ns per query", strategy, avg_query);

        println!("{}: {} bytes", strategy, lists.memory_usage());
    }
}
