//! IPFence CLI
//!
//! CLI tool for compiling address rule configs, checking addresses and
//! decomposing ranges.

mod bench;
mod config;

use std::path::Path;

use clap::{Parser, Subcommand};
use log::Level;

use ipf_compiler::{decompose_range_text, parse_address, Verdict};

#[derive(Parser)]
#[command(name = "ipf")]
#[command(about = "IPFence address-set compiler and tools")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a filter from a JSON config and print the resulting blocks
    Compile {
        /// JSON rule config
        #[arg(short, long)]
        config: String,
    },

    /// Print the verdict for each address
    Check {
        /// JSON rule config
        #[arg(short, long)]
        config: String,

        /// Addresses to check
        #[arg(required = true)]
        addrs: Vec<String>,
    },

    /// Print the minimal CIDR cover of an inclusive address range
    Decompose {
        /// First address of the range
        start: String,

        /// Last address of the range
        end: String,
    },

    /// Benchmark query latency over a pseudo-random address workload
    Bench {
        /// JSON rule config
        #[arg(short, long)]
        config: String,

        /// Passes over the workload
        #[arg(long, default_value_t = 100)]
        iterations: usize,

        /// Workload size
        #[arg(long, default_value_t = 10_000)]
        addresses: usize,

        /// Queries run before measuring
        #[arg(long, default_value_t = 100_000)]
        warmup_ops: usize,

        /// Queries per latency sample
        #[arg(long, default_value_t = 1_000)]
        sample_batch_ops: usize,

        /// Workload RNG seed
        #[arg(long, default_value_t = bench::DEFAULT_SEED)]
        seed: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile { config } => cmd_compile(&config, cli.verbose),
        Commands::Check { config, addrs } => cmd_check(&config, &addrs),
        Commands::Decompose { start, end } => cmd_decompose(&start, &end),
        Commands::Bench {
            config,
            iterations,
            addresses,
            warmup_ops,
            sample_batch_ops,
            seed,
        } => bench::run(bench::BenchOptions {
            config_path: config,
            iterations,
            addresses,
            warmup_ops,
            sample_batch_ops,
            seed,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let result = if std::env::var("RUST_LOG").is_err() {
        simple_logger::init_with_level(if verbose { Level::Debug } else { Level::Info })
    } else {
        simple_logger::init_with_env()
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logger: {e}");
    }
}

fn cmd_compile(config: &str, verbose: bool) -> Result<(), String> {
    let (filter, stats) = config::build_filter(Path::new(config), verbose)?;

    println!("Compiled '{}'", config);
    println!("  Rules:     {} ({} include(s))", stats.rules, stats.includes);
    println!(
        "  Block:     {} v4 (p8 {}, p16 {}, p24 {}, other {}), {} v6",
        stats.filter.block.v4_total(),
        stats.filter.block.v4_p8,
        stats.filter.block.v4_p16,
        stats.filter.block.v4_p24,
        stats.filter.block.v4_rest,
        stats.filter.block.v6
    );
    match stats.filter.allow {
        Some(allow) => println!("  Allow:     {} v4, {} v6", allow.v4_total(), allow.v6),
        None => println!("  Allow:     none"),
    }
    println!("  Time:      {:.1}ms", stats.total_ms);
    println!();

    println!("Blocked:");
    for block in filter.block_index().to_block_set().iter() {
        println!("  {block}");
    }
    if let Some(allow) = filter.allow_index() {
        println!("Allowed:");
        for block in allow.to_block_set().iter() {
            println!("  {block}");
        }
    }

    Ok(())
}

fn cmd_check(config: &str, addrs: &[String]) -> Result<(), String> {
    let (filter, _) = config::build_filter(Path::new(config), false)?;

    let mut parsed = Vec::with_capacity(addrs.len());
    for addr in addrs {
        parsed.push(parse_address(addr).map_err(|e| e.to_string())?);
    }

    for ip in &parsed {
        println!("{ip}\t{}", filter.verdict(*ip));
    }
    if parsed.len() > 1 {
        let overall: Verdict = filter.verdict_any(parsed.iter().copied());
        println!("any\t{overall}");
    }

    Ok(())
}

fn cmd_decompose(start: &str, end: &str) -> Result<(), String> {
    let blocks = decompose_range_text(start, end).map_err(|e| e.to_string())?;
    for block in blocks {
        println!("{block}");
    }
    Ok(())
}
