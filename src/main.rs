use anyhow::{Context, Result};
use clap::Parser;
use treecalc::{CalculationConfig, TreeCalculation};

#[derive(Parser, Debug)]
#[command(
    name = "treecalc",
    about = "Sum a binary tree sequentially and with a worker pool, and compare"
)]
struct Cli {
    /// Height of the generated complete binary tree (0 = single node).
    tree_height: u32,
    /// Tree level whose nodes hand their children to pooled workers.
    level_parallel: u32,
    /// Number of workers in the pool.
    nthreads: usize,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = CalculationConfig::new(cli.tree_height, cli.level_parallel, cli.nthreads);
    let report = TreeCalculation::new(config)
        .run()
        .with_context(|| {
            format!(
                "calculation failed (height={}, level={}, threads={})",
                config.height, config.parallel_level, config.thread_count
            )
        })?;

    println!("{}", report);
    Ok(())
}

fn setup_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
