//! Trace runner for the xcache cache controller.
//!
//! This binary replays a JSON request trace against one controller. It performs:
//! 1. **Run:** Load a configuration (or the defaults) and a trace, replay it, print
//!    one JSON record per operation followed by the counters.
//! 2. **Check:** Validate a configuration file and report the first violation.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (e.g. `RUST_LOG=xcache_core=debug`).

use clap::{Parser, Subcommand};
use serde_json::json;
use std::{fs, process};
use tracing_subscriber::EnvFilter;

use xcache_core::config::Config;
use xcache_core::sim::{Simulator, Trace};

#[derive(Parser, Debug)]
#[command(
    name = "xcache",
    author,
    version,
    about = "Cycle-accurate split I/D cache controller simulator",
    long_about = "Replay processor request traces against the cache controller.\n\nExamples:\n  xcache run --config configs/small.json --trace traces/llsc.json\n  xcache run --config configs/small.json --trace traces/llsc.json --quiet\n  xcache check --config configs/small.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print outcomes and counters.
    Run {
        /// JSON configuration; built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<String>,

        /// JSON trace to replay.
        #[arg(short, long)]
        trace: String,

        /// Print only the counters.
        #[arg(short, long)]
        quiet: bool,

        /// Cycle budget for each blocking request.
        #[arg(long, default_value_t = 100_000)]
        cycle_limit: u64,
    },

    /// Validate a configuration file.
    Check {
        /// JSON configuration.
        #[arg(short, long)]
        config: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            trace,
            quiet,
            cycle_limit,
        } => cmd_run(config.as_deref(), &trace, quiet, cycle_limit),
        Commands::Check { config } => {
            let config = load_config(Some(&config));
            println!(
                "{}: ok (icache {}x{}x{}, dcache {}x{}x{}, wbuf {})",
                config.general.name,
                config.icache.ways,
                config.icache.sets,
                config.icache.words,
                config.dcache.ways,
                config.dcache.sets,
                config.dcache.words,
                config.write_buffer.depth
            );
        }
    }
}

/// Reads and validates a configuration, exiting with code 1 on failure.
fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {path}: {e}");
        process::exit(1);
    });
    Config::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Invalid config {path}: {e}");
        process::exit(1);
    })
}

/// Replays `trace_path` and prints the outcomes and counters as JSON.
fn cmd_run(config_path: Option<&str>, trace_path: &str, quiet: bool, cycle_limit: u64) {
    let config = load_config(config_path);

    let text = fs::read_to_string(trace_path).unwrap_or_else(|e| {
        eprintln!("Error reading trace {trace_path}: {e}");
        process::exit(1);
    });
    let trace = Trace::from_json(&text).unwrap_or_else(|e| {
        eprintln!("{trace_path}: {e}");
        process::exit(1);
    });

    let mut sim = Simulator::new(&config)
        .unwrap_or_else(|e| {
            eprintln!("Invalid config: {e}");
            process::exit(1);
        })
        .with_cycle_limit(cycle_limit);

    let outcomes = sim.run_trace(&trace).unwrap_or_else(|e| {
        eprintln!("[!] Simulation failed: {e}");
        process::exit(1);
    });

    if !quiet {
        for outcome in &outcomes {
            match serde_json::to_string(outcome) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("[!] {e}"),
            }
        }
    }

    let stats = sim.xcache().stats();
    let report = json!({
        "counters": stats,
        "derived": stats.derived(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("[!] {e}");
            process::exit(1);
        }
    }
}
