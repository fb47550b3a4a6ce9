//! kvbench — PUT/GET latency benchmark for key-value storage engines.
//!
//! Usage:
//!   kvbench put                          # PUT benchmark over the mem driver
//!   kvbench get --driver leveldb         # GET benchmark over a loadable driver
//!   kvbench shuffle --key-size 16        # permute the keys file in place
//!
//! The keys file is a flat binary file of fixed-size records:
//!   dd if=/dev/urandom of=keys.bin bs=1M count=100

use clap::{Parser, ValueEnum};
use colored::Colorize;
use kvbench::drivers::DriverRegistry;
use kvbench::engine::{self, BenchKind, BenchOptions};
use kvbench::keystream::KeyStream;
use kvbench::BenchResult;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kvbench", about = "Key-value storage latency benchmark")]
struct Cli {
    /// Benchmark action.
    #[arg(value_enum)]
    action: Action,

    /// Storage driver to benchmark.
    #[arg(long, default_value = "mem")]
    driver: String,

    /// Root directory for per-driver storage state.
    #[arg(long, default_value = "./kvbench-data")]
    root: PathBuf,

    /// Key record size in bytes.
    #[arg(long, default_value_t = 16)]
    key_size: usize,

    /// Value size in bytes for PUT benchmarks.
    #[arg(long, default_value_t = 100)]
    value_size: usize,

    /// Flat binary file of fixed-size key records.
    #[arg(long, default_value = "keys.bin")]
    keys_file: PathBuf,

    /// Progress line interval, in operations.
    #[arg(long, default_value_t = 100_000)]
    report_interval: u64,

    /// Operations to run, or records to permute for `shuffle`.
    #[arg(long, default_value_t = 1_000_000)]
    count: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    Put,
    Get,
    Shuffle,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: &Cli) -> BenchResult<()> {
    eprintln!("{} {}", "Driver:".bold(), cli.driver);
    eprintln!("{} {}", "Count :".bold(), cli.count);

    match cli.action {
        Action::Put | Action::Get => {
            let kind = match cli.action {
                Action::Put => BenchKind::Put,
                _ => BenchKind::Get,
            };
            eprintln!(
                "{}",
                match kind {
                    BenchKind::Put => "PUT",
                    BenchKind::Get => "GET",
                }
                .bold()
            );

            let opts = BenchOptions {
                driver: cli.driver.clone(),
                root: cli.root.clone(),
                key_size: cli.key_size,
                value_size: cli.value_size,
                keys_file: cli.keys_file.clone(),
                report_interval: cli.report_interval,
                count: cli.count,
            };

            let registry = DriverRegistry::new();
            let stdout = std::io::stdout();
            let stderr = std::io::stderr();
            engine::run(
                &registry,
                &opts,
                kind,
                &mut stdout.lock(),
                &mut stderr.lock(),
            )
        }
        Action::Shuffle => {
            eprint!("Shuffling file...");
            KeyStream::shuffle(
                &cli.keys_file,
                cli.key_size,
                cli.count as usize,
                &mut rand::thread_rng(),
            )?;
            eprintln!("\rShuffling file... ok");
            Ok(())
        }
    }
}
