//! Benchmark engine.
//!
//! Orchestrates one run: resolve the driver, open its storage, stream keys
//! from the mapped file, time one storage operation per iteration, feed the
//! elapsed time to the histogram, and emit the final distribution report.
//! Any setup or operation failure is fatal; retrying inside a latency
//! benchmark would corrupt the timing data.

use crate::drivers::{DriverRegistry, Storage, StorageOptions};
use crate::histogram::Histogram;
use crate::keystream::KeyStream;
use crate::{BenchError, BenchResult};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Percentiles printed in the final report.
pub const REPORT_PERCENTILES: [f64; 10] = [
    0.50, 0.95, 0.96, 0.97, 0.98, 0.99, 0.995, 0.999, 0.9995, 0.9999,
];

/// Report latencies in microseconds.
const HISTOGRAM_POWER: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchKind {
    Put,
    Get,
}

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub driver: String,
    pub root: PathBuf,
    pub key_size: usize,
    pub value_size: usize,
    pub keys_file: PathBuf,
    pub report_interval: u64,
    pub count: u64,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            driver: "mem".to_string(),
            root: PathBuf::from("./kvbench-data"),
            key_size: 16,
            value_size: 100,
            keys_file: PathBuf::from("keys.bin"),
            report_interval: 100_000,
            count: 1_000_000,
        }
    }
}

/// Run one benchmark: `count` timed operations of `kind`, a progress line
/// on `progress` every `report_interval` operations, and the histogram
/// report on `report` at the end.
pub fn run(
    registry: &DriverRegistry,
    opts: &BenchOptions,
    kind: BenchKind,
    report: &mut dyn Write,
    progress: &mut dyn Write,
) -> BenchResult<()> {
    if opts.key_size == 0 {
        return Err(BenchError::Config("key size must be non-zero".into()));
    }

    let handle = registry.load(&opts.driver)?;

    let mut storage = handle.driver().open(&StorageOptions {
        path: opts.root.join(&opts.driver),
    })?;

    let mut keys = match KeyStream::open(&opts.keys_file) {
        Ok(keys) => keys,
        Err(err) => {
            let _ = writeln!(
                progress,
                "cannot open keys file '{}'; generate one with:",
                opts.keys_file.display()
            );
            let _ = writeln!(
                progress,
                "  dd if=/dev/urandom of={} bs=1M count=100",
                opts.keys_file.display()
            );
            let _ = storage.close();
            return Err(err);
        }
    };

    let mut hist = Histogram::new(HISTOGRAM_POWER);

    match run_loop(storage.as_mut(), &mut keys, &mut hist, opts, kind, progress) {
        Ok(()) => {
            writeln!(report, "Histogram:")?;
            hist.dump(report, &REPORT_PERCENTILES)?;
            storage.close()?;
            Ok(())
        }
        Err(err) => {
            let _ = storage.close();
            Err(err)
        }
    }
    // Drop order unwinds the rest: key stream unmaps, then the driver
    // handle releases its module.
}

fn run_loop(
    storage: &mut dyn Storage,
    keys: &mut KeyStream,
    hist: &mut Histogram,
    opts: &BenchOptions,
    kind: BenchKind,
    progress: &mut dyn Write,
) -> BenchResult<()> {
    // Scratch buffers live across the whole loop; the timed section never
    // allocates.
    let mut keybuf = vec![0u8; opts.key_size];
    let valbuf = vec![0u8; opts.value_size];

    let mut prev_count = 0u64;
    let mut total_count = 0u64;

    write!(progress, "Benchmarking...")?;
    for _ in 0..opts.count {
        keys.next(&mut keybuf)?;

        let started = Instant::now();
        match kind {
            BenchKind::Put => storage.replace(&keybuf, &valbuf)?,
            BenchKind::Get => storage.select(&keybuf, None)?,
        }
        hist.add(started.elapsed().as_secs_f64());

        prev_count += 1;
        total_count += 1;

        if prev_count < opts.report_interval {
            continue;
        }
        write!(progress, "\r{} ops done...", total_count)?;
        prev_count = 0;
    }
    writeln!(progress, "\r{} ops done", opts.count)?;

    Ok(())
}
