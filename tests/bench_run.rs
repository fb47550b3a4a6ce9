//! End-to-end benchmark runs through the engine and driver registry.

use kvbench::drivers::{Driver, DriverRegistry, Storage, StorageOptions};
use kvbench::engine::{self, BenchKind, BenchOptions};
use kvbench::{BenchError, BenchResult};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KEY_SIZE: usize = 16;

fn write_keys_file(dir: &Path, records: usize) -> PathBuf {
    let path = dir.join("keys.bin");
    let mut data = vec![0u8; records * KEY_SIZE];
    ChaCha8Rng::seed_from_u64(42).fill_bytes(&mut data);
    std::fs::write(&path, data).unwrap();
    path
}

fn options(dir: &TempDir, driver: &str, keys_file: PathBuf, count: u64) -> BenchOptions {
    BenchOptions {
        driver: driver.to_string(),
        root: dir.path().join("data"),
        key_size: KEY_SIZE,
        value_size: 100,
        keys_file,
        report_interval: 100,
        count,
    }
}

/// Pull a latency value out of a report line such as
/// `Min latency       : 0.000001 * 1e-6 sec/op`.
fn report_latency(report: &str, label: &str) -> f64 {
    report
        .lines()
        .find(|l| l.starts_with(label))
        .and_then(|l| l.split(':').nth(1))
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| panic!("no '{}' line in report:\n{}", label, report))
}

#[test]
fn put_run_reports_every_operation() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys_file(dir.path(), 1100);
    let opts = options(&dir, "mem", keys, 1000);

    let registry = DriverRegistry::new();
    let mut report = Vec::new();
    let mut progress = Vec::new();
    engine::run(
        &registry,
        &opts,
        BenchKind::Put,
        &mut report,
        &mut progress,
    )
    .unwrap();

    let report = String::from_utf8(report).unwrap();
    let progress = String::from_utf8(progress).unwrap();

    assert!(report.starts_with("Histogram:"));
    assert!(report
        .lines()
        .any(|l| l.starts_with("Total:") && l.contains("1000")));
    assert!(report.contains("Avg throughput"));

    let min = report_latency(&report, "Min latency");
    let avg = report_latency(&report, "Avg latency");
    let max = report_latency(&report, "Max latency");
    assert!(min <= avg && avg <= max, "min {} avg {} max {}", min, avg, max);

    // One line per report interval; the completion line is distinct.
    assert_eq!(progress.matches("ops done...").count(), 10);
    assert!(progress.starts_with("Benchmarking..."));
    assert!(progress.ends_with("1000 ops done\n"));
}

// A driver whose select always succeeds with the most recently written
// value, so GET runs need no pre-populated storage.
struct EchoDriver;

impl Driver for EchoDriver {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn open(&self, _opts: &StorageOptions) -> BenchResult<Box<dyn Storage>> {
        Ok(Box::new(EchoStorage { last: Vec::new() }))
    }
}

struct EchoStorage {
    last: Vec<u8>,
}

impl Storage for EchoStorage {
    fn replace(&mut self, _key: &[u8], val: &[u8]) -> BenchResult<()> {
        self.last.clear();
        self.last.extend_from_slice(val);
        Ok(())
    }

    fn remove(&mut self, _key: &[u8]) -> BenchResult<()> {
        Ok(())
    }

    fn select(&mut self, _key: &[u8], out: Option<&mut Vec<u8>>) -> BenchResult<()> {
        if let Some(out) = out {
            out.clear();
            out.extend_from_slice(&self.last);
        }
        Ok(())
    }

    fn close(&mut self) -> BenchResult<()> {
        Ok(())
    }
}

fn echo_driver() -> Box<dyn Driver> {
    Box::new(EchoDriver)
}

#[test]
fn get_run_reports_every_operation() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys_file(dir.path(), 1100);
    let opts = options(&dir, "echo", keys, 1000);

    let mut registry = DriverRegistry::new();
    registry.register("echo", echo_driver);

    let mut report = Vec::new();
    let mut progress = Vec::new();
    engine::run(
        &registry,
        &opts,
        BenchKind::Get,
        &mut report,
        &mut progress,
    )
    .unwrap();

    let report = String::from_utf8(report).unwrap();
    assert!(report
        .lines()
        .any(|l| l.starts_with("Total:") && l.contains("1000")));
    assert_eq!(
        String::from_utf8(progress).unwrap().matches("ops done...").count(),
        10
    );
}

#[test]
fn exhausted_key_stream_aborts_without_a_report() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys_file(dir.path(), 10);
    let opts = options(&dir, "mem", keys, 1000);

    let registry = DriverRegistry::new();
    let mut report: Vec<u8> = Vec::new();
    let mut progress: Vec<u8> = Vec::new();
    let err = engine::run(
        &registry,
        &opts,
        BenchKind::Put,
        &mut report,
        &mut progress,
    )
    .unwrap_err();

    assert!(matches!(err, BenchError::KeysExhausted));
    assert!(report.is_empty(), "aborted run must report nothing");
}

#[test]
fn empty_keys_file_fails_before_any_operation() {
    let dir = TempDir::new().unwrap();
    let keys = dir.path().join("keys.bin");
    std::fs::write(&keys, b"").unwrap();
    let opts = options(&dir, "mem", keys, 1000);

    let registry = DriverRegistry::new();
    let mut report: Vec<u8> = Vec::new();
    let mut progress = Vec::new();
    let err = engine::run(
        &registry,
        &opts,
        BenchKind::Put,
        &mut report,
        &mut progress,
    )
    .unwrap_err();

    assert!(matches!(err, BenchError::Io(_)));
    assert!(report.is_empty());
    // The failure hints at how to generate the keys file.
    assert!(String::from_utf8(progress).unwrap().contains("dd if=/dev/urandom"));
}

#[test]
fn unknown_driver_fails_setup() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys_file(dir.path(), 10);
    let opts = options(&dir, "nosuchengine", keys, 10);

    let registry = DriverRegistry::new();
    let err = engine::run(
        &registry,
        &opts,
        BenchKind::Put,
        &mut Vec::<u8>::new(),
        &mut Vec::<u8>::new(),
    )
    .unwrap_err();

    assert!(matches!(err, BenchError::DriverNotFound(_)));
}

// A driver whose writes always fail, to pin the fatal-error policy.
struct BrokenDriver;

impl Driver for BrokenDriver {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn open(&self, _opts: &StorageOptions) -> BenchResult<Box<dyn Storage>> {
        Ok(Box::new(BrokenStorage))
    }
}

struct BrokenStorage;

impl Storage for BrokenStorage {
    fn replace(&mut self, _key: &[u8], _val: &[u8]) -> BenchResult<()> {
        Err(BenchError::Storage {
            driver: "broken".to_string(),
            op: "replace",
            detail: "synthetic failure".to_string(),
        })
    }

    fn remove(&mut self, _key: &[u8]) -> BenchResult<()> {
        Ok(())
    }

    fn select(&mut self, _key: &[u8], _out: Option<&mut Vec<u8>>) -> BenchResult<()> {
        Ok(())
    }

    fn close(&mut self) -> BenchResult<()> {
        Ok(())
    }
}

fn broken_driver() -> Box<dyn Driver> {
    Box::new(BrokenDriver)
}

#[test]
fn failed_storage_operation_is_fatal() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys_file(dir.path(), 100);
    let opts = options(&dir, "broken", keys, 50);

    let mut registry = DriverRegistry::new();
    registry.register("broken", broken_driver);

    let mut report: Vec<u8> = Vec::new();
    let err = engine::run(
        &registry,
        &opts,
        BenchKind::Put,
        &mut report,
        &mut Vec::<u8>::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BenchError::Storage { op: "replace", .. }
    ));
    assert!(report.is_empty());
}
