//! Shared types and error handling for kvbench.
//!
//! The benchmark core is split into four modules: [`keystream`] feeds keys
//! from a memory-mapped file, [`drivers`] resolves a storage driver by name
//! and binds it to the fixed operation contract, [`histogram`] accumulates
//! per-operation latencies, and [`engine`] orchestrates a run.

pub mod drivers;
pub mod engine;
pub mod histogram;
pub mod keystream;

// ────────────────────────────────────────────────────────────────────────────────
// Error type
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug)]
pub enum BenchError {
    Io(std::io::Error),
    /// No compiled-in driver and no loadable module with the given name.
    DriverNotFound(String),
    /// The driver module exists but could not be loaded or bound.
    DriverLoad { name: String, detail: String },
    /// The bound driver advertises a different name than was requested.
    DriverMismatch { requested: String, advertised: String },
    /// A storage operation failed. Fatal to the run.
    Storage {
        driver: String,
        op: &'static str,
        detail: String,
    },
    /// Fewer bytes remain in the key file than one more record requires.
    KeysExhausted,
    Config(String),
}

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchError::Io(e) => write!(f, "IO error: {}", e),
            BenchError::DriverNotFound(name) => write!(f, "driver '{}' is not found", name),
            BenchError::DriverLoad { name, detail } => {
                write!(f, "cannot load driver '{}': {}", name, detail)
            }
            BenchError::DriverMismatch {
                requested,
                advertised,
            } => write!(
                f,
                "driver module advertises '{}', expected '{}'",
                advertised, requested
            ),
            BenchError::Storage { driver, op, detail } => {
                write!(f, "{}: {} failed: {}", driver, op, detail)
            }
            BenchError::KeysExhausted => write!(f, "key stream exhausted"),
            BenchError::Config(s) => write!(f, "config error: {}", s),
        }
    }
}

impl std::error::Error for BenchError {}

impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        BenchError::Io(e)
    }
}
