//! Storage driver contract and driver resolution.
//!
//! The benchmark engine drives every storage engine through the same two
//! traits: a [`Driver`] constructs storage instances, a [`Storage`] serves
//! the timed operations. Drivers resolve by name, either from the
//! compiled-in table or from a dynamically loaded module following a fixed
//! naming convention, and the engine never learns which.

pub mod mem;

use crate::{BenchError, BenchResult};
use libloading::{Library, Symbol};
use std::path::PathBuf;

/// Options handed to a driver when opening its storage instance.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Directory the engine assigns to this driver's on-disk state.
    pub path: PathBuf,
}

/// A storage engine binding, resolvable by name.
pub trait Driver {
    /// The name this driver advertises. Must equal the requested name;
    /// the registry rejects mismatched modules.
    fn name(&self) -> &'static str;

    fn open(&self, opts: &StorageOptions) -> BenchResult<Box<dyn Storage>>;
}

/// One open storage instance. Operations mirror the engine contract:
/// a failed operation signals a driver or storage inconsistency and is
/// fatal to the benchmark run.
pub trait Storage {
    /// Insert or overwrite a key.
    fn replace(&mut self, key: &[u8], val: &[u8]) -> BenchResult<()>;

    /// Delete a key. Missing keys are an error.
    fn remove(&mut self, key: &[u8]) -> BenchResult<()>;

    /// Look a key up. With `out = None` the value is discarded and only
    /// existence is verified; with `Some(buf)` the value is copied into the
    /// caller's buffer.
    fn select(&mut self, key: &[u8], out: Option<&mut Vec<u8>>) -> BenchResult<()>;

    /// Release the instance. Called exactly once, before the driver is
    /// unloaded.
    fn close(&mut self) -> BenchResult<()>;
}

/// Constructor signature a driver module must export. The symbol name is
/// derived from the driver name, see [`DriverRegistry::load`].
pub type DriverConstructor = unsafe fn() -> *mut dyn Driver;

/// Constructor for compiled-in drivers.
pub type BuiltinConstructor = fn() -> Box<dyn Driver>;

/// A resolved driver. Holds the loaded module (if any) alive for as long
/// as the driver is in use and unloads it exactly once.
pub struct DriverHandle {
    // `driver` precedes `_lib` so the instance is destroyed before the
    // code it came from is unloaded.
    driver: Box<dyn Driver>,
    _lib: Option<Library>,
}

impl DriverHandle {
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

/// Name-to-driver resolution: a compiled-in table first, a loadable module
/// second.
pub struct DriverRegistry {
    builtin: Vec<(&'static str, BuiltinConstructor)>,
    plugin_dir: PathBuf,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            builtin: vec![("mem", mem::MemDriver::boxed as BuiltinConstructor)],
            plugin_dir: PathBuf::from("plugins"),
        }
    }

    /// Directory searched for driver modules. Defaults to `plugins/`.
    pub fn with_plugin_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    /// Add a compiled-in driver under `name`.
    pub fn register(&mut self, name: &'static str, ctor: BuiltinConstructor) {
        self.builtin.push((name, ctor));
    }

    /// Resolve `name` to a bound driver.
    ///
    /// Compiled-in drivers win; otherwise the module
    /// `<plugin-dir>/<name>/libkvbench_<name>.<ext>` is loaded and its
    /// `kvbench_<name>_driver` constructor invoked. Either way the bound
    /// driver must advertise the requested name.
    pub fn load(&self, name: &str) -> BenchResult<DriverHandle> {
        if let Some((_, ctor)) = self.builtin.iter().find(|(n, _)| *n == name) {
            return Self::verify(
                DriverHandle {
                    driver: ctor(),
                    _lib: None,
                },
                name,
            );
        }
        self.load_module(name)
    }

    fn load_module(&self, name: &str) -> BenchResult<DriverHandle> {
        let path = self.plugin_dir.join(name).join(format!(
            "{}kvbench_{}{}",
            std::env::consts::DLL_PREFIX,
            name,
            std::env::consts::DLL_SUFFIX
        ));
        if !path.exists() {
            return Err(BenchError::DriverNotFound(name.to_string()));
        }

        let lib = unsafe { Library::new(&path) }.map_err(|e| BenchError::DriverLoad {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

        let symbol = format!("kvbench_{}_driver", name);
        let driver = unsafe {
            let ctor: Symbol<DriverConstructor> =
                lib.get(symbol.as_bytes())
                    .map_err(|e| BenchError::DriverLoad {
                        name: name.to_string(),
                        detail: e.to_string(),
                    })?;
            Box::from_raw(ctor())
        };

        Self::verify(
            DriverHandle {
                driver,
                _lib: Some(lib),
            },
            name,
        )
    }

    fn verify(handle: DriverHandle, requested: &str) -> BenchResult<DriverHandle> {
        let advertised = handle.driver().name();
        if advertised != requested {
            return Err(BenchError::DriverMismatch {
                requested: requested.to_string(),
                advertised: advertised.to_string(),
            });
        }
        Ok(handle)
    }
}
