//! Memory-mapped key stream.
//!
//! Benchmark keys come from a flat binary file of fixed-size records with
//! no header or metadata. Mapping the whole file and advising sequential
//! access keeps key generation free of read syscalls and buffer churn, so
//! timings inside the benchmark loop reflect the storage engine and not
//! the harness.

use crate::{BenchError, BenchResult};
use memmap2::{Mmap, MmapMut, MmapOptions};
use rand::Rng;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

pub struct KeyStream {
    _file: File,
    map: Mmap,
    cur: usize,
}

impl KeyStream {
    /// Map the key file read-only. The mapping and the file handle are
    /// released by `Drop` on every exit path.
    pub fn open<P: AsRef<Path>>(path: P) -> BenchResult<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Err(BenchError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("keys file '{}' is empty", path.as_ref().display()),
            )));
        }

        let map = unsafe { MmapOptions::new().map(&file)? };
        #[cfg(unix)]
        map.advise(memmap2::Advice::Sequential)?;

        Ok(Self {
            _file: file,
            map,
            cur: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    /// Copy the next `key.len()` bytes into the caller's scratch buffer and
    /// advance the cursor.
    ///
    /// Fails with `KeysExhausted` when fewer bytes remain than one more
    /// record requires; the benchmark cannot continue past that point.
    pub fn next(&mut self, key: &mut [u8]) -> BenchResult<()> {
        if self.cur + key.len() >= self.map.len() {
            return Err(BenchError::KeysExhausted);
        }
        key.copy_from_slice(&self.map[self.cur..self.cur + key.len()]);
        self.cur += key.len();
        Ok(())
    }

    /// In-place Fisher-Yates permutation of the first
    /// `min(file_len / record_size, max_records)` records, flushed to the
    /// backing file before the mapping is dropped.
    ///
    /// A file shorter than one record is left untouched. The RNG is passed
    /// in so callers that need reproducible permutations can seed it.
    pub fn shuffle<P: AsRef<Path>>(
        path: P,
        record_size: usize,
        max_records: usize,
        rng: &mut impl Rng,
    ) -> BenchResult<()> {
        if record_size == 0 {
            return Err(BenchError::Config("record size must be non-zero".into()));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(());
        }
        let mut map: MmapMut = unsafe { MmapOptions::new().map_mut(&file)? };

        let n = (map.len() / record_size).min(max_records);
        if n == 0 {
            return Ok(());
        }

        for i in 0..n - 1 {
            let j = rng.gen_range(i..n);
            if j == i {
                continue;
            }
            let (head, tail) = map.split_at_mut(j * record_size);
            head[i * record_size..(i + 1) * record_size].swap_with_slice(&mut tail[..record_size]);
        }

        map.flush()?;
        Ok(())
    }
}
