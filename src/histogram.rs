//! Fixed-bucket latency histogram.
//!
//! Observations are classified into a fixed table of increasing bucket
//! boundaries chosen once for the whole process, so results are comparable
//! across runs and with the LevelDB benchmark output the table was taken
//! from. Insertion is O(log B) and allocation-free; percentiles are
//! interpolated from bucket counts without storing raw samples.

use std::io::{self, Write};

/// Bucket boundaries, derived from the LevelDB benchmark to be compatible
/// with it. The final entries make the last bucket unbounded.
static BUCKETS: [f64; 155] = [
    1.0,
    2.0,
    3.0,
    4.0,
    5.0,
    6.0,
    7.0,
    8.0,
    9.0,
    10.0,
    12.0,
    14.0,
    16.0,
    18.0,
    20.0,
    25.0,
    30.0,
    35.0,
    40.0,
    45.0,
    50.0,
    60.0,
    70.0,
    80.0,
    90.0,
    100.0,
    120.0,
    140.0,
    160.0,
    180.0,
    200.0,
    250.0,
    300.0,
    350.0,
    400.0,
    450.0,
    500.0,
    600.0,
    700.0,
    800.0,
    900.0,
    1000.0,
    1200.0,
    1400.0,
    1600.0,
    1800.0,
    2000.0,
    2500.0,
    3000.0,
    3500.0,
    4000.0,
    4500.0,
    5000.0,
    6000.0,
    7000.0,
    8000.0,
    9000.0,
    10000.0,
    12000.0,
    14000.0,
    16000.0,
    18000.0,
    20000.0,
    25000.0,
    30000.0,
    35000.0,
    40000.0,
    45000.0,
    50000.0,
    60000.0,
    70000.0,
    80000.0,
    90000.0,
    100000.0,
    120000.0,
    140000.0,
    160000.0,
    180000.0,
    200000.0,
    250000.0,
    300000.0,
    350000.0,
    400000.0,
    450000.0,
    500000.0,
    600000.0,
    700000.0,
    800000.0,
    900000.0,
    1000000.0,
    1200000.0,
    1400000.0,
    1600000.0,
    1800000.0,
    2000000.0,
    2500000.0,
    3000000.0,
    3500000.0,
    4000000.0,
    4500000.0,
    5000000.0,
    6000000.0,
    7000000.0,
    8000000.0,
    9000000.0,
    10000000.0,
    12000000.0,
    14000000.0,
    16000000.0,
    18000000.0,
    20000000.0,
    25000000.0,
    30000000.0,
    35000000.0,
    40000000.0,
    45000000.0,
    50000000.0,
    60000000.0,
    70000000.0,
    80000000.0,
    90000000.0,
    100000000.0,
    120000000.0,
    140000000.0,
    160000000.0,
    180000000.0,
    200000000.0,
    250000000.0,
    300000000.0,
    350000000.0,
    400000000.0,
    450000000.0,
    500000000.0,
    600000000.0,
    700000000.0,
    800000000.0,
    900000000.0,
    1000000000.0,
    1200000000.0,
    1400000000.0,
    1600000000.0,
    1800000000.0,
    2000000000.0,
    2500000000.0,
    3000000000.0,
    3500000000.0,
    4000000000.0,
    4500000000.0,
    5000000000.0,
    6000000000.0,
    7000000000.0,
    8000000000.0,
    9000000000.0,
    1e200,
    f64::INFINITY,
];

const BUCKET_COUNT: usize = BUCKETS.len();

/// Per-run latency distribution over the shared bucket table.
///
/// `power` is the decimal scale exponent: every observation is multiplied
/// by `10^power` before classification, so `power = 6` turns raw seconds
/// into the microseconds the bucket table is expressed in.
pub struct Histogram {
    min: f64,
    max: f64,
    sum: f64,
    sumsq: f64,
    size: u64,
    buckets: [u64; BUCKET_COUNT],
    power: i32,
}

impl Histogram {
    pub fn new(power: i32) -> Self {
        Self {
            min: f64::INFINITY,
            max: 0.0,
            sum: 0.0,
            sumsq: 0.0,
            size: 0,
            buckets: [0; BUCKET_COUNT],
            power,
        }
    }

    /// Record one observation.
    ///
    /// A value equal to a bucket boundary lands in the bucket carrying that
    /// boundary, not the next one. The final bucket is unbounded, so every
    /// value is classified.
    pub fn add(&mut self, value: f64) {
        let val = value * 10f64.powi(self.power);
        let idx = BUCKETS.partition_point(|b| *b < val);
        debug_assert!(idx < BUCKET_COUNT);
        self.buckets[idx] += 1;

        if val < self.min {
            self.min = val;
        }
        if val > self.max {
            self.max = val;
        }
        self.sum += val;
        self.sumsq += val * val;
        self.size += 1;
    }

    /// Reset all counters and running statistics, keeping the scale exponent.
    pub fn clear(&mut self) {
        *self = Histogram::new(self.power);
    }

    pub fn total(&self) -> u64 {
        self.size
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.size as f64
    }

    /// Population standard deviation of the scaled observations.
    pub fn stddev(&self) -> f64 {
        let mean = self.mean();
        (self.sumsq / self.size as f64 - mean * mean).max(0.0).sqrt()
    }

    pub fn power(&self) -> i32 {
        self.power
    }

    /// Interpolated value below which a `p` fraction of observations fall.
    ///
    /// Walks buckets in order until the cumulative count reaches
    /// `floor(size * p)`, then interpolates linearly inside the bucket and
    /// clamps to `[min, max]`.
    pub fn percentile(&self, p: f64) -> f64 {
        let threshold = (self.size as f64 * p).floor() as u64;
        let mut cum = 0u64;
        for (i, &count) in self.buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            cum += count;
            if cum >= threshold {
                let left = cum - count;
                let left_val = if i > 0 { BUCKETS[i - 1] } else { 0.0 };
                let right_val = BUCKETS[i];
                let scale = (threshold - left) as f64 / count as f64;
                let r = left_val + (right_val - left_val) * scale;
                if r < self.min {
                    return self.min;
                } else if r > self.max {
                    return self.max;
                }
                return r;
            }
        }
        self.max
    }

    /// Write the distribution report: one line per non-empty bucket with a
    /// proportional bar (one `#` per 5%), followed by totals, min/avg/max
    /// latency, the requested percentiles, and average throughput.
    ///
    /// Dumping an empty histogram is a contract violation.
    pub fn dump(&self, out: &mut dyn Write, percentiles: &[f64]) -> io::Result<()> {
        assert!(self.size > 0, "dump called with zero samples");

        writeln!(
            out,
            "[{:>7}, {:>7})\t{:>11}\t{:>7}",
            "t min", "t max", "ops count", "%"
        )?;
        writeln!(out, "--------------------------------------------------")?;
        for (i, &count) in self.buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let share = count as f64 / self.size as f64;
            let lower = if i > 0 { BUCKETS[i - 1] } else { 0.0 };
            write!(
                out,
                "[{:7.0}, {:7.0})\t{:11}\t{:7.2} ",
                lower,
                BUCKETS[i],
                count,
                share * 1e2
            )?;
            let marks = (share * 1e2 / 5.0) as usize;
            for _ in 0..marks {
                write!(out, "#")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "--------------------------------------------------")?;
        writeln!(out, "Total:     {:7.0}\t{:11}\t   100%", self.sum, self.size)?;
        writeln!(
            out,
            "Min latency       : {:.6} * 1e-{} sec/op",
            self.min, self.power
        )?;
        writeln!(
            out,
            "Avg latency       : {:.6} * 1e-{} sec/op",
            self.mean(),
            self.power
        )?;
        writeln!(
            out,
            "Max latency       : {:.6} * 1e-{} sec/op",
            self.max, self.power
        )?;
        for &p in percentiles {
            writeln!(
                out,
                "{:.4}%  latency  : {:.6} * 1e-{} sec/op",
                p * 1e2,
                self.percentile(p),
                self.power
            )?;
        }
        writeln!(
            out,
            "Avg throughput    : {:7.0} ops/sec",
            self.size as f64 / (self.sum * 10f64.powi(-self.power))
        )?;
        Ok(())
    }
}
