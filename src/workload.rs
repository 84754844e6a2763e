//! CPU-bound workload used as the stand-in for expensive computation.
//!
//! The test matrix is generated once at startup from a fixed seed and then
//! shared read-only between requests (and between workers in prefork mode).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Value returned by every completed unit of work
pub const WORK_UNIT_DONE: u32 = 1;

/// Fixed pseudo-random square matrix
#[derive(Debug, Clone, PartialEq)]
pub struct TestMatrix {
    size: usize,
    values: Vec<f64>,
}

impl TestMatrix {
    /// Generate a `size x size` matrix with values in `[0, 1)` from `seed`
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..size * size).map(|_| rng.gen::<f64>()).collect();
        Self { size, values }
    }

    /// Side length of the matrix
    pub fn size(&self) -> usize {
        self.size
    }

    /// Raw row-major values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Square every element into a fresh buffer.
    ///
    /// The result is discarded; only the time spent matters.
    pub fn square(&self) -> u32 {
        let squared: Vec<f64> = self.values.iter().map(|v| v * v).collect();
        std::hint::black_box(squared);
        WORK_UNIT_DONE
    }
}

/// Run the workload `iterations` times back to back and return the elapsed time.
///
/// Never yields: when called from an async handler it holds the scheduler
/// for the whole loop.
pub fn run_units(matrix: &TestMatrix, iterations: u32) -> Duration {
    let start = Instant::now();
    for _ in 0..iterations {
        matrix.square();
    }
    start.elapsed()
}
