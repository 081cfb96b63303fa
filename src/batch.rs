//! Batch separation over multiple buffers.
//!
//! The sequential entry point is always available when the
//! `batch-processing` feature is on; the `parallel-processing` feature adds
//! rayon-backed variants that fan buffers out across worker threads. One
//! failing buffer fails the whole batch.

use tracing::trace;

use crate::buffer::SampleBuffer;
use crate::config::SeparationConfig;
use crate::pipeline::{SeparatedStems, separate};
use crate::{RealFloat, SeparationResult};

/// Separates each buffer in order with the same configuration.
///
/// Returns stems in input order, or the first error encountered.
pub fn separate_batch<F: RealFloat>(
    buffers: &[SampleBuffer<F>],
    config: &SeparationConfig<F>,
) -> SeparationResult<Vec<SeparatedStems<F>>> {
    buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| {
            trace!(index, total = buffers.len(), "separating batch buffer");
            separate(buffer, config)
        })
        .collect()
}

#[cfg(feature = "parallel-processing")]
mod parallel {
    use rayon::prelude::*;

    use crate::SeparationError;
    use crate::buffer::SampleBuffer;
    use crate::config::SeparationConfig;
    use crate::pipeline::{SeparatedStems, separate};
    use crate::{RealFloat, SeparationResult};

    /// Separates buffers across the global rayon pool, preserving input
    /// order in the result.
    pub fn separate_batch_parallel<F: RealFloat>(
        buffers: &[SampleBuffer<F>],
        config: &SeparationConfig<F>,
    ) -> SeparationResult<Vec<SeparatedStems<F>>> {
        buffers
            .par_iter()
            .map(|buffer| separate(buffer, config))
            .collect()
    }

    /// Separates buffers on a dedicated pool of `num_threads` workers.
    ///
    /// `num_threads == 0` sizes the pool to the machine's logical CPUs.
    pub fn separate_batch_with_threads<F: RealFloat>(
        buffers: &[SampleBuffer<F>],
        config: &SeparationConfig<F>,
        num_threads: usize,
    ) -> SeparationResult<Vec<SeparatedStems<F>>> {
        let workers = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| {
                SeparationError::Configuration(format!(
                    "failed to build a {workers}-thread pool: {e}"
                ))
            })?;
        pool.install(|| separate_batch_parallel(buffers, config))
    }
}

#[cfg(feature = "parallel-processing")]
pub use parallel::{separate_batch_parallel, separate_batch_with_threads};
