// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![allow(clippy::too_many_arguments)]
#![warn(missing_docs)]

//! # stemsplit
//!
//! Classical-DSP source separation: split a mixed music recording into a vocal
//! stem and an instrumental stem using channel decomposition, STFT-domain
//! masking, harmonic/percussive separation, spectral subtraction, zero-phase
//! band-pass filtering, compression, and noise gating. No machine learning,
//! no I/O: one decoded PCM buffer in, two buffers out.
//!
//! ## Overview
//!
//! Callers decode audio however they like (WAV, FLAC, a DAW buffer), wrap the
//! float samples in a [`SampleBuffer`], pick a [`Strategy`] via
//! [`SeparationConfig`], and call [`separate`]. Both returned stems are mono,
//! exactly as long as the input, and at the input sample rate. The crate never
//! touches the filesystem, never prints, and never spawns threads on the core
//! path; progress is reported through an optional [`SeparationObserver`]
//! callback and batch parallelism is an opt-in feature.
//!
//! ## Strategies
//!
//! - [`Strategy::Simple`] — plain mid/side: the side signal as vocals, the mid
//!   signal as instrumental. Stereo only, but fast and artifact-free.
//! - [`Strategy::Enhanced`] — mid/side plus spectral subtraction, a zero-phase
//!   Butterworth band-pass on the vocal branch, and compression. Falls back to
//!   harmonic/percussive separation for mono input.
//! - [`Strategy::AdvancedSpectral`] — a single STFT with complementary
//!   vocal-band gain masks, phase preserved.
//! - [`Strategy::Hybrid`] — mid/side estimates refined by median-filter
//!   harmonic/percussive separation and blended with the raw estimates.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::array;
//! use stemsplit::{SampleBuffer, SeparationConfig, separate};
//!
//! // Channel-major stereo: row 0 = left, row 1 = right.
//! let frames = array![[0.5f64, 0.25, -0.5, -0.25], [0.1, 0.2, -0.1, -0.2]];
//! let mix = SampleBuffer::new_stereo(frames, 44_100)?;
//!
//! let config = SeparationConfig::simple();
//! let stems = separate(&mix, &config)?;
//!
//! assert_eq!(stems.vocals.num_samples(), mix.num_samples());
//! assert_eq!(stems.instrumental.sample_rate(), 44_100);
//! # Ok::<(), stemsplit::SeparationError>(())
//! ```
//!
//! ## Features
//!
//! - `batch-processing` (default): sequential multi-buffer helpers.
//! - `parallel-processing`: rayon-backed batch separation.
//! - `progress-tracking`: an `indicatif` progress-bar observer.
//! - `serialization`: serde derives on the configuration types.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`SeparationResult`]; nothing in the
//! library path panics. Configuration problems surface as
//! [`SeparationError::Configuration`] before any signal processing starts, so
//! a failed call never leaves partial output behind.

use ndarray::ScalarOperand;
use num_traits::{Float, FloatConst, NumCast};
use rustfft::FftNum;

mod error;

pub mod buffer;
pub mod config;
pub mod dsp;
pub mod observer;
pub mod pipeline;
pub mod util;

#[cfg(feature = "batch-processing")]
pub mod batch;

pub use buffer::{BufferData, SampleBuffer};
pub use config::{
    BandRange, CompressorParams, DEFAULT_MAX_FFT_SIZE, HpssParams, SeparationConfig, StftParams,
    Strategy, WindowType,
};
pub use dsp::{
    ChannelOps, Dynamics, HarmonicPercussive, NoiseReduction, SpectralTransforms,
    ZeroPhaseFiltering,
};
pub use error::{SeparationError, SeparationResult};
pub use observer::{CallbackObserver, NullObserver, SeparationObserver, Stage, StageEvent};
pub use pipeline::{SeparatedStems, Separator, separate};

#[cfg(feature = "batch-processing")]
pub use batch::separate_batch;
#[cfg(feature = "parallel-processing")]
pub use batch::{separate_batch_parallel, separate_batch_with_threads};
#[cfg(feature = "progress-tracking")]
pub use observer::ProgressBarObserver;

/// Marker trait for the float sample types the pipeline processes.
///
/// Implemented for [`f32`] and [`f64`]. The [`FftNum`] bound lets spectra
/// share the buffer's precision instead of forcing an intermediate cast, and
/// [`ScalarOperand`] keeps ndarray scalar arithmetic available generically.
pub trait RealFloat: Float + FloatConst + NumCast + FftNum + ScalarOperand {}

impl RealFloat for f32 {}
impl RealFloat for f64 {}

/// Index of the left channel in stereo buffer layouts.
pub const LEFT: usize = 0;
/// Index of the right channel in stereo buffer layouts.
pub const RIGHT: usize = 1;

/// Casts between real scalar types, panicking on failure.
///
/// Intended for conversions that cannot fail for the types involved, such as
/// sample counts and literal constants into [`RealFloat`] values.
///
/// # Panics
/// Panics if `value` is not representable in `F`.
pub fn to_precision<F, T>(value: T) -> F
where
    F: RealFloat,
    T: NumCast,
{
    NumCast::from(value).expect("valid numeric conversion between real scalar types")
}
