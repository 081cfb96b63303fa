//! Signal processing building blocks for the separation pipeline.
//!
//! Each concern lives in its own module behind a focused trait implemented on
//! [`crate::SampleBuffer`]:
//!
//! - [`transforms`] - STFT/ISTFT and whole-buffer FFT
//! - [`channels`] - mid/side decomposition and downmixing
//! - [`hpss`] - median-filter harmonic/percussive separation
//! - [`masking`] - frequency-band gain masks over spectrograms
//! - [`denoise`] - whole-buffer spectral subtraction
//! - [`filtering`] - zero-phase Butterworth band-pass
//! - [`dynamics`] - compression, gating, pre-emphasis
//!
//! All operations are pure: buffer in, buffer out, no state between calls.

pub mod channels;
pub mod denoise;
pub mod dynamics;
pub mod filtering;
pub mod hpss;
pub mod masking;
pub mod traits;
pub mod transforms;

pub use traits::{
    ChannelOps, Dynamics, HarmonicPercussive, NoiseReduction, SpectralTransforms,
    ZeroPhaseFiltering,
};
