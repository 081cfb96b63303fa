//! Synthetic signal generation.
//!
//! Deterministic generators for sine waves, chirps, impulses, and silence,
//! used throughout the test suite and handy for callers exercising the
//! pipeline without real recordings. Sample counts are explicit so tests can
//! line signals up with STFT frame boundaries.

use ndarray::{Array1, Array2};

use crate::buffer::SampleBuffer;
use crate::{LEFT, RealFloat, SeparationError, SeparationResult, to_precision};

/// Generates a mono sine wave.
pub fn sine_wave<F: RealFloat>(
    frequency: F,
    num_samples: usize,
    sample_rate: u32,
    amplitude: F,
) -> SeparationResult<SampleBuffer<F>> {
    let sr = to_precision::<F, _>(sample_rate.max(1));
    let two_pi_freq = two_pi::<F>() * frequency;
    let samples = Array1::from_shape_fn(num_samples, |i| {
        let t = to_precision::<F, _>(i) / sr;
        amplitude * (two_pi_freq * t).sin()
    });
    SampleBuffer::new_mono(samples, sample_rate)
}

/// Generates a stereo buffer with an independent sine per channel.
///
/// Distinct left/right frequencies give the mid/side decomposition something
/// to actually separate.
pub fn stereo_sine_wave<F: RealFloat>(
    left_hz: F,
    right_hz: F,
    num_samples: usize,
    sample_rate: u32,
    amplitude: F,
) -> SeparationResult<SampleBuffer<F>> {
    let sr = to_precision::<F, _>(sample_rate.max(1));
    let samples = Array2::from_shape_fn((2, num_samples), |(channel, i)| {
        let freq = if channel == LEFT { left_hz } else { right_hz };
        let t = to_precision::<F, _>(i) / sr;
        amplitude * (two_pi::<F>() * freq * t).sin()
    });
    SampleBuffer::new_stereo(samples, sample_rate)
}

/// Generates a sum of sine components given as `(frequency, amplitude)` pairs.
pub fn compound_tone<F: RealFloat>(
    components: &[(F, F)],
    num_samples: usize,
    sample_rate: u32,
) -> SeparationResult<SampleBuffer<F>> {
    if components.is_empty() {
        return Err(SeparationError::InvalidInput(
            "compound tone requires at least one (frequency, amplitude) component".to_string(),
        ));
    }
    let sr = to_precision::<F, _>(sample_rate.max(1));
    let samples = Array1::from_shape_fn(num_samples, |i| {
        let t = to_precision::<F, _>(i) / sr;
        components
            .iter()
            .fold(F::zero(), |acc, (freq, amp)| {
                acc + *amp * (two_pi::<F>() * *freq * t).sin()
            })
    });
    SampleBuffer::new_mono(samples, sample_rate)
}

/// Generates a linear sweep from `start_hz` to `end_hz`.
pub fn chirp<F: RealFloat>(
    start_hz: F,
    end_hz: F,
    num_samples: usize,
    sample_rate: u32,
    amplitude: F,
) -> SeparationResult<SampleBuffer<F>> {
    let sr = to_precision::<F, _>(sample_rate.max(1));
    let duration = to_precision::<F, _>(num_samples) / sr;
    let half = to_precision::<F, _>(0.5);
    let samples = Array1::from_shape_fn(num_samples, |i| {
        let t = to_precision::<F, _>(i) / sr;
        // Instantaneous phase of a linear sweep: 2*pi*(f0*t + (f1-f0)*t^2/(2*T)).
        let phase = two_pi::<F>() * (start_hz * t + (end_hz - start_hz) * t * t * half / duration);
        amplitude * phase.sin()
    });
    SampleBuffer::new_mono(samples, sample_rate)
}

/// Generates silence with a single spike of `amplitude` at `position`.
pub fn impulse<F: RealFloat>(
    num_samples: usize,
    sample_rate: u32,
    position: usize,
    amplitude: F,
) -> SeparationResult<SampleBuffer<F>> {
    if position >= num_samples {
        return Err(SeparationError::InvalidInput(format!(
            "impulse position {position} outside buffer of {num_samples} samples"
        )));
    }
    let mut samples = Array1::zeros(num_samples);
    samples[position] = amplitude;
    SampleBuffer::new_mono(samples, sample_rate)
}

/// Generates a periodic click train: a spike every `period` samples.
pub fn impulse_train<F: RealFloat>(
    num_samples: usize,
    sample_rate: u32,
    period: usize,
    amplitude: F,
) -> SeparationResult<SampleBuffer<F>> {
    if period == 0 {
        return Err(SeparationError::InvalidInput(
            "impulse train period must be at least 1 sample".to_string(),
        ));
    }
    let samples = Array1::from_shape_fn(num_samples, |i| {
        if i % period == 0 { amplitude } else { F::zero() }
    });
    SampleBuffer::new_mono(samples, sample_rate)
}

/// Generates mono silence.
pub fn silence<F: RealFloat>(
    num_samples: usize,
    sample_rate: u32,
) -> SeparationResult<SampleBuffer<F>> {
    SampleBuffer::new_mono(Array1::zeros(num_samples), sample_rate)
}

fn two_pi<F: RealFloat>() -> F {
    F::TAU()
}
