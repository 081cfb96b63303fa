//! STFT, inverse STFT, and whole-buffer FFT.
//!
//! Frames are centered: the signal is reflection-padded by half a window on
//! each side before framing, so the first and last samples sit under full
//! analysis windows and the inverse transform can reconstruct the entire
//! original length. Overlap-add normalizes by the accumulated squared window,
//! which makes the round trip exact (to float rounding) at every position
//! some window covers with nonzero weight.

use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::buffer::SampleBuffer;
use crate::config::{StftParams, WindowType};
use crate::dsp::traits::SpectralTransforms;
use crate::{RealFloat, SeparationError, SeparationResult, to_precision};

/// Generates an analysis window of `size` samples.
///
/// Windows are periodic (denominators use `size`, not `size - 1`) so that
/// quarter-window hops tile to a constant overlap sum.
pub fn generate_window<F: RealFloat>(size: usize, window: WindowType) -> Array1<F> {
    let denom = to_precision::<F, _>(size.max(1));
    let half = to_precision::<F, _>(0.5);
    let hamming_a0 = to_precision::<F, _>(0.54);
    let hamming_a1 = to_precision::<F, _>(0.46);
    let blackman_a0 = to_precision::<F, _>(0.42);
    let blackman_a1 = to_precision::<F, _>(0.5);
    let blackman_a2 = to_precision::<F, _>(0.08);
    Array1::from_shape_fn(size, |i| {
        let phase = F::TAU() * to_precision::<F, _>(i) / denom;
        match window {
            WindowType::Rectangular => F::one(),
            WindowType::Hann => half * (F::one() - phase.cos()),
            WindowType::Hamming => hamming_a0 - hamming_a1 * phase.cos(),
            WindowType::Blackman => {
                blackman_a0 - blackman_a1 * phase.cos() + blackman_a2 * (phase + phase).cos()
            }
        }
    })
}

fn validate_stft_params(params: &StftParams) -> SeparationResult<()> {
    if params.window_size == 0 {
        return Err(SeparationError::InvalidInput(
            "stft window size must be greater than zero".to_string(),
        ));
    }
    if params.hop_size == 0 {
        return Err(SeparationError::InvalidInput(
            "stft hop size must be greater than zero".to_string(),
        ));
    }
    if params.hop_size > params.window_size {
        return Err(SeparationError::InvalidInput(format!(
            "stft hop size ({}) must not exceed window size ({})",
            params.hop_size, params.window_size
        )));
    }
    Ok(())
}

fn mono_samples<F: RealFloat>(buffer: &SampleBuffer<F>) -> SeparationResult<&Array1<F>> {
    buffer.as_mono().ok_or_else(|| {
        SeparationError::InvalidInput(
            "spectral transforms expect a mono buffer; decompose or downmix first".to_string(),
        )
    })
}

/// Reflection padding without edge duplication: `[.. x2 x1 | x0 x1 x2 .. | ..]`.
fn reflect_pad<F: RealFloat>(samples: &Array1<F>, pad: usize) -> Vec<F> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    for i in 0..pad {
        padded.push(samples[pad - i]);
    }
    padded.extend(samples.iter().copied());
    for i in 0..pad {
        padded.push(samples[n - 2 - i]);
    }
    padded
}

pub(crate) fn forward_fft<F: RealFloat>(samples: ArrayView1<'_, F>) -> Vec<Complex<F>> {
    let mut buffer: Vec<Complex<F>> = samples
        .iter()
        .map(|x| Complex::new(*x, F::zero()))
        .collect();
    if !buffer.is_empty() {
        let mut planner = FftPlanner::new();
        planner.plan_fft_forward(buffer.len()).process(&mut buffer);
    }
    buffer
}

pub(crate) fn inverse_fft_real<F: RealFloat>(mut spectrum: Vec<Complex<F>>) -> Vec<F> {
    let n = spectrum.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_inverse(n).process(&mut spectrum);
    let scale = F::one() / to_precision::<F, _>(n);
    spectrum.into_iter().map(|c| c.re * scale).collect()
}

impl<F: RealFloat> SpectralTransforms<F> for SampleBuffer<F> {
    fn fft(&self) -> SeparationResult<Vec<Complex<F>>> {
        let samples = mono_samples(self)?;
        Ok(forward_fft(samples.view()))
    }

    fn ifft(spectrum: &[Complex<F>], sample_rate: u32) -> SeparationResult<Self> {
        if spectrum.is_empty() {
            return Err(SeparationError::InvalidInput(
                "cannot invert an empty spectrum".to_string(),
            ));
        }
        let time = inverse_fft_real(spectrum.to_vec());
        Self::new_mono(Array1::from_vec(time), sample_rate)
    }

    fn stft(&self, params: &StftParams) -> SeparationResult<Array2<Complex<F>>> {
        validate_stft_params(params)?;
        let samples = mono_samples(self)?;
        let n = samples.len();
        if n < params.window_size {
            return Err(SeparationError::InvalidInput(format!(
                "buffer of {n} samples is shorter than one {}-sample analysis window",
                params.window_size
            )));
        }

        let pad = params.window_size / 2;
        let padded = reflect_pad(samples, pad);
        let num_frames = (padded.len() - params.window_size) / params.hop_size + 1;
        let window = generate_window::<F>(params.window_size, params.window);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(params.window_size);
        let mut spectrogram = Array2::zeros((params.window_size, num_frames));
        let mut frame_buf = vec![Complex::new(F::zero(), F::zero()); params.window_size];

        for frame in 0..num_frames {
            let start = frame * params.hop_size;
            for (i, slot) in frame_buf.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * window[i], F::zero());
            }
            fft.process(&mut frame_buf);
            for (bin, value) in frame_buf.iter().enumerate() {
                spectrogram[[bin, frame]] = *value;
            }
        }
        Ok(spectrogram)
    }

    fn istft(
        spectrogram: &Array2<Complex<F>>,
        params: &StftParams,
        length: usize,
        sample_rate: u32,
    ) -> SeparationResult<Self> {
        validate_stft_params(params)?;
        let (bins, num_frames) = spectrogram.dim();
        if bins != params.window_size {
            return Err(SeparationError::InvalidInput(format!(
                "spectrogram has {bins} frequency rows but the window size is {}",
                params.window_size
            )));
        }
        if num_frames == 0 {
            return Err(SeparationError::InvalidInput(
                "spectrogram has no frames to invert".to_string(),
            ));
        }
        if length == 0 {
            return Err(SeparationError::InvalidInput(
                "inverse stft target length must be greater than zero".to_string(),
            ));
        }

        let window = generate_window::<F>(params.window_size, params.window);
        let padded_len = (num_frames - 1) * params.hop_size + params.window_size;
        let mut output = vec![F::zero(); padded_len];
        let mut window_sum = vec![F::zero(); padded_len];

        let mut planner = FftPlanner::new();
        let ifft = planner.plan_fft_inverse(params.window_size);
        let scale = F::one() / to_precision::<F, _>(params.window_size);
        let mut frame_buf = vec![Complex::new(F::zero(), F::zero()); params.window_size];

        for frame in 0..num_frames {
            for (bin, slot) in frame_buf.iter_mut().enumerate() {
                *slot = spectrogram[[bin, frame]];
            }
            ifft.process(&mut frame_buf);
            let start = frame * params.hop_size;
            for i in 0..params.window_size {
                let sample = frame_buf[i].re * scale;
                output[start + i] = output[start + i] + sample * window[i];
                window_sum[start + i] = window_sum[start + i] + window[i] * window[i];
            }
        }
        for (sample, wsum) in output.iter_mut().zip(window_sum.iter()) {
            if *wsum > F::zero() {
                *sample = *sample / *wsum;
            }
        }

        // Drop the centering pad, then trim or zero-pad to the target length.
        let pad = params.window_size / 2;
        let mut result = Array1::zeros(length);
        for (i, slot) in result.iter_mut().enumerate() {
            let j = pad + i;
            if j < padded_len {
                *slot = output[j];
            }
        }
        Self::new_mono(result, sample_rate)
    }
}
