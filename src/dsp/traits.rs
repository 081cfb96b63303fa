//! Operation traits implemented on [`crate::SampleBuffer`].
//!
//! The pipeline talks to buffers exclusively through these seams, which keeps
//! every processing stage mockable and the orchestrator free of DSP detail.

use ndarray::Array2;
use num_complex::Complex;

use crate::config::{BandRange, CompressorParams, HpssParams, StftParams};
use crate::{RealFloat, SeparationResult};

/// FFT-based transforms between the time and frequency domains.
pub trait SpectralTransforms<F: RealFloat>: Sized {
    /// Whole-buffer complex FFT of a mono buffer.
    ///
    /// Returns all `num_samples` bins of the unnormalized forward transform.
    fn fft(&self) -> SeparationResult<Vec<Complex<F>>>;

    /// Inverse of [`SpectralTransforms::fft`]: reconstructs a mono buffer
    /// from a full complex spectrum, taking the real part.
    fn ifft(spectrum: &[Complex<F>], sample_rate: u32) -> SeparationResult<Self>;

    /// Centered short-time Fourier transform of a mono buffer.
    ///
    /// The signal is reflection-padded by half a window on both sides, so
    /// the inverse can reconstruct every input sample. The result has shape
    /// `(window_size, num_frames)`: full complex spectra, one column per
    /// frame.
    fn stft(&self, params: &StftParams) -> SeparationResult<Array2<Complex<F>>>;

    /// Inverse STFT via weighted overlap-add, trimmed or zero-padded to
    /// exactly `length` samples.
    ///
    /// Overlap-added frames are normalized by the accumulated squared
    /// window, so `istft(stft(x), len(x))` reconstructs `x` up to float
    /// rounding for any `x` at least one window long.
    fn istft(
        spectrogram: &Array2<Complex<F>>,
        params: &StftParams,
        length: usize,
        sample_rate: u32,
    ) -> SeparationResult<Self>;
}

/// Channel layout operations.
pub trait ChannelOps<F: RealFloat>: Sized {
    /// Splits a stereo buffer into `mid = (L + R) / 2` and
    /// `side = (L - R) / 2`, in that order.
    ///
    /// The strategies use the side signal as their vocal-leaning estimate
    /// and the mid signal as the instrumental-leaning one. Mono input is an
    /// [`crate::SeparationError::UnsupportedFormat`] error.
    fn mid_side(&self) -> SeparationResult<(Self, Self)>;

    /// Recombines mid/side buffers into stereo: `L = mid + side`,
    /// `R = mid - side`.
    fn from_mid_side(mid: &Self, side: &Self) -> SeparationResult<Self>;

    /// Downmixes to mono by averaging channels; mono buffers pass through.
    fn to_mono(&self) -> SeparationResult<Self>;
}

/// Median-filter harmonic/percussive separation.
pub trait HarmonicPercussive<F: RealFloat>: Sized {
    /// Splits a mono buffer into `(harmonic, percussive)` components.
    ///
    /// Median filtering the magnitude spectrogram along time favors
    /// sustained tones; along frequency it favors broadband transients. The
    /// two filtered magnitudes become complementary soft masks (summing to
    /// one per bin) applied to the complex spectrogram, so phase is
    /// untouched. Both outputs are exactly as long as the input.
    fn hpss(
        &self,
        params: &HpssParams<F>,
        stft_params: &StftParams,
    ) -> SeparationResult<(Self, Self)>;
}

/// Broadband noise reduction.
pub trait NoiseReduction<F: RealFloat>: Sized {
    /// Whole-buffer spectral subtraction.
    ///
    /// Estimates the noise magnitude from the first and last 10% of spectrum
    /// bins, subtracts `noise_factor` times that estimate from every bin's
    /// magnitude, floors the result at 10% of the original magnitude, and
    /// reconstructs with the original phase. Stereo buffers are processed
    /// per channel.
    fn spectral_subtract(&self, noise_factor: F) -> SeparationResult<Self>;
}

/// Zero-phase IIR filtering.
pub trait ZeroPhaseFiltering<F: RealFloat>: Sized {
    /// 4th-order Butterworth band-pass run forward and backward, so the
    /// passband keeps its phase while out-of-band content is attenuated
    /// twice over.
    fn bandpass_zero_phase(&self, band: &BandRange<F>) -> SeparationResult<Self>;
}

/// Amplitude-domain dynamics.
pub trait Dynamics<F: RealFloat>: Sized {
    /// Peak-relative dynamic range compression.
    ///
    /// The buffer is normalized to peak 1.0; samples above the threshold are
    /// mapped to `sign(x) * (threshold + (|x| - threshold) / ratio)`; the
    /// original peak scale is then restored. Samples at or below the
    /// threshold pass through.
    fn compress(&self, params: &CompressorParams<F>) -> SeparationResult<Self>;

    /// Hard noise gate: zeroes every sample whose magnitude falls below
    /// `threshold` times the buffer peak. Samples at or above the effective
    /// threshold survive untouched.
    fn noise_gate(&self, threshold: F) -> SeparationResult<Self>;

    /// First-order pre-emphasis `y[n] = x[n] - coef * x[n-1]`, brightening
    /// high frequencies. The first sample uses itself as predecessor.
    fn preemphasis(&self, coef: F) -> SeparationResult<Self>;
}
