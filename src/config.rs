//! Separation configuration: strategies, tunable parameters, presets, and
//! validation.
//!
//! Every empirical constant of the pipeline lives here as a default rather
//! than a magic number in the processing code, so callers can retune the
//! separation without forking the DSP. [`SeparationConfig::validate`] runs
//! before any processing starts; a rejected config never produces output.

use crate::{RealFloat, SeparationError, SeparationResult, to_precision};

/// Default ceiling on any single FFT or spectrogram allocation, in elements.
///
/// `1 << 27` complex values is 2 GiB at `f64` precision, far beyond any sane
/// music buffer but small enough to fail before an allocation takes the
/// process down.
pub const DEFAULT_MAX_FFT_SIZE: usize = 1 << 27;

/// Which separation flow [`crate::separate`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Strategy {
    /// Plain mid/side decomposition: side = vocals, mid = instrumental.
    /// Stereo input only.
    Simple,
    /// Mid/side plus spectral subtraction, zero-phase band-pass, and
    /// compression on the vocal branch. Falls back to harmonic/percussive
    /// separation for mono input.
    #[default]
    Enhanced,
    /// Single STFT with complementary vocal-band gain masks, phase preserved.
    AdvancedSpectral,
    /// Mid/side estimates refined by harmonic/percussive separation and
    /// blended with the raw estimates.
    Hybrid,
}

/// Analysis window applied to each STFT frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum WindowType {
    /// No weighting; only useful for debugging.
    Rectangular,
    /// Raised cosine, zero at both ends. The default; overlap-adds cleanly
    /// at hop = window / 4.
    #[default]
    Hann,
    /// Raised cosine on a pedestal.
    Hamming,
    /// Three-term cosine window with lower sidelobes than Hann.
    Blackman,
}

/// Short-time Fourier transform parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct StftParams {
    /// Samples per analysis frame. Default 2048.
    pub window_size: usize,
    /// Samples between frame starts. Default `window_size / 4`.
    pub hop_size: usize,
    /// Analysis window shape.
    pub window: WindowType,
}

impl StftParams {
    /// Creates parameters with an explicit window and hop.
    pub const fn new(window_size: usize, hop_size: usize, window: WindowType) -> Self {
        Self {
            window_size,
            hop_size,
            window,
        }
    }

    /// The conventional quarter-window hop for `window_size`.
    pub const fn with_window_size(window_size: usize) -> Self {
        Self::new(window_size, window_size / 4, WindowType::Hann)
    }

    /// Number of centered analysis frames over `num_samples` samples.
    ///
    /// Centered framing reflection-pads by `window_size / 2` on both sides,
    /// so every input sample sits under at least one full window. A zero
    /// hop cannot frame anything and yields zero frames.
    pub const fn num_frames(&self, num_samples: usize) -> usize {
        if self.hop_size == 0 {
            return 0;
        }
        let padded = num_samples + 2 * (self.window_size / 2);
        if padded < self.window_size {
            return 0;
        }
        (padded - self.window_size) / self.hop_size + 1
    }

    /// Estimated spectrogram allocation in complex elements, overflow-checked.
    pub fn spectrogram_elements(&self, num_samples: usize) -> SeparationResult<usize> {
        if self.hop_size == 0 {
            return Err(SeparationError::Configuration(
                "stft hop_size must be greater than zero".to_string(),
            ));
        }
        let pad = 2 * (self.window_size / 2);
        let padded = num_samples.checked_add(pad).ok_or_else(|| {
            SeparationError::NumericOverflow(format!(
                "padded signal length overflows usize: {num_samples} + {pad}"
            ))
        })?;
        let frames = if padded < self.window_size {
            0
        } else {
            (padded - self.window_size) / self.hop_size + 1
        };
        self.window_size.checked_mul(frames).ok_or_else(|| {
            SeparationError::NumericOverflow(format!(
                "spectrogram size overflows usize: {} bins x {frames} frames",
                self.window_size
            ))
        })
    }

    pub(crate) fn validate(&self) -> SeparationResult<()> {
        if self.window_size == 0 {
            return Err(SeparationError::Configuration(
                "stft window_size must be greater than zero".to_string(),
            ));
        }
        if self.hop_size == 0 {
            return Err(SeparationError::Configuration(
                "stft hop_size must be greater than zero".to_string(),
            ));
        }
        if self.hop_size > self.window_size {
            return Err(SeparationError::Configuration(format!(
                "stft hop_size ({}) must not exceed window_size ({})",
                self.hop_size, self.window_size
            )));
        }
        Ok(())
    }
}

impl Default for StftParams {
    fn default() -> Self {
        Self::with_window_size(2048)
    }
}

/// An inclusive frequency band in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BandRange<F: RealFloat> {
    /// Lower band edge in Hz.
    pub low_hz: F,
    /// Upper band edge in Hz.
    pub high_hz: F,
}

impl<F: RealFloat> BandRange<F> {
    /// Creates a band from its edges.
    pub const fn new(low_hz: F, high_hz: F) -> Self {
        Self { low_hz, high_hz }
    }

    /// Whether `freq_hz` lies inside the band (edges included).
    pub fn contains(&self, freq_hz: F) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    pub(crate) fn validate(&self, name: &str, nyquist: F, strict: bool) -> SeparationResult<()> {
        let low_ok = if strict {
            self.low_hz > F::zero()
        } else {
            self.low_hz >= F::zero()
        };
        let high_ok = if strict {
            self.high_hz < nyquist
        } else {
            self.high_hz <= nyquist
        };
        if !(low_ok && high_ok && self.low_hz < self.high_hz) {
            return Err(SeparationError::Configuration(format!(
                "{name} band ({:?} Hz - {:?} Hz) must satisfy low < high within (0, Nyquist = {:?} Hz)",
                self.low_hz, self.high_hz, nyquist
            )));
        }
        Ok(())
    }
}

/// Peak-relative dynamic range compression parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct CompressorParams<F: RealFloat> {
    /// Knee position as a fraction of the buffer peak, in (0, 1).
    pub threshold: F,
    /// Compression ratio above the threshold, at least 1.
    pub ratio: F,
}

impl<F: RealFloat> CompressorParams<F> {
    /// Creates compressor parameters.
    pub const fn new(threshold: F, ratio: F) -> Self {
        Self { threshold, ratio }
    }

    pub(crate) fn validate(&self) -> SeparationResult<()> {
        if !(self.threshold > F::zero() && self.threshold < F::one()) {
            return Err(SeparationError::Configuration(format!(
                "compressor threshold ({:?}) must lie strictly inside (0, 1)",
                self.threshold
            )));
        }
        if !(self.ratio >= F::one()) {
            return Err(SeparationError::Configuration(format!(
                "compressor ratio ({:?}) must be at least 1",
                self.ratio
            )));
        }
        Ok(())
    }
}

/// Harmonic/percussive separation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HpssParams<F: RealFloat> {
    /// Median kernel length along time (enhances harmonic content).
    pub harmonic_kernel: usize,
    /// Median kernel length along frequency (enhances percussive content).
    pub percussive_kernel: usize,
    /// Exponent applied to the filtered magnitudes before the soft-mask
    /// ratio. 2.0 gives Wiener-style masks.
    pub mask_power: F,
}

impl<F: RealFloat> HpssParams<F> {
    /// Creates parameters with explicit kernel lengths and mask power.
    pub const fn new(harmonic_kernel: usize, percussive_kernel: usize, mask_power: F) -> Self {
        Self {
            harmonic_kernel,
            percussive_kernel,
            mask_power,
        }
    }

    pub(crate) fn validate(&self) -> SeparationResult<()> {
        if self.harmonic_kernel == 0 || self.percussive_kernel == 0 {
            return Err(SeparationError::Configuration(format!(
                "hpss median kernels must be at least 1, got {} / {}",
                self.harmonic_kernel, self.percussive_kernel
            )));
        }
        if !(self.mask_power > F::zero()) {
            return Err(SeparationError::Configuration(format!(
                "hpss mask power ({:?}) must be greater than zero",
                self.mask_power
            )));
        }
        Ok(())
    }
}

impl<F: RealFloat> Default for HpssParams<F> {
    fn default() -> Self {
        Self::new(31, 31, to_precision::<F, _>(2.0))
    }
}

/// Complete configuration for one separation run.
///
/// Defaults preserve the tuning the strategies were developed with; the
/// preset constructors differ only where a strategy wants different
/// post-processing (the gate, most notably).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SeparationConfig<F: RealFloat> {
    /// Separation flow to run.
    pub strategy: Strategy,
    /// STFT framing shared by every spectral stage.
    pub stft: StftParams,
    /// Frequency band treated as vocal-dominant. Default 300–3000 Hz.
    pub vocal_band: BandRange<F>,
    /// Gain applied to the vocal mask inside `vocal_band`. Default 1.5.
    pub vocal_gain: F,
    /// Gain applied to the instrumental mask inside `vocal_band`. Default 0.3.
    pub instrumental_gain: F,
    /// Spectral-subtraction strength on the vocal branch. Default 0.3.
    pub noise_factor: F,
    /// Spectral-subtraction strength on the instrumental branch. Default 0.2.
    pub instrumental_noise_factor: F,
    /// Zero-phase band-pass range for the Enhanced vocal branch.
    /// Default 80–8000 Hz.
    pub bandpass: BandRange<F>,
    /// Vocal-branch compressor. Default threshold 0.3, ratio 4.
    pub compressor: CompressorParams<F>,
    /// Noise-gate threshold as a fraction of peak; `None` disables the gate.
    pub gate_threshold: Option<F>,
    /// Median-filter parameters for harmonic/percussive separation.
    pub hpss: HpssParams<F>,
    /// Hybrid blend between the separated and raw mid/side estimates, in
    /// [0, 1]. Default 0.7 (0.7 separated + 0.3 raw).
    pub hpss_blend: F,
    /// Pre-emphasis coefficient for the Hybrid vocal branch. Default 0.97.
    pub preemphasis: F,
    /// Ceiling on any single FFT/spectrogram allocation, in elements.
    pub max_fft_size: usize,
}

impl<F: RealFloat> SeparationConfig<F> {
    fn base(strategy: Strategy) -> Self {
        Self {
            strategy,
            stft: StftParams::default(),
            vocal_band: BandRange::new(to_precision::<F, _>(300.0), to_precision::<F, _>(3000.0)),
            vocal_gain: to_precision::<F, _>(1.5),
            instrumental_gain: to_precision::<F, _>(0.3),
            noise_factor: to_precision::<F, _>(0.3),
            instrumental_noise_factor: to_precision::<F, _>(0.2),
            bandpass: BandRange::new(to_precision::<F, _>(80.0), to_precision::<F, _>(8000.0)),
            compressor: CompressorParams::new(to_precision::<F, _>(0.3), to_precision::<F, _>(4.0)),
            gate_threshold: None,
            hpss: HpssParams::default(),
            hpss_blend: to_precision::<F, _>(0.7),
            preemphasis: to_precision::<F, _>(0.97),
            max_fft_size: DEFAULT_MAX_FFT_SIZE,
        }
    }

    /// Preset for [`Strategy::Simple`].
    pub fn simple() -> Self {
        Self::base(Strategy::Simple)
    }

    /// Preset for [`Strategy::Enhanced`].
    pub fn enhanced() -> Self {
        Self::base(Strategy::Enhanced)
    }

    /// Preset for [`Strategy::AdvancedSpectral`].
    pub fn advanced_spectral() -> Self {
        Self::base(Strategy::AdvancedSpectral)
    }

    /// Preset for [`Strategy::Hybrid`]: the only preset that enables the
    /// noise gate, at 1% of peak.
    pub fn hybrid() -> Self {
        Self {
            gate_threshold: Some(to_precision::<F, _>(0.01)),
            ..Self::base(Strategy::Hybrid)
        }
    }

    /// Checks every field against `sample_rate` before processing.
    ///
    /// Returns [`SeparationError::Configuration`] describing the first
    /// offending field. Band edges are compared against Nyquist only for
    /// the strategy that filters with them, so a strategy doing no
    /// frequency-domain work is not rejected over an unused band. A config
    /// that passes here cannot fail validation again mid-pipeline.
    pub fn validate(&self, sample_rate: u32) -> SeparationResult<()> {
        if sample_rate == 0 {
            return Err(SeparationError::Configuration(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        let nyquist = to_precision::<F, _>(sample_rate) / to_precision::<F, _>(2.0);

        self.stft.validate()?;
        if self.strategy == Strategy::AdvancedSpectral {
            self.vocal_band.validate("vocal", nyquist, false)?;
        }
        if self.strategy == Strategy::Enhanced {
            self.bandpass.validate("band-pass", nyquist, true)?;
        }
        self.compressor.validate()?;
        self.hpss.validate()?;

        let unit = |value: F| value >= F::zero() && value <= F::one();
        if !(self.vocal_gain >= F::zero() && self.vocal_gain.is_finite()) {
            return Err(SeparationError::Configuration(format!(
                "vocal mask gain ({:?}) must be finite and non-negative",
                self.vocal_gain
            )));
        }
        if !(self.instrumental_gain >= F::zero() && self.instrumental_gain.is_finite()) {
            return Err(SeparationError::Configuration(format!(
                "instrumental mask gain ({:?}) must be finite and non-negative",
                self.instrumental_gain
            )));
        }
        if !unit(self.noise_factor) {
            return Err(SeparationError::Configuration(format!(
                "noise factor ({:?}) must lie in [0, 1]",
                self.noise_factor
            )));
        }
        if !unit(self.instrumental_noise_factor) {
            return Err(SeparationError::Configuration(format!(
                "instrumental noise factor ({:?}) must lie in [0, 1]",
                self.instrumental_noise_factor
            )));
        }
        if let Some(threshold) = self.gate_threshold {
            if !unit(threshold) {
                return Err(SeparationError::Configuration(format!(
                    "gate threshold ({threshold:?}) must lie in [0, 1]"
                )));
            }
        }
        if !unit(self.hpss_blend) {
            return Err(SeparationError::Configuration(format!(
                "hpss blend ({:?}) must lie in [0, 1]",
                self.hpss_blend
            )));
        }
        if !(self.preemphasis >= F::zero() && self.preemphasis < F::one()) {
            return Err(SeparationError::Configuration(format!(
                "pre-emphasis coefficient ({:?}) must lie in [0, 1)",
                self.preemphasis
            )));
        }
        if self.max_fft_size == 0 {
            return Err(SeparationError::Configuration(
                "max_fft_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl<F: RealFloat> Default for SeparationConfig<F> {
    fn default() -> Self {
        Self::enhanced()
    }
}
