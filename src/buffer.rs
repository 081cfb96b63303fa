//! Core buffer representation for decoded PCM audio.
//!
//! [`SampleBuffer`] pairs float samples with their sample rate. Storage is
//! ndarray-backed: a 1-D array for mono, a channel-major 2-D array for stereo.
//! The separation pipeline accepts nothing else; decoding, resampling, and
//! channel layouts beyond two channels are caller concerns.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::{LEFT, RIGHT, RealFloat, SeparationError, SeparationResult, to_precision};

/// Sample storage for one or two channels.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData<F: RealFloat> {
    /// Single-channel samples.
    Mono(Array1<F>),
    /// Two-channel samples with shape `(2, num_samples)`; row 0 is the left
    /// channel, row 1 the right.
    Stereo(Array2<F>),
}

/// A decoded PCM buffer: float samples plus the rate they were sampled at.
///
/// Buffers are validated at construction: they are never empty, the sample
/// rate is never zero, and stereo data always has exactly two rows. Samples
/// are nominally in `[-1.0, 1.0]`; [`SampleBuffer::clip`] clamps back into
/// that range after processing stages that can overshoot.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer<F: RealFloat> {
    data: BufferData<F>,
    sample_rate: u32,
}

impl<F: RealFloat> SampleBuffer<F> {
    /// Creates a mono buffer from a 1-D sample array.
    pub fn new_mono(samples: Array1<F>, sample_rate: u32) -> SeparationResult<Self> {
        if samples.is_empty() {
            return Err(SeparationError::InvalidInput(
                "mono buffer must contain at least one sample".to_string(),
            ));
        }
        Self::validate_rate(sample_rate)?;
        Ok(Self {
            data: BufferData::Mono(samples),
            sample_rate,
        })
    }

    /// Creates a stereo buffer from a channel-major `(2, num_samples)` array.
    pub fn new_stereo(samples: Array2<F>, sample_rate: u32) -> SeparationResult<Self> {
        if samples.nrows() != 2 {
            return Err(SeparationError::InvalidInput(format!(
                "stereo buffer requires exactly 2 channel rows, got {}",
                samples.nrows()
            )));
        }
        if samples.ncols() == 0 {
            return Err(SeparationError::InvalidInput(
                "stereo buffer must contain at least one sample per channel".to_string(),
            ));
        }
        Self::validate_rate(sample_rate)?;
        Ok(Self {
            data: BufferData::Stereo(samples),
            sample_rate,
        })
    }

    /// Creates a buffer from interleaved samples as decoders produce them.
    ///
    /// `channels` must be 1 or 2 and must divide `samples.len()` evenly. For
    /// stereo the layout is `L R L R ...`.
    pub fn from_interleaved(
        samples: &[F],
        channels: usize,
        sample_rate: u32,
    ) -> SeparationResult<Self> {
        match channels {
            1 => Self::new_mono(Array1::from_vec(samples.to_vec()), sample_rate),
            2 => {
                if samples.is_empty() || samples.len() % 2 != 0 {
                    return Err(SeparationError::InvalidInput(format!(
                        "interleaved stereo length must be a non-zero multiple of 2, got {}",
                        samples.len()
                    )));
                }
                let frames = samples.len() / 2;
                let mut data = Array2::zeros((2, frames));
                for (frame, pair) in samples.chunks_exact(2).enumerate() {
                    data[[LEFT, frame]] = pair[0];
                    data[[RIGHT, frame]] = pair[1];
                }
                Self::new_stereo(data, sample_rate)
            }
            other => Err(SeparationError::InvalidInput(format!(
                "unsupported channel count {other}: only mono (1) and stereo (2) buffers exist"
            ))),
        }
    }

    fn validate_rate(sample_rate: u32) -> SeparationResult<()> {
        if sample_rate == 0 {
            return Err(SeparationError::InvalidInput(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Borrows the underlying sample storage.
    pub const fn data(&self) -> &BufferData<F> {
        &self.data
    }

    /// Consumes the buffer and returns its sample storage.
    pub fn into_data(self) -> BufferData<F> {
        self.data
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        match &self.data {
            BufferData::Mono(samples) => samples.len(),
            BufferData::Stereo(samples) => samples.ncols(),
        }
    }

    /// Number of channels (1 or 2).
    pub const fn channels(&self) -> usize {
        match &self.data {
            BufferData::Mono(_) => 1,
            BufferData::Stereo(_) => 2,
        }
    }

    /// Whether this buffer holds a single channel.
    pub const fn is_mono(&self) -> bool {
        matches!(self.data, BufferData::Mono(_))
    }

    /// Whether this buffer holds two channels.
    pub const fn is_stereo(&self) -> bool {
        matches!(self.data, BufferData::Stereo(_))
    }

    /// Duration of the buffer in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / f64::from(self.sample_rate)
    }

    /// Borrows the samples of a mono buffer, or `None` for stereo.
    pub fn as_mono(&self) -> Option<&Array1<F>> {
        match &self.data {
            BufferData::Mono(samples) => Some(samples),
            BufferData::Stereo(_) => None,
        }
    }

    /// A view of one channel's samples.
    ///
    /// Mono buffers only have channel 0; stereo buffers have [`LEFT`] and
    /// [`RIGHT`].
    pub fn channel(&self, index: usize) -> SeparationResult<ArrayView1<'_, F>> {
        match &self.data {
            BufferData::Mono(samples) if index == 0 => Ok(samples.view()),
            BufferData::Stereo(samples) if index < 2 => Ok(samples.index_axis(Axis(0), index)),
            _ => Err(SeparationError::InvalidInput(format!(
                "channel index {index} out of range for {}-channel buffer",
                self.channels()
            ))),
        }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> F {
        let fold = |acc: F, x: &F| acc.max(x.abs());
        match &self.data {
            BufferData::Mono(samples) => samples.iter().fold(F::zero(), fold),
            BufferData::Stereo(samples) => samples.iter().fold(F::zero(), fold),
        }
    }

    /// Multiplies every sample by `factor` in place.
    pub fn scale(&mut self, factor: F) {
        match &mut self.data {
            BufferData::Mono(samples) => samples.mapv_inplace(|x| x * factor),
            BufferData::Stereo(samples) => samples.mapv_inplace(|x| x * factor),
        }
    }

    /// Clamps every sample to `[min, max]` in place.
    pub fn clip(&mut self, min: F, max: F) -> SeparationResult<()> {
        if min >= max {
            return Err(SeparationError::InvalidInput(format!(
                "invalid clip range: min ({min:?}) >= max ({max:?})"
            )));
        }
        let clamp = |x: F| x.min(max).max(min);
        match &mut self.data {
            BufferData::Mono(samples) => samples.mapv_inplace(clamp),
            BufferData::Stereo(samples) => samples.mapv_inplace(clamp),
        }
        Ok(())
    }

    /// Scales the buffer so its peak is exactly 1.0.
    ///
    /// Silent buffers pass through unchanged; there is nothing meaningful to
    /// scale a peak of zero to.
    pub fn normalize_peak(&mut self) {
        let peak = self.peak();
        if peak > F::zero() {
            self.scale(F::one() / peak);
        }
    }

    /// Nyquist frequency for this buffer's sample rate.
    pub fn nyquist(&self) -> F {
        to_precision::<F, _>(self.sample_rate) / to_precision::<F, _>(2.0)
    }
}
