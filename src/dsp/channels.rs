//! Mid/side decomposition and channel downmixing.
//!
//! The mid channel `(L + R) / 2` holds content shared by both speakers;
//! the side channel `(L - R) / 2` holds what differs between them. The
//! separation strategies treat side as their vocal estimate: cancelling
//! the shared content strips the centered rhythm section, and what
//! survives correlates with the voice's stereo spread (doubling, reverb
//! tails). Decompose-then-recombine with `L = mid + side`,
//! `R = mid - side` is an exact inverse up to float rounding, and exact
//! for dyadic samples.

use ndarray::Array2;

use crate::buffer::{BufferData, SampleBuffer};
use crate::dsp::traits::ChannelOps;
use crate::{LEFT, RIGHT, RealFloat, SeparationError, SeparationResult, to_precision};

impl<F: RealFloat> ChannelOps<F> for SampleBuffer<F> {
    fn mid_side(&self) -> SeparationResult<(Self, Self)> {
        match self.data() {
            BufferData::Mono(_) => Err(SeparationError::UnsupportedFormat(
                "mid/side decomposition requires a stereo buffer".to_string(),
            )),
            BufferData::Stereo(samples) => {
                let half = to_precision::<F, _>(0.5);
                let left = samples.row(LEFT);
                let right = samples.row(RIGHT);
                let mid = (&left + &right) * half;
                let side = (&left - &right) * half;
                Ok((
                    Self::new_mono(mid, self.sample_rate())?,
                    Self::new_mono(side, self.sample_rate())?,
                ))
            }
        }
    }

    fn from_mid_side(mid: &Self, side: &Self) -> SeparationResult<Self> {
        let mid_samples = mid.as_mono().ok_or_else(|| {
            SeparationError::InvalidInput("mid channel must be a mono buffer".to_string())
        })?;
        let side_samples = side.as_mono().ok_or_else(|| {
            SeparationError::InvalidInput("side channel must be a mono buffer".to_string())
        })?;
        if mid_samples.len() != side_samples.len() {
            return Err(SeparationError::InvalidInput(format!(
                "mid and side lengths differ: {} vs {}",
                mid_samples.len(),
                side_samples.len()
            )));
        }
        if mid.sample_rate() != side.sample_rate() {
            return Err(SeparationError::InvalidInput(format!(
                "mid and side sample rates differ: {} vs {}",
                mid.sample_rate(),
                side.sample_rate()
            )));
        }
        let left = mid_samples + side_samples;
        let right = mid_samples - side_samples;
        let channels = Array2::from_shape_fn((2, left.len()), |(channel, i)| {
            if channel == LEFT { left[i] } else { right[i] }
        });
        Self::new_stereo(channels, mid.sample_rate())
    }

    fn to_mono(&self) -> SeparationResult<Self> {
        match self.data() {
            BufferData::Mono(samples) => Self::new_mono(samples.clone(), self.sample_rate()),
            BufferData::Stereo(samples) => {
                let half = to_precision::<F, _>(0.5);
                let mixed = (&samples.row(LEFT) + &samples.row(RIGHT)) * half;
                Self::new_mono(mixed, self.sample_rate())
            }
        }
    }
}
