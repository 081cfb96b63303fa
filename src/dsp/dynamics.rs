//! Peak-relative dynamics: compression, noise gating, pre-emphasis.

use ndarray::ArrayViewMut1;

use crate::buffer::{BufferData, SampleBuffer};
use crate::config::CompressorParams;
use crate::dsp::traits::Dynamics;
use crate::{RealFloat, SeparationError, SeparationResult};

fn preemphasize<F: RealFloat>(mut samples: ArrayViewMut1<'_, F>, coef: F) {
    if samples.is_empty() {
        return;
    }
    for i in (1..samples.len()).rev() {
        samples[i] = samples[i] - coef * samples[i - 1];
    }
    samples[0] = (F::one() - coef) * samples[0];
}

impl<F: RealFloat> Dynamics<F> for SampleBuffer<F> {
    fn compress(&self, params: &CompressorParams<F>) -> SeparationResult<Self> {
        params.validate()?;
        let peak = self.peak();
        if peak <= F::zero() {
            return Ok(self.clone());
        }
        let threshold = params.threshold;
        let ratio = params.ratio;
        // Work on the peak-normalized signal, then scale back by the
        // original peak. Samples above the threshold keep only 1/ratio of
        // their excess, so each application shrinks the peak toward the
        // threshold level.
        let shape = |x: F| {
            let normalized = x / peak;
            let magnitude = normalized.abs();
            let shaped = if magnitude > threshold {
                normalized.signum() * (threshold + (magnitude - threshold) / ratio)
            } else {
                normalized
            };
            shaped * peak
        };
        match self.data() {
            BufferData::Mono(samples) => Self::new_mono(samples.mapv(shape), self.sample_rate()),
            BufferData::Stereo(samples) => {
                Self::new_stereo(samples.mapv(shape), self.sample_rate())
            }
        }
    }

    fn noise_gate(&self, threshold: F) -> SeparationResult<Self> {
        if !threshold.is_finite() || threshold < F::zero() {
            return Err(SeparationError::InvalidInput(
                "gate threshold must be finite and non-negative".to_string(),
            ));
        }
        // The cutoff tracks the buffer's own peak, so quiet recordings are
        // not wiped out by an absolute level. Samples exactly at the cutoff
        // survive.
        let cutoff = threshold * self.peak();
        let gate = |x: F| if x.abs() < cutoff { F::zero() } else { x };
        match self.data() {
            BufferData::Mono(samples) => Self::new_mono(samples.mapv(gate), self.sample_rate()),
            BufferData::Stereo(samples) => {
                Self::new_stereo(samples.mapv(gate), self.sample_rate())
            }
        }
    }

    fn preemphasis(&self, coef: F) -> SeparationResult<Self> {
        if !coef.is_finite() || coef < F::zero() || coef > F::one() {
            return Err(SeparationError::InvalidInput(
                "pre-emphasis coefficient must lie in [0, 1]".to_string(),
            ));
        }
        match self.data() {
            BufferData::Mono(samples) => {
                let mut out = samples.clone();
                preemphasize(out.view_mut(), coef);
                Self::new_mono(out, self.sample_rate())
            }
            BufferData::Stereo(samples) => {
                let mut out = samples.clone();
                for row in out.rows_mut() {
                    preemphasize(row, coef);
                }
                Self::new_stereo(out, self.sample_rate())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::generation::sine_wave;
    use ndarray::{Array1, array};

    fn rms(samples: &Array1<f64>) -> f64 {
        (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_gate_keeps_samples_at_the_cutoff() {
        let buffer = SampleBuffer::new_mono(
            array![1.0, 0.5, 0.009, -0.3, 0.0099, 0.01],
            44100,
        )
        .unwrap();
        let gated = buffer.noise_gate(0.01).unwrap();
        assert_eq!(
            gated.as_mono().unwrap(),
            &array![1.0, 0.5, 0.0, -0.3, 0.0, 0.01]
        );
    }

    #[test]
    fn test_gate_cutoff_tracks_peak() {
        // Same signal at half level gates the same samples.
        let buffer = SampleBuffer::new_mono(
            array![0.5, 0.25, 0.0045, -0.15, 0.00495, 0.005],
            44100,
        )
        .unwrap();
        let gated = buffer.noise_gate(0.01).unwrap();
        assert_eq!(
            gated.as_mono().unwrap(),
            &array![0.5, 0.25, 0.0, -0.15, 0.0, 0.005]
        );
    }

    #[test]
    fn test_gate_zero_threshold_is_identity() {
        let buffer = SampleBuffer::new_mono(array![0.4, -0.001, 0.0], 44100).unwrap();
        let gated = buffer.noise_gate(0.0).unwrap();
        assert_eq!(gated.as_mono().unwrap(), buffer.as_mono().unwrap());
    }

    #[test]
    fn test_gate_uses_global_peak_on_stereo() {
        let buffer =
            SampleBuffer::new_stereo(array![[1.0, 0.004], [0.5, 0.2]], 44100).unwrap();
        let gated = buffer.noise_gate(0.01).unwrap();
        match gated.data() {
            BufferData::Stereo(samples) => {
                assert_eq!(samples, &array![[1.0, 0.0], [0.5, 0.2]]);
            }
            BufferData::Mono(_) => panic!("expected stereo output"),
        }
    }

    #[test]
    fn test_compression_shrinks_peak_toward_threshold() {
        let params = CompressorParams::new(0.3f64, 4.0);
        let buffer = SampleBuffer::new_mono(array![0.8, 0.1, -0.4], 44100).unwrap();

        let once = buffer.compress(&params).unwrap();
        // Peak sample normalizes to 1.0, shapes to 0.3 + 0.7/4 = 0.475.
        assert!((once.peak() - 0.38).abs() < 1e-12);
        let samples = once.as_mono().unwrap();
        assert!((samples[1] - 0.1).abs() < 1e-12);
        assert!((samples[2] + 0.28).abs() < 1e-12);

        let twice = once.compress(&params).unwrap();
        assert!((twice.peak() - 0.1805).abs() < 1e-12);
    }

    #[test]
    fn test_compression_ratio_one_is_identity() {
        let params = CompressorParams::new(0.3f64, 1.0);
        let buffer = SampleBuffer::new_mono(array![0.8, -0.55, 0.2, 0.01], 44100).unwrap();
        let out = buffer.compress(&params).unwrap();
        for (a, b) in buffer
            .as_mono()
            .unwrap()
            .iter()
            .zip(out.as_mono().unwrap().iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_compression_leaves_silence_alone() {
        let params = CompressorParams::new(0.3, 4.0);
        let buffer = SampleBuffer::new_mono(Array1::zeros(16), 44100).unwrap();
        let out = buffer.compress(&params).unwrap();
        assert!(out.as_mono().unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_compression_rejects_bad_params() {
        let buffer = SampleBuffer::new_mono(array![0.5], 44100).unwrap();
        assert!(matches!(
            buffer.compress(&CompressorParams::new(0.0, 4.0)),
            Err(SeparationError::Configuration(_))
        ));
        assert!(buffer.compress(&CompressorParams::new(1.0, 4.0)).is_err());
        assert!(buffer.compress(&CompressorParams::new(0.3, 0.5)).is_err());
    }

    #[test]
    fn test_preemphasis_matches_manual_recurrence() {
        let buffer = SampleBuffer::new_mono(array![1.0, 0.5, 0.25, -0.5], 44100).unwrap();
        let out = buffer.preemphasis(0.5).unwrap();
        assert_eq!(out.as_mono().unwrap(), &array![0.5, 0.0, 0.0, -0.625]);
    }

    #[test]
    fn test_preemphasis_zero_coef_is_identity() {
        let buffer = SampleBuffer::new_mono(array![0.3, -0.2, 0.9], 44100).unwrap();
        let out = buffer.preemphasis(0.0).unwrap();
        assert_eq!(out.as_mono().unwrap(), buffer.as_mono().unwrap());
    }

    #[test]
    fn test_preemphasis_attenuates_lows_boosts_highs() {
        let low = sine_wave::<f64>(50.0, 4096, 8000, 0.5).unwrap();
        let out = low.preemphasis(0.97).unwrap();
        assert!(rms(out.as_mono().unwrap()) < 0.1 * rms(low.as_mono().unwrap()));

        let high = sine_wave::<f64>(3900.0, 4096, 8000, 0.5).unwrap();
        let out = high.preemphasis(0.97).unwrap();
        assert!(rms(out.as_mono().unwrap()) > 1.5 * rms(high.as_mono().unwrap()));
    }

    #[test]
    fn test_preemphasis_processes_rows_independently() {
        let buffer =
            SampleBuffer::new_stereo(array![[1.0, 0.5], [0.25, 0.25]], 44100).unwrap();
        let out = buffer.preemphasis(1.0).unwrap();
        match out.data() {
            BufferData::Stereo(samples) => {
                assert_eq!(samples, &array![[0.0, -0.5], [0.0, 0.0]]);
            }
            BufferData::Mono(_) => panic!("expected stereo output"),
        }
    }

    #[test]
    fn test_preemphasis_rejects_out_of_range_coef() {
        let buffer = SampleBuffer::new_mono(array![0.5], 44100).unwrap();
        assert!(buffer.preemphasis(-0.1).is_err());
        assert!(buffer.preemphasis(1.5).is_err());
        assert!(buffer.preemphasis(f64::NAN).is_err());
    }
}
