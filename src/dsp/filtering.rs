//! Zero-phase Butterworth band-pass filtering.
//!
//! The filter is designed in the analog domain (prewarped band edges,
//! Butterworth prototype poles, low-pass to band-pass transform) and
//! mapped to cascaded biquad sections with the bilinear transform. Each
//! channel is filtered forward and then backward over an odd-symmetric
//! edge extension, which cancels the phase response and squares the
//! magnitude response.
//!
//! Design and filtering both run in `f64` regardless of the sample type:
//! the eighth-order cascade puts poles close to the unit circle at low
//! band edges, where single-precision coefficients can lose stability.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;

use crate::buffer::{BufferData, SampleBuffer};
use crate::config::BandRange;
use crate::dsp::traits::ZeroPhaseFiltering;
use crate::{LEFT, RIGHT, RealFloat, SeparationResult, to_precision};

/// Butterworth prototype order. The band transform doubles it, so the
/// cascade is eighth order overall.
const FILTER_ORDER: usize = 4;

/// One second-order section with a normalized denominator.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Advances one sample through the transposed direct form II state.
    fn process(&self, x: f64, state: &mut (f64, f64)) -> f64 {
        let y = self.b0 * x + state.0;
        state.0 = self.b1 * x - self.a1 * y + state.1;
        state.1 = self.b2 * x - self.a2 * y;
        y
    }

    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// State matching the steady-state response to a constant input `x0`,
    /// so a filter pass starts transient-free.
    fn steady_state(&self, x0: f64) -> (f64, f64) {
        let dc = self.dc_gain();
        ((dc - self.b0) * x0, (self.b2 - self.a2 * dc) * x0)
    }
}

fn design_butterworth_bandpass(
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
    order: usize,
) -> Vec<Biquad> {
    debug_assert!(order >= 2 && order % 2 == 0, "even prototype orders only");
    let c = 2.0 * sample_rate;
    let warped_low = c * (PI * low_hz / sample_rate).tan();
    let warped_high = c * (PI * high_hz / sample_rate).tan();
    let center = (warped_low * warped_high).sqrt();
    let bandwidth = warped_high - warped_low;

    let mut sections = Vec::with_capacity(order);
    for k in 0..order / 2 {
        // Upper-half-plane prototype pole; its conjugate is implied by the
        // real biquad coefficients.
        let angle = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        let prototype = Complex64::new(angle.cos(), angle.sin());
        // Low-pass to band-pass: each prototype pole becomes the two roots
        // of s^2 - bandwidth*p*s + center^2 = 0.
        let bp = prototype * bandwidth;
        let discriminant = (bp * bp - Complex64::new(4.0 * center * center, 0.0)).sqrt();
        for sign in [1.0, -1.0] {
            let pole_s = (bp + discriminant * sign) / 2.0;
            let pole_z = (Complex64::new(c, 0.0) + pole_s) / (Complex64::new(c, 0.0) - pole_s);
            sections.push(Biquad {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1: -2.0 * pole_z.re,
                a2: pole_z.norm_sqr(),
            });
        }
    }

    // Normalize to unit gain at the band's geometric center, spreading the
    // correction evenly across sections.
    let omega = 2.0 * (center / c).atan();
    let zinv = Complex64::from_polar(1.0, -omega);
    let zinv2 = zinv * zinv;
    let mut response = Complex64::new(1.0, 0.0);
    for section in &sections {
        let numerator = Complex64::new(1.0, 0.0) - zinv2;
        let denominator = Complex64::new(1.0, 0.0) + zinv * section.a1 + zinv2 * section.a2;
        response *= numerator / denominator;
    }
    let gain = response.norm().recip().powf(1.0 / sections.len() as f64);
    for section in &mut sections {
        section.b0 = gain;
        section.b2 = -gain;
    }
    sections
}

fn filter_pass(sections: &[Biquad], input: &[f64]) -> Vec<f64> {
    let mut states = Vec::with_capacity(sections.len());
    let mut level = input.first().copied().unwrap_or(0.0);
    for section in sections {
        states.push(section.steady_state(level));
        level *= section.dc_gain();
    }
    let mut output = Vec::with_capacity(input.len());
    for &x in input {
        let mut sample = x;
        for (section, state) in sections.iter().zip(states.iter_mut()) {
            sample = section.process(sample, state);
        }
        output.push(sample);
    }
    output
}

/// Forward-backward filtering over an odd extension of the signal, as in
/// `filtfilt`: the result has zero phase and the squared magnitude
/// response of the cascade.
fn filtfilt(sections: &[Biquad], input: &[f64]) -> Vec<f64> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let pad = (3 * (2 * sections.len() + 1)).min(n - 1);
    let mut extended = Vec::with_capacity(n + 2 * pad);
    for i in 0..pad {
        extended.push(2.0 * input[0] - input[pad - i]);
    }
    extended.extend_from_slice(input);
    for i in 0..pad {
        extended.push(2.0 * input[n - 1] - input[n - 2 - i]);
    }

    let mut forward = filter_pass(sections, &extended);
    forward.reverse();
    let mut backward = filter_pass(sections, &forward);
    backward.reverse();
    backward[pad..pad + n].to_vec()
}

fn filter_channel<F: RealFloat>(samples: ArrayView1<'_, F>, sections: &[Biquad]) -> Array1<F> {
    let input: Vec<f64> = samples.iter().map(|x| to_precision::<f64, _>(*x)).collect();
    filtfilt(sections, &input)
        .into_iter()
        .map(|x| to_precision::<F, _>(x))
        .collect()
}

impl<F: RealFloat> ZeroPhaseFiltering<F> for SampleBuffer<F> {
    fn bandpass_zero_phase(&self, band: &BandRange<F>) -> SeparationResult<Self> {
        band.validate("band-pass", self.nyquist(), true)?;
        let sections = design_butterworth_bandpass(
            to_precision::<f64, _>(band.low_hz),
            to_precision::<f64, _>(band.high_hz),
            f64::from(self.sample_rate()),
            FILTER_ORDER,
        );
        match self.data() {
            BufferData::Mono(samples) => {
                Self::new_mono(filter_channel(samples.view(), &sections), self.sample_rate())
            }
            BufferData::Stereo(samples) => {
                let left = filter_channel(samples.row(LEFT), &sections);
                let right = filter_channel(samples.row(RIGHT), &sections);
                let mut channels = Array2::zeros((2, left.len()));
                channels.row_mut(LEFT).assign(&left);
                channels.row_mut(RIGHT).assign(&right);
                Self::new_stereo(channels, self.sample_rate())
            }
        }
    }
}
