//! Harmonic/percussive source separation on magnitude spectrograms.
//!
//! Harmonic content shows up as horizontal ridges in a spectrogram (stable
//! pitch over time) and percussive content as vertical ones (broadband at
//! one instant). Median-filtering each frequency row along time enhances
//! the former, and each time frame along frequency enhances the latter.
//! The enhanced spectrograms are turned into soft masks that always sum to
//! one per bin, so the two separated components sum back to the input.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, Zip};
use num_complex::Complex;

use crate::buffer::SampleBuffer;
use crate::config::{HpssParams, StftParams};
use crate::dsp::traits::{HarmonicPercussive, SpectralTransforms};
use crate::{RealFloat, SeparationResult, to_precision};

/// Folds an out-of-range index back into `[0, len)` by reflection at the
/// boundaries, mirroring `[.. x2 x1 | x0 x1 x2 .. | ..]` padding.
fn reflect_index(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as usize;
        }
    }
}

fn median_filter_1d<F: RealFloat>(values: ArrayView1<'_, F>, kernel: usize) -> Array1<F> {
    let len = values.len();
    if kernel <= 1 || len == 0 {
        return values.to_owned();
    }
    let half = to_precision::<F, _>(0.5);
    let mut window = vec![F::zero(); kernel];
    Array1::from_shape_fn(len, |i| {
        let lo = i as isize - (kernel / 2) as isize;
        for (j, slot) in window.iter_mut().enumerate() {
            *slot = values[reflect_index(lo + j as isize, len)];
        }
        window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        if kernel % 2 == 1 {
            window[kernel / 2]
        } else {
            (window[kernel / 2 - 1] + window[kernel / 2]) * half
        }
    })
}

/// Builds the harmonic and percussive soft masks for a magnitude
/// spectrogram laid out as `(frequency_bins, time_frames)`.
fn separation_masks<F: RealFloat>(
    magnitude: &Array2<F>,
    params: &HpssParams<F>,
) -> (Array2<F>, Array2<F>) {
    let (bins, frames) = magnitude.dim();

    let mut harmonic = Array2::zeros((bins, frames));
    for (bin, row) in magnitude.rows().into_iter().enumerate() {
        harmonic
            .row_mut(bin)
            .assign(&median_filter_1d(row, params.harmonic_kernel));
    }
    let mut percussive = Array2::zeros((bins, frames));
    for (frame, column) in magnitude.columns().into_iter().enumerate() {
        percussive
            .column_mut(frame)
            .assign(&median_filter_1d(column, params.percussive_kernel));
    }

    let half = to_precision::<F, _>(0.5);
    let mut mask_harmonic = Array2::zeros((bins, frames));
    let mut mask_percussive = Array2::zeros((bins, frames));
    Zip::from(&mut mask_harmonic)
        .and(&mut mask_percussive)
        .and(&harmonic)
        .and(&percussive)
        .for_each(|mh, mp, h, p| {
            let h_power = h.powf(params.mask_power);
            let p_power = p.powf(params.mask_power);
            let total = h_power + p_power;
            if total > F::zero() {
                *mh = h_power / total;
                *mp = p_power / total;
            } else {
                *mh = half;
                *mp = half;
            }
        });
    (mask_harmonic, mask_percussive)
}

fn apply_mask<F: RealFloat>(
    spectrogram: &Array2<Complex<F>>,
    mask: &Array2<F>,
) -> Array2<Complex<F>> {
    Zip::from(spectrogram)
        .and(mask)
        .map_collect(|value, gain| value.scale(*gain))
}

impl<F: RealFloat> HarmonicPercussive<F> for SampleBuffer<F> {
    fn hpss(
        &self,
        params: &HpssParams<F>,
        stft_params: &StftParams,
    ) -> SeparationResult<(Self, Self)> {
        params.validate()?;
        let spectrogram = self.stft(stft_params)?;
        let magnitude = spectrogram.mapv(|c| c.norm());
        let (mask_harmonic, mask_percussive) = separation_masks(&magnitude, params);

        let length = self.num_samples();
        let rate = self.sample_rate();
        let harmonic = Self::istft(
            &apply_mask(&spectrogram, &mask_harmonic),
            stft_params,
            length,
            rate,
        )?;
        let percussive = Self::istft(
            &apply_mask(&spectrogram, &mask_percussive),
            stft_params,
            length,
            rate,
        )?;
        Ok((harmonic, percussive))
    }
}
