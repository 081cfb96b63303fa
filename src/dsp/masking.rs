//! Frequency-band gain masks over full complex spectra.
//!
//! Masks are built per FFT bin against the aliased bin frequency (the
//! mirrored half above Nyquist maps back to its positive frequency), so a
//! mask applied to the spectrum of a real signal is conjugate-symmetric
//! and inversion yields a real signal again.

use ndarray::{Array1, Array2};
use num_complex::Complex;

use crate::config::BandRange;
use crate::util::math::fft_frequencies;
use crate::{RealFloat, SeparationError, SeparationResult};

/// Builds a per-bin gain mask that applies `gain` inside `band` and leaves
/// every other bin at unity.
pub fn band_gain_mask<F: RealFloat>(
    n_fft: usize,
    sample_rate: u32,
    band: &BandRange<F>,
    gain: F,
) -> Array1<F> {
    let frequencies = fft_frequencies::<F>(sample_rate, n_fft);
    let mut mask = Array1::from_elem(n_fft, F::one());
    for (bin, frequency) in frequencies.iter().enumerate() {
        if band.contains(*frequency) {
            mask[bin] = gain;
        }
    }
    mask
}

/// Scales every spectrogram row by its bin gain. The mask length must
/// match the spectrogram's frequency axis.
pub fn apply_band_mask<F: RealFloat>(
    spectrogram: &Array2<Complex<F>>,
    mask: &Array1<F>,
) -> SeparationResult<Array2<Complex<F>>> {
    if mask.len() != spectrogram.nrows() {
        return Err(SeparationError::InvalidInput(format!(
            "mask has {} bins but the spectrogram has {} frequency rows",
            mask.len(),
            spectrogram.nrows()
        )));
    }
    let mut masked = spectrogram.clone();
    for (bin, mut row) in masked.rows_mut().into_iter().enumerate() {
        let gain = mask[bin];
        row.mapv_inplace(|value| value.scale(gain));
    }
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_band_gain_mask_hits_aliased_bins() {
        // 8-bin spectrum at 8 kHz: bin frequencies 0, 1k, 2k, 3k, 4k, 3k, 2k, 1k.
        let band = BandRange::new(900.0, 3100.0);
        let mask = band_gain_mask::<f64>(8, 8000, &band, 0.3);
        assert_eq!(mask, array![1.0, 0.3, 0.3, 0.3, 1.0, 0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_band_gain_mask_is_conjugate_symmetric() {
        let band = BandRange::new(300.0, 3000.0);
        let mask = band_gain_mask::<f64>(256, 44100, &band, 1.5);
        for bin in 1..256 {
            assert_eq!(mask[bin], mask[256 - bin]);
        }
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let band = BandRange::new(1000.0, 3000.0);
        let mask = band_gain_mask::<f64>(8, 8000, &band, 2.0);
        assert_eq!(mask[1], 2.0);
        assert_eq!(mask[3], 2.0);
        assert_eq!(mask[0], 1.0);
        assert_eq!(mask[4], 1.0);
    }

    #[test]
    fn test_apply_band_mask_scales_rows() {
        let spectrogram = Array2::from_elem((4, 3), Complex::new(1.0f64, -1.0));
        let mask = array![2.0, 0.5, 1.0, 0.0];
        let masked = apply_band_mask(&spectrogram, &mask).unwrap();
        for frame in 0..3 {
            assert_eq!(masked[[0, frame]], Complex::new(2.0, -2.0));
            assert_eq!(masked[[1, frame]], Complex::new(0.5, -0.5));
            assert_eq!(masked[[2, frame]], Complex::new(1.0, -1.0));
            assert_eq!(masked[[3, frame]], Complex::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_apply_band_mask_rejects_length_mismatch() {
        let spectrogram = Array2::from_elem((4, 2), Complex::new(1.0f64, 0.0));
        let mask = array![1.0, 1.0, 1.0];
        assert!(matches!(
            apply_band_mask(&spectrogram, &mask),
            Err(SeparationError::InvalidInput(_))
        ));
    }
}
