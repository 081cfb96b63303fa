//! Frequency and amplitude conversion helpers.

use crate::{RealFloat, to_precision};

/// Center frequency in Hz of each bin of a full `n_fft`-point spectrum.
///
/// Bins above Nyquist report the frequency of their conjugate mirror (the
/// aliased magnitude `|f|`), so per-bin band decisions stay symmetric and a
/// masked spectrum of a real signal inverts back to a real signal.
pub fn fft_frequencies<F: RealFloat>(sample_rate: u32, n_fft: usize) -> Vec<F> {
    let sr = to_precision::<F, _>(sample_rate);
    let n = to_precision::<F, _>(n_fft.max(1));
    (0..n_fft)
        .map(|k| {
            let mirrored = k.min(n_fft - k);
            to_precision::<F, _>(mirrored) * sr / n
        })
        .collect()
}

/// Converts a linear amplitude to decibels, floored at -200 dB.
pub fn amplitude_to_db<F: RealFloat>(amplitude: F) -> F {
    let amin = to_precision::<F, _>(1e-10);
    to_precision::<F, _>(20.0) * amplitude.abs().max(amin).log10()
}

/// Converts decibels back to a linear amplitude.
pub fn db_to_amplitude<F: RealFloat>(db: F) -> F {
    to_precision::<F, _>(10.0).powf(db / to_precision::<F, _>(20.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_frequencies_mirror() {
        let freqs = fft_frequencies::<f64>(8000, 8);
        assert_eq!(freqs[0], 0.0);
        assert_eq!(freqs[1], 1000.0);
        assert_eq!(freqs[4], 4000.0); // Nyquist
        // Bins above Nyquist mirror their conjugates.
        assert_eq!(freqs[5], 3000.0);
        assert_eq!(freqs[7], 1000.0);
    }

    #[test]
    fn test_fft_frequencies_length() {
        let freqs = fft_frequencies::<f32>(44100, 2048);
        assert_eq!(freqs.len(), 2048);
        assert!(freqs.iter().all(|f| *f >= 0.0 && *f <= 22050.0));
    }

    #[test]
    fn test_amplitude_db_roundtrip() {
        for amp in [1.0f64, 0.5, 0.1, 0.001] {
            let db = amplitude_to_db(amp);
            assert!((db_to_amplitude(db) - amp).abs() < 1e-9);
        }
        // Half amplitude is about -6 dB.
        assert!((amplitude_to_db(0.5f64) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_amplitude_to_db_floor() {
        assert!((amplitude_to_db(0.0f64) + 200.0).abs() < 1e-9);
    }
}
