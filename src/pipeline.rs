//! Strategy dispatch and the separation pipeline.
//!
//! [`Separator::separate`] (or the free [`separate`] function) validates
//! the configuration against the buffer, runs the configured strategy, and
//! finishes both stems with clipping and the optional noise gate. Every
//! strategy produces two mono stems with the input's length and sample
//! rate.

use std::fmt;

use ndarray::Zip;
use tracing::debug;

use crate::buffer::{BufferData, SampleBuffer};
use crate::config::{SeparationConfig, Strategy};
use crate::dsp::masking::{apply_band_mask, band_gain_mask};
use crate::dsp::traits::{
    ChannelOps, Dynamics, HarmonicPercussive, NoiseReduction, SpectralTransforms,
    ZeroPhaseFiltering,
};
use crate::observer::{NullObserver, SeparationObserver, Stage, StageEvent};
use crate::util::math::amplitude_to_db;
use crate::{RealFloat, SeparationError, SeparationResult, to_precision};

/// The two mono stems a separation run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatedStems<F: RealFloat> {
    /// Vocal estimate.
    pub vocals: SampleBuffer<F>,
    /// Instrumental estimate.
    pub instrumental: SampleBuffer<F>,
}

/// Runs separations with a fixed configuration and an optional observer.
///
/// The separator is stateless between runs; the same instance can process
/// any number of buffers.
pub struct Separator<F: RealFloat> {
    config: SeparationConfig<F>,
    observer: Box<dyn SeparationObserver>,
}

impl<F: RealFloat> Separator<F> {
    /// Creates a separator that reports progress to no one.
    pub fn new(config: SeparationConfig<F>) -> Self {
        Self {
            config,
            observer: Box::new(NullObserver),
        }
    }

    /// Creates a separator that reports stages to `observer`.
    pub fn with_observer(
        config: SeparationConfig<F>,
        observer: Box<dyn SeparationObserver>,
    ) -> Self {
        Self { config, observer }
    }

    /// The configuration this separator runs with.
    pub const fn config(&self) -> &SeparationConfig<F> {
        &self.config
    }

    /// Separates `buffer` into vocal and instrumental stems.
    pub fn separate(&self, buffer: &SampleBuffer<F>) -> SeparationResult<SeparatedStems<F>> {
        run(buffer, &self.config, self.observer.as_ref())
    }
}

impl<F: RealFloat> fmt::Debug for Separator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Separator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Separates `buffer` with `config`, without progress reporting.
pub fn separate<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
) -> SeparationResult<SeparatedStems<F>> {
    run(buffer, config, &NullObserver)
}

struct StageTracker<'a> {
    observer: &'a dyn SeparationObserver,
    strategy: Strategy,
}

impl StageTracker<'_> {
    fn stage(&self, stage: Stage) {
        debug!(stage = %stage, strategy = ?self.strategy, "stage complete");
        self.observer.on_stage(&StageEvent {
            stage,
            strategy: self.strategy,
        });
    }
}

const fn stage_count(strategy: Strategy, stereo: bool) -> usize {
    match (strategy, stereo) {
        (Strategy::Simple, _) => 2,
        (Strategy::Enhanced, true) => 6,
        (Strategy::Enhanced, false) => 2,
        (Strategy::AdvancedSpectral | Strategy::Hybrid, true) => 4,
        (Strategy::AdvancedSpectral | Strategy::Hybrid, false) => 3,
    }
}

/// Rejects inputs whose spectral working set would exceed the configured
/// ceiling, before any allocation happens.
fn check_fft_ceiling<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
) -> SeparationResult<()> {
    let num_samples = buffer.num_samples();
    let needs_spectrogram = match config.strategy {
        Strategy::Simple => return Ok(()),
        // The stereo path only takes whole-buffer transforms.
        Strategy::Enhanced => buffer.is_mono(),
        Strategy::AdvancedSpectral | Strategy::Hybrid => true,
    };
    let required = if needs_spectrogram {
        config.stft.spectrogram_elements(num_samples)?
    } else {
        num_samples
    };
    if required > config.max_fft_size {
        return Err(SeparationError::NumericOverflow(format!(
            "separation needs {required} spectral elements, above the configured ceiling of {}",
            config.max_fft_size
        )));
    }
    Ok(())
}

fn peak_db<F: RealFloat>(buffer: &SampleBuffer<F>) -> f64 {
    to_precision::<f64, _>(amplitude_to_db(buffer.peak()))
}

/// Weighted sum of two equal-length mono buffers.
fn mix_mono<F: RealFloat>(
    a: &SampleBuffer<F>,
    weight_a: F,
    b: &SampleBuffer<F>,
    weight_b: F,
) -> SeparationResult<SampleBuffer<F>> {
    let first = a.as_mono().ok_or_else(|| {
        SeparationError::InvalidInput("mix inputs must be mono buffers".to_string())
    })?;
    let second = b.as_mono().ok_or_else(|| {
        SeparationError::InvalidInput("mix inputs must be mono buffers".to_string())
    })?;
    if first.len() != second.len() {
        return Err(SeparationError::InvalidInput(format!(
            "mix inputs differ in length: {} vs {}",
            first.len(),
            second.len()
        )));
    }
    let mixed = Zip::from(first)
        .and(second)
        .map_collect(|x, y| *x * weight_a + *y * weight_b);
    SampleBuffer::new_mono(mixed, a.sample_rate())
}

/// Clips a finished stem into [-1, 1] and applies the configured gate.
fn finalize<F: RealFloat>(
    stem: &mut SampleBuffer<F>,
    config: &SeparationConfig<F>,
) -> SeparationResult<()> {
    stem.clip(-F::one(), F::one())?;
    if let Some(threshold) = config.gate_threshold {
        *stem = stem.noise_gate(threshold)?;
    }
    Ok(())
}

fn run<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
    observer: &dyn SeparationObserver,
) -> SeparationResult<SeparatedStems<F>> {
    config.validate(buffer.sample_rate())?;
    check_fft_ceiling(buffer, config)?;
    if config.strategy == Strategy::Simple && buffer.is_mono() {
        return Err(SeparationError::UnsupportedFormat(
            "the simple strategy needs stereo input to split mid from side".to_string(),
        ));
    }

    observer.started(
        config.strategy,
        stage_count(config.strategy, buffer.is_stereo()),
    );
    debug!(
        strategy = ?config.strategy,
        samples = buffer.num_samples(),
        sample_rate = buffer.sample_rate(),
        channels = buffer.channels(),
        "separation started"
    );
    let tracker = StageTracker {
        observer,
        strategy: config.strategy,
    };

    let (mut vocals, mut instrumental) = match config.strategy {
        Strategy::Simple => simple_strategy(buffer, &tracker)?,
        Strategy::Enhanced => enhanced_strategy(buffer, config, &tracker)?,
        Strategy::AdvancedSpectral => advanced_spectral_strategy(buffer, config, &tracker)?,
        Strategy::Hybrid => hybrid_strategy(buffer, config, &tracker)?,
    };

    finalize(&mut vocals, config)?;
    finalize(&mut instrumental, config)?;
    tracker.stage(Stage::Finalize);

    debug_assert_eq!(vocals.num_samples(), buffer.num_samples());
    debug_assert_eq!(instrumental.num_samples(), buffer.num_samples());

    observer.finished(config.strategy);
    debug!(
        vocal_peak_db = peak_db(&vocals),
        instrumental_peak_db = peak_db(&instrumental),
        "separation finished"
    );
    Ok(SeparatedStems {
        vocals,
        instrumental,
    })
}

/// Side as vocals, mid as instrumental: cancelling the content both
/// channels share strips the centered rhythm section out of the side
/// signal, leaving the vocal-correlated stereo spread.
fn simple_strategy<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    tracker: &StageTracker<'_>,
) -> SeparationResult<(SampleBuffer<F>, SampleBuffer<F>)> {
    let (mid, side) = buffer.mid_side()?;
    tracker.stage(Stage::Decompose);
    Ok((side, mid))
}

fn enhanced_strategy<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
    tracker: &StageTracker<'_>,
) -> SeparationResult<(SampleBuffer<F>, SampleBuffer<F>)> {
    match buffer.data() {
        BufferData::Mono(_) => {
            // No stereo field to exploit; separate by onset structure
            // instead and treat the pitched component as the voice.
            let (harmonic, percussive) = buffer.hpss(&config.hpss, &config.stft)?;
            tracker.stage(Stage::Hpss);
            Ok((harmonic, percussive))
        }
        BufferData::Stereo(_) => {
            let (mid, side) = buffer.mid_side()?;
            tracker.stage(Stage::Decompose);
            debug!(
                mid_peak_db = peak_db(&mid),
                side_peak_db = peak_db(&side),
                "mid/side split"
            );

            let vocals = side.spectral_subtract(config.noise_factor)?;
            tracker.stage(Stage::NoiseReduction);
            let vocals = vocals.bandpass_zero_phase(&config.bandpass)?;
            tracker.stage(Stage::Bandpass);
            let vocals = vocals.compress(&config.compressor)?;
            tracker.stage(Stage::Compression);

            // Half the side channel folded back in keeps wide-panned
            // instruments audible in the instrumental stem.
            let instrumental = mix_mono(&mid, F::one(), &side, to_precision::<F, _>(0.5))?;
            let instrumental = instrumental.spectral_subtract(config.instrumental_noise_factor)?;
            tracker.stage(Stage::NoiseReduction);

            Ok((vocals, instrumental))
        }
    }
}

fn advanced_spectral_strategy<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
    tracker: &StageTracker<'_>,
) -> SeparationResult<(SampleBuffer<F>, SampleBuffer<F>)> {
    let mono = match buffer.data() {
        BufferData::Mono(_) => buffer.clone(),
        BufferData::Stereo(_) => {
            let mixed = buffer.to_mono()?;
            tracker.stage(Stage::Decompose);
            mixed
        }
    };

    let spectrogram = mono.stft(&config.stft)?;
    let n_fft = config.stft.window_size;
    let rate = mono.sample_rate();
    let length = mono.num_samples();

    let vocal_mask = band_gain_mask(n_fft, rate, &config.vocal_band, config.vocal_gain);
    let instrumental_mask =
        band_gain_mask(n_fft, rate, &config.vocal_band, config.instrumental_gain);
    let mut vocals = SampleBuffer::istft(
        &apply_band_mask(&spectrogram, &vocal_mask)?,
        &config.stft,
        length,
        rate,
    )?;
    let mut instrumental = SampleBuffer::istft(
        &apply_band_mask(&spectrogram, &instrumental_mask)?,
        &config.stft,
        length,
        rate,
    )?;
    tracker.stage(Stage::Masking);

    vocals.normalize_peak();
    instrumental.normalize_peak();
    tracker.stage(Stage::Normalize);

    Ok((vocals, instrumental))
}

fn hybrid_strategy<F: RealFloat>(
    buffer: &SampleBuffer<F>,
    config: &SeparationConfig<F>,
    tracker: &StageTracker<'_>,
) -> SeparationResult<(SampleBuffer<F>, SampleBuffer<F>)> {
    match buffer.data() {
        BufferData::Stereo(_) => {
            let (mid, side) = buffer.mid_side()?;
            tracker.stage(Stage::Decompose);

            // Pre-emphasis sharpens vocal onsets before the harmonic
            // estimate; the percussive component of the mid carries the
            // rhythm section. Blending the refined components back with
            // the estimates they came from keeps artifacts in check.
            let vocal_estimate = side.preemphasis(config.preemphasis)?;
            let (vocal_refined, _) = vocal_estimate.hpss(&config.hpss, &config.stft)?;
            let (_, instrumental_refined) = mid.hpss(&config.hpss, &config.stft)?;
            tracker.stage(Stage::Hpss);

            let raw = F::one() - config.hpss_blend;
            let mut vocals =
                mix_mono(&vocal_refined, config.hpss_blend, &vocal_estimate, raw)?;
            let mut instrumental =
                mix_mono(&instrumental_refined, config.hpss_blend, &mid, raw)?;
            vocals.normalize_peak();
            instrumental.normalize_peak();
            tracker.stage(Stage::Normalize);

            Ok((vocals, instrumental))
        }
        BufferData::Mono(_) => {
            // Without a stereo field there are no mid/side estimates to
            // blend against; the split components stand alone, with
            // pre-emphasis brightening the vocal side.
            let (harmonic, mut instrumental) = buffer.hpss(&config.hpss, &config.stft)?;
            let mut vocals = harmonic.preemphasis(config.preemphasis)?;
            tracker.stage(Stage::Hpss);

            vocals.normalize_peak();
            instrumental.normalize_peak();
            tracker.stage(Stage::Normalize);

            Ok((vocals, instrumental))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StftParams;
    use crate::config::WindowType;
    use crate::observer::CallbackObserver;
    use crate::util::generation::{sine_wave, stereo_sine_wave};
    use ndarray::array;
    use std::sync::{Arc, Mutex};

    fn fast_stft() -> StftParams {
        StftParams::new(1024, 256, WindowType::Hann)
    }

    fn all_presets() -> [SeparationConfig<f64>; 4] {
        [
            SeparationConfig::simple(),
            SeparationConfig::enhanced(),
            SeparationConfig::advanced_spectral(),
            SeparationConfig::hybrid(),
        ]
    }

    fn recording_observer() -> (Arc<Mutex<Vec<Stage>>>, Box<dyn SeparationObserver>) {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        let observer = CallbackObserver::new(move |event: &StageEvent| {
            sink.lock().unwrap().push(event.stage);
        });
        (stages, Box::new(observer))
    }

    #[test]
    fn test_all_strategies_produce_full_length_mono_stems() {
        let buffer = stereo_sine_wave::<f64>(440.0, 3000.0, 8192, 22050, 0.8).unwrap();
        for mut config in all_presets() {
            config.stft = fast_stft();
            let stems = separate(&buffer, &config).unwrap();
            for stem in [&stems.vocals, &stems.instrumental] {
                assert!(stem.is_mono(), "{:?} produced a non-mono stem", config.strategy);
                assert_eq!(stem.num_samples(), 8192);
                assert_eq!(stem.sample_rate(), 22050);
                assert!(
                    stem.as_mono()
                        .unwrap()
                        .iter()
                        .all(|x| x.is_finite() && x.abs() <= 1.0),
                    "{:?} produced out-of-range samples",
                    config.strategy
                );
            }
        }
    }

    #[test]
    fn test_mono_input_works_for_all_but_simple() {
        let buffer = sine_wave::<f64>(440.0, 8192, 22050, 0.8).unwrap();
        for mut config in all_presets() {
            config.stft = fast_stft();
            let result = separate(&buffer, &config);
            if config.strategy == Strategy::Simple {
                assert!(matches!(result, Err(SeparationError::UnsupportedFormat(_))));
            } else {
                let stems = result.unwrap();
                assert_eq!(stems.vocals.num_samples(), 8192);
                assert_eq!(stems.instrumental.num_samples(), 8192);
            }
        }
    }

    #[test]
    fn test_enhanced_mono_fallback_produces_signal() {
        // Tonal and transient content together, so the fallback has
        // something to put in each stem.
        let tone = sine_wave::<f64>(440.0, 8192, 22050, 0.5).unwrap();
        let clicks = crate::util::generation::impulse_train::<f64>(8192, 22050, 2048, 0.5).unwrap();
        let mixed = tone.as_mono().unwrap() + clicks.as_mono().unwrap();
        let buffer = SampleBuffer::new_mono(mixed, 22050).unwrap();

        let mut config = SeparationConfig::enhanced();
        config.stft = fast_stft();
        let stems = separate(&buffer, &config).unwrap();
        assert!(stems.vocals.peak() > 1e-3);
        assert!(stems.instrumental.peak() > 1e-3);
    }

    #[test]
    fn test_simple_splits_alternating_channels_exactly() {
        // Left holds the shared content, right alternates phase, so the
        // split lands entirely on even/odd samples.
        let channels = ndarray::array![[1.0, 1.0, 1.0, 1.0], [1.0, -1.0, 1.0, -1.0]];
        let buffer = SampleBuffer::new_stereo(channels, 44100).unwrap();
        let stems = separate(&buffer, &SeparationConfig::simple()).unwrap();
        assert_eq!(stems.vocals.as_mono().unwrap(), &array![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(
            stems.instrumental.as_mono().unwrap(),
            &array![1.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_simple_stems_recombine_to_the_input() {
        let left = array![0.5, 0.25, -0.125, 1.0];
        let right = array![0.25, -0.5, 0.375, 0.0];
        let mut channels = ndarray::Array2::zeros((2, 4));
        channels.row_mut(0).assign(&left);
        channels.row_mut(1).assign(&right);
        let buffer = SampleBuffer::new_stereo(channels, 44100).unwrap();

        let stems = separate(&buffer, &SeparationConfig::simple()).unwrap();
        let vocals = stems.vocals.as_mono().unwrap();
        let instrumental = stems.instrumental.as_mono().unwrap();
        // mid + side = L and mid - side = R, exactly, for dyadic samples.
        assert_eq!(&(instrumental + vocals), &left);
        assert_eq!(&(instrumental - vocals), &right);
    }

    #[test]
    fn test_fft_ceiling_is_enforced() {
        let buffer = stereo_sine_wave::<f64>(440.0, 3000.0, 16384, 22050, 0.8).unwrap();
        let mut config = SeparationConfig::<f64>::enhanced();
        config.max_fft_size = 64;
        assert!(matches!(
            separate(&buffer, &config),
            Err(SeparationError::NumericOverflow(_))
        ));

        let mut config = SeparationConfig::<f64>::advanced_spectral();
        config.max_fft_size = 1024;
        assert!(matches!(
            separate(&buffer, &config),
            Err(SeparationError::NumericOverflow(_))
        ));
    }

    #[test]
    fn test_simple_ignores_fft_ceiling() {
        let buffer = stereo_sine_wave::<f64>(440.0, 880.0, 4096, 44100, 0.5).unwrap();
        let mut config = SeparationConfig::<f64>::simple();
        config.max_fft_size = 1;
        assert!(separate(&buffer, &config).is_ok());
    }

    #[test]
    fn test_config_is_validated_before_processing() {
        let buffer = stereo_sine_wave::<f64>(440.0, 880.0, 4096, 8000, 0.5).unwrap();
        // The default 8 kHz band-pass edge collides with a 4 kHz Nyquist.
        assert!(matches!(
            separate(&buffer, &SeparationConfig::enhanced()),
            Err(SeparationError::Configuration(_))
        ));

        let mut config = SeparationConfig::<f64>::simple();
        config.stft = StftParams::new(512, 1024, WindowType::Hann);
        let buffer = stereo_sine_wave::<f64>(440.0, 880.0, 4096, 44100, 0.5).unwrap();
        assert!(matches!(
            separate(&buffer, &config),
            Err(SeparationError::Configuration(_))
        ));
    }

    #[test]
    fn test_simple_accepts_low_sample_rates() {
        // An 8 kHz recording collides with the default band-pass edges, but
        // the simple strategy never filters and must not be held to them.
        let buffer = stereo_sine_wave::<f64>(440.0, 880.0, 4096, 8000, 0.5).unwrap();
        let stems = separate(&buffer, &SeparationConfig::simple()).unwrap();
        assert_eq!(stems.vocals.num_samples(), 4096);
        assert_eq!(stems.instrumental.sample_rate(), 8000);
    }

    #[test]
    fn test_simple_reports_decompose_then_finalize() {
        let buffer = stereo_sine_wave::<f64>(440.0, 880.0, 4096, 44100, 0.5).unwrap();
        let (stages, observer) = recording_observer();
        let separator = Separator::with_observer(SeparationConfig::simple(), observer);
        separator.separate(&buffer).unwrap();
        assert_eq!(
            stages.lock().unwrap().as_slice(),
            &[Stage::Decompose, Stage::Finalize]
        );
    }

    #[test]
    fn test_enhanced_reports_the_full_stage_sequence() {
        let buffer = stereo_sine_wave::<f64>(440.0, 3000.0, 8192, 22050, 0.8).unwrap();
        let (stages, observer) = recording_observer();
        let mut config = SeparationConfig::enhanced();
        config.stft = fast_stft();
        let separator = Separator::with_observer(config, observer);
        separator.separate(&buffer).unwrap();

        let seen = stages.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[
                Stage::Decompose,
                Stage::NoiseReduction,
                Stage::Bandpass,
                Stage::Compression,
                Stage::NoiseReduction,
                Stage::Finalize,
            ]
        );
        assert_eq!(seen.len(), stage_count(Strategy::Enhanced, true));
    }

    #[test]
    fn test_stage_counts_match_reported_events() {
        let stereo = stereo_sine_wave::<f64>(440.0, 3000.0, 8192, 22050, 0.8).unwrap();
        let mono = sine_wave::<f64>(440.0, 8192, 22050, 0.8).unwrap();
        for mut config in all_presets() {
            config.stft = fast_stft();
            for buffer in [&stereo, &mono] {
                if config.strategy == Strategy::Simple && buffer.is_mono() {
                    continue;
                }
                let (stages, observer) = recording_observer();
                let separator = Separator::with_observer(config.clone(), observer);
                separator.separate(buffer).unwrap();
                assert_eq!(
                    stages.lock().unwrap().len(),
                    stage_count(config.strategy, buffer.is_stereo()),
                    "stage count mismatch for {:?} ({} channels)",
                    config.strategy,
                    buffer.channels()
                );
            }
        }
    }

    #[test]
    fn test_gate_applies_whenever_configured() {
        let mut channels = ndarray::Array2::zeros((2, 2));
        channels.row_mut(0).assign(&array![1.0, 0.4]);
        channels.row_mut(1).assign(&array![-1.0, 0.4]);
        let buffer = SampleBuffer::new_stereo(channels, 44100).unwrap();

        // side = [1.0, 0.0], mid = [0.0, 0.4].
        let mut config = SeparationConfig::<f64>::simple();
        config.gate_threshold = Some(0.5);
        let stems = separate(&buffer, &config).unwrap();
        assert_eq!(stems.vocals.as_mono().unwrap(), &array![1.0, 0.0]);
        assert_eq!(stems.instrumental.as_mono().unwrap(), &array![0.0, 0.4]);
    }

    #[test]
    fn test_separator_is_reusable_and_deterministic() {
        let buffer = stereo_sine_wave::<f64>(440.0, 3000.0, 8192, 22050, 0.8).unwrap();
        let mut config = SeparationConfig::enhanced();
        config.stft = fast_stft();
        let separator = Separator::new(config.clone());

        let first = separator.separate(&buffer).unwrap();
        let second = separator.separate(&buffer).unwrap();
        assert_eq!(first, second);

        let free = separate(&buffer, &config).unwrap();
        assert_eq!(first, free);
    }

    #[test]
    fn test_hybrid_normalizes_stems() {
        let buffer = stereo_sine_wave::<f64>(440.0, 3000.0, 8192, 22050, 0.2).unwrap();
        let mut config = SeparationConfig::hybrid();
        config.stft = fast_stft();
        let stems = separate(&buffer, &config).unwrap();
        // Quiet input still comes out peak-normalized (gate leaves the
        // loudest sample alone).
        assert!((stems.vocals.peak() - 1.0).abs() < 1e-9);
        assert!((stems.instrumental.peak() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_accessor_returns_the_running_config() {
        let config = SeparationConfig::<f32>::hybrid();
        let separator = Separator::new(config.clone());
        assert_eq!(separator.config(), &config);
    }
}
