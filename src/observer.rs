//! Progress observation for separation runs.
//!
//! A [`Separator`](crate::pipeline::Separator) announces each processing
//! stage through a [`SeparationObserver`]. The built-in implementations
//! cover the common cases: ignore everything, forward events to a closure,
//! or drive a terminal progress bar (behind the `progress-tracking`
//! feature).

use std::fmt;

use crate::config::Strategy;

/// A coarse processing stage inside a separation run.
///
/// Stages are reported in execution order; how many and which ones occur
/// depends on the strategy and the input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Mid/side decomposition or mono downmix.
    Decompose,
    /// Spectral subtraction.
    NoiseReduction,
    /// Zero-phase band-pass filtering.
    Bandpass,
    /// Dynamic range compression.
    Compression,
    /// Harmonic/percussive separation.
    Hpss,
    /// Frequency-band mask application.
    Masking,
    /// Peak normalization.
    Normalize,
    /// Clipping and optional gating of the finished stems.
    Finalize,
}

impl Stage {
    /// Short lowercase name, suitable for log lines and progress messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Decompose => "decompose",
            Self::NoiseReduction => "noise-reduction",
            Self::Bandpass => "band-pass",
            Self::Compression => "compression",
            Self::Hpss => "hpss",
            Self::Masking => "masking",
            Self::Normalize => "normalize",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A completed stage, reported right after the stage's work finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEvent {
    /// The stage that just completed.
    pub stage: Stage,
    /// The strategy driving the run.
    pub strategy: Strategy,
}

/// Receives stage notifications during a separation run.
///
/// Implementations must be callable from worker threads, hence the
/// `Send + Sync` bound.
pub trait SeparationObserver: Send + Sync {
    /// Called once before any processing, with the number of stages the
    /// run will report.
    fn started(&self, strategy: Strategy, total_stages: usize);

    /// Called after each stage completes.
    fn on_stage(&self, event: &StageEvent);

    /// Called once after the stems are finished.
    fn finished(&self, strategy: Strategy);
}

/// Ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SeparationObserver for NullObserver {
    fn started(&self, _strategy: Strategy, _total_stages: usize) {}

    fn on_stage(&self, _event: &StageEvent) {}

    fn finished(&self, _strategy: Strategy) {}
}

/// Forwards each stage event to a closure.
pub struct CallbackObserver<C>
where
    C: Fn(&StageEvent) + Send + Sync,
{
    callback: C,
}

impl<C> CallbackObserver<C>
where
    C: Fn(&StageEvent) + Send + Sync,
{
    /// Wraps `callback` as an observer.
    pub const fn new(callback: C) -> Self {
        Self { callback }
    }
}

impl<C> SeparationObserver for CallbackObserver<C>
where
    C: Fn(&StageEvent) + Send + Sync,
{
    fn started(&self, _strategy: Strategy, _total_stages: usize) {}

    fn on_stage(&self, event: &StageEvent) {
        (self.callback)(event);
    }

    fn finished(&self, _strategy: Strategy) {}
}

#[cfg(feature = "progress-tracking")]
mod progress {
    use indicatif::{ProgressBar, ProgressStyle};

    use super::{SeparationObserver, StageEvent};
    use crate::config::Strategy;

    /// Drives an [`indicatif`] progress bar, one tick per stage.
    #[derive(Debug)]
    pub struct ProgressBarObserver {
        bar: ProgressBar,
    }

    impl ProgressBarObserver {
        /// Creates an observer with the default bar layout.
        pub fn new() -> Self {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            Self { bar }
        }
    }

    impl Default for ProgressBarObserver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SeparationObserver for ProgressBarObserver {
        fn started(&self, strategy: Strategy, total_stages: usize) {
            self.bar.set_length(total_stages as u64);
            self.bar.set_position(0);
            self.bar.set_prefix(format!("{strategy:?}"));
        }

        fn on_stage(&self, event: &StageEvent) {
            self.bar.set_message(event.stage.name());
            self.bar.inc(1);
        }

        fn finished(&self, _strategy: Strategy) {
            self.bar.finish_with_message("done");
        }
    }
}

#[cfg(feature = "progress-tracking")]
pub use progress::ProgressBarObserver;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Decompose.name(), "decompose");
        assert_eq!(Stage::NoiseReduction.name(), "noise-reduction");
        assert_eq!(Stage::Hpss.name(), "hpss");
        assert_eq!(format!("{}", Stage::Finalize), "finalize");
    }

    #[test]
    fn test_null_observer_accepts_events() {
        let observer = NullObserver;
        observer.started(Strategy::Simple, 2);
        observer.on_stage(&StageEvent {
            stage: Stage::Decompose,
            strategy: Strategy::Simple,
        });
        observer.finished(Strategy::Simple);
    }

    #[test]
    fn test_callback_observer_forwards_each_event() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let observer = CallbackObserver::new(move |_event: &StageEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        observer.started(Strategy::Enhanced, 6);
        for stage in [Stage::Decompose, Stage::NoiseReduction, Stage::Finalize] {
            observer.on_stage(&StageEvent {
                stage,
                strategy: Strategy::Enhanced,
            });
        }
        observer.finished(Strategy::Enhanced);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[cfg(feature = "progress-tracking")]
    #[test]
    fn test_progress_bar_observer_runs_through() {
        let observer = ProgressBarObserver::new();
        observer.started(Strategy::Simple, 2);
        observer.on_stage(&StageEvent {
            stage: Stage::Decompose,
            strategy: Strategy::Simple,
        });
        observer.on_stage(&StageEvent {
            stage: Stage::Finalize,
            strategy: Strategy::Simple,
        });
        observer.finished(Strategy::Simple);
    }
}
