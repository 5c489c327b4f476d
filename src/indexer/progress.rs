//! Scan progress: a clamped fraction in `[0, 1]` with a human readable
//! message, pushed to a pluggable sink.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Upper bound of the fraction until `finish` is called.
pub const MAX_UNFINISHED: f64 = 0.99;

/// Receives progress updates.
pub trait ProgressSink: Send + Sync {
    fn update(&self, fraction: f64, message: &str);
    fn finish(&self, message: &str);
}

/// Renders progress as a terminal bar.
pub struct IndicatifSink {
    bar: ProgressBar,
}

impl IndicatifSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(1000);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl Default for IndicatifSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifSink {
    fn update(&self, fraction: f64, message: &str) {
        self.bar.set_position((fraction * 1000.0) as u64);
        self.bar.set_message(message.to_string());
    }

    fn finish(&self, message: &str) {
        self.bar.set_position(1000);
        self.bar.finish_with_message(message.to_string());
    }
}

/// Logs progress at debug level, throttled to whole-percent steps.
#[derive(Default)]
pub struct TracingSink {
    last_percent: Mutex<Option<u32>>,
}

impl ProgressSink for TracingSink {
    fn update(&self, fraction: f64, message: &str) {
        let percent = (fraction * 100.0) as u32;
        let mut last = lock(&self.last_percent);
        if *last != Some(percent) {
            *last = Some(percent);
            tracing::debug!("{}", message);
        }
    }

    fn finish(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _fraction: f64, _message: &str) {}
    fn finish(&self, _message: &str) {}
}

/// Shared progress of one scan. Clones report into the same state.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

struct Inner {
    label: String,
    sink: Arc<dyn ProgressSink>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    fraction: f64,
    total_units: usize,
    /// Share of the whole scan that one unit is worth.
    unit_share: f64,
    started_at: Option<Instant>,
    finished: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                label: label.into(),
                sink,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Reporter that discards every update.
    pub fn silent(label: impl Into<String>) -> Self {
        Self::new(label, Arc::new(NullSink))
    }

    pub fn start(&self) {
        {
            let mut state = lock(&self.inner.state);
            *state = State {
                started_at: Some(Instant::now()),
                ..State::default()
            };
        }
        self.publish();
    }

    /// Spreads the headroom left at this point evenly over `total` units.
    pub fn set_total_units(&self, total: usize) {
        let mut state = lock(&self.inner.state);
        state.total_units = total;
        state.unit_share = if total == 0 {
            0.0
        } else {
            (1.0 - state.fraction) / total as f64
        };
    }

    /// Advances by `units` out of the configured total.
    pub fn advance(&self, units: usize) {
        {
            let mut state = lock(&self.inner.state);
            if state.finished || state.total_units == 0 {
                return;
            }
            let step = units as f64 * state.unit_share;
            state.fraction = (state.fraction + step).min(MAX_UNFINISHED);
        }
        self.publish();
    }

    /// Adds a fixed share of the whole scan.
    pub fn add_fraction(&self, delta: f64) {
        {
            let mut state = lock(&self.inner.state);
            if state.finished {
                return;
            }
            state.fraction = (state.fraction + delta.max(0.0)).min(MAX_UNFINISHED);
        }
        self.publish();
    }

    pub fn finish(&self) {
        let elapsed = {
            let mut state = lock(&self.inner.state);
            state.fraction = 1.0;
            state.finished = true;
            state.started_at.map(|t| t.elapsed())
        };
        let mut message = self.message();
        if let Some(elapsed) = elapsed {
            message = format!("{} ({:.2}s)", message, elapsed.as_secs_f64());
        }
        self.inner.sink.finish(&message);
    }

    pub fn fraction(&self) -> f64 {
        lock(&self.inner.state).fraction
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.inner.state).finished
    }

    /// `"<label>: <percent>%"`, percent floored to two decimals.
    pub fn message(&self) -> String {
        format!("{}: {}%", self.inner.label, format_percent(self.fraction()))
    }

    fn publish(&self) {
        let fraction = self.fraction();
        self.inner.sink.update(fraction, &self.message());
    }
}

/// Floors to two decimals and trims trailing zeros (`12.5`, `99`, `0`).
pub fn format_percent(fraction: f64) -> String {
    let hundredths = (fraction * 10_000.0).floor() as u64;
    let text = format!("{}.{:02}", hundredths / 100, hundredths % 100);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
