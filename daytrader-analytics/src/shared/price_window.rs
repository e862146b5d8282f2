/// Rolling price window, summary statistics and sparkline
///
/// The window is the only state carried across poll ticks. It is owned by the
/// orchestrator and appended to once per successful tick.
use std::collections::VecDeque;

use serde::Serialize;

/// Samples kept in the rolling window
pub const DEFAULT_PRICE_WINDOW: usize = 48;

/// Absolute price delta separating up/down from flat
const TREND_THRESHOLD: f64 = 0.02;

/// Sparkline heights span SPARK_MIN_HEIGHT..=SPARK_MIN_HEIGHT + SPARK_HEIGHT_RANGE
const SPARK_MIN_HEIGHT: f64 = 20.0;
const SPARK_HEIGHT_RANGE: f64 = 70.0;

/// Floor for the low/high span so a flat window does not divide by zero
const SPARK_MIN_SPAN: f64 = 0.0001;

/// Fixed-capacity FIFO of price samples, oldest first
#[derive(Debug, Clone)]
pub struct PriceWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push the latest sample, evicting the oldest when full
    pub fn append(&mut self, sample: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples in chronological order
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples().collect()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Derive summary statistics, using `fallback` for low/high when empty
    pub fn stats(&self, fallback: f64) -> PriceStats {
        let (Some(first), Some(last)) = (self.samples.front().copied(), self.latest()) else {
            return PriceStats {
                low: fallback,
                high: fallback,
                ..PriceStats::default()
            };
        };

        let low = self.samples().fold(f64::INFINITY, f64::min);
        let high = self.samples().fold(f64::NEG_INFINITY, f64::max);
        let change = last - first;
        let pct = if first != 0.0 { change / first * 100.0 } else { 0.0 };

        // Population standard deviation
        let n = self.samples.len() as f64;
        let mean = self.samples().sum::<f64>() / n;
        let variance = self.samples().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

        let range = high - low;
        let range_pct = if last != 0.0 { range / last * 100.0 } else { 0.0 };

        PriceStats {
            change,
            pct,
            low,
            high,
            vol: variance.sqrt(),
            range,
            range_pct,
            trend: Trend::classify(change),
        }
    }

    /// Sparkline for the current window
    pub fn sparkline(&self) -> Vec<SparkPoint> {
        build_sparkline(&self.to_vec())
    }
}

impl Default for PriceWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_WINDOW)
    }
}

/// Price direction over the whole window
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}

impl Trend {
    /// Classify an absolute first-to-last change
    pub fn classify(change: f64) -> Self {
        if change > TREND_THRESHOLD {
            Trend::Up
        } else if change < -TREND_THRESHOLD {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "■",
        }
    }
}

/// Window summary; `change` is last minus first sample, not tick-to-tick
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PriceStats {
    pub change: f64,
    pub pct: f64,
    pub low: f64,
    pub high: f64,
    pub vol: f64,
    pub range: f64,
    pub range_pct: f64,
    pub trend: Trend,
}

/// One sparkline bar
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SparkPoint {
    pub value: f64,
    /// Normalized height in 20..=90
    pub height: f64,
    /// Next sample is at least this one; the last sample compares to itself
    pub is_up: bool,
}

/// Map samples to normalized bar heights
pub fn build_sparkline(samples: &[f64]) -> Vec<SparkPoint> {
    if samples.is_empty() {
        return Vec::new();
    }

    let low = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let high = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (high - low).max(SPARK_MIN_SPAN);

    samples
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let next = samples.get(index + 1).copied().unwrap_or(value);
            SparkPoint {
                value,
                height: SPARK_MIN_HEIGHT + ((value - low) / span) * SPARK_HEIGHT_RANGE,
                is_up: next >= value,
            }
        })
        .collect()
}
