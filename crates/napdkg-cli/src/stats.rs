//! Per-phase timing summaries across runs

use std::time::Duration;

use napdkg_party::PhaseTimings;

/// Mean and sample standard deviation in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub samples: usize,
}

impl Summary {
    pub fn of(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let n = ms.len() as f64;
        let mean = ms.iter().sum::<f64>() / n;
        let stddev = if ms.len() > 1 {
            (ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Self {
            mean_ms: mean,
            stddev_ms: stddev,
            samples: ms.len(),
        })
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>10.2} ms ± {:>8.2} ms (n={})",
            self.mean_ms, self.stddev_ms, self.samples
        )
    }
}

/// Collected phase timings of every successful party
#[derive(Debug, Default)]
pub struct PhaseSamples {
    samples: Vec<PhaseTimings>,
}

impl PhaseSamples {
    pub fn push(&mut self, timings: PhaseTimings) {
        self.samples.push(timings);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(phase, summary)` rows in phase order, followed by the total
    pub fn rows(&self) -> Vec<(&'static str, Summary)> {
        let Some(first) = self.samples.first() else {
            return Vec::new();
        };
        let mut rows: Vec<_> = first
            .phases()
            .iter()
            .enumerate()
            .filter_map(|(i, (name, _))| {
                let column: Vec<Duration> = self.samples.iter().map(|t| t.phases()[i].1).collect();
                Summary::of(&column).map(|s| (*name, s))
            })
            .collect();
        let totals: Vec<Duration> = self.samples.iter().map(PhaseTimings::total).collect();
        if let Some(total) = Summary::of(&totals) {
            rows.push(("total", total));
        }
        rows
    }
}
