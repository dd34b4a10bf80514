//! # psyche-validity
//!
//! Post-hoc detection of disengaged or gamed sessions. Consumers use the
//! resulting [`PatternFlags`] to invalidate results instead of presenting
//! them with false confidence.
//!
//! ## Heuristics
//!
//! - **Monotonic**: one option position dominates the answers
//! - **High skip rate**: too many skipped items
//! - **Flatline**: a long unbroken run of the same position
//! - **Robotic timing**: latencies with implausibly low spread
//! - **Somatic monotony**: almost no variety in reported sensations
//! - **Early termination**: session ended well short of the item count
//!
//! Short histories are judged conservatively: below five responses only
//! early termination can be raised.

#![deny(unsafe_code)]

use std::collections::HashSet;

use psyche_types::{PatternFlags, ResponseEvent, TOTAL_NODES};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Thresholds for the validity heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidityConfig {
    /// Minimum responses before any engagement heuristic runs.
    pub min_history: usize,
    /// Sessions shorter than `ratio * total` are early terminations.
    pub early_termination_ratio: f64,
    pub monotonic_min_samples: usize,
    pub monotonic_share: f64,
    pub skip_rate_threshold: f64,
    /// Latencies outside `(floor, ceiling)` are ignored for timing analysis.
    pub latency_floor_ms: u64,
    pub latency_ceiling_ms: u64,
    pub timing_min_samples: usize,
    /// Deviation assumed when there are too few samples.
    pub sparse_deviation_ms: f64,
    pub robotic_deviation_ms: f64,
    pub min_distinct_sensations: usize,
    pub flatline_run: usize,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            early_termination_ratio: 0.7,
            monotonic_min_samples: 10,
            monotonic_share: 0.8,
            skip_rate_threshold: 0.4,
            latency_floor_ms: 300,
            latency_ceiling_ms: 30_000,
            timing_min_samples: 10,
            sparse_deviation_ms: 1000.0,
            robotic_deviation_ms: 500.0,
            min_distinct_sensations: 3,
            flatline_run: 10,
        }
    }
}

/// Anti-gaming analysis over a history snapshot.
#[derive(Debug, Clone)]
pub struct ValidityDetector {
    total_nodes: u32,
    config: ValidityConfig,
}

impl ValidityDetector {
    pub fn new(total_nodes: u32, config: ValidityConfig) -> Self {
        Self {
            total_nodes,
            config,
        }
    }

    pub fn config(&self) -> &ValidityConfig {
        &self.config
    }

    pub fn analyze(&self, history: &[ResponseEvent]) -> PatternFlags {
        let mut flags = PatternFlags {
            is_early_termination: self.is_early_termination(history.len()),
            ..Default::default()
        };

        if history.len() < self.config.min_history {
            return flags;
        }

        let dominant = self.dominant_position(history);
        flags.is_monotonic = dominant.is_some();
        flags.dominant_position = dominant;
        flags.is_high_skip_rate = self.skip_rate(history) >= self.config.skip_rate_threshold;
        flags.is_flatline = longest_position_run(history) >= self.config.flatline_run;
        flags.is_robotic_timing = self.latency_deviation(history) < self.config.robotic_deviation_ms;
        flags.is_somatic_monotony = self.is_somatic_monotony(history);

        if flags.is_suspect() {
            debug!(reasons = ?flags.reasons(), responses = history.len(), "Session flagged");
        }

        flags
    }

    fn is_early_termination(&self, len: usize) -> bool {
        (len as f64) < self.config.early_termination_ratio * f64::from(self.total_nodes)
    }

    /// Position holding at least the monotonic share of real choices.
    fn dominant_position(&self, history: &[ResponseEvent]) -> Option<i8> {
        let mut counts = [0usize; 3];
        for slot in history.iter().filter_map(|e| e.choice_position.slot()) {
            if let Some(count) = counts.get_mut(slot) {
                *count += 1;
            }
        }

        let valid: usize = counts.iter().sum();
        if valid < self.config.monotonic_min_samples {
            return None;
        }

        counts
            .iter()
            .position(|&c| c as f64 / valid as f64 >= self.config.monotonic_share)
            .map(|p| p as i8)
    }

    /// Skipped items over the larger of history length and item count.
    fn skip_rate(&self, history: &[ResponseEvent]) -> f64 {
        let skips = history.iter().filter(|e| e.is_skip()).count();
        let denominator = history.len().max(self.total_nodes as usize);
        skips as f64 / denominator as f64
    }

    /// Population standard deviation of plausible latencies.
    fn latency_deviation(&self, history: &[ResponseEvent]) -> f64 {
        let samples: Vec<f64> = history
            .iter()
            .map(|e| e.latency_ms)
            .filter(|&l| l > self.config.latency_floor_ms && l < self.config.latency_ceiling_ms)
            .map(|l| l as f64)
            .collect();

        if samples.len() < self.config.timing_min_samples {
            return self.config.sparse_deviation_ms;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }

    /// Fewer than three distinct sensations; two where one is neutral falls
    /// under the same rule.
    fn is_somatic_monotony(&self, history: &[ResponseEvent]) -> bool {
        let distinct: HashSet<_> = history.iter().map(|e| e.sensation).collect();
        distinct.len() < self.config.min_distinct_sensations
    }
}

impl Default for ValidityDetector {
    fn default() -> Self {
        Self::new(TOTAL_NODES, ValidityConfig::default())
    }
}

fn longest_position_run(history: &[ResponseEvent]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for event in history {
        if Some(event.choice_position) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(event.choice_position);
        }
        longest = longest.max(current);
    }

    longest
}
