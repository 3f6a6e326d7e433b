use chrono::{DateTime, Utc};
use std::time::Duration;

/// Terminal result of one strategy within one repetition.
#[derive(Clone, Debug)]
pub struct StrategyOutcome {
    pub repetition: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub failure: Option<String>,
}

impl StrategyOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregate over all repetitions of one strategy. Failed repetitions are
/// counted but excluded from the mean; when nothing succeeded the aggregates
/// are absent, never zero.
#[derive(Clone, Debug)]
pub struct StrategySummary {
    pub attempted: u32,
    pub succeeded: u32,
    pub mean_elapsed: Option<Duration>,
    /// Bytes per second, derived as `file_size / mean_elapsed`.
    pub mean_speed_bps: Option<f64>,
    /// One line per failed repetition, keyed by repetition index.
    pub failures: Vec<String>,
}

impl StrategySummary {
    pub fn failed(&self) -> u32 {
        self.attempted - self.succeeded
    }
}

pub fn summarize(outcomes: &[StrategyOutcome], file_size: u64) -> StrategySummary {
    let successes: Vec<&StrategyOutcome> =
        outcomes.iter().filter(|o| o.succeeded()).collect();

    let mean_elapsed = if successes.is_empty() {
        None
    } else {
        let total: Duration = successes.iter().map(|o| o.elapsed).sum();
        Some(total / successes.len() as u32)
    };

    let mean_speed_bps = mean_elapsed
        .map(|mean| mean.as_secs_f64())
        .filter(|secs| *secs > 0.0)
        .map(|secs| file_size as f64 / secs);

    let failures = outcomes
        .iter()
        .filter_map(|o| {
            o.failure
                .as_ref()
                .map(|reason| format!("repetition {}: {reason}", o.repetition))
        })
        .collect();

    StrategySummary {
        attempted: outcomes.len() as u32,
        succeeded: successes.len() as u32,
        mean_elapsed,
        mean_speed_bps,
        failures,
    }
}

/// Name and size of one benchmarked file.
#[derive(Clone, Debug)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
}

/// Everything one run produced; handed to the history store for persistence.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub date: DateTime<Utc>,
    pub repetitions: u32,
    pub chunk_size: u64,
    pub single: StrategySummary,
    pub chunked: StrategySummary,
    pub correlation_ids: Vec<Option<String>>,
    pub single_file: FileMeta,
    pub chunk_file: FileMeta,
}

impl RunReport {
    /// True when every repetition of every strategy failed; the run carries
    /// no valid timing and must be treated as inconclusive.
    pub fn inconclusive(&self) -> bool {
        self.single.succeeded == 0 && self.chunked.succeeded == 0
    }
}
