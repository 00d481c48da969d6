use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};

/// Wall-clock date and monotonic start of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct InvocationClock {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl InvocationClock {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Invocation date as RFC 3339 UTC with millisecond precision.
    pub fn date(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn elapsed_ms(&self) -> u64 {
        round_millis(self.started.elapsed())
    }
}

pub fn round_millis(duration: Duration) -> u64 {
    (duration.as_secs_f64() * 1_000.0).round() as u64
}
