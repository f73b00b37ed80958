use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Number of recent response times kept for the average.
pub const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub active_sessions: usize,
    pub total_messages: u64,
    pub avg_response_time_ms: f64,
    /// Failed share of all messages, formatted like `"12.5%"`.
    pub error_rate: String,
    pub uptime_seconds: u64,
}

struct Counters {
    total_messages: u64,
    failed_messages: u64,
    response_times_ms: VecDeque<f64>,
}

/// Process-wide message counters.
pub struct MetricsRecorder {
    started: Instant,
    counters: Mutex<Counters>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters {
                total_messages: 0,
                failed_messages: 0,
                response_times_ms: VecDeque::with_capacity(RESPONSE_WINDOW),
            }),
        }
    }

    pub fn record(&self, elapsed: Duration, success: bool) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.total_messages += 1;
        if !success {
            counters.failed_messages += 1;
        }
        if counters.response_times_ms.len() >= RESPONSE_WINDOW {
            counters.response_times_ms.pop_front();
        }
        counters
            .response_times_ms
            .push_back(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn snapshot(&self, active_sessions: usize) -> MetricsSnapshot {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let avg = if counters.response_times_ms.is_empty() {
            0.0
        } else {
            counters.response_times_ms.iter().sum::<f64>() / counters.response_times_ms.len() as f64
        };
        let error_rate = if counters.total_messages == 0 {
            0.0
        } else {
            counters.failed_messages as f64 / counters.total_messages as f64 * 100.0
        };

        MetricsSnapshot {
            active_sessions,
            total_messages: counters.total_messages,
            avg_response_time_ms: (avg * 100.0).round() / 100.0,
            error_rate: format!("{:.1}%", error_rate),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    pub fn reset(&self) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.total_messages = 0;
        counters.failed_messages = 0;
        counters.response_times_ms.clear();
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
