//! In-memory alert store.
//!
//! The store keeps the most recent `ALERT_LOG_CAPACITY` alerts; appending
//! past the cap evicts the oldest entry first. Queries are by recency or by
//! since-timestamp. The store is shared between the capture worker (via the
//! memory sink) and the HTTP API behind a mutex.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::{AlertPayload, ViolationType};

pub const ALERT_LOG_CAPACITY: usize = 1000;

/// Window for the naive safety score, in milliseconds.
const SCORE_WINDOW_MS: u64 = 10 * 60 * 1000;

pub type SharedAlertLog = Arc<Mutex<AlertLog>>;

#[derive(Clone, Debug, Serialize)]
pub struct AlertStats {
    pub total: usize,
    pub by_type: HashMap<ViolationType, u64>,
    pub safety_score: u32,
}

pub struct AlertLog {
    entries: VecDeque<AlertPayload>,
    capacity: usize,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_capacity(ALERT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(ALERT_LOG_CAPACITY)),
            capacity,
        }
    }

    pub fn shared() -> SharedAlertLog {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append, evicting the oldest entry when at capacity.
    pub fn append(&mut self, alert: AlertPayload) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(alert);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn oldest(&self) -> Option<&AlertPayload> {
        self.entries.front()
    }

    /// Alerts strictly newer than `ts_ms`, oldest first.
    pub fn since(&self, ts_ms: u64) -> Vec<AlertPayload> {
        self.entries
            .iter()
            .filter(|a| a.ts > ts_ms)
            .cloned()
            .collect()
    }

    /// The most recent `n` alerts, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AlertPayload> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Totals plus a naive safety score: 100 minus 5 per alert in the last
    /// ten minutes, floored at zero.
    pub fn stats(&self, now_ms: u64) -> AlertStats {
        let mut by_type: HashMap<ViolationType, u64> = HashMap::new();
        for alert in &self.entries {
            *by_type.entry(alert.alert_type).or_insert(0) += 1;
        }
        let window_start = now_ms.saturating_sub(SCORE_WINDOW_MS);
        let recent = self.entries.iter().filter(|a| a.ts >= window_start).count() as u32;
        AlertStats {
            total: self.entries.len(),
            by_type,
            safety_score: 100u32.saturating_sub(recent.saturating_mul(5)),
        }
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
