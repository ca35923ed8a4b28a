use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One frozen stretch of a running session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PauseWindow {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl PauseWindow {
    pub fn open(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
            duration_ms: None,
        }
    }

    pub fn close(&mut self, ended_at: DateTime<Utc>) {
        if self.ended_at.is_some() {
            return;
        }
        self.ended_at = Some(ended_at);
        self.duration_ms = Some(elapsed_ms(self.started_at, ended_at));
    }

    /// Length of the window, measuring an open window up to `now`.
    pub fn duration_until(&self, now: DateTime<Utc>) -> u64 {
        match self.duration_ms {
            Some(ms) => ms,
            None => elapsed_ms(self.started_at, now),
        }
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}
