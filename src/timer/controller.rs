use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::error::TimerError;

use super::{TimerEvent, TimerState};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub display: String,
    pub button_label: &'static str,
    pub paused_ms: u64,
    pub progress_ratio: f64,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Clonable handle owning the timer state and its single tick task.
///
/// The tick task exists only while the phase is `running` or `break`; every
/// operation re-evaluates that and spawns or cancels it. Dropping the last
/// handle cancels the task.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    events: broadcast::Sender<TimerEvent>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl TimerController {
    pub fn new(default_length_secs: u64, debug_mode: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(TimerState::new(default_length_secs))),
            ticker: Arc::new(Mutex::new(None)),
            events,
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 60 },
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let guard = self.state.lock().await;
        TimerSnapshot {
            display: guard.display(),
            button_label: guard.button_label(),
            paused_ms: guard.paused_ms(Utc::now()),
            progress_ratio: guard.progress_ratio(),
            state: guard.clone(),
        }
    }

    pub async fn configure(&self, length_secs: i64) -> Result<TimerState, TimerError> {
        self.apply(|state| state.configure(length_secs)).await
    }

    pub async fn configure_minutes(&self, minutes: f64) -> Result<TimerState, TimerError> {
        self.apply(|state| state.configure_minutes(minutes)).await
    }

    pub async fn start(&self) -> Result<TimerState, TimerError> {
        self.apply(|state| state.start(Utc::now())).await
    }

    /// Returns `false` when the phase has nothing to pause or resume.
    pub async fn toggle(&self) -> bool {
        let changed = self.state.lock().await.toggle(Utc::now());
        if changed {
            self.sync_ticker().await;
        }
        changed
    }

    pub async fn reset(&self) -> TimerState {
        self.state.lock().await.reset();
        self.cancel_ticker().await;
        self.get_state().await
    }

    pub async fn set_baseline(&self, length_secs: u64) -> TimerState {
        self.state.lock().await.set_baseline(length_secs);
        self.get_state().await
    }

    pub async fn request_break(&self, break_length_secs: i64) -> Result<TimerState, TimerError> {
        self.apply(|state| state.request_break(break_length_secs)).await
    }

    pub async fn skip_break(&self) -> Result<TimerState, TimerError> {
        let event = self.state.lock().await.skip_break(Utc::now())?;
        self.sync_ticker().await;
        info!("Break skipped; reading resumed");
        let _ = self.events.send(event);
        Ok(self.get_state().await)
    }

    pub async fn continue_reading(&self) -> Result<TimerState, TimerError> {
        self.apply(|state| state.continue_reading(Utc::now())).await
    }

    async fn apply<F>(&self, op: F) -> Result<TimerState, TimerError>
    where
        F: FnOnce(&mut TimerState) -> Result<(), TimerError>,
    {
        {
            let mut guard = self.state.lock().await;
            op(&mut guard)?;
        }
        self.sync_ticker().await;
        Ok(self.get_state().await)
    }

    async fn sync_ticker(&self) {
        let ticking = self.state.lock().await.is_ticking();
        if ticking {
            self.spawn_ticker().await;
        } else {
            self.cancel_ticker().await;
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        // Dropping the previous ticker cancels it.
        ticker_guard.take();

        let state = self.state.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks.max(1);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let start = time::Instant::now() + tick_interval;
            let mut interval = time::interval_at(start, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let (event, still_ticking, display) = {
                    let mut guard = state.lock().await;
                    if token.is_cancelled() || !guard.is_ticking() {
                        break;
                    }
                    let event = guard.tick(Utc::now());
                    (event, guard.is_ticking(), guard.display())
                };

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    debug!("Timer heartbeat: {display}");
                }

                if let Some(event) = event {
                    match event {
                        TimerEvent::SessionFinished { paused_ms } => {
                            info!("Reading session finished ({paused_ms} ms paused)")
                        }
                        TimerEvent::BreakFinished => info!("Break finished; reading resumed"),
                    }
                    let _ = events.send(event);
                }

                if !still_ticking {
                    break;
                }
            }
        });

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        self.ticker.lock().await.take();
    }
}
