use crate::{
    settings::UserSettings,
    timer::{TimerPhase, TimerSnapshot, TimerState},
    AppState,
};

pub async fn get_timer_state(state: &AppState) -> Result<TimerSnapshot, String> {
    Ok(state.timer.get_snapshot().await)
}

pub async fn set_session_length(state: &AppState, minutes: f64) -> Result<TimerState, String> {
    state
        .timer
        .configure_minutes(minutes)
        .await
        .map_err(|e| e.to_string())
}

/// Stores new session and break defaults. Later resets use the new session length.
pub async fn set_defaults(
    state: &AppState,
    session_minutes: f64,
    break_minutes: f64,
) -> Result<UserSettings, String> {
    let session_length_secs = positive_secs("session", session_minutes)?;
    let break_length_secs = positive_secs("break", break_minutes)?;

    let mut settings = state.settings.snapshot();
    settings.session_length_secs = session_length_secs;
    settings.break_length_secs = break_length_secs;
    state
        .settings
        .update(settings.clone())
        .map_err(|e| format!("{e:#}"))?;

    state.timer.set_baseline(session_length_secs).await;
    Ok(settings)
}

fn positive_secs(what: &str, minutes: f64) -> Result<u64, String> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(format!("invalid {what} length: {minutes}"));
    }
    Ok(((minutes * 60.0).round() as u64).max(1))
}

pub async fn start_timer(state: &AppState) -> Result<TimerState, String> {
    state.timer.start().await.map_err(|e| e.to_string())
}

/// The single Start / Pause / Resume button.
pub async fn toggle_timer(state: &AppState) -> Result<TimerState, String> {
    let current = state.timer.get_state().await;
    if current.phase == TimerPhase::Idle {
        return state.timer.start().await.map_err(|e| e.to_string());
    }

    if !state.timer.toggle().await {
        return Err(format!("timer is {}; nothing to pause", current.phase));
    }
    Ok(state.timer.get_state().await)
}

pub async fn reset_timer(state: &AppState) -> Result<TimerState, String> {
    Ok(state.timer.reset().await)
}

/// Starts a rest countdown; falls back to the configured default length.
pub async fn start_break(state: &AppState, minutes: Option<f64>) -> Result<TimerState, String> {
    let secs = match minutes {
        Some(minutes) if minutes.is_finite() => (minutes * 60.0).round() as i64,
        Some(minutes) => return Err(format!("invalid break length: {minutes}")),
        None => state.settings.break_length_secs() as i64,
    };
    state
        .timer
        .request_break(secs)
        .await
        .map_err(|e| e.to_string())
}

pub async fn skip_break(state: &AppState) -> Result<TimerState, String> {
    state.timer.skip_break().await.map_err(|e| e.to_string())
}

pub async fn continue_reading(state: &AppState) -> Result<TimerState, String> {
    state
        .timer
        .continue_reading()
        .await
        .map_err(|e| e.to_string())
}
