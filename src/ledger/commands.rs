use crate::{
    models::{BookMetadata, BookRecord, ReadingHint, SessionEntry, SessionOutcome, StatusFilter},
    timer::TimerPhase,
    AppState,
};

pub async fn list_books(
    state: &AppState,
    filter: StatusFilter,
) -> Result<Vec<BookRecord>, String> {
    let ledger = state.ledger.lock().await;
    Ok(ledger.filter(filter).into_iter().cloned().collect())
}

/// Saves the post-session form. From a completed session the timer either
/// restarts the countdown (`continue_reading`) or goes back to idle.
pub async fn save_reading(
    state: &AppState,
    entry: SessionEntry,
    continue_reading: bool,
) -> Result<SessionOutcome, String> {
    let outcome = state
        .ledger
        .lock()
        .await
        .record_session(entry)
        .map_err(|e| e.to_string())?;

    if state.timer.get_state().await.phase == TimerPhase::Completed {
        if continue_reading {
            state
                .timer
                .continue_reading()
                .await
                .map_err(|e| e.to_string())?;
        } else {
            state.timer.reset().await;
        }
    }

    Ok(outcome)
}

pub async fn update_book(
    state: &AppState,
    id: String,
    metadata: BookMetadata,
) -> Result<BookRecord, String> {
    state
        .ledger
        .lock()
        .await
        .edit_metadata(&id, metadata)
        .map_err(|e| e.to_string())
}

pub async fn update_note(state: &AppState, id: String, note: String) -> Result<BookRecord, String> {
    state
        .ledger
        .lock()
        .await
        .edit_note(&id, &note)
        .map_err(|e| e.to_string())
}

pub async fn delete_book(state: &AppState, id: String) -> Result<(), String> {
    state
        .ledger
        .lock()
        .await
        .delete(&id)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Prefill for a timer opened with a pre-selected title.
pub async fn get_reading_hint(
    state: &AppState,
    title: String,
) -> Result<Option<ReadingHint>, String> {
    Ok(state.ledger.lock().await.reading_hint(&title))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        settings::SettingsStore,
        store::{test_support::temp_path, MemoryStore},
        suggest::OfflineCatalog,
        timer::TimerEvent,
    };

    fn app_state() -> AppState {
        AppState::new(
            SettingsStore::new(temp_path("settings.json")).unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(OfflineCatalog),
            false,
        )
    }

    async fn finish_session(state: &AppState) {
        let mut events = state.timer.subscribe();
        state.timer.configure(2).await.unwrap();
        state.timer.start().await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, TimerEvent::SessionFinished { .. }));
        assert_eq!(state.timer.get_state().await.phase, TimerPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_returns_timer_to_idle() {
        let state = app_state();
        finish_session(&state).await;

        let outcome = save_reading(&state, SessionEntry::new("Dune", 40), false)
            .await
            .unwrap();
        assert_eq!(outcome.book.current_page, 40);

        let timer = state.timer.get_state().await;
        assert_eq!(timer.phase, TimerPhase::Idle);
        assert_eq!(timer.remaining_secs, 1500);
        assert_eq!(timer.button_label(), "Start");
    }

    #[tokio::test(start_paused = true)]
    async fn continuing_restarts_the_countdown() {
        let state = app_state();
        finish_session(&state).await;

        save_reading(&state, SessionEntry::new("Dune", 40), true)
            .await
            .unwrap();

        let timer = state.timer.get_state().await;
        assert_eq!(timer.phase, TimerPhase::Running);
        assert_eq!(timer.remaining_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn saving_mid_session_leaves_timer_alone() {
        let state = app_state();
        state.timer.start().await.unwrap();

        save_reading(&state, SessionEntry::new("Dune", 40), false)
            .await
            .unwrap();
        assert_eq!(state.timer.get_state().await.phase, TimerPhase::Running);
    }
}
