//! Line-oriented front end standing in for the timer and books pages.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::warn;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};

use crate::{
    ledger::commands as ledger_cmd,
    models::{BookMetadata, BookStatus, SessionEntry, StatusFilter, Suggestion},
    timer::{commands as timer_cmd, TimerEvent},
    AppState,
};

const HELP: &str = "\
commands:
  start | toggle | reset | status
  length <minutes>          set the session length (idle only)
  defaults <session> <break>  default session and break minutes
  break [minutes]           rest after a finished session
  skip                      end the break now
  continue                  start the next session right away
  books [all|reading|finished]
  hint <title>              preselect a book from the ledger
  suggest <query>           search the catalog
  pick <n>                  use suggestion n for the next save
  save <page> <reading|finished> [title] [| note]
  save+ ...                 same as save, then keep reading
  edit <id> <page> <total> <reading|finished> <title> | <author>
  note <id> <text>          replace a book's note
  delete <id>
  quit";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Start,
    Toggle,
    Reset,
    Status,
    Length(f64),
    Defaults {
        session_minutes: f64,
        break_minutes: f64,
    },
    Break(Option<f64>),
    Skip,
    Continue,
    Books(StatusFilter),
    Hint(String),
    Suggest(String),
    Pick(usize),
    Save {
        page: u32,
        status: BookStatus,
        title: Option<String>,
        note: String,
        keep_reading: bool,
    },
    Edit {
        id: String,
        metadata: BookMetadata,
    },
    Note {
        id: String,
        text: String,
    },
    Delete(String),
    Help,
    Quit,
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(at) => (&input[..at], input[at..].trim_start()),
        None => (input, ""),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{what} must be a number, got '{value}'"))
}

fn parse_status(value: &str) -> Result<BookStatus, String> {
    BookStatus::parse(value)
        .ok_or_else(|| format!("status must be reading or finished, got '{value}'"))
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str, String> {
    if value.is_empty() {
        Err(format!("missing {what}"))
    } else {
        Ok(value)
    }
}

pub(crate) fn parse_command(line: &str) -> Result<Command, String> {
    let (word, rest) = split_word(line.trim());
    let command = match word {
        "start" => Command::Start,
        "toggle" | "pause" | "resume" => Command::Toggle,
        "reset" => Command::Reset,
        "status" => Command::Status,
        "length" => Command::Length(parse_number(required(rest, "minutes")?, "minutes")?),
        "defaults" => {
            let (session, rest) = split_word(rest);
            let (brk, _) = split_word(rest);
            Command::Defaults {
                session_minutes: parse_number(required(session, "session minutes")?, "minutes")?,
                break_minutes: parse_number(required(brk, "break minutes")?, "minutes")?,
            }
        }
        "break" if rest.is_empty() => Command::Break(None),
        "break" => Command::Break(Some(parse_number(rest, "minutes")?)),
        "skip" => Command::Skip,
        "continue" => Command::Continue,
        "books" if rest.is_empty() => Command::Books(StatusFilter::All),
        "books" => Command::Books(
            StatusFilter::parse(rest).ok_or_else(|| format!("unknown filter '{rest}'"))?,
        ),
        "hint" => Command::Hint(required(rest, "title")?.to_string()),
        "suggest" => Command::Suggest(rest.to_string()),
        "pick" => {
            let n = required(rest, "suggestion number")?;
            Command::Pick(parse_number(n, "suggestion number")?)
        }
        "save" | "save+" => {
            let (head, note) = match rest.split_once('|') {
                Some((head, note)) => (head, note.trim().to_string()),
                None => (rest, String::new()),
            };
            let (page, head) = split_word(head);
            let (status, title) = split_word(head);
            let title = title.trim();
            Command::Save {
                page: parse_number(required(page, "page")?, "page")?,
                status: parse_status(required(status, "status")?)?,
                title: (!title.is_empty()).then(|| title.to_string()),
                note,
                keep_reading: word == "save+",
            }
        }
        "edit" => {
            let (head, author) = rest
                .split_once('|')
                .ok_or_else(|| "edit needs '<title> | <author>'".to_string())?;
            let (id, head) = split_word(head);
            let (page, head) = split_word(head);
            let (total, head) = split_word(head);
            let (status, title) = split_word(head);
            Command::Edit {
                id: required(id, "id")?.to_string(),
                metadata: BookMetadata {
                    title: title.trim().to_string(),
                    author: author.trim().to_string(),
                    current_page: parse_number(required(page, "page")?, "page")?,
                    total_pages: parse_number(required(total, "total pages")?, "total pages")?,
                    status: parse_status(required(status, "status")?)?,
                },
            }
        }
        "note" => {
            let (id, text) = split_word(rest);
            Command::Note {
                id: required(id, "id")?.to_string(),
                text: text.to_string(),
            }
        }
        "delete" => Command::Delete(required(rest, "id")?.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(command)
}

/// Prefill carried into the next `save`.
#[derive(Debug, Default)]
struct Draft {
    title: Option<String>,
    author: Option<String>,
    total_pages: Option<u32>,
}

impl Draft {
    fn from_suggestion(suggestion: &Suggestion) -> Self {
        Self {
            title: Some(suggestion.title.clone()),
            author: Some(suggestion.author.clone()),
            total_pages: Some(suggestion.total_pages),
        }
    }
}

async fn execute(state: &AppState, draft: &mut Draft, command: Command) -> Result<String, String> {
    let output = match command {
        Command::Start => {
            let timer = timer_cmd::start_timer(state).await?;
            format!("{} ({})", timer.display(), timer.phase)
        }
        Command::Toggle => {
            let timer = timer_cmd::toggle_timer(state).await?;
            format!("{} ({})", timer.display(), timer.phase)
        }
        Command::Reset => timer_cmd::reset_timer(state).await?.display(),
        Command::Status => {
            let snapshot = timer_cmd::get_timer_state(state).await?;
            format!(
                "{} {} [{}] paused {}s",
                snapshot.display,
                snapshot.state.phase,
                snapshot.button_label,
                snapshot.paused_ms / 1000
            )
        }
        Command::Length(minutes) => {
            timer_cmd::set_session_length(state, minutes).await?.display()
        }
        Command::Defaults {
            session_minutes,
            break_minutes,
        } => {
            let settings = timer_cmd::set_defaults(state, session_minutes, break_minutes).await?;
            format!(
                "session {}s, break {}s",
                settings.session_length_secs, settings.break_length_secs
            )
        }
        Command::Break(minutes) => timer_cmd::start_break(state, minutes).await?.display(),
        Command::Skip => timer_cmd::skip_break(state).await?.display(),
        Command::Continue => timer_cmd::continue_reading(state).await?.display(),
        Command::Books(filter) => {
            let books = ledger_cmd::list_books(state, filter).await?;
            if books.is_empty() {
                return Ok("no books".into());
            }
            books
                .iter()
                .map(|book| {
                    format!(
                        "{}  {} by {}  {}/{} ({}%) {}",
                        book.id,
                        book.title,
                        book.author,
                        book.current_page,
                        book.total_pages,
                        book.progress_percent(),
                        book.status.as_str()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Hint(title) => match ledger_cmd::get_reading_hint(state, title.clone()).await? {
            Some(hint) => {
                let message = hint.message();
                *draft = Draft {
                    title: Some(hint.title),
                    author: Some(hint.author),
                    total_pages: Some(hint.total_pages),
                };
                message
            }
            None => {
                *draft = Draft {
                    title: Some(title),
                    ..Draft::default()
                };
                "new book".into()
            }
        },
        Command::Suggest(query) => {
            state.suggestions.refresh(&query).await;
            let suggestions = state.suggestions.suggestions();
            if suggestions.is_empty() {
                return Ok("no suggestions".into());
            }
            suggestions
                .iter()
                .enumerate()
                .map(|(n, s)| {
                    format!("{}. {} by {} ({} pages)", n + 1, s.title, s.author, s.total_pages)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Pick(n) => {
            let suggestions = state.suggestions.suggestions();
            let suggestion = n
                .checked_sub(1)
                .and_then(|index| suggestions.get(index))
                .ok_or_else(|| format!("no suggestion {n}"))?;
            *draft = Draft::from_suggestion(suggestion);
            state.suggestions.clear();
            match ledger_cmd::get_reading_hint(state, suggestion.title.clone()).await? {
                Some(hint) => hint.message(),
                None => format!("picked {}", suggestion.title),
            }
        }
        Command::Save {
            page,
            status,
            title,
            note,
            keep_reading,
        } => {
            let title = title
                .or_else(|| draft.title.clone())
                .ok_or_else(|| "Please select or enter a book title!".to_string())?;
            let mut entry = SessionEntry::new(title.clone(), page).note(note).status(status);
            if draft.title.as_deref() == Some(title.as_str()) {
                entry.author = draft.author.clone();
                entry.total_pages_hint = draft.total_pages;
            }

            let outcome = ledger_cmd::save_reading(state, entry, keep_reading).await?;
            *draft = Draft::default();

            let mut lines = vec![format!(
                "{}: page {}/{} ({})",
                outcome.book.title,
                outcome.book.current_page,
                outcome.book.total_pages,
                outcome.book.status.as_str()
            )];
            if let Some(message) = outcome.progress_message() {
                lines.push(message);
            }
            if outcome.finished_book() {
                lines.push("You finished this book!".into());
            }
            lines.join("\n")
        }
        Command::Edit { id, metadata } => {
            let book = ledger_cmd::update_book(state, id, metadata).await?;
            format!("updated {}", book.title)
        }
        Command::Note { id, text } => {
            let book = ledger_cmd::update_note(state, id, text).await?;
            format!("note of {} replaced", book.title)
        }
        Command::Delete(id) => {
            ledger_cmd::delete_book(state, id).await?;
            "deleted".into()
        }
        Command::Help => HELP.into(),
        Command::Quit => String::new(),
    };
    Ok(output)
}

pub async fn run(state: Arc<AppState>, initial_book: Option<String>) -> Result<()> {
    let mut events = state.timer.subscribe();
    let notifier = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TimerEvent::SessionFinished { .. }) => {
                    println!("\nSession completed! Record it with 'save <page> <status> [title]'.");
                }
                Ok(TimerEvent::BreakFinished) => println!("\nBreak over, back to reading."),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} timer event(s)"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut draft = Draft::default();
    let mut stdout = io::stdout();
    if let Some(title) = initial_book {
        let output = execute(&state, &mut draft, Command::Hint(title))
            .await
            .unwrap_or_else(|err| err);
        stdout.write_all(format!("{output}\n").as_bytes()).await?;
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                stdout.write_all(format!("{err}\n").as_bytes()).await?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        let output = execute(&state, &mut draft, command)
            .await
            .unwrap_or_else(|err| format!("error: {err}"));
        stdout.write_all(format!("{output}\n").as_bytes()).await?;
    }

    notifier.abort();
    state.timer.reset().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        settings::SettingsStore,
        store::{test_support::temp_path, MemoryStore},
        suggest::OfflineCatalog,
        timer::TimerPhase,
    };

    fn app_state() -> AppState {
        AppState::new(
            SettingsStore::new(temp_path("settings.json")).unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(OfflineCatalog),
            false,
        )
    }

    #[test]
    fn parses_timer_commands() {
        assert_eq!(parse_command("start").unwrap(), Command::Start);
        assert_eq!(parse_command("  pause ").unwrap(), Command::Toggle);
        assert_eq!(parse_command("length 0.5").unwrap(), Command::Length(0.5));
        assert_eq!(parse_command("break").unwrap(), Command::Break(None));
        assert_eq!(parse_command("break 10").unwrap(), Command::Break(Some(10.0)));
        assert_eq!(
            parse_command("defaults 45 10").unwrap(),
            Command::Defaults {
                session_minutes: 45.0,
                break_minutes: 10.0,
            }
        );
        assert!(parse_command("defaults 45").is_err());
        assert!(parse_command("length").is_err());
        assert!(parse_command("fly").is_err());
    }

    #[test]
    fn parses_save_with_title_and_note() {
        let command = parse_command("save+ 412 finished Dune Messiah | what a ride").unwrap();
        assert_eq!(
            command,
            Command::Save {
                page: 412,
                status: BookStatus::Finished,
                title: Some("Dune Messiah".into()),
                note: "what a ride".into(),
                keep_reading: true,
            }
        );

        let command = parse_command("save 10 reading").unwrap();
        assert!(matches!(command, Command::Save { title: None, keep_reading: false, .. }));
        assert!(parse_command("save ten reading Dune").is_err());
        assert!(parse_command("save 10 done Dune").is_err());
    }

    #[test]
    fn parses_edit() {
        let command = parse_command("edit abc 5 256 reading Dune Messiah | Frank Herbert").unwrap();
        let Command::Edit { id, metadata } = command else {
            panic!("expected edit");
        };
        assert_eq!(id, "abc");
        assert_eq!(metadata.title, "Dune Messiah");
        assert_eq!(metadata.author, "Frank Herbert");
        assert_eq!(metadata.total_pages, 256);
    }

    #[tokio::test]
    async fn save_uses_hint_draft() {
        let state = app_state();
        let mut draft = Draft::default();

        let missing = execute(&state, &mut draft, parse_command("save 5 reading").unwrap()).await;
        assert_eq!(missing.unwrap_err(), "Please select or enter a book title!");

        execute(&state, &mut draft, Command::Hint("Dune".into())).await.unwrap();
        let save = parse_command("save 50 reading | great start").unwrap();
        let output = execute(&state, &mut draft, save).await.unwrap();
        assert!(output.starts_with("Dune: page 50/300"));

        execute(&state, &mut draft, Command::Hint("Dune".into())).await.unwrap();
        let output = execute(&state, &mut draft, parse_command("save 300 reading").unwrap())
            .await
            .unwrap();
        assert!(output.contains("You progressed by 250 pages"));
        assert!(output.contains("You finished this book!"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_only_works_from_idle() {
        let state = app_state();
        let mut draft = Draft::default();

        let output = execute(&state, &mut draft, Command::Start).await.unwrap();
        assert!(output.ends_with("(running)"));
        let err = execute(&state, &mut draft, Command::Start).await.unwrap_err();
        assert!(err.contains("running"), "{err}");

        execute(&state, &mut draft, Command::Toggle).await.unwrap();
        assert!(execute(&state, &mut draft, Command::Start).await.is_err());
        assert_eq!(state.timer.get_state().await.phase, TimerPhase::PausedRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn defaults_move_the_reset_baseline() {
        let state = app_state();
        let mut draft = Draft::default();

        let command = parse_command("defaults 45 10").unwrap();
        let output = execute(&state, &mut draft, command).await.unwrap();
        assert_eq!(output, "session 2700s, break 600s");
        assert_eq!(state.settings.session_length_secs(), 2700);
        assert_eq!(state.settings.break_length_secs(), 600);
        assert_eq!(state.timer.get_state().await.remaining_secs, 2700);

        execute(&state, &mut draft, Command::Length(1.0)).await.unwrap();
        execute(&state, &mut draft, Command::Start).await.unwrap();
        let output = execute(&state, &mut draft, Command::Reset).await.unwrap();
        assert_eq!(output, "45:00");

        let bad = parse_command("defaults 0 10").unwrap();
        assert!(execute(&state, &mut draft, bad).await.is_err());
        assert_eq!(state.settings.session_length_secs(), 2700);
    }
}
