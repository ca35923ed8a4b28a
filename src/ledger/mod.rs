//! Per-book progress ledger.
//!
//! The whole sequence is re-serialized into one store slot after every
//! mutation. Records are stored by `id`, but session merges find their book
//! by exact title through `title_index`.

pub mod commands;

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use uuid::Uuid;

use crate::{
    error::{LedgerError, LedgerResult},
    log_info, log_warn,
    models::{
        book::{DEFAULT_TOTAL_PAGES, UNKNOWN_AUTHOR},
        BookMetadata, BookRecord, BookStatus, ReadingHint, SessionEntry, SessionOutcome,
        StatusFilter,
    },
    store::KeyValueStore,
};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_STORAGE_KEY: &str = "readingProgress";

pub struct Ledger {
    books: Vec<BookRecord>,
    title_index: HashMap<String, usize>,
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl Ledger {
    /// Reads the slot once. A missing or unreadable blob yields an empty ledger.
    pub fn load(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let books = match store.get(&key) {
            Ok(Some(raw)) => parse_books(&key, &raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                log_warn!("Failed to read ledger slot '{key}', starting empty: {err:#}");
                Vec::new()
            }
        };

        log_info!("Loaded {} book(s) from '{key}'", books.len());
        let title_index = build_title_index(&books);
        Self {
            books,
            title_index,
            store,
            key,
        }
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn get(&self, id: &str) -> Option<&BookRecord> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Exact, case-sensitive match; the first record wins on duplicates.
    pub fn find_by_title(&self, title: &str) -> Option<&BookRecord> {
        self.title_index
            .get(title)
            .and_then(|&index| self.books.get(index))
    }

    pub fn reading_hint(&self, title: &str) -> Option<ReadingHint> {
        self.find_by_title(title).map(ReadingHint::from)
    }

    pub fn filter(&self, status: StatusFilter) -> Vec<&BookRecord> {
        self.books
            .iter()
            .filter(|book| status.matches(book))
            .collect()
    }

    /// Merges a finished session into the matching book, or creates it.
    pub fn record_session(&mut self, entry: SessionEntry) -> LedgerResult<SessionOutcome> {
        if entry.title.trim().is_empty() {
            return Err(LedgerError::Validation(
                "a book title is required to save a session".into(),
            ));
        }

        let mut books = self.books.clone();
        let (index, pages_advanced) = match self.title_index.get(&entry.title).copied() {
            Some(index) => {
                let book = &mut books[index];
                if entry.reached_page < book.current_page {
                    log_warn!(
                        "'{}' moved back from page {} to {}",
                        book.title,
                        book.current_page,
                        entry.reached_page
                    );
                }
                let advanced = entry.reached_page.saturating_sub(book.current_page);
                book.current_page = entry.reached_page;
                append_note(&mut book.note, &entry.note_text);
                book.status = entry.status;
                (index, Some(advanced))
            }
            None => {
                let author = entry
                    .author
                    .filter(|author| !author.is_empty())
                    .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
                let total_pages = entry
                    .total_pages_hint
                    .filter(|&pages| pages > 0)
                    .unwrap_or(DEFAULT_TOTAL_PAGES);
                books.push(BookRecord {
                    id: Uuid::new_v4().to_string(),
                    title: entry.title.clone(),
                    author,
                    current_page: entry.reached_page,
                    total_pages,
                    note: entry.note_text.clone(),
                    status: entry.status,
                });
                (books.len() - 1, None)
            }
        };

        let book = &mut books[index];
        if book.is_complete() {
            book.status = BookStatus::Finished;
        }
        let book = book.clone();

        self.commit(books)?;
        match pages_advanced {
            Some(pages) => log_info!("Updated '{}' (+{pages} pages)", book.title),
            None => log_info!("Added '{}' ({})", book.title, book.id),
        }

        Ok(SessionOutcome {
            book,
            pages_advanced,
        })
    }

    /// Plain overwrite of the metadata fields; the note is left alone.
    pub fn edit_metadata(&mut self, id: &str, metadata: BookMetadata) -> LedgerResult<BookRecord> {
        if metadata.title.trim().is_empty() {
            return Err(LedgerError::Validation("book title must not be empty".into()));
        }

        let mut books = self.books.clone();
        let book = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        book.title = metadata.title;
        book.author = metadata.author;
        book.current_page = metadata.current_page;
        book.total_pages = metadata.total_pages;
        book.status = metadata.status;
        let updated = book.clone();

        self.commit(books)?;
        log_info!("Edited '{}' ({id})", updated.title);
        Ok(updated)
    }

    /// Replaces the whole note, unlike session merges which append.
    pub fn edit_note(&mut self, id: &str, note: &str) -> LedgerResult<BookRecord> {
        let mut books = self.books.clone();
        let book = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        book.note = note.trim().to_string();
        let updated = book.clone();

        self.commit(books)?;
        log_info!("Replaced note of '{}' ({id})", updated.title);
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> LedgerResult<BookRecord> {
        let mut books = self.books.clone();
        let position = books
            .iter()
            .position(|book| book.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        let removed = books.remove(position);

        self.commit(books)?;
        log_info!("Deleted '{}' ({id})", removed.title);
        Ok(removed)
    }

    /// Persists first; memory only changes once the store accepted the blob.
    fn commit(&mut self, books: Vec<BookRecord>) -> LedgerResult<()> {
        let serialized =
            serde_json::to_string(&books).context("failed to serialize ledger")?;
        self.store
            .set(&self.key, &serialized)
            .with_context(|| format!("failed to persist ledger to '{}'", self.key))?;

        self.title_index = build_title_index(&books);
        self.books = books;
        Ok(())
    }
}

/// Parses records one at a time so a single malformed entry cannot drop the rest.
fn parse_books(key: &str, raw: &str) -> Vec<BookRecord> {
    let entries = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(entries) => entries,
        Err(err) => {
            log_warn!("Ledger slot '{key}' is not a JSON array, starting empty: {err}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| match serde_json::from_value::<BookRecord>(entry) {
            Ok(book) => Some(book),
            Err(err) => {
                log_warn!("Skipping unreadable record #{position} in '{key}': {err}");
                None
            }
        })
        .collect()
}

fn build_title_index(books: &[BookRecord]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(books.len());
    for (position, book) in books.iter().enumerate() {
        index.entry(book.title.clone()).or_insert(position);
    }
    index
}

fn append_note(note: &mut String, addition: &str) {
    if addition.is_empty() {
        return;
    }
    if !note.is_empty() {
        note.push('\n');
    }
    note.push_str(addition);
}
