use serde::{Deserialize, Serialize};

use super::book::{BookRecord, BookStatus};

/// What the user reports once a session is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub title: String,
    pub author: Option<String>,
    pub total_pages_hint: Option<u32>,
    pub reached_page: u32,
    #[serde(default)]
    pub note_text: String,
    #[serde(default)]
    pub status: BookStatus,
}

impl SessionEntry {
    pub fn new(title: impl Into<String>, reached_page: u32) -> Self {
        Self {
            title: title.into(),
            author: None,
            total_pages_hint: None,
            reached_page,
            note_text: String::new(),
            status: BookStatus::Reading,
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages_hint = Some(total_pages);
        self
    }

    pub fn note(mut self, note_text: impl Into<String>) -> Self {
        self.note_text = note_text.into();
        self
    }

    pub fn status(mut self, status: BookStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub book: BookRecord,
    /// `None` when the session created the record.
    pub pages_advanced: Option<u32>,
}

impl SessionOutcome {
    pub fn progress_message(&self) -> Option<String> {
        self.pages_advanced.map(|pages| {
            let suffix = if pages == 1 { "" } else { "s" };
            format!("You progressed by {pages} page{suffix}")
        })
    }

    pub fn finished_book(&self) -> bool {
        self.book.status == BookStatus::Finished && self.book.is_complete()
    }
}

/// Prefill data for a timer entered with a pre-selected title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingHint {
    pub title: String,
    pub author: String,
    pub current_page: u32,
    pub total_pages: u32,
}

impl ReadingHint {
    pub fn message(&self) -> String {
        format!(
            "You are currently on page {} of {}",
            self.current_page, self.total_pages
        )
    }
}

impl From<&BookRecord> for ReadingHint {
    fn from(book: &BookRecord) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            current_page: book.current_page,
            total_pages: book.total_pages,
        }
    }
}
