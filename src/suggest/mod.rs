//! Book suggestions from a public catalog search.
//!
//! Lookups never fail outward: transport errors and empty payloads both end
//! up as an empty list. Each refresh is tagged with a ticket so a slow older
//! response cannot overwrite a newer one.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    log_error, log_info,
    models::{
        book::{DEFAULT_TOTAL_PAGES, UNKNOWN_AUTHOR},
        Suggestion,
    },
    settings::LookupSettings,
};

mod google;

pub use google::{GoogleBooksCatalog, GOOGLE_BOOKS_URL};

const ENABLE_LOGS: bool = true;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub text: String,
    /// Restrict matching to titles (`intitle:` prefix).
    pub title_only: bool,
    pub lang_restrict: Option<String>,
    pub max_results: u32,
}

impl CatalogQuery {
    pub fn q(&self) -> String {
        if self.title_only {
            format!("intitle:{}", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// The subset of the catalog's volume payload we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeList {
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub page_count: Option<u32>,
}

#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn search(&self, query: &CatalogQuery) -> Result<VolumeList>;
}

/// Catalog that never finds anything. Used when lookups are switched off.
pub struct OfflineCatalog;

#[async_trait]
impl BookCatalog for OfflineCatalog {
    async fn search(&self, _query: &CatalogQuery) -> Result<VolumeList> {
        Ok(VolumeList::default())
    }
}

impl From<VolumeInfo> for Suggestion {
    fn from(info: VolumeInfo) -> Self {
        let title = info
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let author = info
            .authors
            .filter(|authors| !authors.is_empty())
            .map(|authors| authors.join(", "))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let total_pages = info
            .page_count
            .filter(|&pages| pages > 0)
            .unwrap_or(DEFAULT_TOTAL_PAGES);

        Suggestion {
            title,
            author,
            total_pages,
        }
    }
}

pub fn to_suggestions(list: VolumeList) -> Vec<Suggestion> {
    list.items
        .into_iter()
        .map(|volume| Suggestion::from(volume.volume_info))
        .collect()
}

/// General search first, then one title-restricted retry if that came back empty.
pub async fn lookup(
    catalog: &dyn BookCatalog,
    text: &str,
    settings: &LookupSettings,
) -> Vec<Suggestion> {
    if text.trim().is_empty() || text.chars().count() < settings.min_query_chars {
        return Vec::new();
    }

    let mut query = CatalogQuery {
        text: text.to_string(),
        title_only: false,
        lang_restrict: settings.lang_restrict.clone(),
        max_results: settings.max_results,
    };

    for _ in 0..2 {
        match catalog.search(&query).await {
            Ok(list) => {
                let suggestions = to_suggestions(list);
                if !suggestions.is_empty() {
                    return suggestions;
                }
            }
            Err(err) => {
                log_error!("Catalog search for '{}' failed: {err:#}", query.q());
                return Vec::new();
            }
        }
        if query.title_only {
            break;
        }
        query.title_only = true;
    }

    Vec::new()
}

/// Latest-wins holder for the suggestion list shown under a search box.
pub struct SuggestionFeed {
    catalog: Arc<dyn BookCatalog>,
    settings: LookupSettings,
    issued: AtomicU64,
    current: Mutex<Vec<Suggestion>>,
}

impl SuggestionFeed {
    pub fn new(catalog: Arc<dyn BookCatalog>, settings: LookupSettings) -> Self {
        Self {
            catalog,
            settings,
            issued: AtomicU64::new(0),
            current: Mutex::new(Vec::new()),
        }
    }

    /// Runs a lookup and applies it unless a newer refresh was issued meanwhile.
    /// Returns whether the result was applied.
    pub async fn refresh(&self, text: &str) -> bool {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let suggestions = lookup(self.catalog.as_ref(), text, &self.settings).await;

        let mut current = self.current();
        if self.issued.load(Ordering::SeqCst) != ticket {
            log_info!("Dropping stale suggestions for '{text}' (ticket {ticket})");
            return false;
        }
        *current = suggestions;
        true
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.current().clone()
    }

    /// Clears the list and invalidates anything still in flight.
    pub fn clear(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.current().clear();
    }

    fn current(&self) -> MutexGuard<'_, Vec<Suggestion>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
