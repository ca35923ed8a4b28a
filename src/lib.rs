mod console;
pub mod error;
pub mod ledger;
pub mod models;
pub mod settings;
pub mod store;
pub mod suggest;
pub mod timer;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use log::info;
use tokio::sync::Mutex;

use ledger::Ledger;
use settings::SettingsStore;
use store::{JsonFileStore, KeyValueStore, SqliteStore};
use suggest::{BookCatalog, GoogleBooksCatalog, OfflineCatalog, SuggestionFeed};
use timer::TimerController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
}

/// Process-level options read from the environment.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub data_dir: PathBuf,
    pub debug_mode: bool,
    pub store_kind: StoreKind,
    /// Skip network lookups; suggestions stay empty.
    pub offline: bool,
}

impl RuntimeOptions {
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var_os("READTIMER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".readtimer"));
        let debug_mode = env_flag("READTIMER_DEBUG");
        let offline = env_flag("READTIMER_OFFLINE");
        let store_kind = match std::env::var("READTIMER_STORE") {
            Ok(value) if value.eq_ignore_ascii_case("sqlite") => StoreKind::Sqlite,
            Ok(value) if value.is_empty() || value.eq_ignore_ascii_case("json") => StoreKind::Json,
            Ok(value) => return Err(anyhow!("unknown READTIMER_STORE '{value}'")),
            Err(_) => StoreKind::Json,
        };

        Ok(Self {
            data_dir,
            debug_mode,
            store_kind,
            offline,
        })
    }

    pub fn catalog(&self) -> Arc<dyn BookCatalog> {
        if self.offline {
            Arc::new(OfflineCatalog)
        } else {
            Arc::new(GoogleBooksCatalog::new())
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct AppState {
    pub timer: TimerController,
    pub ledger: Mutex<Ledger>,
    pub suggestions: SuggestionFeed,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(
        settings: SettingsStore,
        store: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn BookCatalog>,
        debug_mode: bool,
    ) -> Self {
        let ledger = Ledger::load(store, settings.storage_key());
        let timer = TimerController::new(settings.session_length_secs(), debug_mode);
        let suggestions = SuggestionFeed::new(catalog, settings.lookup());

        Self {
            timer,
            ledger: Mutex::new(ledger),
            suggestions,
            settings,
        }
    }

    pub fn open(options: &RuntimeOptions, catalog: Arc<dyn BookCatalog>) -> Result<Self> {
        std::fs::create_dir_all(&options.data_dir).with_context(|| {
            format!("failed to create data directory {}", options.data_dir.display())
        })?;

        let settings = SettingsStore::new(options.data_dir.join("settings.json"))?;
        let store: Arc<dyn KeyValueStore> = match options.store_kind {
            StoreKind::Json => Arc::new(JsonFileStore::new(options.data_dir.join("storage.json"))?),
            StoreKind::Sqlite => {
                Arc::new(SqliteStore::new(options.data_dir.join("readtimer.sqlite3"))?)
            }
        };

        Ok(Self::new(settings, store, catalog, options.debug_mode))
    }
}

/// Entry point for the `readtimer` binary. `--book <title>` preselects a book.
pub fn run() -> Result<()> {
    let options = RuntimeOptions::from_env()?;
    let initial_book = initial_book(std::env::args().skip(1));
    utils::logging::init(options.debug_mode);

    info!("ReadTimer starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let state = Arc::new(AppState::open(&options, options.catalog())?);
        console::run(state, initial_book).await
    })
}

fn initial_book(mut args: impl Iterator<Item = String>) -> Option<String> {
    while let Some(arg) = args.next() {
        if arg == "--book" {
            return args.next().filter(|title| !title.is_empty());
        }
        if let Some(title) = arg.strip_prefix("--book=") {
            return Some(title.to_string()).filter(|title| !title.is_empty());
        }
    }
    None
}
