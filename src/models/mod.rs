pub mod book;
pub mod pause;
pub mod session;
pub mod suggestion;

pub use book::{BookMetadata, BookRecord, BookStatus, StatusFilter};
pub use pause::PauseWindow;
pub use session::{ReadingHint, SessionEntry, SessionOutcome};
pub use suggestion::Suggestion;
