use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const DEFAULT_TOTAL_PAGES: u32 = 300;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BookStatus {
    #[default]
    Reading,
    Finished,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Reading => "reading",
            BookStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reading" => Some(BookStatus::Reading),
            "finished" => Some(BookStatus::Finished),
            _ => None,
        }
    }
}

/// One persisted entry of the ledger, keyed by the camelCase names of the
/// stored JSON blob. Page counts written as null, fractions or strings are
/// read back as plain numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, deserialize_with = "lenient_page")]
    pub current_page: u32,
    #[serde(default, deserialize_with = "lenient_page")]
    pub total_pages: u32,
    /// Append-only session log, entries separated by `\n`.
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub status: BookStatus,
}

impl BookRecord {
    /// Percentage shown on the progress bar, capped at 100.
    pub fn progress_percent(&self) -> u32 {
        if self.total_pages == 0 {
            return 0;
        }
        let ratio = f64::from(self.current_page) / f64::from(self.total_pages) * 100.0;
        (ratio.round() as u32).min(100)
    }

    pub fn is_complete(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// null → 0, fractions truncate, negatives clamp to 0, numeric strings parse.
fn lenient_page<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => Ok(number.as_f64().map_or(0, |pages| pages as u32)),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(|pages| pages as u32)
            .map_err(|_| de::Error::custom(format!("page count '{text}' is not a number"))),
        Some(other) => Err(de::Error::custom(format!("page count {other} is not a number"))),
    }
}

/// Direct overwrite payload for `Ledger::edit_metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub status: BookStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Reading,
    Finished,
}

impl StatusFilter {
    pub fn matches(&self, book: &BookRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Reading => book.status == BookStatus::Reading,
            StatusFilter::Finished => book.status == BookStatus::Finished,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(StatusFilter::All),
            "reading" => Some(StatusFilter::Reading),
            "finished" => Some(StatusFilter::Finished),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(current_page: u32, total_pages: u32) -> BookRecord {
        BookRecord {
            id: "1".into(),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            current_page,
            total_pages,
            note: String::new(),
            status: BookStatus::Reading,
        }
    }

    #[test]
    fn progress_is_rounded_and_capped() {
        assert_eq!(book(50, 412).progress_percent(), 12);
        assert_eq!(book(500, 412).progress_percent(), 100);
        assert_eq!(book(10, 0).progress_percent(), 0);
    }

    #[test]
    fn deserializes_stored_blob_shape() {
        let raw = r#"{"id":"1700000000000","title":"Dune","author":"Frank Herbert",
            "currentPage":50,"totalPages":412,"note":"great start","status":"reading"}"#;
        let record: BookRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.current_page, 50);
        assert_eq!(record.status, BookStatus::Reading);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalPages"], 412);
        assert_eq!(json["status"], "reading");
    }

    #[test]
    fn loose_page_counts_degrade_to_numbers() {
        let raw = r#"{"id":"2","title":"Solaris","author":"Stanisław Lem",
            "currentPage":null,"totalPages":"204"}"#;
        let record: BookRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.current_page, 0);
        assert_eq!(record.total_pages, 204);

        let raw = r#"{"id":"3","title":"Ubik","author":"Philip K. Dick",
            "currentPage":12.7,"totalPages":-5}"#;
        let record: BookRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.current_page, 12);
        assert_eq!(record.total_pages, 0);

        let raw = r#"{"id":"4","title":"Ubik","author":"Philip K. Dick","totalPages":202}"#;
        assert_eq!(serde_json::from_str::<BookRecord>(raw).unwrap().current_page, 0);

        let raw = r#"{"id":"5","title":"Ubik","author":"","currentPage":"twelve","totalPages":1}"#;
        assert!(serde_json::from_str::<BookRecord>(raw).is_err());
    }

    #[test]
    fn filter_projects_by_status() {
        let mut finished = book(412, 412);
        finished.status = BookStatus::Finished;
        let reading = book(1, 412);

        assert!(StatusFilter::All.matches(&finished));
        assert!(StatusFilter::Finished.matches(&finished));
        assert!(!StatusFilter::Finished.matches(&reading));
        assert!(StatusFilter::Reading.matches(&reading));
    }
}
