use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_ISBN: &str = "Unknown";

/// Bumped whenever the ledger column order changes.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// One normalized search result.
///
/// Every field is always populated: missing catalog data is replaced by the
/// sentinel constants above (or an empty string for cover and year), so callers
/// never branch on presence. Fields are private; a candidate is built once by
/// [`CandidateDraft::finish`] and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookCandidate {
    title: String,
    author: String,
    cover_url: String,
    isbn13: String,
    published_year: String,
    source_name: String,
}

impl BookCandidate {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors joined with `", "`.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Empty when the catalog had no cover art.
    pub fn cover_url(&self) -> &str {
        &self.cover_url
    }

    pub fn has_cover(&self) -> bool {
        !self.cover_url.is_empty()
    }

    pub fn isbn13(&self) -> &str {
        &self.isbn13
    }

    pub fn published_year(&self) -> &str {
        &self.published_year
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Case-insensitive (title, author) key used for cross-source dedup.
    pub fn fingerprint(&self) -> (String, String) {
        (self.title.to_lowercase(), self.author.to_lowercase())
    }
}

/// Raw fields gathered by a catalog adapter before sentinels are applied.
#[derive(Debug, Default, Clone)]
pub struct CandidateDraft {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub cover_url: Option<String>,
    pub isbn13: Option<String>,
    pub published_year: Option<String>,
}

impl CandidateDraft {
    pub fn finish(self, source_name: &str) -> BookCandidate {
        let authors = self
            .authors
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        let author = if authors.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            authors.join(", ")
        };

        BookCandidate {
            title: non_blank(self.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            author,
            cover_url: non_blank(self.cover_url).unwrap_or_default(),
            isbn13: non_blank(self.isbn13).unwrap_or_else(|| UNKNOWN_ISBN.to_string()),
            published_year: non_blank(self.published_year).unwrap_or_default(),
            source_name: source_name.to_string(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoanStatus {
    Available,
    Borrowed,
    Reading,
    NotAvailable,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Available => "Available",
            LoanStatus::Borrowed => "Borrowed",
            LoanStatus::Reading => "Reading",
            LoanStatus::NotAvailable => "Not Available",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match lowered.as_str() {
            "available" => Ok(LoanStatus::Available),
            "borrowed" => Ok(LoanStatus::Borrowed),
            "reading" => Ok(LoanStatus::Reading),
            "not available" | "unavailable" => Ok(LoanStatus::NotAvailable),
            _ => Err(format!("unknown loan status: {}", value.trim())),
        }
    }
}

/// Ledger columns in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerColumn {
    Owner,
    Isbn,
    Title,
    Author,
    Status,
    Borrower,
    DueDate,
    CoverUrl,
    ReadingProgress,
}

pub const LEDGER_COLUMNS: [LedgerColumn; 9] = [
    LedgerColumn::Owner,
    LedgerColumn::Isbn,
    LedgerColumn::Title,
    LedgerColumn::Author,
    LedgerColumn::Status,
    LedgerColumn::Borrower,
    LedgerColumn::DueDate,
    LedgerColumn::CoverUrl,
    LedgerColumn::ReadingProgress,
];

impl LedgerColumn {
    /// Column name, shared by the SQL table and tabular output.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerColumn::Owner => "owner",
            LedgerColumn::Isbn => "isbn",
            LedgerColumn::Title => "title",
            LedgerColumn::Author => "author",
            LedgerColumn::Status => "status",
            LedgerColumn::Borrower => "borrower",
            LedgerColumn::DueDate => "due_date",
            LedgerColumn::CoverUrl => "cover_url",
            LedgerColumn::ReadingProgress => "reading_progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub id: String, // UUID
    pub owner: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub status: LoanStatus,
    pub borrower: String,
    pub due_date: Option<NaiveDate>,
    pub cover_url: String,
    pub reading_progress: String,
    pub added_at: i64,
}

impl LedgerRow {
    /// The row as its fixed-width field tuple, in [`LEDGER_COLUMNS`] order.
    pub fn fields(&self) -> [String; 9] {
        LEDGER_COLUMNS.map(|column| self.field(column))
    }

    pub fn field(&self, column: LedgerColumn) -> String {
        match column {
            LedgerColumn::Owner => self.owner.clone(),
            LedgerColumn::Isbn => self.isbn.clone(),
            LedgerColumn::Title => self.title.clone(),
            LedgerColumn::Author => self.author.clone(),
            LedgerColumn::Status => self.status.to_string(),
            LedgerColumn::Borrower => self.borrower.clone(),
            LedgerColumn::DueDate => self
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            LedgerColumn::CoverUrl => self.cover_url.clone(),
            LedgerColumn::ReadingProgress => self.reading_progress.clone(),
        }
    }
}

/// Fields for a row about to be appended; id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerRow {
    pub owner: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub status: LoanStatus,
    pub borrower: String,
    pub due_date: Option<NaiveDate>,
    pub cover_url: String,
    pub reading_progress: String,
}

impl NewLedgerRow {
    pub fn from_candidate(owner: &str, candidate: &BookCandidate) -> Self {
        Self {
            owner: owner.to_string(),
            isbn: candidate.isbn13().to_string(),
            title: candidate.title().to_string(),
            author: candidate.author().to_string(),
            status: LoanStatus::Available,
            borrower: String::new(),
            due_date: None,
            cover_url: candidate.cover_url().to_string(),
            reading_progress: String::new(),
        }
    }
}
