//! The shared book ledger: one row per owned copy.
//!
//! Rows are addressed by a synthetic UUID rather than by their position, so
//! deleting one row never changes which book another id refers to. Listings
//! come back in insertion order.

use crate::db;
use crate::error::LedgerError;
use crate::models::{LedgerColumn, LedgerRow, LoanStatus, NewLedgerRow};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const ROW_COLUMNS: &str = "id, owner, isbn, title, author, status, borrower, due_date, cover_url, reading_progress, added_at";

pub trait LedgerStore {
    fn append(&self, row: NewLedgerRow) -> Result<LedgerRow, LedgerError>;
    fn rows(&self) -> Result<Vec<LedgerRow>, LedgerError>;
    fn rows_for_owner(&self, owner: &str) -> Result<Vec<LedgerRow>, LedgerError>;
    fn get(&self, id: &str) -> Result<Option<LedgerRow>, LedgerError>;
    fn update(&self, id: &str, column: LedgerColumn, value: &str) -> Result<LedgerRow, LedgerError>;
    fn delete(&self, id: &str) -> Result<(), LedgerError>;
}

pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self::new(db::open_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Ok(Self::new(db::open_in_memory()?))
    }

    fn query_rows(&self, sql: &str, owner: Option<&str>) -> Result<Vec<LedgerRow>, LedgerError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match owner {
            Some(owner) => stmt.query_map(params![owner], map_row)?,
            None => stmt.query_map([], map_row)?,
        };
        let rows = rows.collect::<Result<Vec<RawRow>, _>>()?;
        rows.into_iter().map(RawRow::into_row).collect()
    }
}

impl LedgerStore for SqliteLedger {
    fn append(&self, row: NewLedgerRow) -> Result<LedgerRow, LedgerError> {
        let stored = LedgerRow {
            id: Uuid::new_v4().to_string(),
            owner: row.owner,
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            status: row.status,
            borrower: row.borrower,
            due_date: row.due_date,
            cover_url: row.cover_url,
            reading_progress: row.reading_progress,
            added_at: chrono::Utc::now().timestamp_millis(),
        };
        self.conn.execute(
            "INSERT INTO ledger_rows (id, owner, isbn, title, author, status, borrower, due_date, cover_url, reading_progress, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                stored.id,
                stored.owner,
                stored.isbn,
                stored.title,
                stored.author,
                stored.status.as_str(),
                stored.borrower,
                format_date(stored.due_date),
                stored.cover_url,
                stored.reading_progress,
                stored.added_at
            ],
        )?;
        log::info!("ledger append {} \"{}\" for {}", stored.id, stored.title, stored.owner);
        Ok(stored)
    }

    fn rows(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        self.query_rows(
            &format!("SELECT {} FROM ledger_rows ORDER BY added_at, rowid", ROW_COLUMNS),
            None,
        )
    }

    fn rows_for_owner(&self, owner: &str) -> Result<Vec<LedgerRow>, LedgerError> {
        self.query_rows(
            &format!(
                "SELECT {} FROM ledger_rows WHERE owner = ?1 ORDER BY added_at, rowid",
                ROW_COLUMNS
            ),
            Some(owner),
        )
    }

    fn get(&self, id: &str) -> Result<Option<LedgerRow>, LedgerError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM ledger_rows WHERE id = ?1", ROW_COLUMNS),
                params![id],
                map_row,
            )
            .optional()?;
        raw.map(RawRow::into_row).transpose()
    }

    fn update(&self, id: &str, column: LedgerColumn, value: &str) -> Result<LedgerRow, LedgerError> {
        let value = validate_value(column, value)?;
        let changed = self.conn.execute(
            &format!("UPDATE ledger_rows SET {} = ?1 WHERE id = ?2", column.name()),
            params![value, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::RowNotFound(id.to_string()));
        }
        self.get(id)?
            .ok_or_else(|| LedgerError::RowNotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<(), LedgerError> {
        let changed = self
            .conn
            .execute("DELETE FROM ledger_rows WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::RowNotFound(id.to_string()));
        }
        log::info!("ledger delete {}", id);
        Ok(())
    }
}

/// Canonical stored form of `value` for `column`, or why it was rejected.
fn validate_value(column: LedgerColumn, value: &str) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    match column {
        LedgerColumn::Status => trimmed
            .parse::<LoanStatus>()
            .map(|status| status.as_str().to_string())
            .map_err(|message| invalid(column, message)),
        LedgerColumn::DueDate => {
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(|date| date.format(DATE_FORMAT).to_string())
                .map_err(|err| invalid(column, format!("{} ({})", trimmed, err)))
        }
        LedgerColumn::Owner | LedgerColumn::Title if trimmed.is_empty() => {
            Err(invalid(column, "must not be empty".to_string()))
        }
        _ => Ok(trimmed.to_string()),
    }
}

fn invalid(column: LedgerColumn, message: String) -> LedgerError {
    LedgerError::InvalidValue {
        column: column.name().to_string(),
        message,
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|value| value.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Row as stored; status and due date are parsed after the query completes.
struct RawRow {
    id: String,
    owner: String,
    isbn: String,
    title: String,
    author: String,
    status: String,
    borrower: String,
    due_date: String,
    cover_url: String,
    reading_progress: String,
    added_at: i64,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        owner: row.get(1)?,
        isbn: row.get(2)?,
        title: row.get(3)?,
        author: row.get(4)?,
        status: row.get(5)?,
        borrower: row.get(6)?,
        due_date: row.get(7)?,
        cover_url: row.get(8)?,
        reading_progress: row.get(9)?,
        added_at: row.get(10)?,
    })
}

impl RawRow {
    fn into_row(self) -> Result<LedgerRow, LedgerError> {
        let status = self
            .status
            .parse::<LoanStatus>()
            .map_err(|message| invalid(LedgerColumn::Status, message))?;
        let due_date = if self.due_date.trim().is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(self.due_date.trim(), DATE_FORMAT).map_err(|err| {
                    invalid(LedgerColumn::DueDate, format!("{} ({})", self.due_date, err))
                })?,
            )
        };
        Ok(LedgerRow {
            id: self.id,
            owner: self.owner,
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            status,
            borrower: self.borrower,
            due_date,
            cover_url: self.cover_url,
            reading_progress: self.reading_progress,
            added_at: self.added_at,
        })
    }
}
