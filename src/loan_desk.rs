use crate::error::{LedgerError, SessionError};
use crate::ledger::LedgerStore;
use crate::models::{LedgerColumn, LedgerRow, LoanStatus};
use crate::session::owned_row;
use chrono::NaiveDate;

/// Lending and reading-state changes on one owner's rows.
///
/// Every change goes through [`LedgerStore::update`]; multi-field changes are
/// applied column by column with no transaction around them.
pub struct LoanDesk<'a, L> {
    ledger: &'a L,
    owner: &'a str,
}

impl<'a, L: LedgerStore> LoanDesk<'a, L> {
    pub fn new(ledger: &'a L, owner: &'a str) -> Self {
        Self { ledger, owner }
    }

    pub fn lend(
        &self,
        row_id: &str,
        borrower: &str,
        due_date: NaiveDate,
    ) -> Result<LedgerRow, SessionError> {
        let row = owned_row(self.ledger, self.owner, row_id)?;
        if matches!(row.status, LoanStatus::Borrowed | LoanStatus::NotAvailable) {
            return Err(SessionError::NotLendable {
                title: row.title,
                status: row.status.to_string(),
            });
        }
        let borrower = borrower.trim();
        if borrower.is_empty() {
            return Err(SessionError::Ledger(LedgerError::InvalidValue {
                column: "borrower".to_string(),
                message: "must not be empty".to_string(),
            }));
        }

        self.ledger.update(row_id, LedgerColumn::Borrower, borrower)?;
        self.ledger.update(
            row_id,
            LedgerColumn::DueDate,
            &due_date.format("%Y-%m-%d").to_string(),
        )?;
        let row = self
            .ledger
            .update(row_id, LedgerColumn::Status, LoanStatus::Borrowed.as_str())?;
        log::info!("lent \"{}\" to {} until {}", row.title, borrower, due_date);
        Ok(row)
    }

    pub fn return_book(&self, row_id: &str) -> Result<LedgerRow, SessionError> {
        owned_row(self.ledger, self.owner, row_id)?;
        self.ledger.update(row_id, LedgerColumn::Borrower, "")?;
        self.ledger.update(row_id, LedgerColumn::DueDate, "")?;
        let row = self
            .ledger
            .update(row_id, LedgerColumn::Status, LoanStatus::Available.as_str())?;
        log::info!("returned \"{}\"", row.title);
        Ok(row)
    }

    /// Lent-out and unavailable books are not on the shelf to be read.
    pub fn start_reading(&self, row_id: &str) -> Result<LedgerRow, SessionError> {
        let row = owned_row(self.ledger, self.owner, row_id)?;
        refuse_if(&row, "start reading", &[LoanStatus::Borrowed, LoanStatus::NotAvailable])?;
        if row.reading_progress.is_empty() {
            self.ledger
                .update(row_id, LedgerColumn::ReadingProgress, &format_progress(0))?;
        }
        Ok(self
            .ledger
            .update(row_id, LedgerColumn::Status, LoanStatus::Reading.as_str())?)
    }

    /// Record reading progress. Finishing a book (100%) puts it back on the
    /// shelf; progress on an available book marks it as being read.
    pub fn set_progress(&self, row_id: &str, percent: u32) -> Result<LedgerRow, SessionError> {
        let row = owned_row(self.ledger, self.owner, row_id)?;
        let percent = percent.min(100);
        let mut updated = self
            .ledger
            .update(row_id, LedgerColumn::ReadingProgress, &format_progress(percent))?;
        if percent == 100 && row.status == LoanStatus::Reading {
            updated = self
                .ledger
                .update(row_id, LedgerColumn::Status, LoanStatus::Available.as_str())?;
        } else if percent < 100 && row.status == LoanStatus::Available {
            updated = self
                .ledger
                .update(row_id, LedgerColumn::Status, LoanStatus::Reading.as_str())?;
        }
        Ok(updated)
    }

    /// A borrowed book has to be returned first so the loan is not lost.
    pub fn mark_unavailable(&self, row_id: &str) -> Result<LedgerRow, SessionError> {
        let row = owned_row(self.ledger, self.owner, row_id)?;
        refuse_if(&row, "mark unavailable", &[LoanStatus::Borrowed])?;
        Ok(self
            .ledger
            .update(row_id, LedgerColumn::Status, LoanStatus::NotAvailable.as_str())?)
    }

    /// Borrowed rows whose due date is before `today`.
    pub fn overdue(&self, today: NaiveDate) -> Result<Vec<LedgerRow>, SessionError> {
        Ok(self
            .ledger
            .rows_for_owner(self.owner)?
            .into_iter()
            .filter(|row| row.status == LoanStatus::Borrowed)
            .filter(|row| row.due_date.map(|due| due < today).unwrap_or(false))
            .collect())
    }

    pub fn remove(&self, row_id: &str) -> Result<(), SessionError> {
        owned_row(self.ledger, self.owner, row_id)?;
        Ok(self.ledger.delete(row_id)?)
    }
}

fn refuse_if(
    row: &LedgerRow,
    action: &'static str,
    blocked: &[LoanStatus],
) -> Result<(), SessionError> {
    if blocked.contains(&row.status) {
        return Err(SessionError::InvalidTransition {
            action,
            title: row.title.clone(),
            status: row.status.to_string(),
        });
    }
    Ok(())
}

fn format_progress(percent: u32) -> String {
    format!("{}%", percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SqliteLedger;
    use crate::models::NewLedgerRow;

    fn shelve(ledger: &SqliteLedger, owner: &str, title: &str) -> LedgerRow {
        ledger
            .append(NewLedgerRow {
                owner: owner.to_string(),
                isbn: "Unknown".to_string(),
                title: title.to_string(),
                author: "Unknown Author".to_string(),
                status: LoanStatus::Available,
                borrower: String::new(),
                due_date: None,
                cover_url: String::new(),
                reading_progress: String::new(),
            })
            .expect("append")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn lend_and_return_round_trip() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Dune");
        let desk = LoanDesk::new(&ledger, "ana");

        let lent = desk.lend(&row.id, " Ben ", date(2026, 11, 1)).expect("lend");
        assert_eq!(lent.status, LoanStatus::Borrowed);
        assert_eq!(lent.borrower, "Ben");
        assert_eq!(lent.due_date, Some(date(2026, 11, 1)));

        let returned = desk.return_book(&row.id).expect("return");
        assert_eq!(returned.status, LoanStatus::Available);
        assert_eq!(returned.borrower, "");
        assert_eq!(returned.due_date, None);
    }

    #[test]
    fn cannot_lend_a_borrowed_or_unavailable_book() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Dune");
        let desk = LoanDesk::new(&ledger, "ana");
        desk.lend(&row.id, "Ben", date(2026, 11, 1)).expect("lend");

        assert!(matches!(
            desk.lend(&row.id, "Cleo", date(2026, 12, 1)),
            Err(SessionError::NotLendable { .. })
        ));

        let other = shelve(&ledger, "ana", "Emma");
        desk.mark_unavailable(&other.id).expect("unavailable");
        assert!(matches!(
            desk.lend(&other.id, "Cleo", date(2026, 12, 1)),
            Err(SessionError::NotLendable { .. })
        ));
    }

    #[test]
    fn other_owners_rows_are_off_limits() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ben", "Dune");
        let desk = LoanDesk::new(&ledger, "ana");

        assert!(matches!(desk.remove(&row.id), Err(SessionError::NotOwner(_))));
        assert!(matches!(
            desk.lend(&row.id, "Cleo", date(2026, 11, 1)),
            Err(SessionError::NotOwner(_))
        ));
        assert!(ledger.get(&row.id).expect("get").is_some());
    }

    #[test]
    fn reading_progress_moves_status() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Middlemarch");
        let desk = LoanDesk::new(&ledger, "ana");

        let reading = desk.start_reading(&row.id).expect("start");
        assert_eq!(reading.status, LoanStatus::Reading);
        assert_eq!(reading.reading_progress, "0%");

        let halfway = desk.set_progress(&row.id, 55).expect("progress");
        assert_eq!(halfway.reading_progress, "55%");
        assert_eq!(halfway.status, LoanStatus::Reading);

        let done = desk.set_progress(&row.id, 250).expect("finish");
        assert_eq!(done.reading_progress, "100%");
        assert_eq!(done.status, LoanStatus::Available);

        let again = desk.set_progress(&row.id, 10).expect("reread");
        assert_eq!(again.status, LoanStatus::Reading);
    }

    #[test]
    fn borrowed_book_keeps_its_loan_until_returned() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Dune");
        let desk = LoanDesk::new(&ledger, "ana");
        desk.lend(&row.id, "Ben", date(2026, 10, 1)).expect("lend");

        assert!(matches!(
            desk.start_reading(&row.id),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            desk.mark_unavailable(&row.id),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            desk.lend(&row.id, "Cleo", date(2026, 12, 1)),
            Err(SessionError::NotLendable { .. })
        ));

        let stored = ledger.get(&row.id).expect("get").expect("row");
        assert_eq!(stored.status, LoanStatus::Borrowed);
        assert_eq!(stored.borrower, "Ben");
        assert_eq!(stored.due_date, Some(date(2026, 10, 1)));
        assert_eq!(desk.overdue(date(2026, 10, 15)).expect("overdue").len(), 1);
    }

    #[test]
    fn unavailable_book_cannot_be_read() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Emma");
        let desk = LoanDesk::new(&ledger, "ana");
        desk.mark_unavailable(&row.id).expect("unavailable");

        assert!(matches!(
            desk.start_reading(&row.id),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(
            ledger.get(&row.id).expect("get").expect("row").status,
            LoanStatus::NotAvailable
        );
    }

    #[test]
    fn overdue_lists_only_late_loans() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let late = shelve(&ledger, "ana", "Late");
        let on_time = shelve(&ledger, "ana", "On Time");
        shelve(&ledger, "ana", "On Shelf");
        let desk = LoanDesk::new(&ledger, "ana");
        desk.lend(&late.id, "Ben", date(2026, 10, 1)).expect("lend");
        desk.lend(&on_time.id, "Cleo", date(2026, 10, 20)).expect("lend");

        let overdue = desk.overdue(date(2026, 10, 15)).expect("overdue");

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].title, "Late");
    }

    #[test]
    fn remove_deletes_owned_row() {
        let ledger = SqliteLedger::open_in_memory().expect("ledger");
        let row = shelve(&ledger, "ana", "Dune");
        let desk = LoanDesk::new(&ledger, "ana");

        desk.remove(&row.id).expect("remove");

        assert!(ledger.get(&row.id).expect("get").is_none());
        assert!(matches!(desk.remove(&row.id), Err(SessionError::UnknownRow(_))));
    }
}
