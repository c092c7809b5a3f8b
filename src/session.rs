//! Per-user state for the search → select → add flow.
//!
//! The caller owns a [`Session`] and passes it through each step; nothing is
//! kept in globals. Results from the last search live here until the user adds
//! one of them or searches again.

use crate::catalog::{BibkeyCatalog, VolumeCatalog};
use crate::classifier::is_blank_query;
use crate::error::SessionError;
use crate::identity::User;
use crate::ledger::LedgerStore;
use crate::loan_desk::LoanDesk;
use crate::models::{BookCandidate, LedgerRow, NewLedgerRow};
use crate::search::BookSearch;

#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    query: Option<String>,
    candidates: Vec<BookCandidate>,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self {
            user,
            query: None,
            candidates: vec![],
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn owner(&self) -> &str {
        &self.user.username
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn candidates(&self) -> &[BookCandidate] {
        &self.candidates
    }

    /// Run a hybrid search and keep its results for selection.
    ///
    /// Blank input is rejected before any catalog is contacted.
    pub fn search<A, B>(
        &mut self,
        engine: &BookSearch<A, B>,
        query: &str,
    ) -> Result<&[BookCandidate], SessionError>
    where
        A: VolumeCatalog,
        B: BibkeyCatalog,
    {
        let query = query.trim();
        if is_blank_query(query) {
            return Err(SessionError::EmptyQuery);
        }
        self.candidates = engine.hybrid_search(query);
        self.query = Some(query.to_string());
        Ok(&self.candidates)
    }

    pub fn candidate(&self, index: usize) -> Result<&BookCandidate, SessionError> {
        self.candidates
            .get(index)
            .ok_or(SessionError::NoSuchCandidate {
                index,
                available: self.candidates.len(),
            })
    }

    /// Append the chosen candidate to the ledger as an available book owned by
    /// this session's user, then discard the search results.
    pub fn confirm_add<L: LedgerStore>(
        &mut self,
        ledger: &L,
        index: usize,
    ) -> Result<LedgerRow, SessionError> {
        let candidate = self.candidate(index)?;
        let row = ledger.append(NewLedgerRow::from_candidate(self.owner(), candidate))?;
        self.clear();
        Ok(row)
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.candidates.clear();
    }

    pub fn library<L: LedgerStore>(&self, ledger: &L) -> Result<Vec<LedgerRow>, SessionError> {
        Ok(ledger.rows_for_owner(self.owner())?)
    }

    /// Look up a row by id, or by 1-based position in this user's listing.
    pub fn resolve_row<L: LedgerStore>(
        &self,
        ledger: &L,
        reference: &str,
    ) -> Result<LedgerRow, SessionError> {
        let reference = reference.trim();
        if let Ok(position) = reference.parse::<usize>() {
            return self
                .library(ledger)?
                .into_iter()
                .nth(position.wrapping_sub(1))
                .ok_or_else(|| SessionError::UnknownRow(reference.to_string()));
        }
        owned_row(ledger, self.owner(), reference)
    }

    pub fn loan_desk<'a, L: LedgerStore>(&'a self, ledger: &'a L) -> LoanDesk<'a, L> {
        LoanDesk::new(ledger, self.owner())
    }
}

pub(crate) fn owned_row<L: LedgerStore>(
    ledger: &L,
    owner: &str,
    id: &str,
) -> Result<LedgerRow, SessionError> {
    match ledger.get(id)? {
        Some(row) if row.owner == owner => Ok(row),
        Some(_) => Err(SessionError::NotOwner(id.to_string())),
        None => Err(SessionError::UnknownRow(id.to_string())),
    }
}
