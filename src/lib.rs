//! Book catalog search and a shared lending ledger.
//!
//! [`search::BookSearch`] queries Google Books and Open Library, merges what
//! they return into [`models::BookCandidate`] values and orders them for a
//! person to pick from. The picked book is appended to the ledger through a
//! [`session::Session`], and lending or reading state is changed afterwards
//! through its [`loan_desk::LoanDesk`].

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod loan_desk;
pub mod models;
pub mod search;
pub mod session;

pub use catalog::{BibkeyCatalog, GoogleBooks, HttpFetcher, JsonFetch, OpenLibrary, VolumeCatalog};
pub use classifier::{is_blank_query, is_isbn_shaped, normalize_isbn_query};
pub use config::Config;
pub use error::{ConfigError, IdentityError, LedgerError, SessionError};
pub use identity::{User, UserDirectory};
pub use ledger::{LedgerStore, SqliteLedger};
pub use loan_desk::LoanDesk;
pub use models::{BookCandidate, LedgerColumn, LedgerRow, LoanStatus, NewLedgerRow};
pub use search::BookSearch;
pub use session::Session;

/// The production search engine: both catalogs over one shared HTTP client.
pub type HttpBookSearch<'a> = BookSearch<GoogleBooks<&'a HttpFetcher>, OpenLibrary<&'a HttpFetcher>>;

pub fn http_search<'a>(fetcher: &'a HttpFetcher, config: &Config) -> HttpBookSearch<'a> {
  BookSearch::new(
    GoogleBooks::new(fetcher, config),
    OpenLibrary::new(fetcher, config),
  )
  .with_max_results(config.max_results)
}
