use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create ledger directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("no ledger row with id {0}")]
    RowNotFound(String),

    #[error("invalid value for {column}: {message}")]
    InvalidValue { column: String, message: String },

    #[error("ledger schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    BadCredentials,

    #[error(transparent)]
    Storage(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("enter a search term")]
    EmptyQuery,

    #[error("no candidate #{} in the current results ({} available)", .index + 1, .available)]
    NoSuchCandidate { index: usize, available: usize },

    #[error("no book matches {0} in your library")]
    UnknownRow(String),

    #[error("row {0} belongs to another user")]
    NotOwner(String),

    #[error("\"{title}\" cannot be lent while {status}")]
    NotLendable { title: String, status: String },

    #[error("cannot {action} \"{title}\" while {status}")]
    InvalidTransition {
        action: &'static str,
        title: String,
        status: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}
