// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A database error occurred.
    DatabaseError(String),
    /// Database connection failed.
    DatabaseConnectionFailed(String),
    /// Database migration failed.
    MigrationFailed(String),
    /// Query execution failed.
    QueryFailed(String),
    /// The requested permit was not found.
    PermitNotFound(i64),
    /// The requested audit event was not found.
    EventNotFound(i64),
    /// The stored version no longer matches the version the caller loaded.
    ConcurrencyConflict {
        permit_id: i64,
        expected_version: i64,
        actual_version: i64,
    },
    /// Stored rows could not be turned back into a permit.
    ReconstructionError(String),
    /// Serialization/deserialization error.
    SerializationError(String),
    /// Initialization error.
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    ForeignKeyEnforcementNotEnabled,
    /// The stored hazard categories disagree with the category table.
    CategoryTableMismatch(String),
    /// The requested resource was not found.
    NotFound(String),
    /// A general error occurred.
    Other(String),
}

impl PersistenceError {
    /// Returns true if the error means a referenced record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PermitNotFound(_) | Self::EventNotFound(_) | Self::NotFound(_)
        )
    }

    /// Returns true if `SQLite` refused the statement because another
    /// connection held a lock. Such a statement may succeed when repeated.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::DatabaseError(msg)
            | Self::DatabaseConnectionFailed(msg)
            | Self::QueryFailed(msg) => {
                let msg: String = msg.to_ascii_lowercase();
                BUSY_MESSAGES.iter().any(|busy| msg.contains(busy))
            }
            _ => false,
        }
    }
}

/// `SQLite` messages for `SQLITE_BUSY` and `SQLITE_LOCKED`.
const BUSY_MESSAGES: [&str; 3] = [
    "database is locked",
    "database is busy",
    "database table is locked",
];

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::MigrationFailed(msg) => write!(f, "Migration failed: {msg}"),
            Self::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            Self::PermitNotFound(id) => write!(f, "Permit not found: {id}"),
            Self::EventNotFound(id) => write!(f, "Event not found: {id}"),
            Self::ConcurrencyConflict {
                permit_id,
                expected_version,
                actual_version,
            } => write!(
                f,
                "Permit {permit_id} was modified concurrently: expected version {expected_version}, found {actual_version}"
            ),
            Self::ReconstructionError(msg) => write!(f, "Permit reconstruction error: {msg}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::ForeignKeyEnforcementNotEnabled => {
                write!(f, "Foreign key enforcement is not enabled")
            }
            Self::CategoryTableMismatch(msg) => {
                write!(f, "Hazard category table mismatch: {msg}")
            }
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<time::error::Format> for PersistenceError {
    fn from(err: time::error::Format) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<time::error::Parse> for PersistenceError {
    fn from(err: time::error::Parse) -> Self {
        Self::ReconstructionError(err.to_string())
    }
}

impl From<hse_permit_domain::DomainError> for PersistenceError {
    fn from(err: hse_permit_domain::DomainError) -> Self {
        Self::ReconstructionError(err.to_string())
    }
}
