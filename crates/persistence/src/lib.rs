// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the HSE work permit system.
//!
//! This crate is the permit record store: it loads and saves `WorkPermit`
//! aggregates, allocates permit numbers, lists permits by predicate and
//! keeps the audit log. It is built on Diesel with the `SQLite` backend.
//!
//! ## Consistency
//!
//! Each permit row carries a version. A save succeeds only if the stored
//! version still equals the version the permit was loaded with, and bumps
//! it by one. The permit, its child rows and the command's audit event are
//! written in one immediate transaction, so two concurrent approvals of the
//! same permit cannot both commit.
//!
//! ## Databases
//!
//! - In-memory databases are used by tests; each instance is isolated
//! - File databases run in WAL mode
//!
//! Both run the embedded migrations, enforce foreign keys, and verify the
//! seeded hazard categories at start-up.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit::{CreationResult, TransitionResult, WorkPermit};
use hse_permit_audit::AuditEvent;
use hse_permit_domain::{HazardCategoryTable, PermitNumber};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;
mod records;

#[cfg(test)]
mod tests;

pub use error::PersistenceError;
pub use mutations::PersistedPermit;
pub use queries::{MAX_LIST_LIMIT, PermitQuery, PermitSummary};

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The permit record store.
pub struct Persistence {
    conn: SqliteConnection,
    categories: HazardCategoryTable,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db_name = format!("memdb_permits_{db_id}");
        let shared_memory_url = format!("file:{db_name}?mode=memory&cache=shared");

        let conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        Self::from_connection(conn)
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: SqliteConnection) -> Result<Self, PersistenceError> {
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;
        let categories: HazardCategoryTable = queries::categories::load_category_table(&mut conn)?;
        Ok(Self { conn, categories })
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        backend::sqlite::verify_foreign_key_enforcement(&mut self.conn)
    }

    /// The hazard category table verified at start-up.
    #[must_use]
    pub const fn categories(&self) -> &HazardCategoryTable {
        &self.categories
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Allocates the next permit number for the month containing `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence cannot be advanced.
    pub fn allocate_permit_number(
        &mut self,
        at: OffsetDateTime,
    ) -> Result<PermitNumber, PersistenceError> {
        self.conn.immediate_transaction(|conn| {
            mutations::allocate_permit_number(conn, at.year(), u8::from(at.month()))
        })
    }

    /// Persists a newly created permit and its creation event.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit number is already taken or a write fails.
    pub fn persist_creation(
        &mut self,
        result: &CreationResult,
    ) -> Result<PersistedPermit, PersistenceError> {
        mutations::persist_creation(&mut self.conn, result, &self.categories)
    }

    /// Persists the outcome of a command applied to a loaded permit.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict` if the permit was saved by someone else
    /// after it was loaded, `PermitNotFound` if it was deleted, or another
    /// error if a write fails.
    pub fn persist_transition(
        &mut self,
        result: &TransitionResult,
    ) -> Result<PersistedPermit, PersistenceError> {
        mutations::persist_transition(&mut self.conn, result, &self.categories)
    }

    /// Deletes a permit and records the deletion event.
    ///
    /// Status rules are the caller's concern; this only checks the version.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is missing or was modified concurrently.
    pub fn delete_permit(
        &mut self,
        permit_id: i64,
        expected_version: i64,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        mutations::persist_deletion(&mut self.conn, permit_id, expected_version, event)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Loads a permit by id.
    ///
    /// # Errors
    ///
    /// Returns `PermitNotFound` if no such permit exists.
    pub fn load_permit(&mut self, permit_id: i64) -> Result<WorkPermit, PersistenceError> {
        let record = queries::permits::load_permit(&mut self.conn, permit_id, &self.categories)?;
        Ok(WorkPermit::restore(record))
    }

    /// Loads a permit by its number.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no permit carries the number.
    pub fn load_permit_by_number(
        &mut self,
        permit_number: &PermitNumber,
    ) -> Result<WorkPermit, PersistenceError> {
        let permit_id: i64 = queries::permits::find_permit_id(&mut self.conn, permit_number)?;
        self.load_permit(permit_id)
    }

    /// Lists permits matching `query`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_permits(
        &mut self,
        query: &PermitQuery,
    ) -> Result<Vec<PermitSummary>, PersistenceError> {
        queries::permits::list_permits(&mut self.conn, query)
    }

    /// Retrieves an audit event by ID.
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` if the event does not exist.
    pub fn get_audit_event(&mut self, event_id: i64) -> Result<AuditEvent, PersistenceError> {
        queries::audit::get_audit_event(&mut self.conn, event_id)
    }

    /// Retrieves the audit timeline of a permit, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_audit_timeline(
        &mut self,
        permit_number: &PermitNumber,
    ) -> Result<Vec<AuditEvent>, PersistenceError> {
        queries::audit::get_audit_timeline(&mut self.conn, permit_number)
    }
}
