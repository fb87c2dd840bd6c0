//! Repository interfaces and Diesel-backed implementation.
//!
//! This module defines traits for reading and writing the opt-out registry
//! alongside [`DieselRepository`], a small wrapper around a Diesel
//! connection pool.

use std::collections::HashMap;

use diesel::SqliteConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use thiserror::Error;

use crate::domain::{Subscriber, UnsubscribePreference};

pub mod subscriber;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Failures of the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Opens an r2d2 pool for the SQLite database at `database_url`.
pub fn establish_connection_pool(database_url: &str) -> RepositoryResult<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Ok(Pool::builder().build(manager)?)
}

/// Concrete repository backed by a Diesel connection pool.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Creates a new [`DieselRepository`] from the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

/// Read-only operations on the opt-out registry.
pub trait SubscriptionReader {
    /// Returns the stored subscription flag of every *known* address.
    ///
    /// Addresses missing from the registry are absent from the map; callers
    /// pick the default that suits them.
    fn get_status(&self, addresses: &[String]) -> RepositoryResult<HashMap<String, bool>>;

    /// Fetches a single registry entry.
    fn get_subscriber(&self, address: &str) -> RepositoryResult<Option<Subscriber>>;
}

/// Write operations on the opt-out registry.
pub trait SubscriptionWriter {
    /// Stores an opt-out for a known address.
    ///
    /// Returns [`RepositoryError::NotFound`] when the address is not in the
    /// registry.
    ///
    /// # Example
    /// ```no_run
    /// use pushkind_campaign::domain::UnsubscribePreference;
    /// use pushkind_campaign::repository::{DieselRepository, SubscriptionWriter};
    /// # fn demo(repo: &DieselRepository) {
    /// let _ = repo.record_unsubscribe(
    ///     "a@example.com",
    ///     &["too-many".to_owned()],
    ///     "",
    ///     UnsubscribePreference::UnsubscribeAll,
    /// );
    /// # }
    /// ```
    fn record_unsubscribe(
        &self,
        address: &str,
        reasons: &[String],
        comments: &str,
        preference: UnsubscribePreference,
    ) -> RepositoryResult<()>;

    /// Adds `address` as subscribed unless it is already known.
    ///
    /// Existing entries are left untouched so that earlier opt-outs survive
    /// a re-import. Returns `true` when a row was inserted.
    fn insert_if_absent(
        &self,
        address: &str,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<bool>;
}
