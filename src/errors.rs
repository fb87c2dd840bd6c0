//! Common error type for the campaign tools.
//!
//! A campaign run touches an SMTP server, the subscriber database and the
//! recipient CSV file.  This module consolidates the possible failures into
//! a single [`Error`] enum so that callers can use a simple
//! `Result<T, Error>` without relying on panicking calls like `unwrap` or
//! `expect`.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Errors that can occur while running a campaign or maintaining the list.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from SMTP operations.
    #[error("smtp error: {0}")]
    Smtp(#[from] mail_send::Error),

    /// The transport could not be reached or rejected the credentials.
    #[error("connection error: {0}")]
    Connection(String),

    /// A send was attempted without an open transport session.
    #[error("transport is not connected")]
    NotConnected,

    /// Persistence layer failures.
    #[error("registry error: {0}")]
    Registry(#[from] RepositoryError),

    /// The recipient list could not be read.
    #[error("cannot read recipients from {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// CSV output failures.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// File system failures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Problems with environment or configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected user input.
    #[error("validation error: {0}")]
    Validation(String),
}
