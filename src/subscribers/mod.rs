//! Maintenance of the opt-out registry.
//!
//! Unlike the dispatch filter, list maintenance treats addresses missing
//! from the registry as subscribed: importing adds them as subscribers and
//! filtering keeps them.

pub mod audit;

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{Recipient, Subscriber, UnsubscribeRequest};
use crate::errors::Error;
use crate::recipients::{read_table_from_path, write_table};
use crate::repository::{SubscriptionReader, SubscriptionWriter};

use audit::AuditRecord;

/// Adds every addressable recipient not yet in the registry as subscribed.
///
/// Existing entries keep their status. Returns the number of new entries.
pub fn import_recipients<W>(repo: &W, recipients: &[Recipient]) -> usize
where
    W: SubscriptionWriter + ?Sized,
{
    let mut imported = 0;
    for recipient in recipients {
        let Some(email) = recipient.address() else {
            continue;
        };
        let first_name = recipient.get("first_name").unwrap_or_default().trim();
        let last_name = recipient.get("last_name").unwrap_or_default().trim();

        match repo.insert_if_absent(email, first_name, last_name) {
            Ok(true) => imported += 1,
            Ok(false) => {}
            Err(e) => log::error!("Error importing subscriber {email}: {e}"),
        }
    }
    imported
}

pub fn import_csv<W>(repo: &W, path: &Path) -> Result<usize, Error>
where
    W: SubscriptionWriter + ?Sized,
{
    let table = read_table_from_path(path)?;
    let imported = import_recipients(repo, &table.rows);
    log::info!(
        "Imported {imported} new subscribers from {}",
        path.display()
    );
    Ok(imported)
}

/// Rows kept by [`filter_recipients`].
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<Recipient>,
    pub removed: usize,
}

/// Drops recipients that opted out; unknown addresses are kept.
///
/// Rows without an address are dropped without being counted.
pub fn filter_recipients<R>(repo: &R, recipients: Vec<Recipient>) -> Result<FilterOutcome, Error>
where
    R: SubscriptionReader + ?Sized,
{
    let addresses: Vec<String> = recipients
        .iter()
        .filter_map(Recipient::address)
        .map(str::to_owned)
        .collect();
    let status = repo.get_status(&addresses)?;

    let mut outcome = FilterOutcome::default();
    for recipient in recipients {
        let Some(email) = recipient.address() else {
            continue;
        };
        if status.get(email).copied().unwrap_or(true) {
            outcome.kept.push(recipient);
        } else {
            outcome.removed += 1;
        }
    }
    Ok(outcome)
}

/// Writes the subscribed rows of `input` to `output`, keeping its columns.
///
/// Returns the number of removed rows.
pub fn filter_csv<R>(repo: &R, input: &Path, output: &Path) -> Result<usize, Error>
where
    R: SubscriptionReader + ?Sized,
{
    let table = read_table_from_path(input)?;
    let outcome = filter_recipients(repo, table.rows)?;
    write_table(File::create(output)?, &table.headers, &outcome.kept)?;
    Ok(outcome.removed)
}

/// Records an opt-out and appends it to the audit file when one is given.
pub fn unsubscribe<W>(
    repo: &W,
    request: &UnsubscribeRequest,
    audit_log: Option<&Path>,
) -> Result<(), Error>
where
    W: SubscriptionWriter + ?Sized,
{
    let email = request.email.trim();
    if email.is_empty() {
        return Err(Error::Validation("Email is required".to_owned()));
    }

    repo.record_unsubscribe(email, &request.reasons, &request.comments, request.preference)?;

    if let Some(path) = audit_log {
        audit::append(path, &AuditRecord::new(email, request, Local::now()))?;
    }

    log::info!(
        "Unsubscribe request: {}, Preference: {}, Reasons: {:?}",
        email,
        request.preference,
        request.reasons
    );
    Ok(())
}

/// Current registry entry for `email`.
pub fn status<R>(repo: &R, email: &str) -> Result<Option<Subscriber>, Error>
where
    R: SubscriptionReader + ?Sized,
{
    Ok(repo.get_subscriber(email.trim())?)
}
