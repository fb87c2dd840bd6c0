//! Subscriber repository implementation backed by Diesel.
//!
//! Provides [`SubscriptionReader`] and [`SubscriptionWriter`] trait
//! implementations for [`DieselRepository`].

use std::collections::HashMap;

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;

use crate::domain::{Subscriber as DomainSubscriber, UnsubscribePreference};
use crate::models::{NewSubscriber, NewUnsubscribeReason, Subscriber as DbSubscriber};
use crate::repository::{
    DieselRepository, RepositoryError, RepositoryResult, SubscriptionReader, SubscriptionWriter,
};

/// SQLite refuses statements with more bound parameters than this.
const LOOKUP_CHUNK: usize = 500;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    subscribed BOOLEAN NOT NULL DEFAULT 1,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);
CREATE TABLE IF NOT EXISTS unsubscribe_reasons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    reason TEXT NOT NULL,
    comments TEXT NOT NULL DEFAULT '',
    preference TEXT NOT NULL,
    unsubscribed_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_subscribers_email ON subscribers(email);
CREATE INDEX IF NOT EXISTS idx_unsubscribe_reasons_email ON unsubscribe_reasons(email);";

impl DieselRepository {
    /// Creates the registry tables when they do not exist yet.
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let mut conn = self.conn()?;
        conn.batch_execute(SCHEMA)?;
        Ok(())
    }
}

impl SubscriptionReader for DieselRepository {
    fn get_status(&self, addresses: &[String]) -> RepositoryResult<HashMap<String, bool>> {
        use crate::schema::subscribers;
        let mut conn = self.conn()?;

        let mut status = HashMap::with_capacity(addresses.len());
        for chunk in addresses.chunks(LOOKUP_CHUNK) {
            let rows = subscribers::table
                .filter(subscribers::email.eq_any(chunk))
                .select((subscribers::email, subscribers::subscribed))
                .load::<(String, bool)>(&mut conn)?;
            status.extend(rows);
        }

        Ok(status)
    }

    fn get_subscriber(&self, address: &str) -> RepositoryResult<Option<DomainSubscriber>> {
        use crate::schema::subscribers;
        let mut conn = self.conn()?;

        let subscriber = subscribers::table
            .filter(subscribers::email.eq(address))
            .select(DbSubscriber::as_select())
            .first::<DbSubscriber>(&mut conn)
            .optional()?;

        Ok(subscriber.map(Into::into))
    }
}

impl SubscriptionWriter for DieselRepository {
    fn record_unsubscribe(
        &self,
        address: &str,
        reasons: &[String],
        comments: &str,
        preference: UnsubscribePreference,
    ) -> RepositoryResult<()> {
        use crate::schema::{subscribers, unsubscribe_reasons};
        let mut conn = self.conn()?;

        conn.transaction::<_, RepositoryError, _>(|conn| {
            let now = Utc::now().naive_utc();
            let target = subscribers::table.filter(subscribers::email.eq(address));

            let updated = match preference {
                UnsubscribePreference::UnsubscribeAll => diesel::update(target)
                    .set((
                        subscribers::subscribed.eq(false),
                        subscribers::updated_at.eq(now),
                    ))
                    .execute(conn)?,
                UnsubscribePreference::LessFrequent => diesel::update(target)
                    .set(subscribers::updated_at.eq(now))
                    .execute(conn)?,
            };
            if updated == 0 {
                return Err(RepositoryError::NotFound(address.to_owned()));
            }

            for reason in reasons {
                diesel::insert_into(unsubscribe_reasons::table)
                    .values(NewUnsubscribeReason {
                        email: address,
                        reason: reason.as_str(),
                        comments,
                        preference: preference.as_str(),
                        unsubscribed_at: now,
                    })
                    .execute(conn)?;
            }

            Ok(())
        })
    }

    fn insert_if_absent(
        &self,
        address: &str,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<bool> {
        use crate::schema::subscribers;

        if address.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "subscriber email is empty".to_owned(),
            ));
        }

        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();
        let inserted = diesel::insert_or_ignore_into(subscribers::table)
            .values(NewSubscriber {
                email: address,
                first_name,
                last_name,
                subscribed: true,
                created_at: now,
                updated_at: now,
            })
            .execute(&mut conn)?;

        Ok(inserted > 0)
    }
}
