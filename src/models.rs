use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::Subscriber as DomainSubscriber;
use crate::schema::{subscribers, unsubscribe_reasons};

#[derive(Queryable, Selectable)]
#[diesel(table_name = subscribers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Subscriber {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Subscriber> for DomainSubscriber {
    fn from(row: Subscriber) -> Self {
        Self {
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            subscribed: row.subscribed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = subscribers)]
pub struct NewSubscriber<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub subscribed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = unsubscribe_reasons)]
pub struct NewUnsubscribeReason<'a> {
    pub email: &'a str,
    pub reason: &'a str,
    pub comments: &'a str,
    pub preference: &'a str,
    pub unsubscribed_at: NaiveDateTime,
}
