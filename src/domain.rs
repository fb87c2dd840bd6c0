//! Domain types shared by the dispatch engine and the list tools.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Subject used when a campaign does not provide one.
pub const DEFAULT_SUBJECT: &str = "Important Information";

/// Field holding the recipient address.
pub const EMAIL_FIELD: &str = "email";

/// One row of the recipient list.
///
/// Fields keep the column order of the source so that a filtered list can be
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    fields: IndexMap<String, String>,
}

impl Recipient {
    pub fn new(fields: IndexMap<String, String>) -> Self {
        Self { fields }
    }

    /// Trimmed `email` field, or `None` when it is missing or blank.
    pub fn address(&self) -> Option<&str> {
        self.fields
            .get(EMAIL_FIELD)
            .map(|email| email.trim())
            .filter(|email| !email.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }
}

impl<K, V> FromIterator<(K, V)> for Recipient
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Anything that can resolve a `{key}` placeholder.
pub trait Bindings {
    fn binding(&self, key: &str) -> Option<&str>;
}

impl Bindings for HashMap<String, String> {
    fn binding(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Bindings for IndexMap<String, String> {
    fn binding(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Bindings for Recipient {
    fn binding(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

/// Message templates of a campaign. Every part is optional.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub html: Option<String>,
    pub text: Option<String>,
    pub subject: Option<String>,
}

fn default_delay_seconds() -> u64 {
    1
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(50).unwrap_or(NonZeroUsize::MIN)
}

fn default_true() -> bool {
    true
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_owned()
}

/// Delivery options of a single campaign run.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignOptions {
    /// Pause between two delivery units.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    /// Maximum number of blind-copy recipients per message.
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_true")]
    pub use_blind_copy: bool,
    #[serde(default = "default_true")]
    pub check_subscription: bool,
    /// Extra blind-copy addresses attached to every individual message.
    #[serde(default)]
    pub individual_bcc: Vec<String>,
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            batch_size: default_batch_size(),
            use_blind_copy: true,
            check_subscription: true,
            individual_bcc: Vec::new(),
            default_subject: default_subject(),
        }
    }
}

/// Outcome counters of a campaign run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunTally {
    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} successful, {} failed, {} skipped",
            self.success, self.failed, self.skipped
        )
    }
}

/// Logging context handed to every component of a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    campaign: String,
}

impl RunContext {
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "campaign#{}", self.campaign)
    }
}

/// What a recipient asked for when opting out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsubscribePreference {
    #[default]
    UnsubscribeAll,
    LessFrequent,
}

impl UnsubscribePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnsubscribePreference::UnsubscribeAll => "unsubscribe-all",
            UnsubscribePreference::LessFrequent => "less-frequent",
        }
    }
}

impl fmt::Display for UnsubscribePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opt-out request as submitted by the unsubscribe page.
#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub preference: UnsubscribePreference,
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
