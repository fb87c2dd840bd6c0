//! Runtime settings loaded from a YAML file and `CAMPAIGN__*` environment
//! variables, e.g. `CAMPAIGN__SMTP__PASSWORD`.

use std::fmt;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::campaign::unsubscribe::DEFAULT_UNSUBSCRIBE_URL;
use crate::domain::CampaignOptions;
use crate::errors::Error;

fn default_database_url() -> String {
    "email_subscribers.db".to_owned()
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("unsubscribes.csv")
}

fn default_smtp_port() -> u16 {
    587
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_unsubscribe_url() -> String {
    DEFAULT_UNSUBSCRIBE_URL.to_owned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// CSV file receiving a copy of every opt-out.
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
    pub smtp: SmtpSettings,
    pub campaign: CampaignSettings,
}

/// Mail submission account.
#[derive(Clone, Deserialize)]
pub struct SmtpSettings {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// TLS from the first byte (port 465) instead of STARTTLS.
    #[serde(default)]
    pub implicit_tls: bool,
    pub login: String,
    pub password: String,
    /// Visible sender; defaults to the login.
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl SmtpSettings {
    pub fn sender_address(&self) -> &str {
        self.sender.as_deref().unwrap_or(self.login.as_str())
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("implicit_tls", &self.implicit_tls)
            .field("login", &self.login)
            .field("password", &"***")
            .field("sender", &self.sender)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// What to send and to whom.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignSettings {
    pub recipients: PathBuf,
    #[serde(default)]
    pub html_template: Option<PathBuf>,
    #[serde(default)]
    pub text_template: Option<PathBuf>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default = "default_unsubscribe_url")]
    pub unsubscribe_url: String,
    #[serde(default)]
    pub delivery: CampaignOptions,
}

impl Settings {
    /// Reads `path` (optional) and overlays the environment.
    pub fn load(path: &str) -> Result<Self, Error> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CAMPAIGN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
