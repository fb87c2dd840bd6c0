//! Helpers for integration tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use pushkind_campaign::campaign::executor::Transport;
use pushkind_campaign::campaign::message_builder::OutgoingEmail;
use pushkind_campaign::domain::{Recipient, Subscriber};
use pushkind_campaign::errors::Error;
use pushkind_campaign::recipients::RecipientSource;
use pushkind_campaign::repository::{
    DbPool, DieselRepository, RepositoryError, RepositoryResult, SubscriptionReader,
    establish_connection_pool,
};

/// Temporary database used in integration tests.
pub struct TestDb {
    filename: String,
    pool: DbPool,
}

impl TestDb {
    #[allow(dead_code)]
    pub fn new(filename: &str) -> Self {
        std::fs::remove_file(filename).ok(); // Clean up old DB

        let pool =
            establish_connection_pool(filename).expect("Failed to establish SQLite connection.");
        DieselRepository::new(pool.clone())
            .ensure_schema()
            .expect("Failed to create registry schema.");
        TestDb {
            filename: filename.to_string(),
            pool,
        }
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    #[allow(dead_code)]
    pub fn repo(&self) -> DieselRepository {
        DieselRepository::new(self.pool.clone())
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        std::fs::remove_file(&self.filename).ok();
        std::fs::remove_file(format!("{}-shm", &self.filename)).ok();
        std::fs::remove_file(format!("{}-wal", &self.filename)).ok();
    }
}

/// Transport that records what it would have sent.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingTransport {
    pub connected: bool,
    pub refuse_connect: bool,
    /// Zero-based send attempts that fail.
    pub failing_sends: HashSet<usize>,
    pub connects: usize,
    pub disconnects: usize,
    pub attempts: usize,
    pub sent: Vec<OutgoingEmail>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&mut self) -> Result<(), Error> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(Error::Connection("authentication rejected".into()));
        }
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), Error> {
        let attempt = self.attempts;
        self.attempts += 1;
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.failing_sends.contains(&attempt) {
            return Err(Error::Connection("connection reset".into()));
        }
        self.sent.push(email.clone());
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.connected {
            self.disconnects += 1;
        }
        self.connected = false;
    }
}

/// Registry held in memory; `None` simulates an unreachable database.
#[allow(dead_code)]
pub struct MemoryRegistry(pub Option<HashMap<String, bool>>);

#[allow(dead_code)]
impl MemoryRegistry {
    pub fn with(entries: &[(&str, bool)]) -> Self {
        Self(Some(
            entries
                .iter()
                .map(|(email, subscribed)| (email.to_string(), *subscribed))
                .collect(),
        ))
    }

    pub fn unreachable() -> Self {
        Self(None)
    }
}

impl SubscriptionReader for MemoryRegistry {
    fn get_status(&self, addresses: &[String]) -> RepositoryResult<HashMap<String, bool>> {
        let entries = self
            .0
            .as_ref()
            .ok_or_else(|| RepositoryError::ValidationError("registry offline".into()))?;
        Ok(addresses
            .iter()
            .filter_map(|a| entries.get(a).map(|s| (a.clone(), *s)))
            .collect())
    }

    fn get_subscriber(&self, _address: &str) -> RepositoryResult<Option<Subscriber>> {
        Ok(None)
    }
}

/// Source that cannot be read.
#[allow(dead_code)]
pub struct BrokenSource;

impl RecipientSource for BrokenSource {
    fn read(&self) -> Result<Vec<Recipient>, Error> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        )))
    }
}

#[allow(dead_code)]
pub fn recipient(email: &str, first_name: &str) -> Recipient {
    [
        ("email", email),
        ("first_name", first_name),
        ("last_name", "Doe"),
        ("campaign_id", "SPRING25"),
    ]
    .into_iter()
    .collect()
}
