//! Email subscriptions for status updates.
//!
//! Addresses are kept in a line-oriented file, one per line, without
//! duplicates. Appends are serialized so concurrent requests for the same
//! address cannot write it twice.

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("invalid or missing email address")]
    InvalidEmail,
    #[error("failed to update subscription store: {0}")]
    Io(#[from] IoError),
}

/// Result of a successful subscription request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Check an email address and return it trimmed
pub fn validate_email(raw: &str) -> Result<String, SubscriptionError> {
    let email = raw.trim();
    if email.len() > 254 || !EMAIL_PATTERN.is_match(email) {
        return Err(SubscriptionError::InvalidEmail);
    }
    Ok(email.to_string())
}

/// Deduplicated append-only list of subscribed addresses
#[derive(Debug)]
pub struct SubscriptionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add `email` unless it is already present
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, SubscriptionError> {
        let email = validate_email(email)?;
        let _guard = self.write_lock.lock().await;

        if self.read_all().await?.iter().any(|existing| existing == &email) {
            debug!(email = %email, "address already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(format!("{email}\n").as_bytes()).await?;
        file.flush().await?;

        info!(store = %self.path.display(), "new subscription stored");
        Ok(SubscribeOutcome::Added)
    }

    /// All stored addresses in insertion order
    pub async fn subscribers(&self) -> Result<Vec<String>, SubscriptionError> {
        self.read_all().await
    }

    async fn read_all(&self) -> Result<Vec<String>, SubscriptionError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}
