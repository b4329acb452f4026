//! Dispatch attempt records and their status lifecycle.

use crate::{AttemptId, CredentialId, FailureSet, Recipient};

/// Status of a dispatch attempt.
///
/// `Pending` and `Queued` are the entry states; `Sent` and `Failed` are terminal.
/// A partially failed attempt is `Sent` with a non-empty failure set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// Synchronous send in progress.
    Pending,
    /// Waiting for a worker.
    Queued,
    /// Backend accepted the batch (possibly with per-recipient failures).
    Sent,
    /// Every recipient failed, or the backend failed outright.
    Failed,
}

impl DispatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    /// Whether a stored attempt in this status may move to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Queued, Self::Sent | Self::Failed)
        )
    }

    /// Terminal status for a finished batch.
    ///
    /// `Failed` only when every distinct recipient is in `failures`; an empty
    /// batch counts as sent.
    pub fn settle(recipients: &[Recipient], failures: &FailureSet) -> Self {
        if !recipients.is_empty() && recipients.iter().all(|r| failures.contains(r)) {
            Self::Failed
        } else {
            Self::Sent
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DispatchStatus {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => color_eyre::eyre::bail!("unknown dispatch status: {}", other),
        }
    }
}

/// Tracked record of one send operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DispatchAttempt {
    pub id: AttemptId,
    pub credential_id: CredentialId,
    pub status: DispatchStatus,
    /// Recipients as supplied by the caller.
    pub recipients: Vec<Recipient>,
    pub failures: FailureSet,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl DispatchAttempt {
    fn new(credential_id: CredentialId, recipients: Vec<Recipient>, status: DispatchStatus) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: AttemptId::generate(),
            credential_id,
            status,
            recipients,
            failures: FailureSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// New attempt for a synchronous send.
    pub fn pending(credential_id: CredentialId, recipients: Vec<Recipient>) -> Self {
        Self::new(credential_id, recipients, DispatchStatus::Pending)
    }

    /// New attempt for a deferred send.
    pub fn queued(credential_id: CredentialId, recipients: Vec<Recipient>) -> Self {
        Self::new(credential_id, recipients, DispatchStatus::Queued)
    }

    /// Move to a terminal status, recording the failure set.
    pub fn settle(
        &mut self,
        status: DispatchStatus,
        failures: FailureSet,
    ) -> color_eyre::eyre::Result<()> {
        if !self.status.can_transition_to(status) {
            color_eyre::eyre::bail!(
                "attempt {} cannot move from {} to {}",
                self.id,
                self.status,
                status
            );
        }

        self.status = status;
        self.failures = failures;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }
}
