//! Per-recipient failure tracking.

use std::collections::BTreeMap;

use crate::Recipient;

/// A recipient the backend did not accept, with the driver's reason.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailureRecord {
    pub recipient: Recipient,
    pub reason: String,
}

impl FailureRecord {
    pub fn new(recipient: impl Into<Recipient>, reason: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            reason: reason.into(),
        }
    }
}

/// Failure records keyed by recipient.
///
/// A recipient appears at most once; the first reason recorded wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<FailureRecord>", into = "Vec<FailureRecord>")]
pub struct FailureSet {
    entries: BTreeMap<Recipient, String>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every recipient in `recipients` as failed for the same reason.
    pub fn all<'a>(recipients: impl IntoIterator<Item = &'a Recipient>, reason: &str) -> Self {
        let mut set = Self::new();
        for recipient in recipients {
            set.insert(recipient.clone(), reason);
        }
        set
    }

    /// Record a failure. Returns `false` if the recipient was already present.
    pub fn insert(&mut self, recipient: Recipient, reason: impl Into<String>) -> bool {
        match self.entries.entry(recipient) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(reason.into());
                true
            }
        }
    }

    /// Merge another set in, keyed by recipient.
    pub fn merge(&mut self, other: FailureSet) {
        for (recipient, reason) in other.entries {
            self.insert(recipient, reason);
        }
    }

    pub fn contains(&self, recipient: &Recipient) -> bool {
        self.entries.contains_key(recipient)
    }

    pub fn reason(&self, recipient: &Recipient) -> Option<&str> {
        self.entries.get(recipient).map(String::as_str)
    }

    pub fn remove(&mut self, recipient: &Recipient) -> Option<String> {
        self.entries.remove(recipient)
    }

    /// Keep only recipients matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Recipient) -> bool) {
        self.entries.retain(|recipient, _| keep(recipient));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Recipient, &str)> {
        self.entries.iter().map(|(r, reason)| (r, reason.as_str()))
    }

    /// Records in recipient order.
    pub fn records(&self) -> Vec<FailureRecord> {
        self.iter()
            .map(|(recipient, reason)| FailureRecord::new(recipient.clone(), reason))
            .collect()
    }
}

impl From<Vec<FailureRecord>> for FailureSet {
    fn from(records: Vec<FailureRecord>) -> Self {
        records.into_iter().collect()
    }
}

impl From<FailureSet> for Vec<FailureRecord> {
    fn from(set: FailureSet) -> Self {
        set.entries
            .into_iter()
            .map(|(recipient, reason)| FailureRecord { recipient, reason })
            .collect()
    }
}

impl FromIterator<FailureRecord> for FailureSet {
    fn from_iter<I: IntoIterator<Item = FailureRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record.recipient, record.reason);
        }
        set
    }
}
