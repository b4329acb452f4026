//! Database models.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use push_core::{
    AttemptId, Credential, CredentialId, Device, DispatchAttempt, FailureSet, Platform, Recipient,
};

use crate::schema::{credentials, devices, dispatch_attempts};

fn utc(naive: chrono::NaiveDateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc)
}

/// Credential record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = credentials)]
pub struct CredentialRow {
    pub id: String,
    pub api_key: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Credential::new(row.id, row.api_key)
    }
}

/// New credential for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credentials)]
pub struct NewCredential<'a> {
    pub id: &'a str,
    pub api_key: &'a str,
    pub created_at: chrono::NaiveDateTime,
}

/// Device record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = devices, primary_key(uid))]
pub struct DeviceRow {
    pub uid: String,
    pub credential_id: String,
    pub platform: String,
    pub identity: String,
    pub token: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Device {
            uid: Recipient::new(row.uid),
            credential_id: CredentialId::new(row.credential_id),
            platform: Platform::new(row.platform),
            identity: row.identity,
            token: row.token,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        }
    }
}

/// New device for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub uid: &'a str,
    pub credential_id: &'a str,
    pub platform: &'a str,
    pub identity: &'a str,
    pub token: &'a str,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Dispatch attempt record. Recipients and failures are JSON text.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = dispatch_attempts)]
pub struct AttemptRow {
    pub id: String,
    pub credential_id: String,
    pub status: String,
    pub recipients: String,
    pub failures: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl TryFrom<AttemptRow> for DispatchAttempt {
    type Error = color_eyre::eyre::Report;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let recipients: Vec<Recipient> = serde_json::from_str(&row.recipients)
            .wrap_err_with(|| format!("corrupt recipients for attempt {}", row.id))?;
        let failures: FailureSet = serde_json::from_str(&row.failures)
            .wrap_err_with(|| format!("corrupt failures for attempt {}", row.id))?;

        Ok(DispatchAttempt {
            status: row.status.parse()?,
            id: AttemptId::new(row.id),
            credential_id: CredentialId::new(row.credential_id),
            recipients,
            failures,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        })
    }
}

/// New dispatch attempt for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dispatch_attempts)]
pub struct NewAttempt<'a> {
    pub id: &'a str,
    pub credential_id: &'a str,
    pub status: &'a str,
    pub recipients: String,
    pub failures: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}
