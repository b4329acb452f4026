//! SQLite storage implementation.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use push_core::{
    AttemptId, Credential, CredentialId, Device, DispatchAttempt, DispatchStatus, FailureSet,
    Recipient,
};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl CredentialStore for SqliteStorage {
    fn upsert_credential(&self, credential: &Credential) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        let new_credential = NewCredential {
            id: credential.id.as_str(),
            api_key: &credential.api_key,
            created_at: chrono::Utc::now().naive_utc(),
        };

        diesel::insert_into(credentials::table)
            .values(&new_credential)
            .on_conflict(credentials::id)
            .do_update()
            .set(credentials::api_key.eq(&credential.api_key))
            .execute(&mut conn)
            .wrap_err("failed to store credential")?;

        Ok(())
    }

    fn credential_by_api_key(
        &self,
        api_key: &str,
    ) -> color_eyre::eyre::Result<Option<Credential>> {
        let mut conn = self.conn()?;

        let row: Option<CredentialRow> = credentials::table
            .filter(credentials::api_key.eq(api_key))
            .select(CredentialRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to look up credential")?;

        Ok(row.map(Credential::from))
    }
}

impl DeviceStore for SqliteStorage {
    fn register_device(&self, device: &Device) -> color_eyre::eyre::Result<Device> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let new_device = NewDevice {
            uid: device.uid.as_str(),
            credential_id: device.credential_id.as_str(),
            platform: device.platform.as_str(),
            identity: &device.identity,
            token: &device.token,
            created_at: device.created_at.naive_utc(),
            updated_at: now,
        };

        diesel::insert_into(devices::table)
            .values(&new_device)
            .on_conflict(devices::uid)
            .do_update()
            .set((
                devices::token.eq(&device.token),
                devices::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .wrap_err("failed to register device")?;

        let row: DeviceRow = devices::table
            .find(device.uid.as_str())
            .select(DeviceRow::as_select())
            .first(&mut conn)
            .wrap_err("failed to reload device")?;

        Ok(row.into())
    }

    fn devices(
        &self,
        credential: &CredentialId,
        uids: &[Recipient],
    ) -> color_eyre::eyre::Result<Vec<Device>> {
        let uid_strings: Vec<&str> = uids.iter().map(Recipient::as_str).collect();
        let mut conn = self.conn()?;

        let rows: Vec<DeviceRow> = devices::table
            .filter(devices::credential_id.eq(credential.as_str()))
            .filter(devices::uid.eq_any(&uid_strings))
            .select(DeviceRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to load devices")?;

        Ok(rows.into_iter().map(Device::from).collect())
    }
}

impl StatusStore for SqliteStorage {
    fn create_attempt(&self, attempt: &DispatchAttempt) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        let new_attempt = NewAttempt {
            id: attempt.id.as_str(),
            credential_id: attempt.credential_id.as_str(),
            status: attempt.status.as_str(),
            recipients: serde_json::to_string(&attempt.recipients)
                .wrap_err("failed to encode recipients")?,
            failures: serde_json::to_string(&attempt.failures)
                .wrap_err("failed to encode failures")?,
            created_at: attempt.created_at.naive_utc(),
            updated_at: attempt.updated_at.naive_utc(),
        };

        diesel::insert_into(dispatch_attempts::table)
            .values(&new_attempt)
            .execute(&mut conn)
            .wrap_err("failed to create attempt")?;

        Ok(())
    }

    fn update_attempt(
        &self,
        id: &AttemptId,
        status: DispatchStatus,
        failures: &FailureSet,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let encoded = serde_json::to_string(failures).wrap_err("failed to encode failures")?;

        conn.transaction::<_, color_eyre::eyre::Report, _>(|conn| {
            let current: Option<String> = dispatch_attempts::table
                .find(id.as_str())
                .select(dispatch_attempts::status)
                .first(conn)
                .optional()
                .wrap_err("failed to read attempt status")?;

            let Some(current) = current else {
                color_eyre::eyre::bail!("attempt {} not found", id);
            };
            check_transition(id, current.parse()?, status)?;

            diesel::update(dispatch_attempts::table.find(id.as_str()))
                .set((
                    dispatch_attempts::status.eq(status.as_str()),
                    dispatch_attempts::failures.eq(&encoded),
                    dispatch_attempts::updated_at.eq(updated_at.naive_utc()),
                ))
                .execute(conn)
                .wrap_err("failed to update attempt")?;

            Ok(())
        })
    }

    fn attempt(&self, id: &AttemptId) -> color_eyre::eyre::Result<Option<DispatchAttempt>> {
        let mut conn = self.conn()?;

        let row: Option<AttemptRow> = dispatch_attempts::table
            .find(id.as_str())
            .select(AttemptRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to get attempt")?;

        row.map(DispatchAttempt::try_from).transpose()
    }

    fn latest_attempts(
        &self,
        credential: &CredentialId,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<DispatchAttempt>> {
        let mut conn = self.conn()?;

        let rows: Vec<AttemptRow> = dispatch_attempts::table
            .filter(dispatch_attempts::credential_id.eq(credential.as_str()))
            .order((
                dispatch_attempts::created_at.desc(),
                dispatch_attempts::id.desc(),
            ))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(AttemptRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to list attempts")?;

        rows.into_iter().map(DispatchAttempt::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_core::Platform;

    fn storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("push.db");
        let storage = SqliteStorage::new(url.to_str().unwrap()).unwrap();
        storage.run_migrations().unwrap();
        (dir, storage)
    }

    #[test]
    fn test_credential_lookup() {
        let (_dir, storage) = storage();
        storage
            .upsert_credential(&Credential::new("acme", "key-1"))
            .unwrap();
        storage
            .upsert_credential(&Credential::new("acme", "key-2"))
            .unwrap();

        assert!(storage.credential_by_api_key("key-1").unwrap().is_none());
        let found = storage.credential_by_api_key("key-2").unwrap().unwrap();
        assert_eq!(found.id, CredentialId::new("acme"));
    }

    #[test]
    fn test_reregistering_device_replaces_token() {
        let (_dir, storage) = storage();
        let credential = CredentialId::new("acme");
        let first = Device::new(credential.clone(), Platform::new("android"), "123", "regid-1");
        let second = Device::new(credential.clone(), Platform::new("android"), "123", "regid-2");

        let stored = storage.register_device(&first).unwrap();
        let updated = storage.register_device(&second).unwrap();

        assert_eq!(stored.uid, updated.uid);
        assert_eq!(updated.token, "regid-2");

        let found = storage.devices(&credential, &[first.uid.clone()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token, "regid-2");

        let other = storage
            .devices(&CredentialId::new("other"), &[first.uid.clone()])
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_attempt_lifecycle() {
        let (_dir, storage) = storage();
        let attempt = DispatchAttempt::queued(
            CredentialId::new("acme"),
            vec!["UID:1".into(), "UID:2".into()],
        );
        storage.create_attempt(&attempt).unwrap();

        let loaded = storage.attempt(&attempt.id).unwrap().unwrap();
        assert_eq!(loaded.status, DispatchStatus::Queued);
        assert_eq!(loaded.recipients, attempt.recipients);

        let mut failures = FailureSet::new();
        failures.insert("UID:2".into(), "Unregistered");
        let settled_at = chrono::Utc::now();
        storage
            .update_attempt(&attempt.id, DispatchStatus::Sent, &failures, settled_at)
            .unwrap();

        let settled = storage.attempt(&attempt.id).unwrap().unwrap();
        assert_eq!(settled.status, DispatchStatus::Sent);
        assert_eq!(settled.failures, failures);
        assert_eq!(settled.updated_at, settled_at);

        assert!(
            storage
                .update_attempt(&attempt.id, DispatchStatus::Failed, &FailureSet::new(), settled_at)
                .is_err()
        );
        assert!(
            storage
                .update_attempt(&AttemptId::new("missing"), DispatchStatus::Sent, &failures, settled_at)
                .is_err()
        );
        assert!(storage.attempt(&AttemptId::new("missing")).unwrap().is_none());
    }

    #[test]
    fn test_latest_attempts_scoped_and_limited() {
        let (_dir, storage) = storage();
        let acme = CredentialId::new("acme");
        for _ in 0..12 {
            storage
                .create_attempt(&DispatchAttempt::pending(acme.clone(), vec!["UID:1".into()]))
                .unwrap();
        }
        storage
            .create_attempt(&DispatchAttempt::pending(
                CredentialId::new("other"),
                vec!["UID:9".into()],
            ))
            .unwrap();

        let latest = storage.latest_attempts(&acme, 10).unwrap();
        assert_eq!(latest.len(), 10);
        assert!(latest.iter().all(|a| a.credential_id == acme));
        assert!(latest.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
