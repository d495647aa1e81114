use async_trait::async_trait;

use super::domain::{Organization, OrganizationPatch};
use crate::errors::ServiceError;

/// Data access for organizations. Implementations never reject on business
/// grounds: a missing row is `Ok(None)` / a silent no-op, not an error.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Insert with defaults for every field but `name`; returns the generated id.
    async fn create(&self, name: &str) -> Result<i64, ServiceError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Organization>, ServiceError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Organization>, ServiceError>;
    /// Write only the populated fields of `patch`; an empty patch succeeds without touching storage.
    async fn update(&self, id: i64, patch: &OrganizationPatch) -> Result<(), ServiceError>;
    /// Unconditional overwrite of the balance with a decimal string.
    async fn set_balance(&self, id: i64, rub_balance: &str) -> Result<(), ServiceError>;
    async fn delete(&self, id: i64) -> Result<(), ServiceError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    #[derive(Default)]
    pub struct MockOrganizationRepository {
        rows: Mutex<HashMap<i64, Organization>>,
        last_id: AtomicI64,
        writes: AtomicUsize,
        failing: bool,
    }

    impl MockOrganizationRepository {
        /// Every call fails with a database error.
        pub fn failing() -> Self {
            Self { failing: true, ..Self::default() }
        }

        /// Number of statements that would have modified storage.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), ServiceError> {
            if self.failing {
                return Err(ServiceError::Db("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl OrganizationRepository for MockOrganizationRepository {
        async fn create(&self, name: &str) -> Result<i64, ServiceError> {
            self.check()?;
            let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
            let org = Organization::new(id, name, chrono::Utc::now().fixed_offset());
            self.rows.lock().unwrap().insert(id, org);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(id)
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<Organization>, ServiceError> {
            self.check()?;
            let found = self.rows.lock().unwrap().get(&id).cloned();
            // suspension point between read and the caller's write, as with a real pool
            tokio::task::yield_now().await;
            Ok(found)
        }

        async fn list(&self) -> Result<Vec<Organization>, ServiceError> {
            self.check()?;
            let mut all: Vec<Organization> = self.rows.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(all)
        }

        async fn update(&self, id: i64, patch: &OrganizationPatch) -> Result<(), ServiceError> {
            self.check()?;
            if patch.is_empty() {
                return Ok(());
            }
            if let Some(org) = self.rows.lock().unwrap().get_mut(&id) {
                patch.apply_to(org);
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_balance(&self, id: i64, rub_balance: &str) -> Result<(), ServiceError> {
            self.check()?;
            let parsed: Decimal = rub_balance
                .parse()
                .map_err(|e| ServiceError::Db(format!("invalid balance {rub_balance:?}: {e}")))?;
            if let Some(org) = self.rows.lock().unwrap().get_mut(&id) {
                org.rub_balance = parsed;
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, id: i64) -> Result<(), ServiceError> {
            self.check()?;
            self.rows.lock().unwrap().remove(&id);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
