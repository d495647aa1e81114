use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::domain::{Organization, OrganizationPatch};
use super::repository::OrganizationRepository;
use crate::errors::ServiceError;

/// Rules applied to balance mutations.
#[derive(Debug, Clone, Copy)]
pub struct BalancePolicy {
    /// When false, a debit that would leave the balance below zero is rejected.
    pub allow_negative: bool,
}

impl Default for BalancePolicy {
    fn default() -> Self { Self { allow_negative: true } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalanceOp {
    TopUp,
    Debit,
}

impl BalanceOp {
    fn as_str(self) -> &'static str {
        match self {
            BalanceOp::TopUp => "top_up",
            BalanceOp::Debit => "debit",
        }
    }
}

/// Organization business service independent of web framework
pub struct OrganizationService<R: OrganizationRepository + ?Sized> {
    repo: Arc<R>,
    policy: BalancePolicy,
    // one lock per organization id, held across read-compute-write of the balance
    balance_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl<R: OrganizationRepository + ?Sized> OrganizationService<R> {
    pub fn new(repo: Arc<R>, policy: BalancePolicy) -> Self {
        Self { repo, policy, balance_locks: DashMap::new() }
    }

    pub fn policy(&self) -> BalancePolicy { self.policy }

    /// Create an organization with only a name; every other field starts empty.
    ///
    /// # Examples
    /// ```
    /// use service::organization::{repository::mock::MockOrganizationRepository, BalancePolicy, OrganizationService};
    /// use std::sync::Arc;
    /// let svc = OrganizationService::new(Arc::new(MockOrganizationRepository::default()), BalancePolicy::default());
    /// let id = tokio_test::block_on(svc.create("Acme")).unwrap();
    /// let org = tokio_test::block_on(svc.get_by_id(id)).unwrap();
    /// assert_eq!(org.name, "Acme");
    /// assert!(org.rub_balance.is_zero());
    /// ```
    #[instrument(name = "OrganizationService.create", skip(self), err)]
    pub async fn create(&self, name: &str) -> Result<i64, ServiceError> {
        let id = self.repo.create(name).await?;
        info!(organization_id = id, "organization_created");
        Ok(id)
    }

    #[instrument(name = "OrganizationService.get_by_id", skip(self), err)]
    pub async fn get_by_id(&self, id: i64) -> Result<Organization, ServiceError> {
        match self.repo.get_by_id(id).await? {
            Some(org) => Ok(org),
            None => {
                warn!(organization_id = id, "organization not found");
                Err(ServiceError::not_found("organization"))
            }
        }
    }

    #[instrument(name = "OrganizationService.list", skip(self), err)]
    pub async fn list(&self) -> Result<Vec<Organization>, ServiceError> {
        self.repo.list().await
    }

    #[instrument(name = "OrganizationService.update", skip(self, patch), fields(empty_patch = patch.is_empty()), err)]
    pub async fn update(&self, id: i64, patch: &OrganizationPatch) -> Result<(), ServiceError> {
        self.get_by_id(id).await?;
        self.repo.update(id, patch).await?;
        info!(organization_id = id, "organization_updated");
        Ok(())
    }

    #[instrument(name = "OrganizationService.delete", skip(self), err)]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.get_by_id(id).await?;
        self.repo.delete(id).await?;
        self.balance_locks.remove(&id);
        info!(organization_id = id, "organization_deleted");
        Ok(())
    }

    /// Add `amount` to the balance and return the new balance.
    ///
    /// # Examples
    /// ```
    /// use service::organization::{repository::mock::MockOrganizationRepository, BalancePolicy, OrganizationService};
    /// use rust_decimal::Decimal;
    /// use std::sync::Arc;
    /// let svc = OrganizationService::new(Arc::new(MockOrganizationRepository::default()), BalancePolicy::default());
    /// let id = tokio_test::block_on(svc.create("Acme")).unwrap();
    /// let balance = tokio_test::block_on(svc.top_up(id, Decimal::new(10050, 2))).unwrap();
    /// assert_eq!(balance.to_string(), "100.50");
    /// ```
    #[instrument(name = "OrganizationService.top_up", skip(self), fields(amount = %amount), err)]
    pub async fn top_up(&self, id: i64, amount: Decimal) -> Result<Decimal, ServiceError> {
        self.mutate_balance(id, BalanceOp::TopUp, amount).await
    }

    /// Subtract `amount` from the balance and return the new balance.
    /// Goes below zero unless the policy forbids it.
    #[instrument(name = "OrganizationService.debit", skip(self), fields(amount = %amount), err)]
    pub async fn debit(&self, id: i64, amount: Decimal) -> Result<Decimal, ServiceError> {
        self.mutate_balance(id, BalanceOp::Debit, amount).await
    }

    async fn mutate_balance(&self, id: i64, op: BalanceOp, amount: Decimal) -> Result<Decimal, ServiceError> {
        let lock = self.balance_lock(id);
        let guard = lock.lock().await;
        let res = self.apply_balance(id, op, amount).await;
        drop(guard);

        if matches!(res, Err(ServiceError::NotFound(_))) {
            self.release_balance_lock(id, &lock);
        }
        common::telemetry::observe_balance_operation(op.as_str(), res.is_ok());
        if let Ok(balance) = &res {
            info!(organization_id = id, operation = op.as_str(), %amount, %balance, "balance_changed");
        }
        res
    }

    async fn apply_balance(&self, id: i64, op: BalanceOp, amount: Decimal) -> Result<Decimal, ServiceError> {
        let current = self.get_by_id(id).await?.rub_balance;
        let next = match op {
            BalanceOp::TopUp => current.checked_add(amount),
            BalanceOp::Debit => current.checked_sub(amount),
        }
        .ok_or_else(|| ServiceError::Validation(format!("balance overflow applying {} to {}", amount, current)))?;

        if op == BalanceOp::Debit && !self.policy.allow_negative && next.is_sign_negative() && !next.is_zero() {
            warn!(organization_id = id, %current, %amount, "debit rejected: insufficient balance");
            return Err(ServiceError::InsufficientBalance {
                balance: current.to_string(),
                requested: amount.to_string(),
            });
        }

        self.repo.set_balance(id, &next.to_string()).await?;
        Ok(next)
    }

    fn balance_lock(&self, id: i64) -> Arc<Mutex<()>> {
        // clone out so the map shard is not held across an await
        self.balance_locks.entry(id).or_default().value().clone()
    }

    /// Drop the entry for an id that turned out not to exist, unless another
    /// caller is still holding or waiting on it.
    fn release_balance_lock(&self, id: i64, held: &Arc<Mutex<()>>) {
        // map + `held` are the only owners when nobody else is queued
        self.balance_locks
            .remove_if(&id, |_, lock| Arc::ptr_eq(lock, held) && Arc::strong_count(lock) == 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organization::repository::mock::MockOrganizationRepository;
    use serde_json::json;

    fn svc() -> (Arc<MockOrganizationRepository>, OrganizationService<MockOrganizationRepository>) {
        let repo = Arc::new(MockOrganizationRepository::default());
        (repo.clone(), OrganizationService::new(repo, BalancePolicy::default()))
    }

    fn dec(s: &str) -> Decimal { s.parse().unwrap() }

    #[tokio::test]
    async fn created_with_name_only_has_empty_fields() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        let org = svc.get_by_id(id).await.unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(org.rub_balance, Decimal::ZERO);
        assert_eq!(org.video_cut_description_end_sample, "");
        assert_eq!(org.publication_text_end_sample, "");
        assert!(org.tone_of_voice.is_empty());
        assert!(org.brand_rules.is_empty());
        assert!(org.compliance_rules.is_empty());
        assert!(org.audience_insights.is_empty());
        assert!(org.products.is_empty());
        assert!(org.locale.is_empty());
        assert!(org.additional_info.is_empty());
    }

    #[tokio::test]
    async fn empty_name_is_accepted() {
        let (_, svc) = svc();
        let id = svc.create("").await.unwrap();
        assert_eq!(svc.get_by_id(id).await.unwrap().name, "");
    }

    #[tokio::test]
    async fn empty_patch_changes_nothing_and_skips_the_write() {
        let (repo, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        let before = svc.get_by_id(id).await.unwrap();
        let writes = repo.write_count();

        svc.update(id, &OrganizationPatch::default()).await.unwrap();

        assert_eq!(svc.get_by_id(id).await.unwrap(), before);
        assert_eq!(repo.write_count(), writes);
    }

    #[tokio::test]
    async fn subset_patch_changes_only_those_fields() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        let seed = OrganizationPatch {
            brand_rules: Some(vec!["no slang".into()]),
            locale: Some(serde_json::from_value(json!({"language": "ru"})).unwrap()),
            ..Default::default()
        };
        svc.update(id, &seed).await.unwrap();
        let before = svc.get_by_id(id).await.unwrap();

        let patch = OrganizationPatch {
            name: Some("Acme Corp".into()),
            tone_of_voice: Some(vec!["friendly".into(), "concise".into()]),
            ..Default::default()
        };
        svc.update(id, &patch).await.unwrap();

        let after = svc.get_by_id(id).await.unwrap();
        assert_eq!(after.name, "Acme Corp");
        assert_eq!(after.tone_of_voice, vec!["friendly".to_string(), "concise".to_string()]);
        assert_eq!(after.brand_rules, before.brand_rules);
        assert_eq!(after.locale, before.locale);
        assert_eq!(after.rub_balance, before.rub_balance);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn missing_organization_is_not_found_everywhere() {
        let (repo, svc) = svc();
        assert!(matches!(svc.get_by_id(42).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.update(42, &OrganizationPatch::default()).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(42).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.top_up(42, dec("1")).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.debit(42, dec("1")).await, Err(ServiceError::NotFound(_))));
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn list_on_empty_store_is_empty() {
        let (_, svc) = svc();
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_, svc) = svc();
        let first = svc.create("first").await.unwrap();
        let second = svc.create("second").await.unwrap();
        let ids: Vec<i64> = svc.list().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn top_up_then_debit_restores_balance() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        svc.top_up(id, dec("12.34")).await.unwrap();
        let start = svc.get_by_id(id).await.unwrap().rub_balance;

        svc.top_up(id, dec("0.1")).await.unwrap();
        let end = svc.debit(id, dec("0.1")).await.unwrap();
        assert_eq!(end, start);
        assert_eq!(svc.get_by_id(id).await.unwrap().rub_balance, start);
    }

    #[tokio::test]
    async fn debit_below_zero_is_allowed_by_default() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        let balance = svc.debit(id, dec("5")).await.unwrap();
        assert_eq!(balance, dec("-5"));
    }

    #[tokio::test]
    async fn strict_policy_rejects_overdraft_without_writing() {
        let repo = Arc::new(MockOrganizationRepository::default());
        let svc = OrganizationService::new(repo.clone(), BalancePolicy { allow_negative: false });
        let id = svc.create("Acme").await.unwrap();
        svc.top_up(id, dec("3")).await.unwrap();
        let writes = repo.write_count();

        let err = svc.debit(id, dec("5")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientBalance { .. }));
        assert_eq!(repo.write_count(), writes);
        assert_eq!(svc.get_by_id(id).await.unwrap().rub_balance, dec("3"));

        // exactly to zero is fine
        assert_eq!(svc.debit(id, dec("3")).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn store_failures_pass_through() {
        let svc = OrganizationService::new(Arc::new(MockOrganizationRepository::failing()), BalancePolicy::default());
        assert!(matches!(svc.create("x").await, Err(ServiceError::Db(_))));
        assert!(matches!(svc.list().await, Err(ServiceError::Db(_))));
        assert!(matches!(svc.top_up(1, dec("1")).await, Err(ServiceError::Db(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_balance_changes_are_not_lost() {
        let repo = Arc::new(MockOrganizationRepository::default());
        let svc = Arc::new(OrganizationService::new(repo, BalancePolicy::default()));
        let id = svc.create("Acme").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    svc.top_up(id, dec("2")).await
                } else {
                    svc.debit(id, dec("1")).await
                }
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        // 25 top-ups of 2, 25 debits of 1
        assert_eq!(svc.get_by_id(id).await.unwrap().rub_balance, dec("25"));
    }

    #[tokio::test]
    async fn delete_releases_the_balance_lock() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        svc.top_up(id, dec("1")).await.unwrap();
        assert!(svc.balance_locks.contains_key(&id));
        svc.delete(id).await.unwrap();
        assert!(!svc.balance_locks.contains_key(&id));
    }

    #[tokio::test]
    async fn missing_ids_leave_no_balance_locks_behind() {
        let (_, svc) = svc();
        for id in 1000..1100 {
            assert!(matches!(svc.top_up(id, dec("1")).await, Err(ServiceError::NotFound(_))));
            assert!(matches!(svc.debit(id, dec("1")).await, Err(ServiceError::NotFound(_))));
        }
        assert!(svc.balance_locks.is_empty());
    }

    #[tokio::test]
    async fn existing_ids_keep_their_balance_lock() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        svc.top_up(id, dec("1")).await.unwrap();
        assert_eq!(svc.balance_locks.len(), 1);
    }

    #[tokio::test]
    async fn acme_lifecycle() {
        let (_, svc) = svc();
        let id = svc.create("Acme").await.unwrap();
        assert_eq!(svc.top_up(id, dec("100.00")).await.unwrap(), dec("100"));
        assert_eq!(svc.debit(id, dec("30.00")).await.unwrap(), dec("70"));
        assert_eq!(svc.get_by_id(id).await.unwrap().rub_balance.to_string(), "70.00");
        svc.delete(id).await.unwrap();
        assert!(matches!(svc.get_by_id(id).await, Err(ServiceError::NotFound(_))));
    }
}
