use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    Account, AccountDependents, AccountDraft, Conversation, Member, Membership, NewUser, Person,
    Webhook,
};
use crate::billing::models::BillingPlan;
use crate::error::AppResult;

/// Billing fields mirrored from the provider, written together.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingSnapshot {
    pub billing_status: String,
    pub billing_plan_id: Option<Uuid>,
    pub chargify_customer_id: i64,
}

/// key: accounts-store -> persistence seam for accounts and owned rows
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Account>>;

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Account>>;

    async fn slug_taken(&self, slug: &str) -> AppResult<bool>;

    /// Inserts the account and, when given, the owner user with an owner
    /// membership. Either every row is written or none is.
    async fn create(
        &self,
        draft: AccountDraft,
        owner: Option<NewUser>,
    ) -> AppResult<(Account, Option<Membership>)>;

    /// Deletes the account together with its conversations, people,
    /// memberships and webhooks. Returns `false` when no such account exists.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn update_portal_link(
        &self,
        id: Uuid,
        url: &str,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Sets the subscription id only if none is stored yet. Returns the id
    /// that is stored after the call.
    async fn set_subscription_id_if_absent(&self, id: Uuid, subscription_id: i64)
        -> AppResult<i64>;

    async fn apply_billing_snapshot(&self, id: Uuid, snapshot: &BillingSnapshot) -> AppResult<()>;

    async fn find_billing_plan_by_slug(&self, slug: &str) -> AppResult<Option<BillingPlan>>;

    async fn members(&self, account_id: Uuid) -> AppResult<Vec<Member>>;

    async fn add_conversation(&self, account_id: Uuid, subject: &str) -> AppResult<Conversation>;

    async fn add_person(
        &self,
        account_id: Uuid,
        email: &str,
        name: Option<&str>,
    ) -> AppResult<Person>;

    async fn add_webhook(&self, account_id: Uuid, url: &str) -> AppResult<Webhook>;

    async fn dependents(&self, account_id: Uuid) -> AppResult<AccountDependents>;
}
