use async_trait::async_trait;

use super::models::{ManagementLink, SubscriptionStatus};
use crate::error::AppResult;

/// key: billing-adapter -> provider integration
///
/// `Ok(None)` means the provider answered but has nothing for the request
/// (unknown customer, no subscription). Transport and server failures are
/// `Err`; callers in this crate treat both as "try again next time".
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Fresh self-service portal link for a provider customer.
    async fn management_url(&self, customer_id: i64) -> AppResult<Option<ManagementLink>>;

    /// Subscription owned by the customer registered under `reference`.
    async fn subscription_id_from_customer_reference(
        &self,
        reference: &str,
    ) -> AppResult<Option<i64>>;

    async fn subscription_status(
        &self,
        subscription_id: i64,
    ) -> AppResult<Option<SubscriptionStatus>>;
}
