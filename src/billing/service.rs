use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::adapters::BillingClient;
use crate::accounts::models::Account;
use crate::accounts::store::{AccountStore, BillingSnapshot};
use crate::error::AppResult;

/// key: billing-service -> portal link cache and subscription mirroring
///
/// Provider failures never surface from here: they are logged and the
/// account keeps whatever it had, to be retried on the next call. Store
/// failures do propagate.
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn AccountStore>,
    client: Arc<dyn BillingClient>,
}

impl BillingService {
    pub fn new(store: Arc<dyn AccountStore>, client: Arc<dyn BillingClient>) -> Self {
        Self { store, client }
    }

    /// Returns the account's self-service portal link, fetching and
    /// persisting a new one when the cached link is blank or expired.
    /// Returns an empty string when no link has ever been obtained.
    pub async fn portal_url(&self, account: &mut Account, now: DateTime<Utc>) -> AppResult<String> {
        if !account.portal_link_stale(now) {
            debug!(account_id = %account.id, "portal link still valid");
            return Ok(cached_portal_url(account));
        }

        let Some(customer_id) = account.billable_customer_id() else {
            debug!(
                account_id = %account.id,
                customer_id = ?account.chargify_customer_id,
                "portal link stale but account has no billable customer; skipping provider"
            );
            return Ok(cached_portal_url(account));
        };

        match self.client.management_url(customer_id).await {
            Ok(Some(link)) => {
                self.store
                    .update_portal_link(account.id, &link.url, link.expires_at)
                    .await?;
                info!(
                    account_id = %account.id,
                    valid_until = %link.expires_at,
                    "refreshed billing portal link"
                );
                account.chargify_portal_url = Some(link.url);
                account.chargify_portal_valid_until = Some(link.expires_at);
            }
            Ok(None) => {
                warn!(account_id = %account.id, customer_id, "provider returned no portal link");
            }
            Err(err) => {
                warn!(?err, account_id = %account.id, customer_id, "failed to fetch portal link");
            }
        }

        Ok(cached_portal_url(account))
    }

    /// Pulls the latest subscription state from the provider into the
    /// account. Looks up the subscription id once if the account doesn't
    /// have one yet; an id that is already stored is never replaced.
    pub async fn refresh_subscription(&self, account: &mut Account) -> AppResult<()> {
        let subscription_id = match account.chargify_subscription_id {
            Some(id) => id,
            None => match self.lookup_subscription_id(account).await? {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        let status = match self.client.subscription_status(subscription_id).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(account_id = %account.id, subscription_id, "provider returned no subscription");
                return Ok(());
            }
            Err(err) => {
                warn!(
                    ?err,
                    account_id = %account.id,
                    subscription_id,
                    "failed to fetch subscription status"
                );
                return Ok(());
            }
        };

        let plan = self
            .store
            .find_billing_plan_by_slug(&status.product.handle)
            .await?;
        if plan.is_none() {
            warn!(
                account_id = %account.id,
                handle = %status.product.handle,
                "no billing plan matches provider product handle"
            );
        }

        let snapshot = BillingSnapshot {
            billing_status: status.state,
            billing_plan_id: plan.map(|plan| plan.id),
            chargify_customer_id: status.customer.id,
        };
        self.store
            .apply_billing_snapshot(account.id, &snapshot)
            .await?;
        info!(
            account_id = %account.id,
            subscription_id,
            billing_status = %snapshot.billing_status,
            "synchronized subscription from provider"
        );

        account.billing_status = Some(snapshot.billing_status);
        account.billing_plan_id = snapshot.billing_plan_id;
        account.chargify_customer_id = Some(snapshot.chargify_customer_id);
        Ok(())
    }

    async fn lookup_subscription_id(&self, account: &mut Account) -> AppResult<Option<i64>> {
        let reference = account.id.to_string();
        let found = match self
            .client
            .subscription_id_from_customer_reference(&reference)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                warn!(?err, account_id = %account.id, "failed to look up subscription id");
                None
            }
        };
        let Some(found) = found else {
            debug!(account_id = %account.id, "no subscription registered for account");
            return Ok(None);
        };

        let stored = self
            .store
            .set_subscription_id_if_absent(account.id, found)
            .await?;
        account.chargify_subscription_id = Some(stored);
        Ok(Some(stored))
    }
}

fn cached_portal_url(account: &Account) -> String {
    account.chargify_portal_url.clone().unwrap_or_default()
}
