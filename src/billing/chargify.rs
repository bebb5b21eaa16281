use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::adapters::BillingClient;
use super::models::{ManagementLink, SubscriptionStatus};
use crate::config;
use crate::error::{AppError, AppResult};

/// key: billing-adapter-chargify -> REST client for the hosted billing site
pub struct ChargifyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ManagementLinkResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    customer: CustomerId,
}

#[derive(Debug, Deserialize)]
struct CustomerId {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct SubscriptionIdEnvelope {
    subscription: SubscriptionId,
}

#[derive(Debug, Deserialize)]
struct SubscriptionId {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct SubscriptionStatusEnvelope {
    subscription: SubscriptionStatus,
}

impl ChargifyClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|err| AppError::Message(format!("invalid Chargify base url {base_url}: {err}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Builds a client from `CHARGIFY_*` settings. `None` when billing is not
    /// configured for this environment.
    pub fn from_env() -> AppResult<Option<Self>> {
        let (Some(base_url), Some(api_key)) =
            (config::chargify_base_url(), config::CHARGIFY_API_KEY.clone())
        else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(*config::CHARGIFY_TIMEOUT_SECS);
        Self::new(base_url, api_key, timeout).map(Some)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Option<T>> {
        let response = self
            .client
            .get(self.endpoint(path))
            .basic_auth(&self.api_key, Some("x"))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.error_for_status()?.json::<T>().await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl BillingClient for ChargifyClient {
    async fn management_url(&self, customer_id: i64) -> AppResult<Option<ManagementLink>> {
        let path = format!("portal/customers/{customer_id}/management_link.json");
        let response = self.get_json::<ManagementLinkResponse>(&path, &[]).await?;
        Ok(response.and_then(|link| match (link.url, link.expires_at) {
            (Some(url), Some(expires_at)) if !url.is_empty() => {
                Some(ManagementLink { url, expires_at })
            }
            _ => None,
        }))
    }

    async fn subscription_id_from_customer_reference(
        &self,
        reference: &str,
    ) -> AppResult<Option<i64>> {
        let Some(customer) = self
            .get_json::<CustomerEnvelope>("customers/lookup.json", &[("reference", reference)])
            .await?
        else {
            return Ok(None);
        };

        let path = format!("customers/{}/subscriptions.json", customer.customer.id);
        let subscriptions = self
            .get_json::<Vec<SubscriptionIdEnvelope>>(&path, &[])
            .await?
            .unwrap_or_default();
        Ok(subscriptions
            .into_iter()
            .next()
            .map(|envelope| envelope.subscription.id))
    }

    async fn subscription_status(
        &self,
        subscription_id: i64,
    ) -> AppResult<Option<SubscriptionStatus>> {
        let path = format!("subscriptions/{subscription_id}.json");
        let response = self
            .get_json::<SubscriptionStatusEnvelope>(&path, &[])
            .await?;
        Ok(response.map(|envelope| envelope.subscription))
    }
}
