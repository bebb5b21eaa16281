use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: billing-plan-model -> matched to provider product handles by slug
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct BillingPlan {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Self-service portal link together with the moment it stops working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagementLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// key: billing-subscription-status -> provider view of one subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionStatus {
    pub state: String,
    pub product: ProductRef,
    pub customer: CustomerRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRef {
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRef {
    pub id: i64,
}
