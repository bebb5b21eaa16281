use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: accounts-model -> tenant record behind mailboxes and billing
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing)]
    pub webhook_secret: String,
    pub chargify_customer_id: Option<i64>,
    pub chargify_subscription_id: Option<i64>,
    pub billing_status: Option<String>,
    pub billing_plan_id: Option<Uuid>,
    pub chargify_portal_url: Option<String>,
    pub chargify_portal_valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Customer id usable against the billing provider. Zero and negative
    /// ids are placeholders from development data and never leave the app.
    pub fn billable_customer_id(&self) -> Option<i64> {
        self.chargify_customer_id.filter(|id| *id > 0)
    }

    /// Whether the cached portal link must be fetched again before use.
    pub fn portal_link_stale(&self, now: DateTime<Utc>) -> bool {
        let blank = self
            .chargify_portal_url
            .as_deref()
            .map(|url| url.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return true;
        }
        match self.chargify_portal_valid_until {
            Some(valid_until) => valid_until < now,
            None => true,
        }
    }
}

/// Input for [`crate::accounts::create_account`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    #[serde(default)]
    pub owner: Option<NewUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Fully prepared row handed to the store: slug resolved, secret generated.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Owner,
    Agent,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "owner",
            MembershipRole::Agent => "agent",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "owner" => MembershipRole::Owner,
            _ => MembershipRole::Agent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: Uuid,
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub created_at: DateTime<Utc>,
}

/// A user reached through one of the account's memberships.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Member {
    pub user: User,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Webhook {
    pub id: Uuid,
    pub account_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Row counts of everything an account owns.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct AccountDependents {
    pub conversations: i64,
    pub people: i64,
    pub memberships: i64,
    pub webhooks: i64,
}

impl AccountDependents {
    pub fn is_empty(&self) -> bool {
        self.conversations == 0 && self.people == 0 && self.memberships == 0 && self.webhooks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            slug: "acme".into(),
            webhook_secret: "0".repeat(32),
            chargify_customer_id: None,
            chargify_subscription_id: None,
            billing_status: None,
            billing_plan_id: None,
            chargify_portal_url: None,
            chargify_portal_valid_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn portal_link_stale_when_blank_or_expired() {
        let now = Utc::now();
        let mut account = account();
        assert!(account.portal_link_stale(now));

        account.chargify_portal_url = Some("   ".into());
        account.chargify_portal_valid_until = Some(now + Duration::days(1));
        assert!(account.portal_link_stale(now));

        account.chargify_portal_url = Some("https://portal.example/abc".into());
        assert!(!account.portal_link_stale(now));

        account.chargify_portal_valid_until = Some(now - Duration::seconds(1));
        assert!(account.portal_link_stale(now));

        account.chargify_portal_valid_until = None;
        assert!(account.portal_link_stale(now));
    }

    #[test]
    fn only_positive_customer_ids_are_billable() {
        let mut account = account();
        assert_eq!(account.billable_customer_id(), None);
        account.chargify_customer_id = Some(0);
        assert_eq!(account.billable_customer_id(), None);
        account.chargify_customer_id = Some(-4);
        assert_eq!(account.billable_customer_id(), None);
        account.chargify_customer_id = Some(42);
        assert_eq!(account.billable_customer_id(), Some(42));
    }

    #[test]
    fn webhook_secret_is_not_serialized() {
        let value = serde_json::to_value(account()).unwrap();
        assert!(value.get("webhook_secret").is_none());
        assert_eq!(value["slug"], "acme");
    }
}
