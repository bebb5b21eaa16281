use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use super::models::{
    Account, AccountDependents, AccountDraft, Conversation, Member, Membership, MembershipRole,
    NewUser, Person, User, Webhook,
};
use super::store::{AccountStore, BillingSnapshot};
use crate::billing::models::BillingPlan;
use crate::error::{AppError, AppResult, ValidationError};

const ACCOUNT_COLUMNS: &str = "id, name, slug, webhook_secret, chargify_customer_id, \
    chargify_subscription_id, billing_status, billing_plan_id, chargify_portal_url, \
    chargify_portal_valid_until, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

/// key: accounts-store-postgres -> sqlx backed account persistence
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_insert_error(err: sqlx::Error, email: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return ValidationError::EmailTaken(email.to_string()).into();
        }
    }
    error!(?err, "DB error creating account owner");
    AppError::Db(err)
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find(&self, id: Uuid) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE slug = $1 LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn slug_taken(&self, slug: &str) -> AppResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn create(
        &self,
        draft: AccountDraft,
        owner: Option<NewUser>,
    ) -> AppResult<(Account, Option<Membership>)> {
        if draft.name.trim().is_empty() {
            return Err(ValidationError::BlankName.into());
        }
        if draft.slug.trim().is_empty() {
            return Err(ValidationError::BlankSlug.into());
        }

        // Dropping `tx` on any early return rolls every insert back.
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, name, slug, webhook_secret) VALUES ($1, $2, $3, $4) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(draft.id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.webhook_secret)
        .fetch_one(&mut *tx)
        .await?;

        let membership = match owner {
            Some(new_user) => {
                let user = sqlx::query_as::<_, User>(
                    "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) \
                     RETURNING id, email, name, created_at",
                )
                .bind(Uuid::new_v4())
                .bind(&new_user.email)
                .bind(&new_user.name)
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| user_insert_error(err, &new_user.email))?;

                let row = sqlx::query(
                    "INSERT INTO memberships (id, account_id, user_id, role) VALUES ($1, $2, $3, $4) \
                     RETURNING id, created_at",
                )
                .bind(Uuid::new_v4())
                .bind(account.id)
                .bind(user.id)
                .bind(MembershipRole::Owner.as_str())
                .fetch_one(&mut *tx)
                .await?;

                Some(Membership {
                    id: row.get("id"),
                    account_id: account.id,
                    user_id: user.id,
                    role: MembershipRole::Owner,
                    created_at: row.get("created_at"),
                })
            }
            None => None,
        };

        tx.commit().await?;
        Ok((account, membership))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        for table in ["conversations", "people", "memberships", "webhooks"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE account_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn update_portal_link(
        &self,
        id: Uuid,
        url: &str,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE accounts SET chargify_portal_url = $2, chargify_portal_valid_until = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .bind(valid_until)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn set_subscription_id_if_absent(
        &self,
        id: Uuid,
        subscription_id: i64,
    ) -> AppResult<i64> {
        let stored: Option<Option<i64>> = sqlx::query_scalar(
            "UPDATE accounts \
             SET chargify_subscription_id = COALESCE(chargify_subscription_id, $2), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING chargify_subscription_id",
        )
        .bind(id)
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;
        stored.flatten().ok_or(AppError::NotFound)
    }

    async fn apply_billing_snapshot(&self, id: Uuid, snapshot: &BillingSnapshot) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE accounts SET billing_status = $2, billing_plan_id = $3, \
             chargify_customer_id = $4, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&snapshot.billing_status)
        .bind(snapshot.billing_plan_id)
        .bind(snapshot.chargify_customer_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn find_billing_plan_by_slug(&self, slug: &str) -> AppResult<Option<BillingPlan>> {
        let plan = sqlx::query_as::<_, BillingPlan>(
            "SELECT id, slug, name, created_at FROM billing_plans WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn members(&self, account_id: Uuid) -> AppResult<Vec<Member>> {
        let rows = sqlx::query(
            "SELECT u.id, u.email, u.name, u.created_at, m.role \
             FROM memberships m JOIN users u ON u.id = m.user_id \
             WHERE m.account_id = $1 ORDER BY m.created_at ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let role: String = row.get("role");
                Member {
                    user: User {
                        id: row.get("id"),
                        email: row.get("email"),
                        name: row.get("name"),
                        created_at: row.get("created_at"),
                    },
                    role: MembershipRole::from_str(&role),
                }
            })
            .collect())
    }

    async fn add_conversation(&self, account_id: Uuid, subject: &str) -> AppResult<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (id, account_id, subject) VALUES ($1, $2, $3) \
             RETURNING id, account_id, subject, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(subject)
        .fetch_one(&self.pool)
        .await?;
        Ok(conversation)
    }

    async fn add_person(
        &self,
        account_id: Uuid,
        email: &str,
        name: Option<&str>,
    ) -> AppResult<Person> {
        let person = sqlx::query_as::<_, Person>(
            "INSERT INTO people (id, account_id, email, name) VALUES ($1, $2, $3, $4) \
             RETURNING id, account_id, email, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(person)
    }

    async fn add_webhook(&self, account_id: Uuid, url: &str) -> AppResult<Webhook> {
        let webhook = sqlx::query_as::<_, Webhook>(
            "INSERT INTO webhooks (id, account_id, url) VALUES ($1, $2, $3) \
             RETURNING id, account_id, url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(webhook)
    }

    async fn dependents(&self, account_id: Uuid) -> AppResult<AccountDependents> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM conversations WHERE account_id = $1) AS conversations,
                (SELECT COUNT(*) FROM people WHERE account_id = $1) AS people,
                (SELECT COUNT(*) FROM memberships WHERE account_id = $1) AS memberships,
                (SELECT COUNT(*) FROM webhooks WHERE account_id = $1) AS webhooks
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountDependents {
            conversations: row.get("conversations"),
            people: row.get("people"),
            memberships: row.get("memberships"),
            webhooks: row.get("webhooks"),
        })
    }
}
