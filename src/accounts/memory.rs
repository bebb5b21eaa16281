//! In-memory [`AccountStore`] used by tests and local tooling.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    Account, AccountDependents, AccountDraft, Conversation, Member, Membership, MembershipRole,
    NewUser, Person, User, Webhook,
};
use super::store::{AccountStore, BillingSnapshot};
use crate::billing::models::BillingPlan;
use crate::error::{AppError, AppResult, ValidationError};

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    users: HashMap<Uuid, User>,
    memberships: Vec<Membership>,
    conversations: Vec<Conversation>,
    people: Vec<Person>,
    webhooks: Vec<Webhook>,
    billing_plans: Vec<BillingPlan>,
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    state: Mutex<State>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_billing_plan(&self, slug: &str, name: &str) -> AppResult<BillingPlan> {
        let plan = BillingPlan {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.state()?.billing_plans.push(plan.clone());
        Ok(plan)
    }

    /// Inserts or replaces an account row as-is, bypassing creation rules.
    pub fn put_account(&self, account: Account) -> AppResult<()> {
        self.state()?.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn insert_user(&self, email: &str, name: Option<&str>) -> AppResult<User> {
        let mut state = self.state()?;
        insert_user(&mut state, email, name)
    }

    fn state(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Message("account store lock poisoned".into()))
    }
}

fn insert_user(state: &mut State, email: &str, name: Option<&str>) -> AppResult<User> {
    if state
        .users
        .values()
        .any(|user| user.email.eq_ignore_ascii_case(email))
    {
        return Err(ValidationError::EmailTaken(email.to_string()).into());
    }
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.map(str::to_string),
        created_at: Utc::now(),
    };
    state.users.insert(user.id, user.clone());
    Ok(user)
}

fn account_mut(state: &mut State, id: Uuid) -> AppResult<&mut Account> {
    state.accounts.get_mut(&id).ok_or(AppError::NotFound)
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.state()?.accounts.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Account>> {
        Ok(self
            .state()?
            .accounts
            .values()
            .find(|account| account.slug == slug)
            .cloned())
    }

    async fn slug_taken(&self, slug: &str) -> AppResult<bool> {
        Ok(self
            .state()?
            .accounts
            .values()
            .any(|account| account.slug == slug))
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

        let mut state = self.state()?;
        if state.accounts.values().any(|account| account.slug == draft.slug) {
            return Err(AppError::Message(format!(
                "slug `{}` is already in use",
                draft.slug
            )));
        }

        // Owner first: a rejected user leaves nothing behind.
        let owner = match owner {
            Some(new_user) => Some(insert_user(
                &mut state,
                &new_user.email,
                new_user.name.as_deref(),
            )?),
            None => None,
        };

        let now = Utc::now();
        let account = Account {
            id: draft.id,
            name: draft.name,
            slug: draft.slug,
            webhook_secret: draft.webhook_secret,
            chargify_customer_id: None,
            chargify_subscription_id: None,
            billing_status: None,
            billing_plan_id: None,
            chargify_portal_url: None,
            chargify_portal_valid_until: None,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(account.id, account.clone());

        let membership = owner.map(|user| Membership {
            id: Uuid::new_v4(),
            account_id: account.id,
            user_id: user.id,
            role: MembershipRole::Owner,
            created_at: now,
        });
        if let Some(membership) = &membership {
            state.memberships.push(membership.clone());
        }

        Ok((account, membership))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state()?;
        if state.accounts.remove(&id).is_none() {
            return Ok(false);
        }
        state.conversations.retain(|row| row.account_id != id);
        state.people.retain(|row| row.account_id != id);
        state.memberships.retain(|row| row.account_id != id);
        state.webhooks.retain(|row| row.account_id != id);
        Ok(true)
    }

    async fn update_portal_link(
        &self,
        id: Uuid,
        url: &str,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state()?;
        let account = account_mut(&mut state, id)?;
        account.chargify_portal_url = Some(url.to_string());
        account.chargify_portal_valid_until = Some(valid_until);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn set_subscription_id_if_absent(
        &self,
        id: Uuid,
        subscription_id: i64,
    ) -> AppResult<i64> {
        let mut state = self.state()?;
        let account = account_mut(&mut state, id)?;
        let stored = *account
            .chargify_subscription_id
            .get_or_insert(subscription_id);
        account.updated_at = Utc::now();
        Ok(stored)
    }

    async fn apply_billing_snapshot(&self, id: Uuid, snapshot: &BillingSnapshot) -> AppResult<()> {
        let mut state = self.state()?;
        let account = account_mut(&mut state, id)?;
        account.billing_status = Some(snapshot.billing_status.clone());
        account.billing_plan_id = snapshot.billing_plan_id;
        account.chargify_customer_id = Some(snapshot.chargify_customer_id);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn find_billing_plan_by_slug(&self, slug: &str) -> AppResult<Option<BillingPlan>> {
        Ok(self
            .state()?
            .billing_plans
            .iter()
            .find(|plan| plan.slug == slug)
            .cloned())
    }

    async fn members(&self, account_id: Uuid) -> AppResult<Vec<Member>> {
        let state = self.state()?;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| membership.account_id == account_id)
            .filter_map(|membership| {
                state.users.get(&membership.user_id).map(|user| Member {
                    user: user.clone(),
                    role: membership.role,
                })
            })
            .collect())
    }

    async fn add_conversation(&self, account_id: Uuid, subject: &str) -> AppResult<Conversation> {
        let mut state = self.state()?;
        account_mut(&mut state, account_id)?;
        let conversation = Conversation {
            id: Uuid::new_v4(),
            account_id,
            subject: subject.to_string(),
            created_at: Utc::now(),
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn add_person(
        &self,
        account_id: Uuid,
        email: &str,
        name: Option<&str>,
    ) -> AppResult<Person> {
        let mut state = self.state()?;
        account_mut(&mut state, account_id)?;
        let person = Person {
            id: Uuid::new_v4(),
            account_id,
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: Utc::now(),
        };
        state.people.push(person.clone());
        Ok(person)
    }

    async fn add_webhook(&self, account_id: Uuid, url: &str) -> AppResult<Webhook> {
        let mut state = self.state()?;
        account_mut(&mut state, account_id)?;
        let webhook = Webhook {
            id: Uuid::new_v4(),
            account_id,
            url: url.to_string(),
            created_at: Utc::now(),
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }

    async fn dependents(&self, account_id: Uuid) -> AppResult<AccountDependents> {
        let state = self.state()?;
        Ok(AccountDependents {
            conversations: state
                .conversations
                .iter()
                .filter(|row| row.account_id == account_id)
                .count() as i64,
            people: state
                .people
                .iter()
                .filter(|row| row.account_id == account_id)
                .count() as i64,
            memberships: state
                .memberships
                .iter()
                .filter(|row| row.account_id == account_id)
                .count() as i64,
            webhooks: state
                .webhooks
                .iter()
                .filter(|row| row.account_id == account_id)
                .count() as i64,
        })
    }
}
