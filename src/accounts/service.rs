use tracing::info;
use uuid::Uuid;

use super::models::{Account, AccountDraft, Member, Membership, NewAccount};
use super::slug::unique_slug;
use super::store::AccountStore;
use crate::error::{AppError, AppResult, ValidationError};
use crate::webhooks::generate_webhook_secret;

/// Creates an account, and its owner when one is supplied.
///
/// The slug and webhook secret are fixed here, before anything is written.
/// The account, owner user and owner membership are committed together or
/// not at all.
pub async fn create_account(
    store: &dyn AccountStore,
    new_account: NewAccount,
) -> AppResult<(Account, Option<Membership>)> {
    let name = new_account.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::BlankName.into());
    }
    let slug = unique_slug(store, &name).await?;

    let draft = AccountDraft {
        id: Uuid::new_v4(),
        name,
        slug,
        webhook_secret: generate_webhook_secret(),
    };
    let (account, membership) = store.create(draft, new_account.owner).await?;
    info!(
        account_id = %account.id,
        slug = %account.slug,
        with_owner = membership.is_some(),
        "account created"
    );
    Ok((account, membership))
}

/// Deletes an account and everything it owns.
pub async fn destroy_account(store: &dyn AccountStore, id: Uuid) -> AppResult<()> {
    if !store.delete(id).await? {
        return Err(AppError::NotFound);
    }
    info!(account_id = %id, "account destroyed");
    Ok(())
}

pub async fn find_account_by_slug(store: &dyn AccountStore, slug: &str) -> AppResult<Account> {
    store.find_by_slug(slug).await?.ok_or(AppError::NotFound)
}

/// Users of the account, reached through its memberships.
pub async fn members(store: &dyn AccountStore, id: Uuid) -> AppResult<Vec<Member>> {
    if store.find(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    store.members(id).await
}
