pub mod mailbox;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod slug;
pub mod store;

pub use mailbox::{extract_slug, mailbox, match_mailbox, match_mailbox_strict, Mailbox};
pub use memory::InMemoryAccountStore;
pub use models::{
    Account, AccountDependents, AccountDraft, Conversation, Member, Membership, MembershipRole,
    NewAccount, NewUser, Person, User, Webhook,
};
pub use postgres::PgAccountStore;
pub use service::{create_account, destroy_account, find_account_by_slug, members};
pub use store::{AccountStore, BillingSnapshot};
