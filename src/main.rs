use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use helpdesk::accounts::{
    self, create_account, destroy_account, find_account_by_slug, mailbox, match_mailbox,
    AccountStore, NewAccount, NewUser, PgAccountStore,
};
use helpdesk::billing::{BillingService, ChargifyClient};
use helpdesk::config;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: helpdesk <command> [args]

commands:
  create <name> [owner-email]   create an account, optionally with an owner
  destroy <slug>                delete an account and everything it owns
  members <slug>                list users of an account
  mailbox <slug>                print the incoming address of an account
  match <address>               resolve an inbound address to an account
  portal-url <slug>             print the billing portal link, refreshing it if stale
  sync-billing <slug>           pull subscription state from Chargify";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config::DATABASE_URL.as_str())
        .await
        .context("failed to connect to DATABASE_URL")?;
    let store = Arc::new(PgAccountStore::new(pool));

    match (command.as_str(), rest) {
        ("create", [name, owner @ ..]) => {
            let owner = owner.first().map(|email| NewUser {
                email: email.clone(),
                name: None,
            });
            let (account, membership) = create_account(
                &*store,
                NewAccount {
                    name: name.clone(),
                    owner,
                },
            )
            .await?;
            print_json(&json!({ "account": account, "owner": membership }))?;
        }
        ("destroy", [slug]) => {
            let account = find_account_by_slug(&*store, slug).await?;
            destroy_account(&*store, account.id).await?;
            println!("destroyed {}", account.slug);
        }
        ("members", [slug]) => {
            let account = find_account_by_slug(&*store, slug).await?;
            let members = accounts::members(&*store, account.id).await?;
            print_json(&members)?;
        }
        ("mailbox", [slug]) => {
            let account = find_account_by_slug(&*store, slug).await?;
            println!("{}", mailbox(&account, config::INCOMING_EMAIL_DOMAIN.as_str()));
        }
        ("match", [address]) => match match_mailbox(&*store, address).await? {
            Some(account) => print_json(&account)?,
            None => {
                eprintln!("no account matches {address}");
                std::process::exit(1);
            }
        },
        ("portal-url", [slug]) => {
            let billing = billing_service(store.clone())?;
            let mut account = find_account_by_slug(&*store, slug).await?;
            println!("{}", billing.portal_url(&mut account, Utc::now()).await?);
        }
        ("sync-billing", [slug]) => {
            let billing = billing_service(store.clone())?;
            let mut account = find_account_by_slug(&*store, slug).await?;
            billing.refresh_subscription(&mut account).await?;
            print_json(&json!({
                "slug": account.slug,
                "billing_status": account.billing_status,
                "billing_plan_id": account.billing_plan_id,
                "chargify_customer_id": account.chargify_customer_id,
                "chargify_subscription_id": account.chargify_subscription_id,
            }))?;
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn billing_service(store: Arc<PgAccountStore>) -> anyhow::Result<BillingService> {
    let Some(client) = ChargifyClient::from_env()? else {
        bail!("billing is not configured; set CHARGIFY_API_KEY and CHARGIFY_SUBDOMAIN");
    };
    let store: Arc<dyn AccountStore> = store;
    Ok(BillingService::new(store, Arc::new(client)))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
