use helpdesk::accounts::{
    create_account, extract_slug, mailbox, match_mailbox, match_mailbox_strict, InMemoryAccountStore,
    NewAccount,
};
use helpdesk::AppError;

const DOMAIN: &str = "helpful.io";

async fn store_with(names: &[&str]) -> InMemoryAccountStore {
    let store = InMemoryAccountStore::new();
    for name in names {
        create_account(
            &store,
            NewAccount {
                name: name.to_string(),
                owner: None,
            },
        )
        .await
        .unwrap();
    }
    store
}

// key: mailbox-tests -> address construction and slug routing
#[tokio::test]
async fn mailbox_round_trips_to_the_same_account() {
    let store = store_with(&["Acme", "Big Co, Inc.", "snake_case_team"]).await;

    for slug in ["acme", "big-co-inc", "snake_case_team"] {
        let account = match_mailbox_strict(&store, &format!("{slug}@{DOMAIN}"))
            .await
            .unwrap();
        let address = mailbox(&account, DOMAIN);

        let by_bare = match_mailbox(&store, &address.address).await.unwrap();
        assert_eq!(by_bare.as_ref().map(|a| a.id), Some(account.id));

        let by_formatted = match_mailbox(&store, &address.to_string()).await.unwrap();
        assert_eq!(by_formatted.map(|a| a.id), Some(account.id));
    }
}

#[tokio::test]
async fn mailbox_uses_slug_domain_and_display_name() {
    let store = store_with(&["Big Co, Inc."]).await;
    let account = match_mailbox_strict(&store, "big-co-inc@helpful.io")
        .await
        .unwrap();

    let address = mailbox(&account, "inbound.example.com");
    assert_eq!(address.address, "big-co-inc@inbound.example.com");
    assert_eq!(address.display_name.as_deref(), Some("Big Co, Inc."));
    assert_eq!(
        address.to_string(),
        "\"Big Co, Inc.\" <big-co-inc@inbound.example.com>"
    );
}

#[tokio::test]
async fn tag_suffix_is_ignored() {
    let store = store_with(&["Acme"]).await;

    let matched = match_mailbox(&store, "acme+support@domain.com")
        .await
        .unwrap()
        .expect("tagged address should resolve");
    assert_eq!(matched.slug, "acme");

    let named = match_mailbox(&store, "Support Desk <acme+billing@domain.com>")
        .await
        .unwrap();
    assert_eq!(named.map(|a| a.slug), Some("acme".to_string()));
}

#[tokio::test]
async fn strict_match_reports_unknown_slug_as_not_found() {
    let store = store_with(&["Acme"]).await;

    let err = match_mailbox_strict(&store, "nonexistent@domain.com")
        .await
        .expect_err("unknown slug must not resolve");
    assert!(matches!(err, AppError::NotFound), "unexpected error: {err:?}");
}

#[tokio::test]
async fn malformed_addresses_are_empty_or_not_found() {
    let store = store_with(&["Acme"]).await;

    for raw in ["@domain.com", "acme", "ac.me@domain.com", "acme+a+b@domain.com", ""] {
        assert!(
            match_mailbox(&store, raw).await.unwrap().is_none(),
            "expected no match for {raw:?}"
        );
        let err = match_mailbox_strict(&store, raw)
            .await
            .expect_err("malformed address must not resolve");
        assert!(matches!(err, AppError::NotFound), "unexpected error for {raw:?}: {err:?}");
    }
}

#[test]
fn slug_extraction_only_allows_word_and_hyphen_characters() {
    assert_eq!(extract_slug("big-co_2@helpful.io").as_deref(), Some("big-co_2"));
    assert_eq!(extract_slug("acme+support@helpful.io").as_deref(), Some("acme"));
    assert_eq!(extract_slug("acme!@helpful.io"), None);
}
