use std::time::Duration;

use chrono::{TimeZone, Utc};
use helpdesk::billing::{BillingClient, ChargifyClient};
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer) -> ChargifyClient {
    ChargifyClient::new(server.base_url(), "test-key", Duration::from_secs(5)).unwrap()
}

// key: billing-adapter-chargify-tests -> REST contract
#[tokio::test]
async fn management_url_returns_link_and_expiry() {
    let server = MockServer::start_async().await;
    let link_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/portal/customers/42/management_link.json")
            .header_exists("authorization");
        then.status(200).json_body(json!({
            "url": "https://www.billingportal.com/manage/42/abc",
            "fetch_count": 1,
            "created_at": "2024-03-01T09:00:00Z",
            "new_link_available_at": "2024-03-01T09:15:00Z",
            "expires_at": "2024-03-04T09:00:00Z",
        }));
    });

    let link = client(&server)
        .management_url(42)
        .await
        .unwrap()
        .expect("link present");
    assert_eq!(link.url, "https://www.billingportal.com/manage/42/abc");
    assert_eq!(
        link.expires_at,
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    );

    link_mock.assert();
}

#[tokio::test]
async fn management_url_for_unknown_customer_is_empty() {
    let server = MockServer::start_async().await;
    let link_mock = server.mock(|when, then| {
        when.method(GET).path("/portal/customers/7/management_link.json");
        then.status(404).json_body(json!({ "errors": ["Customer not found"] }));
    });

    let link = client(&server).management_url(7).await.unwrap();
    assert!(link.is_none());
    link_mock.assert();
}

#[tokio::test]
async fn subscription_id_resolved_through_customer_reference() {
    let server = MockServer::start_async().await;
    let lookup_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/customers/lookup.json")
            .query_param("reference", "3f1c2e0a-acme");
        then.status(200).json_body(json!({
            "customer": { "id": 314, "reference": "3f1c2e0a-acme" }
        }));
    });
    let subscriptions_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/314/subscriptions.json");
        then.status(200).json_body(json!([
            { "subscription": { "id": 9001, "state": "active" } },
            { "subscription": { "id": 8000, "state": "canceled" } },
        ]));
    });

    let subscription_id = client(&server)
        .subscription_id_from_customer_reference("3f1c2e0a-acme")
        .await
        .unwrap();
    assert_eq!(subscription_id, Some(9001));

    lookup_mock.assert();
    subscriptions_mock.assert();
}

#[tokio::test]
async fn unknown_reference_skips_subscription_listing() {
    let server = MockServer::start_async().await;
    let lookup_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/lookup.json");
        then.status(404);
    });
    let subscriptions_mock = server.mock(|when, then| {
        when.method(GET).path_contains("/subscriptions.json");
        then.status(200).json_body(json!([]));
    });

    let subscription_id = client(&server)
        .subscription_id_from_customer_reference("nobody")
        .await
        .unwrap();
    assert_eq!(subscription_id, None);

    lookup_mock.assert();
    assert_eq!(subscriptions_mock.hits(), 0);
}

#[tokio::test]
async fn customer_without_subscriptions_has_no_id() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/customers/lookup.json");
        then.status(200).json_body(json!({ "customer": { "id": 5 } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/customers/5/subscriptions.json");
        then.status(200).json_body(json!([]));
    });

    let subscription_id = client(&server)
        .subscription_id_from_customer_reference("acme")
        .await
        .unwrap();
    assert_eq!(subscription_id, None);
}

#[tokio::test]
async fn subscription_status_reads_state_product_and_customer() {
    let server = MockServer::start_async().await;
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/subscriptions/9001.json");
        then.status(200).json_body(json!({
            "subscription": {
                "id": 9001,
                "state": "trialing",
                "balance_in_cents": 0,
                "product": { "id": 1, "handle": "pro", "name": "Pro" },
                "customer": { "id": 314, "reference": "3f1c2e0a-acme" }
            }
        }));
    });

    let status = client(&server)
        .subscription_status(9001)
        .await
        .unwrap()
        .expect("status present");
    assert_eq!(status.state, "trialing");
    assert_eq!(status.product.handle, "pro");
    assert_eq!(status.customer.id, 314);

    status_mock.assert();
}

#[tokio::test]
async fn server_errors_surface_as_errors() {
    let server = MockServer::start_async().await;
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/subscriptions/1.json");
        then.status(503);
    });

    let result = client(&server).subscription_status(1).await;
    assert!(result.is_err(), "503 should be an error, got {result:?}");
    status_mock.assert();
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = ChargifyClient::new("not a url", "key", Duration::from_secs(1));
    assert!(result.is_err());
}
