#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use futures::future;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use authed_client::{
	auth::TokenStore,
	client::AuthedClient,
	config::ClientConfig,
	error::{Error, RefreshError},
};

const ITEMS: &str = "/api/items/";
const REFRESH: &str = "/api/auth/refresh/";

fn signed_in_client(server: &MockServer) -> AuthedClient<authed_client::http::ReqwestTransport> {
	let config = ClientConfig::parse(&server.base_url()).expect("Mock base URL should parse.");
	let tokens = Arc::new(TokenStore::in_memory());

	tokens.set_credential("stale", "refresh-1", None).expect("Seeding the session should succeed.");

	AuthedClient::new(config, tokens).expect("Client should build.")
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path(ITEMS).header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path(ITEMS).header("authorization", "Bearer fresh");
			then.status(200).json_body(json!({ "items": [1, 2, 3] }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH).json_body(json!({ "refresh": "refresh-1" }));
			then.status(200)
				.json_body(json!({ "access": "fresh" }))
				.delay(Duration::from_millis(200));
		})
		.await;
	let client = signed_in_client(&server);
	let results =
		future::join_all((0..10).map(|_| client.get_json::<Value>(ITEMS))).await;

	for result in results {
		assert_eq!(result.expect("Every request should recover."), json!({ "items": [1, 2, 3] }));
	}

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(10).await;
	fresh.assert_calls_async(10).await;

	assert_eq!(client.refresher().metrics().attempts(), 1);
	assert!(!client.refresher().is_in_flight());
	assert_eq!(client.tokens.current_access().map(|t| t.expose().to_owned()), Some("fresh".into()));
}

#[tokio::test]
async fn malformed_refresh_response_fails_every_waiter() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path(ITEMS);
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).json_body(json!({ "detail": "ok" })).delay(Duration::from_millis(500));
		})
		.await;
	let client = signed_in_client(&server);
	let results = future::join_all((0..5).map(|_| client.get_json::<Value>(ITEMS))).await;

	for result in results {
		assert!(matches!(
			result,
			Err(Error::Unauthorized {
				refresh: Some(RefreshError::InvalidRefreshResponse { .. }),
				..
			})
		));
	}

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(5).await;

	assert!(client.tokens.snapshot().is_empty());
	assert_eq!(client.refresher().metrics().failures(), 1);
}

#[tokio::test]
async fn settled_refresh_does_not_suppress_the_next_one() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).json_body(json!({ "access": "fresh" }));
		})
		.await;
	let client = signed_in_client(&server);

	client.refresher().refresh().await.expect("First refresh should succeed.");
	client.refresher().refresh().await.expect("Second refresh should succeed.");

	refresh.assert_calls_async(2).await;

	assert_eq!(client.refresher().metrics().joined(), 0);
}
