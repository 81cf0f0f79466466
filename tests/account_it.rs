mod common;

// crates.io
use serde_json::json;
// self
use authed_client::{error::Error, notify::Notice};
use common::*;

const REGISTER: &str = "/api/auth/register/";

#[tokio::test]
async fn login_stores_credential_and_identity() {
	let harness = Harness::new(config(), |call| match call.path.as_str() {
		LOGIN => Reply::json(
			200,
			json!({ "user": { "id": 7, "username": "alice" }, "access": "a1", "refresh": "r1" }),
		),
		_ => Reply::status(404),
	});
	let user = harness.client.login("alice", "secret").await.expect("Login should succeed.");

	assert_eq!(user, alice());
	assert_eq!(harness.tokens().current_user(), Some(alice()));
	assert_eq!(harness.tokens().current_access().map(|t| t.expose().to_owned()), Some("a1".into()));
	assert_eq!(harness.tokens().current_refresh().map(|t| t.expose().to_owned()), Some("r1".into()));

	let login = &harness.transport.calls_to(LOGIN)[0];

	assert_eq!(login.method, "POST");
	assert_eq!(login.json(), json!({ "username": "alice", "password": "secret" }));
}

#[tokio::test]
async fn rejected_login_never_refreshes() {
	let harness = Harness::new(config(), |_| Reply::status(401));

	harness.sign_in("old", "old-refresh");

	let err = harness.client.login("alice", "wrong").await.expect_err("Login is rejected.");

	assert!(matches!(err, Error::Unauthorized { refresh: None, .. }));
	assert!(harness.transport.calls_to(REFRESH).is_empty());
	assert!(harness.tokens().snapshot().is_empty());
	assert_eq!(harness.presenter.notices(), vec![Notice::SessionExpired]);
}

#[tokio::test]
async fn malformed_login_response_is_a_decode_error() {
	let harness = Harness::new(config(), |_| Reply::json(200, json!({ "access": "a1" })));
	let err = harness.client.login("alice", "secret").await.expect_err("Body lacks `user`.");

	assert!(matches!(err, Error::Decode { .. }));
	assert!(!harness.tokens().is_authenticated());
}

#[tokio::test]
async fn register_leaves_session_untouched() {
	let harness = Harness::new(config(), |call| match call.path.as_str() {
		REGISTER => Reply::status(201),
		_ => Reply::status(404),
	});

	harness.client.register("bob", "secret").await.expect("Registration should succeed.");

	assert_eq!(harness.transport.calls_to(REGISTER).len(), 1);
	assert!(!harness.tokens().is_authenticated());
}

#[tokio::test]
async fn register_validation_failure_surfaces_detail() {
	let harness =
		Harness::new(config(), |_| Reply::json(422, json!({ "detail": "Username already taken" })));
	let err = harness.client.register("bob", "secret").await.expect_err("Username is taken.");

	assert!(matches!(err, Error::Validation { ref message, .. } if message == "Username already taken"));
	assert_eq!(
		harness.presenter.notices(),
		vec![Notice::Validation(Some("Username already taken".into()))]
	);
}

#[test]
fn logout_clears_session() {
	let harness = Harness::new(config(), |_| Reply::status(404));

	harness.sign_in("a1", "r1");
	harness.client.logout().expect("Logout should succeed.");

	assert!(harness.tokens().snapshot().is_empty());
	assert!(harness.tokens().current_user().is_none());
}
