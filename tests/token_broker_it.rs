// crates.io
use httpmock::prelude::*;
// self
use spo_graph::{
	_preludet::*,
	auth::TokenRecord,
	credential::TokenSource,
	error::TransientError,
	store::TokenStore,
};

const TOKEN_PATH: &str = "/tenant-test/oauth2/v2.0/token";

fn token_body(token: &str, expires_in: u64) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}")
}

#[tokio::test]
async fn access_token_is_cached_after_first_exchange() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("client_id", TEST_CLIENT_ID)
				.form_urlencoded_tuple("client_secret", TEST_CLIENT_SECRET)
				.form_urlencoded_tuple("scope", TEST_SCOPE);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("cached-token", 3599));
		})
		.await;
	let first = broker.access_token().await.expect("Initial token request should succeed.");
	let second = broker.access_token().await.expect("Cached token request should succeed.");

	assert_eq!(first.expose(), "cached-token");
	assert_eq!(second.expose(), "cached-token");

	mock.assert_calls_async(1).await;

	let stored = store
		.fetch(broker.cache_key())
		.await
		.expect("Token store fetch should succeed.")
		.expect("Stored record should remain present.");

	assert_eq!(stored.access_token.expose(), "cached-token");
}

#[tokio::test]
async fn concurrent_misses_share_one_exchange() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("guard-token", 900));
		})
		.await;
	let (first, second, third): (Result<TokenRecord>, Result<TokenRecord>, Result<TokenRecord>) =
		tokio::join!(broker.token(false), broker.token(false), broker.token(false));

	for record in [first, second, third] {
		assert_eq!(
			record.expect("Concurrent call should succeed.").access_token.expose(),
			"guard-token"
		);
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn force_refresh_bypasses_the_cache() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("forced-token", 3599));
		})
		.await;

	broker.token(false).await.expect("Initial token request should succeed.");
	broker.token(true).await.expect("Forced token request should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn lifetime_shorter_than_skew_is_not_cached() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("short-token", 60));
		})
		.await;

	assert_eq!(
		broker.access_token().await.expect("Short-lived token should still be returned.").expose(),
		"short-token"
	);
	assert!(store.is_empty());

	broker.access_token().await.expect("Second request should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn invalidate_forces_a_new_exchange() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("evicted-token", 3599));
		})
		.await;

	broker.access_token().await.expect("Initial token request should succeed.");

	assert!(broker.invalidate().await.expect("Eviction should succeed.").is_some());

	broker.access_token().await.expect("Token request after eviction should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn invalid_client_secret_is_classified() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"AADSTS7000215: Invalid client secret provided.\"}",
			);
		})
		.await;
	let err = broker
		.bearer_token()
		.await
		.expect_err("Invalid client errors should surface to the caller.");

	assert!(matches!(err, Error::InvalidClient { ref reason } if reason.contains("AADSTS7000215")));
	assert!(store.is_empty());

	mock.assert_async().await;
}

#[tokio::test]
async fn throttling_surfaces_retry_after() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503)
				.header("content-type", "application/json")
				.header("retry-after", "7")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;
	let err = broker.access_token().await.expect_err("Throttled requests should fail.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(503));
			assert_eq!(retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	mock.assert_async().await;
}

#[tokio::test]
async fn missing_expires_in_is_a_configuration_error() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(test_descriptor(&server.url("")));
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"no-expiry\",\"token_type\":\"Bearer\"}");
		})
		.await;

	assert!(matches!(broker.access_token().await, Err(Error::Config(_))));
}
