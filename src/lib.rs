//! SharePoint Online façade over Microsoft Graph: client-credentials token caching, site and
//! drive lookup, and file upload, with an optional HTTP controller on top.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authority;
#[cfg(feature = "server")] pub mod config;
pub mod credential;
pub mod error;
pub mod graph;
pub mod http;
pub mod oauth;
pub mod obs;
#[cfg(feature = "server")] pub mod server;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ApplicationId, ScopeSet, TenantId},
		authority::{AuthorityDescriptor, AuthorityStrategy, DefaultAuthorityStrategy},
		credential::{StaticTokenSource, TokenBroker, TokenSource},
		graph::{GraphClient, GraphEndpoints},
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		store::{MemoryStore, TokenStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Tenant identifier shared by test fixtures.
	pub const TEST_TENANT: &str = "tenant-test";
	/// Application identifier shared by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret shared by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";
	/// Scope requested by test fixtures.
	pub const TEST_SCOPE: &str = "https://graph.microsoft.com/.default";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds an authority descriptor whose host is the provided mock server base URL.
	pub fn test_descriptor(authority_host: &str) -> AuthorityDescriptor {
		AuthorityDescriptor::builder(
			TenantId::new(TEST_TENANT).expect("Tenant fixture should be valid."),
		)
		.authority_host(Url::parse(authority_host).expect("Mock authority host should parse."))
		.build()
		.expect("Authority descriptor should build for the mock server.")
	}

	/// Constructs a [`TokenBroker`] backed by an in-memory store, default authority strategy,
	/// and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: AuthorityDescriptor,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let strategy: Arc<dyn AuthorityStrategy> = Arc::new(DefaultAuthorityStrategy);
		let scope = ScopeSet::new([TEST_SCOPE]).expect("Scope fixture should be valid.");
		let client_id =
			ApplicationId::new(TEST_CLIENT_ID).expect("Client identifier fixture should be valid.");
		let broker = TokenBroker::with_http_client(
			store,
			descriptor,
			strategy,
			client_id,
			TEST_CLIENT_SECRET,
			scope,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		);

		(broker, store_backend)
	}

	/// Builds a [`GraphClient`] pointed at `graph_base` that authenticates with a fixed token.
	pub fn build_static_graph_client(graph_base: &str, spo_host: &str) -> GraphClient {
		let endpoints = GraphEndpoints::new(
			Url::parse(graph_base).expect("Mock Graph base URL should parse."),
			spo_host,
		);
		let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("graph-test-token"));

		GraphClient::new(test_reqwest_http_client().0, endpoints, tokens)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(any(test, feature = "server"))] use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
