//! Credential cache contracts and built-in store implementations.
//!
//! Stores behave like a distributed cache: every entry is written with an absolute
//! eviction instant and is invisible to [`TokenStore::fetch`] once that instant passes.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, ScopeSet, TenantId, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by token caches.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the live entry stored under `key`, if any.
	fn fetch<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Stores `record` under `key` until `evict_at`, replacing any previous entry.
	fn save<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		evict_at: OffsetDateTime,
	) -> StoreFuture<'a, ()>;

	/// Removes the entry stored under `key`, returning it if it was still live.
	fn evict<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key under which the Graph bearer token is cached.
///
/// One deployment caches exactly one token, so the key is fixed for a given configuration.
/// Tenant, client, and scope fingerprint are folded in so configurations sharing a file
/// store never read each other's tokens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	/// Prefix shared by every Graph token key.
	pub const GRAPH_API_TOKEN: &'static str = "ApplicationCacheKeys.GraphApiToken";

	/// Builds the Graph token key for a tenant/client/scope triple.
	pub fn graph_api_token(tenant: &TenantId, client: &ApplicationId, scope: &ScopeSet) -> Self {
		Self(format!("{}:{tenant}:{client}:{}", Self::GRAPH_API_TOKEN, scope.fingerprint()))
	}

	/// Returns the key string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Stored value: a record plus the instant it stops being served.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
	pub(crate) record: TokenRecord,
	pub(crate) evict_at: OffsetDateTime,
}
impl CacheEntry {
	pub(crate) fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now < self.evict_at
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	fn key_for(scopes: &[&str]) -> CacheKey {
		CacheKey::graph_api_token(
			&TenantId::new("tenant-1").expect("Tenant fixture should be valid."),
			&ApplicationId::new("client-1").expect("Client fixture should be valid."),
			&ScopeSet::new(scopes.iter().copied()).expect("Scope fixture should be valid."),
		)
	}

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("disk full"));
		assert_eq!(
			StdError::source(&err)
				.expect("Crate error should expose the store error as its source.")
				.to_string(),
			store_error.to_string()
		);
	}

	#[test]
	fn cache_key_is_stable_and_scope_sensitive() {
		let a = key_for(&["Sites.Read.All", "Files.ReadWrite.All"]);
		let b = key_for(&["Files.ReadWrite.All", "Sites.Read.All"]);
		let c = key_for(&["Sites.Read.All"]);

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert!(a.as_str().starts_with("ApplicationCacheKeys.GraphApiToken:tenant-1:client-1:"));
	}
}
