//! Bearer token records held by the cache.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Taken off a token's lifetime when deciding how long it may stay cached.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::minutes(3);

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordBuilderError {
	/// No access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// No lifetime was provided.
	#[error("Token lifetime (expires_in) is required.")]
	MissingExpiry,
}

/// Bearer token issued by the authority together with its validity window.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Scopes the token was requested for.
	pub scope: ScopeSet,
	#[allow(missing_docs)]
	pub access_token: TokenSecret,
	/// Instant the token response arrived.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// `issued_at + expires_in`.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Starts a record for `scope`.
	pub fn builder(scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder { scope, access_token: None, issued_at: None, expires_in: None }
	}

	/// Whether the authority would already reject the token at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// How long the record may stay cached at `now` once `skew` is taken off its expiry.
	///
	/// `None` means the record must neither be served from nor written to the cache.
	pub fn cache_ttl(&self, now: OffsetDateTime, skew: Duration) -> Option<Duration> {
		let ttl = self.expires_at - now - skew;

		ttl.is_positive().then_some(ttl)
	}

	/// Whether the record can be served from the cache at `now`.
	pub fn is_fresh_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		!self.is_expired_at(now) && self.cache_ttl(now, skew).is_some()
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("scope", &self.scope)
			.field("access_token", &self.access_token)
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Defaults to the current UTC instant when unset.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Lifetime reported by the authority.
	pub fn expires_in(mut self, lifetime: Duration) -> Self {
		self.expires_in = Some(lifetime);

		self
	}

	#[allow(missing_docs)]
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Produces the record.
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let lifetime = self.expires_in.ok_or(TokenRecordBuilderError::MissingExpiry)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);

		Ok(TokenRecord { scope: self.scope, access_token, issued_at, expires_at: issued_at + lifetime })
	}
}
