//! Client-credentials token acquisition with caching and a singleflight guard.
//!
//! [`TokenBroker`] owns the transport, cache, authority descriptor, and strategy for one
//! application registration. A token is looked up under a fixed [`CacheKey`], served while
//! it stays outside the refresh skew window, and otherwise re-issued by the authority and
//! written back with an absolute eviction instant. Concurrent misses inside one process
//! queue behind a single async guard so only one exchange is in flight.

// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, DEFAULT_REFRESH_SKEW, ScopeSet, TokenRecord, TokenSecret},
	authority::{AuthorityDescriptor, AuthorityStrategy},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{BasicFacade, ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, OpKind},
	store::{CacheKey, TokenStore},
};

/// Form fields managed by the broker; strategies cannot override them.
const RESERVED_FORM_FIELDS: [&str; 4] = ["grant_type", "scope", "client_id", "client_secret"];

/// Boxed future returned by [`TokenSource::bearer_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret>> + 'a + Send>>;

/// Supplies bearer tokens to the Graph client.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns a token that is valid for at least the refresh skew.
	fn bearer_token(&self) -> TokenFuture<'_>;
}

/// [`TokenSource`] that always returns the same token.
#[derive(Clone)]
pub struct StaticTokenSource(TokenSecret);
impl StaticTokenSource {
	/// Wraps a pre-issued token.
	pub fn new(token: impl Into<String>) -> Self {
		Self(TokenSecret::new(token))
	}
}
impl TokenSource for StaticTokenSource {
	fn bearer_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { Ok(self.0.clone()) })
	}
}
impl Debug for StaticTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StaticTokenSource(<redacted>)")
	}
}

/// Broker specialized for the crate's reqwest transport stack.
pub type ReqwestTokenBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Caching client-credentials broker for one application registration and scope set.
pub struct TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Cache the issued tokens are written to.
	pub store: Arc<dyn TokenStore>,
	/// Authority that issues the tokens.
	pub descriptor: AuthorityDescriptor,
	/// Strategy responsible for request decoration and error classification.
	pub strategy: Arc<dyn AuthorityStrategy>,
	/// Application (client) identifier.
	pub client_id: ApplicationId,
	/// Scopes requested for every token.
	pub scope: ScopeSet,
	client_secret: String,
	cache_key: CacheKey,
	refresh_skew: Duration,
	flow_guard: Arc<AsyncMutex<()>>,
}
impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	#[allow(clippy::too_many_arguments)]
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: AuthorityDescriptor,
		strategy: Arc<dyn AuthorityStrategy>,
		client_id: ApplicationId,
		client_secret: impl Into<String>,
		scope: ScopeSet,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let cache_key = CacheKey::graph_api_token(&descriptor.tenant, &client_id, &scope);

		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy,
			client_id,
			scope,
			client_secret: client_secret.into(),
			cache_key,
			refresh_skew: DEFAULT_REFRESH_SKEW,
			flow_guard: Default::default(),
		}
	}

	/// Overrides the margin subtracted from token expiry; negative values are clamped to zero.
	pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
		self.refresh_skew = skew.max(Duration::ZERO);

		self
	}

	/// Key the broker caches its token under.
	pub fn cache_key(&self) -> &CacheKey {
		&self.cache_key
	}

	/// Returns a valid bearer token, from the cache when possible.
	pub async fn access_token(&self) -> Result<TokenSecret> {
		self.token(false).await.map(|record| record.access_token)
	}

	/// Returns the full token record; `force_refresh` skips the cache lookup.
	pub async fn token(&self, force_refresh: bool) -> Result<TokenRecord> {
		obs::observe(OpKind::AccessToken, "token", async move {
			let _singleflight = self.flow_guard.lock().await;

			if !force_refresh {
				if let Some(current) = self.cached(OffsetDateTime::now_utc()).await? {
					obs::log_cache(true, self.cache_key.as_str());

					return Ok(current);
				}
			}

			obs::log_cache(false, self.cache_key.as_str());

			let record = self.exchange().await?;
			let now = OffsetDateTime::now_utc();

			// A lifetime shorter than the skew is served once but never cached.
			if let Some(ttl) = record.cache_ttl(now, self.refresh_skew) {
				self.store.save(&self.cache_key, record.clone(), now + ttl).await?;
			}

			Ok(record)
		})
		.await
	}

	/// Drops the cached token so the next call requests a new one.
	pub async fn invalidate(&self) -> Result<Option<TokenRecord>> {
		let _singleflight = self.flow_guard.lock().await;

		Ok(self.store.evict(&self.cache_key).await?)
	}

	async fn cached(&self, now: OffsetDateTime) -> Result<Option<TokenRecord>> {
		Ok(self
			.store
			.fetch(&self.cache_key)
			.await?
			.filter(|record| record.is_fresh_at(now, self.refresh_skew)))
	}

	async fn exchange(&self) -> Result<TokenRecord> {
		let mut form = BTreeMap::new();

		self.strategy.augment_token_request(&mut form);

		let extra_params: Vec<(String, String)> = form
			.into_iter()
			.filter(|(key, _)| !RESERVED_FORM_FIELDS.contains(&key.as_str()))
			.collect();
		let facade: BasicFacade<C, M> = BasicFacade::from_descriptor(
			&self.descriptor,
			self.client_id.as_ref(),
			&self.client_secret,
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
		)?;

		facade
			.exchange_client_credentials(self.strategy.as_ref(), &self.scope, &extra_params)
			.await
	}
}
impl<C, M> TokenSource for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn bearer_token(&self) -> TokenFuture<'_> {
		Box::pin(self.access_token())
	}
}
impl<C, M> Debug for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("authority", &self.descriptor.label())
			.field("client_id", &self.client_id)
			.field("scope", &self.scope)
			.field("client_secret", &"<redacted>")
			.field("refresh_skew", &self.refresh_skew)
			.finish()
	}
}
