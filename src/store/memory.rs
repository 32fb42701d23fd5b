//! Thread-safe in-memory [`TokenStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{CacheEntry, CacheKey, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

/// Process-local cache; the default when no cache file is configured.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of entries currently held, live or not.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true if the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn fetch_now(map: &StoreMap, key: &CacheKey, now: OffsetDateTime) -> Option<TokenRecord> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.record.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		// Stale entry; drop it unless a writer replaced it in between.
		let mut guard = map.write();

		if guard.get(key).is_some_and(|entry| !entry.is_live_at(now)) {
			guard.remove(key);
		}

		None
	}
}
impl TokenStore for MemoryStore {
	fn fetch<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(Self::fetch_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn save<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		evict_at: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().insert(key.clone(), CacheEntry { record, evict_at });

			Ok(())
		})
	}

	fn evict<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(self.0.write().remove(key).filter(|entry| entry.is_live_at(now)).map(|e| e.record))
		})
	}
}
