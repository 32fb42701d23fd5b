//! JSON-file [`TokenStore`] so a token survives process restarts.
//!
//! Several processes may share one file. Every mutation re-reads the file and merges it
//! with the change before the atomic rename, so entries written by other processes are
//! kept; concurrent writes to the same key resolve to the last rename. Fetch misses fall
//! back to the file to pick up tokens cached elsewhere.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
	process,
};
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{CacheEntry, CacheKey, StoreError, StoreFuture, TokenStore},
};

type Snapshot = HashMap<CacheKey, CacheEntry>;

/// Persists cache entries to a JSON file shared across processes.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, dropping entries that already lapsed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let now = OffsetDateTime::now_utc();
		let mut snapshot = load_snapshot(&path)?;

		snapshot.retain(|_, entry| entry.is_live_at(now));

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Replaces `contents` with the live entries currently on disk.
	fn reload_locked(&self, contents: &mut Snapshot, now: OffsetDateTime) -> Result<(), StoreError> {
		let mut snapshot = load_snapshot(&self.path)?;

		snapshot.retain(|_, entry| entry.is_live_at(now));
		*contents = snapshot;

		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let entries: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension(format!("{}.tmp", process::id()));

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl TokenStore for FileStore {
	fn fetch<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let live = |snapshot: &Snapshot| {
				snapshot
					.get(key)
					.filter(|entry| entry.is_live_at(now))
					.map(|entry| entry.record.clone())
			};

			if let Some(record) = live(&*self.inner.read()) {
				return Ok(Some(record));
			}

			let mut guard = self.inner.write();

			self.reload_locked(&mut guard, now)?;

			Ok(live(&*guard))
		})
	}

	fn save<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		evict_at: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();

			self.reload_locked(&mut guard, now)?;
			guard.insert(key.clone(), CacheEntry { record, evict_at });

			self.persist_locked(&guard)
		})
	}

	fn evict<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let cached = guard.remove(key);

			self.reload_locked(&mut guard, now)?;

			let on_disk = guard.remove(key);
			let Some(entry) = on_disk.or(cached) else {
				return Ok(None);
			};

			self.persist_locked(&guard)?;

			Ok(entry.is_live_at(now).then_some(entry.record))
		})
	}
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.is_empty() {
		return Ok(HashMap::new());
	}

	let entries: Vec<(CacheKey, CacheEntry)> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, err: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {err}", path.display()) }
}
