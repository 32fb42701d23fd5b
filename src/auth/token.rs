//! Bearer token secrets and the records the cache stores.

pub mod record;
pub mod secret;
