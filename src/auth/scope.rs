//! Scope sets requested from the authority.

// std
use std::{collections::BTreeSet, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// No scope was supplied.
	#[error("At least one scope is required.")]
	Empty,
	/// A scope contained whitespace.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope.
		scope: String,
	},
}

/// Deduplicated, sorted set of scopes.
///
/// Client-credentials requests against Graph carry a single resource scope such as
/// `https://graph.microsoft.com/.default`; the sorted form keeps the
/// [`fingerprint`](Self::fingerprint) stable when more are configured. The fingerprint is the
/// URL-safe unpadded base64 SHA-256 digest of the space-delimited form.
#[derive(Clone)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint: OnceLock<String>,
}
impl ScopeSet {
	/// Normalizes `scopes`, rejecting empty input and whitespace.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let scope: String = scope.into();

			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}

			set.insert(scope);
		}
		if set.is_empty() {
			return Err(ScopeValidationError::Empty);
		}

		Ok(Self { scopes: set.into_iter().collect(), fingerprint: OnceLock::new() })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Whether the set holds no scopes.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	#[allow(missing_docs)]
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(String::as_str)
	}

	/// Space-delimited form sent in the `scope` form field.
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Cache-key component derived from [`normalized`](Self::normalized).
	pub fn fingerprint(&self) -> &str {
		self.fingerprint
			.get_or_init(|| URL_SAFE_NO_PAD.encode(Sha256::digest(self.normalized().as_bytes())))
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.normalized())
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer)?.parse().map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const GRAPH_DEFAULT: &str = "https://graph.microsoft.com/.default";

	#[test]
	fn normalization_is_order_independent() {
		let lhs = ScopeSet::new(["Sites.Read.All", GRAPH_DEFAULT, "Sites.Read.All"])
			.expect("Scope fixture should be valid.");
		let rhs = ScopeSet::from_str(&format!("  {GRAPH_DEFAULT}\tSites.Read.All "))
			.expect("Scope string should parse.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(lhs.normalized(), format!("Sites.Read.All {GRAPH_DEFAULT}"));
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn fingerprint_is_key_safe() {
		let scope = ScopeSet::new([GRAPH_DEFAULT]).expect("Scope fixture should be valid.");
		let fingerprint = scope.fingerprint();

		assert_eq!(fingerprint.len(), 43);
		assert!(!fingerprint.contains(['/', '+', '=', ':']));
	}

	#[test]
	fn invalid_scopes_are_rejected() {
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert_eq!(ScopeSet::new(Vec::<String>::new()), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new([" padded "]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert_eq!(ScopeSet::from_str("   "), Err(ScopeValidationError::Empty));
	}

	#[test]
	fn serde_uses_the_space_delimited_form() {
		let scope = ScopeSet::new([GRAPH_DEFAULT]).expect("Scope fixture should be valid.");

		assert_eq!(
			serde_json::to_string(&scope).expect("Scope set should serialize."),
			format!("\"{GRAPH_DEFAULT}\"")
		);
		assert!(serde_json::from_str::<ScopeSet>("\"\"").is_err());
	}
}
