//! Directory identifiers spliced into authority URLs and cache keys.

// self
use crate::_prelude::*;

macro_rules! directory_id {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Longest identifier accepted; verified domains stay well below this.
pub const IDENTIFIER_MAX_LEN: usize = 253;

/// Error returned when a directory identifier is rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} id cannot be empty.")]
	Empty {
		/// `Tenant` or `Application`.
		kind: &'static str,
	},
	/// A character outside `[A-Za-z0-9.-]` was found.
	#[error("{kind} id contains `{found}`; only letters, digits, `.` and `-` are allowed.")]
	InvalidCharacter {
		/// `Tenant` or `Application`.
		kind: &'static str,
		/// First rejected character.
		found: char,
	},
	/// The identifier is longer than [`IDENTIFIER_MAX_LEN`].
	#[error("{kind} id exceeds {max} characters.")]
	TooLong {
		/// `Tenant` or `Application`.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

directory_id! {
	/// Directory tenant, either a GUID or a verified domain such as `contoso.onmicrosoft.com`.
	TenantId => "Tenant"
}
directory_id! {
	/// Application (client) id of the app registration.
	ApplicationId => "Application"
}

fn check(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some(found) =
		value.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-')))
	{
		return Err(IdentifierError::InvalidCharacter { kind, found });
	}
	if value.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
