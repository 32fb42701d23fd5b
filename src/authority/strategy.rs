//! Authority strategy hooks that customize client-credentials exchanges.
//!
//! Implementations decorate outgoing token requests and normalize error mapping
//! without tying the broker to any particular HTTP client.

// self
use crate::_prelude::*;

/// Strategy hook that allows deployments to decorate requests and classify errors.
///
/// Implementors must be `Send + Sync`; the hooks use crate-owned data so downstream
/// crates never depend on reqwest-specific structures. Only
/// [`classify_token_error`](Self::classify_token_error) is required.
pub trait AuthorityStrategy: Send + Sync {
	/// Maps token endpoint failures into the crate taxonomy.
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind;

	/// Adds form parameters to the client-credentials request before it is dispatched.
	///
	/// The `grant_type`, `scope`, and client credential fields are managed by the broker and
	/// are ignored if inserted here.
	fn augment_token_request(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical token endpoint error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// Authority rejected the grant (tenant, consent, or policy problem).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scope is unknown or not granted.
	InsufficientScope,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Context passed to strategies when classifying token errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code returned by the authority, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field (Entra ID prefixes it with an `AADSTS` code).
	pub error_description: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl TokenErrorContext {
	/// Convenience constructor for transport-level failures.
	pub fn network_failure() -> Self {
		Self { network_error: true, ..Self::default() }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Extracts the leading `AADSTS<digits>` code from the description, if present.
	pub fn aadsts_code(&self) -> Option<u32> {
		let description = self.error_description.as_deref()?;
		let rest = description.trim_start().strip_prefix("AADSTS")?;
		let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());

		rest[..digits_end].parse().ok()
	}
}

/// Default strategy for Entra ID authorities.
///
/// Well-known `AADSTS` codes win over the OAuth `error` field, which wins over the HTTP
/// status. Network failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultAuthorityStrategy;
impl AuthorityStrategy for DefaultAuthorityStrategy {
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		if ctx.network_error {
			return TokenErrorKind::Transient;
		}

		ctx.aadsts_code()
			.and_then(classify_aadsts)
			.or_else(|| ctx.oauth_error.as_deref().and_then(classify_oauth_error))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_aadsts(code: u32) -> Option<TokenErrorKind> {
	match code {
		// Invalid secret, expired secret, unknown application.
		7000215 | 7000222 | 700016 | 7000218 => Some(TokenErrorKind::InvalidClient),
		// Invalid or unconsented scope.
		70011 | 65001 | 1002012 => Some(TokenErrorKind::InsufficientScope),
		// Unknown tenant, disabled application.
		90002 | 900023 | 7000112 => Some(TokenErrorKind::InvalidGrant),
		// Throttled or service unavailable.
		50196 | 90033 => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_oauth_error(value: &str) -> Option<TokenErrorKind> {
	match value.to_ascii_lowercase().as_str() {
		"invalid_grant" | "access_denied" | "invalid_request" => Some(TokenErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(TokenErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(TokenErrorKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400 | 404) => TokenErrorKind::InvalidGrant,
		Some(401) => TokenErrorKind::InvalidClient,
		Some(403) => TokenErrorKind::InsufficientScope,
		_ => TokenErrorKind::Transient,
	}
}
