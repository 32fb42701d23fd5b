//! Validated description of the directory tenant that issues bearer tokens.

// self
use crate::{_prelude::*, auth::TenantId};

/// Public cloud authority host used when none is configured.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AuthorityDescriptorError {
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The authority host cannot carry a path.
	#[error("Authority host cannot be used as a base URL: {url}.")]
	InvalidAuthorityHost {
		/// Host URL that failed validation.
		url: String,
	},
	/// Token endpoint could not be derived from the host.
	#[error("Token endpoint could not be derived: {reason}.")]
	InvalidTokenEndpoint {
		/// Underlying parse failure, rendered.
		reason: String,
	},
}

/// How the client secret is presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// `client_id`/`client_secret` as form body parameters (what Entra ID documents).
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Immutable authority descriptor consumed by the token broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDescriptor {
	/// Tenant the tokens are issued for.
	pub tenant: TenantId,
	/// Fully qualified v2.0 token endpoint.
	pub token_endpoint: Url,
	/// Client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptor {
	/// Creates a new builder for the provided tenant.
	pub fn builder(tenant: TenantId) -> AuthorityDescriptorBuilder {
		AuthorityDescriptorBuilder::new(tenant)
	}

	/// Stable label used in logs and error messages.
	pub fn label(&self) -> String {
		format!("{}@{}", self.tenant, self.token_endpoint.host_str().unwrap_or("unknown"))
	}
}

/// Builder for [`AuthorityDescriptor`] values.
#[derive(Debug)]
pub struct AuthorityDescriptorBuilder {
	tenant: TenantId,
	authority_host: Option<Url>,
	token_endpoint: Option<Url>,
	client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptorBuilder {
	fn new(tenant: TenantId) -> Self {
		Self {
			tenant,
			authority_host: None,
			token_endpoint: None,
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Overrides the authority host (sovereign clouds, test servers).
	pub fn authority_host(mut self, url: Url) -> Self {
		self.authority_host = Some(url);

		self
	}

	/// Pins the token endpoint instead of deriving it from the host and tenant.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthorityDescriptor, AuthorityDescriptorError> {
		let token_endpoint = match self.token_endpoint {
			Some(url) => url,
			None => {
				let host = match self.authority_host {
					Some(url) => url,
					None => Url::parse(DEFAULT_AUTHORITY_HOST).map_err(|e| {
						AuthorityDescriptorError::InvalidTokenEndpoint { reason: e.to_string() }
					})?,
				};

				derive_token_endpoint(&host, &self.tenant)?
			},
		};
		let descriptor = AuthorityDescriptor {
			tenant: self.tenant,
			token_endpoint,
			client_auth_method: self.client_auth_method,
		};

		validate_endpoint("token", &descriptor.token_endpoint)?;

		Ok(descriptor)
	}
}

fn derive_token_endpoint(host: &Url, tenant: &TenantId) -> Result<Url, AuthorityDescriptorError> {
	if host.cannot_be_a_base() {
		return Err(AuthorityDescriptorError::InvalidAuthorityHost { url: host.to_string() });
	}

	let mut base = host.clone();

	// `Url::join` drops the last segment unless the path ends with a slash.
	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	base.join(&format!("{tenant}/oauth2/v2.0/token"))
		.map_err(|e| AuthorityDescriptorError::InvalidTokenEndpoint { reason: e.to_string() })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), AuthorityDescriptorError> {
	if url.scheme() != "https" {
		Err(AuthorityDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn tenant() -> TenantId {
		TenantId::new("contoso.onmicrosoft.com").expect("Tenant fixture should be valid.")
	}

	#[test]
	fn derives_public_cloud_endpoint() {
		let descriptor =
			AuthorityDescriptor::builder(tenant()).build().expect("Default descriptor should build.");

		assert_eq!(
			descriptor.token_endpoint.as_str(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);
		assert_eq!(descriptor.label(), "contoso.onmicrosoft.com@login.microsoftonline.com");
	}

	#[test]
	fn host_with_path_keeps_its_segments() {
		let descriptor = AuthorityDescriptor::builder(tenant())
			.authority_host(Url::parse("https://proxy.example.com/aad").expect("URL should parse."))
			.build()
			.expect("Descriptor with a path prefix should build.");

		assert_eq!(
			descriptor.token_endpoint.as_str(),
			"https://proxy.example.com/aad/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
	}

	#[test]
	fn rejects_plain_http() {
		let err = AuthorityDescriptor::builder(tenant())
			.authority_host(Url::parse("http://login.example.com").expect("URL should parse."))
			.build()
			.expect_err("Plain HTTP authorities must be rejected.");

		assert!(matches!(err, AuthorityDescriptorError::InsecureEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn rejects_opaque_host() {
		let err = AuthorityDescriptor::builder(tenant())
			.authority_host(Url::parse("mailto:admin@example.com").expect("URL should parse."))
			.build()
			.expect_err("Opaque URLs cannot host an authority.");

		assert!(matches!(err, AuthorityDescriptorError::InvalidAuthorityHost { .. }));
	}
}
