//! Settings loading and wiring of the token broker and Graph client.
//!
//! Sources are merged in order: `config/<env>` (any format the `config` crate understands,
//! optional; `env` comes from `APP_ENV` and defaults to `dev`), then environment variables
//! prefixed with `APP` using `__` as the separator, e.g.
//! `APP__GRAPHAPISETTINGS__TENANTID`. Environment keys arrive lowercased, so every field
//! also accepts its lowercase spelling.

// std
use std::{env, net::SocketAddr, path::PathBuf};
// crates.io
use ::config::{Config, Environment, File};
// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, ScopeSet, TenantId},
	authority::{
		AuthorityDescriptor, AuthorityStrategy, DEFAULT_AUTHORITY_HOST, DefaultAuthorityStrategy,
	},
	credential::{ReqwestTokenBroker, TokenBroker, TokenSource},
	error::ConfigError,
	graph::{GraphClient, GraphEndpoints},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	store::{FileStore, MemoryStore, TokenStore},
};

/// Environment variable selecting the settings file.
pub const APP_ENV: &str = "APP_ENV";

/// Top-level application settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
	/// Graph and authority settings.
	#[serde(rename = "GraphApiSettings", alias = "graphapisettings")]
	pub graph_api: GraphApiSettings,
	/// HTTP listener settings.
	#[serde(default)]
	pub server: ServerSettings,
	/// Log filter settings.
	#[serde(default)]
	pub log: LogSettings,
	/// Token cache settings.
	#[serde(default)]
	pub cache: CacheSettings,
}
impl Settings {
	/// Loads settings for the environment named by `APP_ENV` (default `dev`).
	pub fn load() -> Result<Self> {
		let env = env::var(APP_ENV).unwrap_or_else(|_| "dev".into());

		Self::load_for(&env)
	}

	/// Loads `config/<env>` plus `APP__*` environment overrides.
	pub fn load_for(env: &str) -> Result<Self> {
		let config = Config::builder()
			.add_source(File::with_name(&format!("config/{env}")).required(false))
			.add_source(Environment::with_prefix("APP").separator("__"))
			.build()
			.map_err(ConfigError::Load)?;

		Self::from_config(config)
	}

	/// Deserializes and validates an already merged [`Config`].
	pub fn from_config(config: Config) -> Result<Self> {
		let settings: Self = config.try_deserialize().map_err(ConfigError::Load)?;

		settings.graph_api.validate()?;

		Ok(settings)
	}

	/// Opens the configured token cache: a JSON file when `cache.path` is set, memory otherwise.
	pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
		let store: Arc<dyn TokenStore> = match &self.cache.path {
			Some(path) => Arc::new(FileStore::open(path)?),
			None => Arc::new(MemoryStore::default()),
		};

		Ok(store)
	}
}

/// Settings of the `GraphApiSettings` section.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphApiSettings {
	/// Directory tenant id.
	#[serde(default, alias = "tenantid")]
	pub tenant_id: String,
	/// Application (client) id.
	#[serde(default, alias = "clientid")]
	pub client_id: String,
	/// Client secret value.
	#[serde(default, alias = "secretid")]
	pub secret_id: String,
	/// Scope requested for Graph tokens, e.g. `https://graph.microsoft.com/.default`.
	#[serde(default)]
	pub scope: String,
	/// Graph base URL, e.g. `https://graph.microsoft.com/v1.0`.
	#[serde(default, alias = "basegraphuri")]
	pub base_graph_uri: String,
	/// SharePoint host name, e.g. `contoso.sharepoint.com`.
	#[serde(default, alias = "basespositeuri")]
	pub base_spo_site_uri: String,
	/// Authority host; defaults to the public cloud.
	#[serde(default, alias = "authorityhost")]
	pub authority_host: Option<String>,
	/// Timeout applied to every outbound request, in seconds.
	#[serde(default = "default_request_timeout_secs", alias = "requesttimeoutsecs")]
	pub request_timeout_secs: u64,
}
impl GraphApiSettings {
	/// Rejects empty required fields and malformed values.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (key, value) in [
			("GraphApiSettings.tenantId", &self.tenant_id),
			("GraphApiSettings.clientId", &self.client_id),
			("GraphApiSettings.secretId", &self.secret_id),
			("GraphApiSettings.scope", &self.scope),
			("GraphApiSettings.baseGraphUri", &self.base_graph_uri),
			("GraphApiSettings.baseSpoSiteUri", &self.base_spo_site_uri),
		] {
			if value.trim().is_empty() {
				return Err(ConfigError::MissingSetting { key });
			}
		}

		self.graph_base()?;
		self.scope_set()?;
		self.descriptor()?;

		if self.request_timeout_secs == 0 {
			return Err(ConfigError::InvalidSetting {
				key: "GraphApiSettings.requestTimeoutSecs",
				reason: "must be greater than zero".into(),
			});
		}

		Ok(())
	}

	/// Parsed scope set.
	pub fn scope_set(&self) -> Result<ScopeSet, ConfigError> {
		Ok(self.scope.parse()?)
	}

	/// Authority descriptor for the configured tenant and host.
	pub fn descriptor(&self) -> Result<AuthorityDescriptor, ConfigError> {
		let host = self.authority_host.as_deref().unwrap_or(DEFAULT_AUTHORITY_HOST);
		let host = Url::parse(host).map_err(|e| ConfigError::InvalidSetting {
			key: "GraphApiSettings.authorityHost",
			reason: e.to_string(),
		})?;

		Ok(AuthorityDescriptor::builder(TenantId::new(self.tenant_id.trim())?)
			.authority_host(host)
			.build()?)
	}

	/// Graph endpoints derived from the base URL and SharePoint host.
	pub fn endpoints(&self) -> Result<GraphEndpoints, ConfigError> {
		Ok(GraphEndpoints::new(self.graph_base()?, self.base_spo_site_uri.as_str()))
	}

	/// Builds the token broker over `store`, sharing `http` with the Graph client.
	pub fn broker(
		&self,
		store: Arc<dyn TokenStore>,
		http: ReqwestHttpClient,
	) -> Result<ReqwestTokenBroker, ConfigError> {
		let strategy: Arc<dyn AuthorityStrategy> = Arc::new(DefaultAuthorityStrategy);

		Ok(TokenBroker::with_http_client(
			store,
			self.descriptor()?,
			strategy,
			ApplicationId::new(self.client_id.trim())?,
			self.secret_id.clone(),
			self.scope_set()?,
			http,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}

	/// Builds a Graph client authenticated by a broker over `store`.
	pub fn graph_client(&self, store: Arc<dyn TokenStore>) -> Result<GraphClient> {
		let http = ReqwestHttpClient::with_timeout(std::time::Duration::from_secs(
			self.request_timeout_secs,
		))?;
		let tokens: Arc<dyn TokenSource> = Arc::new(self.broker(store, http.clone())?);

		Ok(GraphClient::new(http.0, self.endpoints()?, tokens))
	}

	fn graph_base(&self) -> Result<Url, ConfigError> {
		Url::parse(self.base_graph_uri.trim()).map_err(|e| ConfigError::InvalidSetting {
			key: "GraphApiSettings.baseGraphUri",
			reason: e.to_string(),
		})
	}
}
impl Debug for GraphApiSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphApiSettings")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("secret_id", &"<redacted>")
			.field("scope", &self.scope)
			.field("base_graph_uri", &self.base_graph_uri)
			.field("base_spo_site_uri", &self.base_spo_site_uri)
			.field("authority_host", &self.authority_host)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.finish()
	}
}

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
	/// Socket address the API listens on.
	#[serde(default = "default_bind_addr", alias = "bindaddr")]
	pub bind_addr: SocketAddr,
}
impl Default for ServerSettings {
	fn default() -> Self {
		Self { bind_addr: default_bind_addr() }
	}
}

/// Log settings.
#[derive(Clone, Debug, Deserialize)]
pub struct LogSettings {
	/// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
	#[serde(default = "default_log_filter")]
	pub filter: String,
}
impl Default for LogSettings {
	fn default() -> Self {
		Self { filter: default_log_filter() }
	}
}

/// Token cache settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CacheSettings {
	/// JSON file the token is cached in; memory when absent.
	#[serde(default)]
	pub path: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
	100
}

fn default_bind_addr() -> SocketAddr {
	SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_filter() -> String {
	"info".into()
}
