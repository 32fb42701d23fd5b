//! Microsoft Graph client for SharePoint sites, drives, and uploads.
//!
//! Every request carries a bearer token from a [`TokenSource`]. Non-success responses are
//! logged with their request context and surfaced as [`Error::Api`] so callers can forward
//! the upstream status and body unchanged.

pub mod model;

pub use model::*;

// crates.io
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{
	Method, RequestBuilder,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	credential::TokenSource,
	error::{ConfigError, TransientError, TransportError},
	obs::{self, OpKind},
};

/// Characters escaped inside a single path segment; `/` and `:` are Graph path delimiters.
const SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b':')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'\\')
	.add(b'^')
	.add(b'`')
	.add(b'{')
	.add(b'|')
	.add(b'}');

/// Base URL of the Graph API and the SharePoint host sites are resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEndpoints {
	base: Url,
	spo_host: String,
}
impl GraphEndpoints {
	/// Creates endpoints from the Graph base (e.g. `https://graph.microsoft.com/v1.0`) and the
	/// SharePoint host name (e.g. `contoso.sharepoint.com`).
	pub fn new(mut base: Url, spo_host: impl Into<String>) -> Self {
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let spo_host = spo_host.into().trim().trim_matches('/').to_owned();

		Self { base, spo_host }
	}

	/// Graph base URL, always ending with `/`.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// SharePoint host name.
	pub fn spo_host(&self) -> &str {
		&self.spo_host
	}

	/// Resolves a relative endpoint (`sites/...`) against the base.
	pub fn url(&self, endpoint: &str) -> Result<Url> {
		self.base.join(endpoint.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source }.into()
		})
	}

	/// `sites/{host}:/sites/{site_name}`; subsite names keep their `/` separators.
	fn site_path(&self, site_name: &str) -> Result<String> {
		let mut path = format!("sites/{}:/sites", self.spo_host);

		for part in site_name.trim_matches('/').split('/') {
			if part.trim().is_empty() || part == "." || part == ".." {
				return Err(Error::invalid_request(format!(
					"site name `{site_name}` contains an empty or relative segment"
				)));
			}

			path.push('/');
			path.push_str(&segment(part));
		}

		Ok(path)
	}
}

/// Graph client bound to one token source.
#[derive(Clone)]
pub struct GraphClient {
	http: ReqwestClient,
	endpoints: GraphEndpoints,
	tokens: Arc<dyn TokenSource>,
}
impl GraphClient {
	/// Creates a client that authenticates every request with `tokens`.
	pub fn new(http: ReqwestClient, endpoints: GraphEndpoints, tokens: Arc<dyn TokenSource>) -> Self {
		Self { http, endpoints, tokens }
	}

	/// Endpoints the client resolves requests against.
	pub fn endpoints(&self) -> &GraphEndpoints {
		&self.endpoints
	}

	/// Resolves a site by its server-relative name (`/sites/{site_name}`).
	pub async fn get_site(&self, site_name: &str) -> Result<SiteDetails> {
		let site_name = required("site name", site_name)?;
		let endpoint = self.endpoints.site_path(site_name)?;

		obs::observe(OpKind::GetSite, "get_site", self.get(&endpoint)).await
	}

	/// Lists the document libraries of a site.
	pub async fn get_drives(&self, site_id: &str) -> Result<Vec<Drive>> {
		let site_id = required("site id", site_id)?;

		obs::observe(OpKind::GetDrives, "get_drives", async move {
			let details: DriveDetails =
				self.get(&format!("sites/{}/drives", segment(site_id))).await?;

			Ok(details.value)
		})
		.await
	}

	/// Finds a document library by display name, ignoring case (Unicode-aware).
	pub async fn find_drive(&self, site_id: &str, drive_name: &str) -> Result<Option<Drive>> {
		let wanted = required("drive name", drive_name)?.to_lowercase();

		obs::observe(OpKind::FindDrive, "find_drive", async move {
			let drives = self.get_drives(site_id).await?;

			Ok(drives.into_iter().find(|drive| drive.name.to_lowercase() == wanted))
		})
		.await
	}

	/// Uploads a file into the root of a drive; Graph renames it on conflict.
	pub async fn upload_file(&self, drive_id: &str, file: UploadFile) -> Result<FileResponse> {
		let drive_id = required("drive id", drive_id)?;
		let file_name = required("file name", &file.name)?;
		let endpoint = format!(
			"drives/{}/root:/{}:/content?@microsoft.graph.conflictBehavior=rename",
			segment(drive_id),
			segment(file_name),
		);

		obs::observe(
			OpKind::UploadFile,
			"upload_file",
			self.put(&endpoint, "application/octet-stream", file.content),
		)
		.await
	}

	/// Sends `GET {base}/{endpoint}` and decodes the JSON body.
	pub async fn get<T>(&self, endpoint: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = self.send(Method::GET, endpoint, None, |req| req).await?;

		decode(&body)
	}

	/// Sends `POST {base}/{endpoint}` with a JSON body and decodes the JSON response.
	pub async fn post<B, T>(&self, endpoint: &str, data: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let payload = serde_json::to_string(data)
			.map_err(|e| Error::invalid_request(format!("request body is not serializable: {e}")))?;
		let logged = payload.clone();
		let body = self
			.send(Method::POST, endpoint, Some(&logged), |req| {
				req.header(CONTENT_TYPE, "application/json").body(payload)
			})
			.await?;

		decode(&body)
	}

	/// Sends `PUT {base}/{endpoint}` with raw bytes and decodes the JSON response.
	pub async fn put<T>(&self, endpoint: &str, content_type: &str, content: Vec<u8>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let textual = content_type.starts_with("text/") || content_type.contains("json");
		let logged = textual.then(|| String::from_utf8_lossy(&content).into_owned());
		let body = self
			.send(Method::PUT, endpoint, logged.as_deref(), |req| {
				req.header(CONTENT_TYPE, content_type).body(content)
			})
			.await?;

		decode(&body)
	}

	/// Sends `DELETE {base}/{endpoint}`; any success body is discarded.
	pub async fn delete(&self, endpoint: &str) -> Result<()> {
		self.send(Method::DELETE, endpoint, None, |req| req).await.map(|_| ())
	}

	async fn send<F>(
		&self,
		method: Method,
		endpoint: &str,
		logged_body: Option<&str>,
		build: F,
	) -> Result<String>
	where
		F: FnOnce(RequestBuilder) -> RequestBuilder,
	{
		let url = self.endpoints.url(endpoint)?;
		let token = self.tokens.bearer_token().await?;
		let request = build(
			self.http.request(method.clone(), url.clone()).header(AUTHORIZATION, token.bearer()),
		);
		let response = request.send().await.map_err(|e| map_send_error(&url, e))?;
		let status = response.status();
		let content_type = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		let body = response.text().await.map_err(|e| map_send_error(&url, e))?;

		if !status.is_success() {
			obs::log_api_error(method.as_str(), url.as_str(), logged_body, status.as_u16(), &body);

			return Err(Error::Api { status: status.as_u16(), body, content_type });
		}

		Ok(body)
	}
}
impl Debug for GraphClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphClient").field("endpoints", &self.endpoints).finish()
	}
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid_request(format!("{what} must not be empty")));
	}

	Ok(trimmed)
}

fn segment(value: &str) -> String {
	utf8_percent_encode(value, SEGMENT).to_string()
}

fn decode<T>(body: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_str(body);

	serde_path_to_error::deserialize(&mut de).map_err(|source| Error::Decode { source })
}

fn map_send_error(url: &Url, err: ReqwestError) -> Error {
	if err.is_timeout() {
		return TransientError::GraphTimeout { url: url.to_string() }.into();
	}
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::graph(err).into()
}
