//! HTTP surface exposing the Graph operations under `/graphapi`.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	body::Body,
	extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
	http::{HeaderValue, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	graph::{Drive, FileResponse, GraphClient, SiteDetails, UploadFile},
};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Graph client shared by every request.
	pub graph: GraphClient,
}
impl AppState {
	/// Wraps a Graph client.
	pub fn new(graph: GraphClient) -> Self {
		Self { graph }
	}
}

/// Builds the application router.
///
/// All three Graph routes share the `{id}` segment: a site name for the lookups and a
/// drive id for uploads.
pub fn router(state: AppState) -> Router {
	let upload = post(upload_file).layer(DefaultBodyLimit::disable());

	Router::new()
		.route("/health", get(health))
		.route("/graphapi/site/{id}", get(get_site))
		.route("/graphapi/site/{id}/drives", get(get_drives))
		.route("/graphapi/site/{id}/upload", upload.clone())
		.route("/graphapi/site/{id}/Upload", upload)
		.with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn bind_and_serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "listening");

	serve(listener, state, shutdown).await
}

async fn health() -> &'static str {
	"ok"
}

async fn get_site(
	State(state): State<AppState>,
	Path(site_name): Path<String>,
) -> Result<Json<SiteDetails>, ApiError> {
	Ok(Json(state.graph.get_site(&site_name).await?))
}

async fn get_drives(
	State(state): State<AppState>,
	Path(site_name): Path<String>,
) -> Result<Json<Vec<Drive>>, ApiError> {
	let site = state.graph.get_site(&site_name).await?;

	Ok(Json(state.graph.get_drives(&site.id).await?))
}

async fn upload_file(
	State(state): State<AppState>,
	Path(drive_id): Path<String>,
	multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
	let file = read_upload(multipart).await?;
	let drive_id = match (file.site_name.as_deref(), file.drive_name.as_deref()) {
		(Some(site_name), Some(drive_name)) => {
			let site = state.graph.get_site(site_name).await?;

			state.graph.find_drive(&site.id, drive_name).await?.map(|drive| drive.id).ok_or_else(
				|| {
					ApiError::new(
						StatusCode::NOT_FOUND,
						format!("Drive `{drive_name}` was not found in site `{site_name}`."),
					)
				},
			)?
		},
		_ => drive_id,
	};

	Ok(Json(state.graph.upload_file(&drive_id, file).await?))
}

/// Collects the `name`, `file`, `siteName` and `driveName` form fields.
async fn read_upload(mut multipart: Multipart) -> Result<UploadFile, ApiError> {
	let mut upload = UploadFile::default();
	let mut file_name = None;
	let mut seen_file = false;

	while let Some(field) = multipart.next_field().await? {
		let name = field.name().unwrap_or_default().to_owned();

		match name.as_str() {
			"file" | "File" => {
				file_name = field.file_name().map(str::to_owned);
				upload.content = field.bytes().await?.to_vec();
				seen_file = true;
			},
			"name" | "Name" => upload.name = field.text().await?,
			"siteName" | "SiteName" => upload.site_name = non_empty(field.text().await?),
			"driveName" | "DriveName" => upload.drive_name = non_empty(field.text().await?),
			_ => {},
		}
	}

	if !seen_file {
		return Err(ApiError::new(StatusCode::BAD_REQUEST, "Form field `file` is required."));
	}
	if upload.name.trim().is_empty() {
		upload.name = file_name.unwrap_or_default();
	}

	Ok(upload)
}

fn non_empty(value: String) -> Option<String> {
	let trimmed = value.trim();

	(!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// JSON error body returned for failures that did not come from Graph.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable error message.
	pub error: String,
}

/// Handler error: either a forwarded Graph response or a locally produced status.
#[derive(Debug)]
pub enum ApiError {
	/// Graph response forwarded verbatim.
	Upstream {
		/// Status returned by Graph.
		status: StatusCode,
		/// Body returned by Graph.
		body: String,
		/// `Content-Type` returned by Graph; omitted from the response when absent.
		content_type: Option<String>,
	},
	/// Locally produced failure.
	Local {
		/// Status sent to the caller.
		status: StatusCode,
		/// Message placed in [`ErrorBody`].
		message: String,
		/// Retry-After hint in seconds.
		retry_after: Option<i64>,
	},
}
impl ApiError {
	/// Builds a local error with `status`.
	pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self::Local { status, message: message.into(), retry_after: None }
	}

	/// Status sent to the caller.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Upstream { status, .. } | Self::Local { status, .. } => *status,
		}
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let status = match &err {
			Error::Api { status, body, content_type } =>
				return Self::Upstream {
					status: StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
					body: body.clone(),
					content_type: content_type.clone(),
				},
			Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
			Error::InvalidClient { .. }
			| Error::InvalidGrant { .. }
			| Error::InsufficientScope { .. }
			| Error::Decode { .. }
			| Error::Transport(_) => StatusCode::BAD_GATEWAY,
			Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
			Error::Config(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};
		let retry_after = match &err {
			Error::Transient(crate::error::TransientError::TokenEndpoint {
				retry_after: Some(delay),
				..
			}) => Some(delay.whole_seconds().max(0)),
			_ => None,
		};

		Self::Local { status, message: err.to_string(), retry_after }
	}
}
impl From<MultipartError> for ApiError {
	fn from(err: MultipartError) -> Self {
		Self::new(err.status(), err.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		match self {
			Self::Upstream { status, body, content_type } => {
				let mut response = (status, Body::from(body)).into_response();

				if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
					response.headers_mut().insert(header::CONTENT_TYPE, value);
				}

				response
			},
			Self::Local { status, message, retry_after } => {
				let mut response = (status, Json(ErrorBody { error: message })).into_response();

				if let Some(secs) = retry_after {
					if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
						response.headers_mut().insert(header::RETRY_AFTER, value);
					}
				}

				response
			},
		}
	}
}
