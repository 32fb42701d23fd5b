// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::ServiceExt;
// self
use spo_graph::{
	_preludet::*,
	server::{self, AppState},
};

const SPO_HOST: &str = "contoso.sharepoint.com";
const BOUNDARY: &str = "spo-graph-boundary";

fn app(server: &MockServer) -> Router {
	server::router(AppState::new(build_static_graph_client(&server.url("/v1.0"), SPO_HOST)))
}

fn multipart(fields: &[(&str, Option<&str>, &str)]) -> Body {
	let mut raw = String::new();

	for (name, file_name, value) in fields {
		raw.push_str(&format!("--{BOUNDARY}\r\n"));

		match file_name {
			Some(file_name) => raw.push_str(&format!(
				"Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
			)),
			None => raw.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
		}

		raw.push_str(value);
		raw.push_str("\r\n");
	}

	raw.push_str(&format!("--{BOUNDARY}--\r\n"));

	Body::from(raw)
}

fn upload_request(uri: &str, body: Body) -> Request<Body> {
	Request::post(uri)
		.header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
		.body(body)
		.expect("Upload request should build.")
}

async fn json_of(response: axum::response::Response) -> Value {
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should be readable.");

	serde_json::from_slice(&bytes).expect("Body should be JSON.")
}

async fn mock_site(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/sites/contoso.sharepoint.com:/sites/finance");
			then.status(200).json_body(json!({ "id": "site-1", "name": "finance" }));
		})
		.await;
}

#[tokio::test]
async fn health_answers_ok() {
	let server = MockServer::start_async().await;
	let response = app(&server)
		.oneshot(Request::get("/health").body(Body::empty()).expect("Request should build."))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn site_route_returns_site_details() {
	let server = MockServer::start_async().await;

	mock_site(&server).await;

	let response = app(&server)
		.oneshot(
			Request::get("/graphapi/site/finance").body(Body::empty()).expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_of(response).await["id"], "site-1");
}

#[tokio::test]
async fn drives_route_resolves_the_site_first() {
	let server = MockServer::start_async().await;

	mock_site(&server).await;

	let drives = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/sites/site-1/drives");
			then.status(200).json_body(json!({ "value": [{ "id": "b!docs", "name": "Documents" }] }));
		})
		.await;
	let response = app(&server)
		.oneshot(
			Request::get("/graphapi/site/finance/drives")
				.body(Body::empty())
				.expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_of(response).await, json!([{
		"id": "b!docs",
		"name": "Documents",
		"description": null,
		"webUrl": null
	}]));

	drives.assert_async().await;
}

#[tokio::test]
async fn graph_errors_are_forwarded_verbatim() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path_includes("/sites/");
			then.status(403).body("{\"error\":{\"code\":\"accessDenied\"}}");
		})
		.await;
	let response = app(&server)
		.oneshot(
			Request::get("/graphapi/site/finance").body(Body::empty()).expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(json_of(response).await["error"]["code"], "accessDenied");
}

#[tokio::test]
async fn non_json_graph_errors_keep_their_content_type() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path_includes("/sites/");
			then.status(502).header("content-type", "text/html").body("<html>Bad gateway</html>");
		})
		.await;
	let response = app(&server)
		.oneshot(
			Request::get("/graphapi/site/finance").body(Body::empty()).expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(
		response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
		Some("text/html")
	);

	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should be readable.");

	assert_eq!(&bytes[..], b"<html>Bad gateway</html>");
}

#[tokio::test]
async fn upload_uses_the_path_drive_id() {
	let server = MockServer::start_async().await;
	let upload = server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1.0/drives/b!docs/root:/notes.txt:/content").body("hello");
			then.status(201).json_body(json!({ "id": "01ITEM", "name": "notes.txt", "size": 5 }));
		})
		.await;
	let body = multipart(&[("file", Some("notes.txt"), "hello")]);
	let response = app(&server)
		.oneshot(upload_request("/graphapi/site/b!docs/Upload", body))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_of(response).await["name"], "notes.txt");

	upload.assert_async().await;
}

#[tokio::test]
async fn upload_resolves_drive_by_site_and_name() {
	let server = MockServer::start_async().await;

	mock_site(&server).await;

	let _drives = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/sites/site-1/drives");
			then.status(200).json_body(json!({ "value": [{ "id": "b!docs", "name": "Documents" }] }));
		})
		.await;
	let upload = server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1.0/drives/b!docs/root:/renamed.txt:/content");
			then.status(201).json_body(json!({ "id": "01ITEM", "name": "renamed.txt" }));
		})
		.await;
	let body = multipart(&[
		("name", None, "renamed.txt"),
		("siteName", None, "finance"),
		("driveName", None, "documents"),
		("file", Some("original.txt"), "payload"),
	]);
	let response = app(&server)
		.oneshot(upload_request("/graphapi/site/ignored/upload", body))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);

	upload.assert_async().await;
}

#[tokio::test]
async fn upload_with_unknown_drive_name_is_not_found() {
	let server = MockServer::start_async().await;

	mock_site(&server).await;

	let _drives = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/sites/site-1/drives");
			then.status(200).json_body(json!({ "value": [] }));
		})
		.await;
	let body = multipart(&[
		("siteName", None, "finance"),
		("driveName", None, "Missing"),
		("file", Some("a.txt"), "x"),
	]);
	let response = app(&server)
		.oneshot(upload_request("/graphapi/site/ignored/upload", body))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert!(
		json_of(response).await["error"]
			.as_str()
			.is_some_and(|message| message.contains("Missing"))
	);
}

#[tokio::test]
async fn upload_without_file_is_bad_request() {
	let server = MockServer::start_async().await;
	let body = multipart(&[("name", None, "lonely.txt")]);
	let response = app(&server)
		.oneshot(upload_request("/graphapi/site/b!docs/upload", body))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
