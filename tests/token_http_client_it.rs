// self
use spo_graph::{
	_preludet::*,
	auth::{ApplicationId, ScopeSet, TenantId},
	authority::{AuthorityDescriptor, AuthorityStrategy, DefaultAuthorityStrategy},
	credential::TokenBroker,
	error::{ConfigError, Error, Result, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	store::{MemoryStore, TokenStore},
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Copy)]
struct FakeHttpClient {
	retry_after: Duration,
}
impl FakeHttpClient {
	fn throttled(retry_after: Duration) -> Self {
		Self { retry_after }
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, retry_after: self.retry_after }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	retry_after: Duration,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.retry_after;
		let body = String::from_utf8_lossy(request.body()).into_owned();

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);
			assert!(body.contains("resource=graph"), "Strategy parameters should reach the form.");
			assert!(
				!body.contains("grant_type=password"),
				"Reserved fields must not be overridden by the strategy."
			);
			slot.store(ResponseMetadata { status: Some(429), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<Option<ResponseMetadata>>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded_metadata(&self) -> Vec<Option<ResponseMetadata>> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		_strategy: &dyn AuthorityStrategy,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		let status = meta.and_then(|value| value.status);
		let retry_after = meta.and_then(|value| value.retry_after);

		self.metadata.lock().push(meta.cloned());

		match err {
			HttpClientError::Reqwest(inner) => TransientError::TokenEndpoint {
				message: format!("Fake transport error: {inner}"),
				status,
				retry_after,
			}
			.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransientError::TokenEndpoint {
				message: format!("Unhandled HTTP client error variant: {other:?}"),
				status,
				retry_after,
			}
			.into(),
		}
	}
}

/// Adds a form field and tries to override a reserved one.
struct ResourceStrategy;
impl AuthorityStrategy for ResourceStrategy {
	fn classify_token_error(
		&self,
		ctx: &spo_graph::authority::TokenErrorContext,
	) -> spo_graph::authority::TokenErrorKind {
		DefaultAuthorityStrategy.classify_token_error(ctx)
	}

	fn augment_token_request(&self, form: &mut BTreeMap<String, String>) {
		form.insert("resource".into(), "graph".into());
		form.insert("grant_type".into(), "password".into());
	}
}

fn build_broker(
	retry_after: Duration,
	mapper: Arc<RecordingTransportErrorMapper>,
) -> TokenBroker<FakeHttpClient, RecordingTransportErrorMapper> {
	let descriptor = AuthorityDescriptor::builder(
		TenantId::new("fake-tenant").expect("Failed to build fake tenant identifier."),
	)
	.build()
	.expect("Failed to build fake authority descriptor.");
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let strategy: Arc<dyn AuthorityStrategy> = Arc::new(ResourceStrategy);

	TokenBroker::with_http_client(
		store,
		descriptor,
		strategy,
		ApplicationId::new("fake-client").expect("Failed to build fake client identifier."),
		"fake-secret",
		ScopeSet::new([TEST_SCOPE]).expect("Failed to build fake scope set."),
		Arc::new(FakeHttpClient::throttled(retry_after)),
		mapper,
	)
}

#[tokio::test]
async fn fake_token_http_client_surfaces_metadata() {
	let broker = build_broker(Duration::seconds(5), Arc::default());
	let err = broker.access_token().await.expect_err("Request should be throttled with HTTP 429.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn fake_mapper_captures_response_metadata() {
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let broker = build_broker(Duration::seconds(30), mapper.clone());
	let _ = broker.access_token().await.expect_err("Request should be throttled with HTTP 429.");

	assert_eq!(
		mapper.recorded_metadata(),
		vec![Some(ResponseMetadata { status: Some(429), retry_after: Some(Duration::seconds(30)) })]
	);
}
