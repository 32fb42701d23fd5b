// self
use crate::{_prelude::*, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span wrapper used by token and Graph operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("spo_graph.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event describing a token cache decision.
pub(crate) fn log_cache(hit: bool, key: &str) {
	#[cfg(feature = "tracing")]
	{
		if hit {
			tracing::debug!(key, "token served from cache");
		} else {
			tracing::debug!(key, "token cache miss; requesting a new token");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (hit, key);
	}
}

/// Emits an error event for a failed operation.
pub(crate) fn log_failure(kind: OpKind, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		// Graph responses are logged with their request context by `log_api_error`.
		if matches!(err, Error::Api { .. }) {
			return;
		}

		match err.upstream_status() {
			Some(status) => tracing::error!(op = kind.as_str(), status, error = %err, "operation failed"),
			None => tracing::error!(op = kind.as_str(), error = %err, "operation failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, err);
	}
}

/// Emits an error event for a non-success Graph response.
pub(crate) fn log_api_error(
	method: &str,
	url: &str,
	request_body: Option<&str>,
	status: u16,
	response_body: &str,
) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			method,
			url,
			request = request_body.unwrap_or_default(),
			status,
			response = response_body,
			"Graph endpoint returned an error"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, url, request_body, status, response_body);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OpKind::GetSite, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn logging_helpers_accept_any_error() {
		log_cache(true, "key");
		log_failure(OpKind::AccessToken, &Error::invalid_request("empty site name"));
		log_api_error("PUT", "https://graph.test/drives/d", None, 409, "{}");
	}
}
