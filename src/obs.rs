//! Observability helpers for token and Graph operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `spo_graph.op` with the `op` (operation)
//!   and `stage` (call site) fields, plus events for cache decisions and upstream failures.
//! - Enable `metrics` to increment the `spo_graph_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.
//! - The `server` feature installs a `tracing-subscriber` formatter via [`init_subscriber`].

mod metrics;
#[cfg(feature = "server")] mod subscriber;
mod tracing;

pub use metrics::*;
#[cfg(feature = "server")] pub use subscriber::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-credentials token acquisition (cache lookup included).
	AccessToken,
	/// Site lookup by server-relative name.
	GetSite,
	/// Document library listing for a site.
	GetDrives,
	/// Document library lookup by display name.
	FindDrive,
	/// File upload into a drive root.
	UploadFile,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::AccessToken => "access_token",
			OpKind::GetSite => "get_site",
			OpKind::GetDrives => "get_drives",
			OpKind::FindDrive => "find_drive",
			OpKind::UploadFile => "upload_file",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an [`OpSpan`], recording attempt and final outcome.
pub(crate) async fn observe<T, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(err) => {
			log_failure(kind, err);
			record_op_outcome(kind, OpOutcome::Failure);
		},
	}

	result
}
