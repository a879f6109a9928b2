//! Error types surfaced to the user through the error banner.

use thiserror::Error;

/// Failures talking to the backend.
#[derive(Error, Debug)]
pub enum ApiError {
	/// The request never got a response.
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),

	/// The backend answered with a non-2xx status.
	#[error("server returned HTTP {status}: {body}")]
	HttpStatus {
		/// Response status code.
		status: u16,
		/// The backend's `error` field, or the raw body.
		body: String,
	},

	/// The body did not match the expected shape.
	#[error("unexpected response body: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Failures turning stored records into a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
	/// The record matches neither stored layout.
	#[error("malformed history record: {reason}")]
	MalformedRecord {
		/// What was missing or mistyped.
		reason: String,
	},
}

impl GraphError {
	pub(crate) fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedRecord {
			reason: reason.into(),
		}
	}
}
