//! Backend routes: graph generation and graph history.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::graph::{CanonicalGraph, GraphPayload, Metadata};

const GENERATE_ROUTE: &str = "/get_response_data";
const HISTORY_ROUTE: &str = "/get_graph_history";

/// One stored history item: its metadata and the record fields, kept raw so a
/// bad record only fails when it is opened.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HistoryItem {
	/// Description and timestamps shown in the list.
	#[serde(default)]
	pub metadata: Metadata,
	/// Every other field of the record, unparsed.
	#[serde(flatten)]
	pub record: serde_json::Map<String, Value>,
}

/// A page of `GET /get_graph_history`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HistoryPage {
	/// Items on this page, oldest first.
	#[serde(default)]
	pub graph_history: Vec<HistoryItem>,
	/// Records left after this page.
	#[serde(default)]
	pub remaining: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
	user_input: &'a str,
}

/// Operations the UI needs from the backend.
#[async_trait(?Send)]
pub trait GraphBackend {
	/// Generates a graph from free text; the result is already canonical.
	async fn generate_graph(&self, user_input: &str) -> Result<CanonicalGraph, ApiError>;

	/// Fetches one page (1-based) of the stored graph history.
	async fn graph_history(&self, page: u32) -> Result<HistoryPage, ApiError>;
}

/// [`GraphBackend`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
	client: reqwest::Client,
	config: AppConfig,
}

impl HttpBackend {
	/// Client resolving routes against `config.api_base`.
	pub fn new(config: AppConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}

	async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
		let status = response.status().as_u16();
		let body = response.text().await?;
		decode(status, &body)
	}
}

#[async_trait(?Send)]
impl GraphBackend for HttpBackend {
	async fn generate_graph(&self, user_input: &str) -> Result<CanonicalGraph, ApiError> {
		debug!("POST {GENERATE_ROUTE} ({} chars)", user_input.len());
		let response = self
			.client
			.post(self.config.endpoint(GENERATE_ROUTE))
			.json(&GenerateRequest { user_input })
			.send()
			.await?;
		let payload: GraphPayload = Self::read(response).await?;
		Ok(payload.into())
	}

	async fn graph_history(&self, page: u32) -> Result<HistoryPage, ApiError> {
		debug!("GET {HISTORY_ROUTE} page {page}");
		let response = self
			.client
			.get(self.config.endpoint(HISTORY_ROUTE))
			.query(&[("page", page)])
			.send()
			.await?;
		Self::read(response).await
	}
}

/// Maps a status and body to the expected payload or an [`ApiError`].
pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
	if !(200..300).contains(&status) {
		return Err(ApiError::HttpStatus {
			status,
			body: error_text(body),
		});
	}
	Ok(serde_json::from_str(body)?)
}

/// Pulls `{"error": "..."}` out of a JSON error body, otherwise keeps the text.
fn error_text(body: &str) -> String {
	let message = serde_json::from_str::<Value>(body)
		.ok()
		.and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned));
	match message {
		Some(message) if !message.is_empty() => message,
		_ if body.trim().is_empty() => "no details".to_owned(),
		_ => body.trim().to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn history_page_keeps_records_raw() {
		let page: HistoryPage = decode(
			200,
			r##"{
				"graph_history": [
					{"metadata": {"description": "first", "created_on": "c", "last_updated_on": "u"},
					 "graph": [{"from": {"id": "a"}, "to": {"id": "b"}, "relationship": {"type": "r"}}]},
					{"from_node": {"id": "x"}, "to_node": {"id": "y"}, "relationship": {"type": "s", "color": "#fff000"}}
				],
				"remaining": 12
			}"##,
		)
		.unwrap();

		assert_eq!(page.remaining, 12);
		assert_eq!(page.graph_history.len(), 2);
		assert_eq!(page.graph_history[0].metadata.description, "first");
		assert!(page.graph_history[0].record.contains_key("graph"));
		assert!(!page.graph_history[0].record.contains_key("metadata"));
		assert_eq!(page.graph_history[1].metadata, Metadata::default());
		assert!(page.graph_history[1].record.contains_key("from_node"));
	}

	#[test]
	fn failure_status_surfaces_error_field() {
		let err = decode::<HistoryPage>(500, r#"{"error": "Neo4j driver not initialized"}"#)
			.unwrap_err();
		match err {
			ApiError::HttpStatus { status, body } => {
				assert_eq!(status, 500);
				assert_eq!(body, "Neo4j driver not initialized");
			}
			other => panic!("unexpected error {other:?}"),
		}
	}

	#[test]
	fn failure_status_keeps_plain_text_body() {
		let err = decode::<GraphPayload>(429, "rate limited\n").unwrap_err();
		assert_eq!(err.to_string(), "server returned HTTP 429: rate limited");

		let err = decode::<GraphPayload>(502, "").unwrap_err();
		assert_eq!(err.to_string(), "server returned HTTP 502: no details");
	}

	#[test]
	fn unreadable_success_body_is_a_decode_error() {
		let err = decode::<GraphPayload>(200, "<html>").unwrap_err();
		assert!(matches!(err, ApiError::Decode(_)));
	}
}
