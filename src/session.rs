//! View state shared by the page and the request flows that update it.
//!
//! [`ViewState`] is the single source of truth for what the page shows: the busy
//! indicator, the error banner, the graph on the canvas and the history list.
//! [`RequestOrchestrator`] drives the backend calls and writes their outcomes
//! back through a [`ViewStore`].

use std::cell::RefCell;

use leptos::prelude::*;
use log::{debug, info, warn};
use serde_json::Value;

use crate::api::{GraphBackend, HistoryPage};
use crate::error::{ApiError, GraphError};
use crate::graph::history::normalize;
use crate::graph::{CanonicalGraph, HistoryRecord, Metadata};

/// Message shown when the form is submitted without text.
pub const EMPTY_INPUT_MESSAGE: &str = "No input provided";

/// Whether a graph generation request is outstanding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestPhase {
	/// Nothing in flight.
	#[default]
	Idle,
	/// Waiting for the latest request.
	Busy,
}

/// An error banner; `id` lets a delayed dismissal skip newer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorNotice {
	/// Increases with every raised error.
	pub id: u64,
	/// Text shown in the banner.
	pub message: String,
}

/// The graph currently handed to the canvas. `seq` changes on every render so
/// showing the same graph again still replaces the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedGraph {
	/// Increases with every render.
	pub seq: u64,
	/// The graph to lay out.
	pub graph: CanonicalGraph,
}

/// One line of the history list.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
	/// 1-based, continuing across loaded pages.
	pub position: usize,
	/// Shown in the list row.
	pub metadata: Metadata,
	record: Value,
}

impl HistoryEntry {
	/// Normalizes the record exactly as it was fetched.
	pub fn to_graph(&self) -> Result<CanonicalGraph, GraphError> {
		let record = HistoryRecord::detect(&self.record)?;
		Ok(normalize(&record, &self.metadata.description))
	}
}

/// History entries accumulated over every page loaded so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistoryList {
	entries: Vec<HistoryEntry>,
	pages_loaded: u32,
	remaining: u64,
	loading: bool,
}

impl HistoryList {
	/// Loaded entries in position order.
	pub fn entries(&self) -> &[HistoryEntry] {
		&self.entries
	}

	/// Entry at a 1-based `position`.
	pub fn get(&self, position: usize) -> Option<&HistoryEntry> {
		position
			.checked_sub(1)
			.and_then(|i| self.entries.get(i))
			.filter(|e| e.position == position)
	}

	/// Whether the backend reported records beyond the loaded pages.
	pub fn has_more(&self) -> bool {
		self.remaining > 0
	}

	/// Whether a page fetch is in flight.
	pub fn is_loading(&self) -> bool {
		self.loading
	}

	/// Claims the next page to fetch, or `None` while a fetch is in flight.
	pub fn begin_load(&mut self) -> Option<u32> {
		if self.loading {
			return None;
		}
		self.loading = true;
		Some(self.pages_loaded + 1)
	}

	/// Appends a fetched page after the existing entries.
	pub fn append(&mut self, page: HistoryPage) {
		self.loading = false;
		self.pages_loaded += 1;
		self.remaining = page.remaining;
		for item in page.graph_history {
			let position = self.entries.len() + 1;
			self.entries.push(HistoryEntry {
				position,
				metadata: item.metadata,
				record: Value::Object(item.record),
			});
		}
	}

	/// Releases a claimed page after a failed fetch.
	pub fn abort_load(&mut self) {
		self.loading = false;
	}
}

/// Everything the page renders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
	/// Drives the busy indicator.
	pub phase: RequestPhase,
	/// Banner contents, if any.
	pub error: Option<ErrorNotice>,
	/// Graph on the canvas.
	pub rendered: Option<RenderedGraph>,
	/// Loaded history pages.
	pub history: HistoryList,
	latest_request: u64,
	notices: u64,
	renders: u64,
}

impl ViewState {
	/// Whether the busy indicator is up.
	pub fn is_busy(&self) -> bool {
		self.phase == RequestPhase::Busy
	}

	/// Description of the graph on the canvas, empty when nothing is shown.
	pub fn description(&self) -> &str {
		self.rendered
			.as_ref()
			.map(|r| r.graph.description.as_str())
			.unwrap_or_default()
	}

	/// Enters `Busy` and returns the ticket of the new request.
	pub fn begin_request(&mut self) -> u64 {
		self.latest_request += 1;
		self.phase = RequestPhase::Busy;
		self.latest_request
	}

	/// Applies a response if `ticket` is still the latest request; stale
	/// responses are dropped. Returns whether it was applied.
	pub fn finish_request(
		&mut self,
		ticket: u64,
		outcome: Result<CanonicalGraph, ApiError>,
	) -> bool {
		if ticket != self.latest_request {
			debug!(
				"dropping response to request {ticket}, request {} is newer",
				self.latest_request
			);
			return false;
		}
		self.phase = RequestPhase::Idle;
		match outcome {
			Ok(graph) => self.show_graph(graph),
			Err(e) => {
				self.raise_error(e.to_string());
			}
		}
		true
	}

	/// Hands a graph to the canvas, replacing whatever was there.
	pub fn show_graph(&mut self, graph: CanonicalGraph) {
		let dangling = graph.dangling_endpoints();
		if !dangling.is_empty() {
			warn!("edges reference unknown nodes {dangling:?}, they will not be drawn");
		}
		self.renders += 1;
		self.rendered = Some(RenderedGraph {
			seq: self.renders,
			graph,
		});
	}

	/// Shows an error banner and returns its id.
	pub fn raise_error(&mut self, message: impl Into<String>) -> u64 {
		self.notices += 1;
		let message = message.into();
		warn!("{message}");
		self.error = Some(ErrorNotice {
			id: self.notices,
			message,
		});
		self.notices
	}

	/// Hides the banner if it is still showing error `id`.
	pub fn dismiss_error(&mut self, id: u64) {
		if self.error.as_ref().is_some_and(|e| e.id == id) {
			self.error = None;
		}
	}

	/// Renders a history entry from its stored record. A record that cannot be
	/// normalized raises an error for that entry only.
	pub fn open_history_entry(&mut self, position: usize) {
		let Some(entry) = self.history.get(position) else {
			warn!("no history entry at position {position}");
			return;
		};
		match entry.to_graph() {
			Ok(graph) => {
				debug!(
					"history entry {position}: {} nodes, {} edges",
					graph.nodes.len(),
					graph.edges.len()
				);
				self.show_graph(graph);
			}
			Err(e) => {
				self.raise_error(format!("History entry {position}: {e}"));
			}
		}
	}
}

/// Somewhere [`ViewState`] lives. Returns `None` once the state is gone.
pub trait ViewStore {
	/// Runs `f` against the state and returns its result.
	fn apply<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R>;
}

impl ViewStore for RwSignal<ViewState> {
	fn apply<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
		self.try_update(f)
	}
}

impl ViewStore for RefCell<ViewState> {
	fn apply<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
		Some(f(&mut self.borrow_mut()))
	}
}

/// Runs backend requests and records their outcome in a [`ViewStore`].
pub struct RequestOrchestrator<B> {
	backend: B,
}

impl<B: GraphBackend> RequestOrchestrator<B> {
	/// Orchestrator issuing requests through `backend`.
	pub fn new(backend: B) -> Self {
		Self { backend }
	}

	/// Generates a graph from `user_input` and shows it.
	///
	/// The busy indicator is raised before the request and cleared before any
	/// error is shown. When submissions overlap only the latest one is applied.
	pub async fn submit<S: ViewStore>(&self, store: &S, user_input: &str) {
		if user_input.trim().is_empty() {
			store.apply(|s| s.raise_error(EMPTY_INPUT_MESSAGE));
			return;
		}
		let Some(ticket) = store.apply(ViewState::begin_request) else {
			return;
		};
		info!("generating graph (request {ticket})");

		let outcome = self.backend.generate_graph(user_input).await;
		if let Ok(graph) = &outcome {
			info!(
				"request {ticket} returned {} nodes, {} edges",
				graph.nodes.len(),
				graph.edges.len()
			);
		}
		store.apply(|s| s.finish_request(ticket, outcome));
	}

	/// Fetches the next history page and appends it to the list.
	pub async fn load_history<S: ViewStore>(&self, store: &S) {
		let Some(Some(page)) = store.apply(|s| s.history.begin_load()) else {
			debug!("history load already in flight");
			return;
		};

		match self.backend.graph_history(page).await {
			Ok(items) => {
				info!(
					"history page {page}: {} entries, {} remaining",
					items.graph_history.len(),
					items.remaining
				);
				store.apply(|s| s.history.append(items));
			}
			Err(e) => {
				store.apply(|s| {
					s.history.abort_load();
					s.raise_error(format!("Could not load graph history: {e}"));
				});
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::rc::Rc;

	use async_trait::async_trait;
	use serde_json::json;

	use super::*;
	use crate::api::decode;
	use crate::components::graph_canvas::style::{LIGHT_TEXT, NodeStyle};
	use crate::graph::GraphPayload;

	/// Replays canned HTTP responses; inputs starting with "slow" yield first.
	#[derive(Default)]
	struct MockBackend {
		generate: RefCell<VecDeque<(u16, String)>>,
		history: RefCell<VecDeque<(u16, String)>>,
		requested_pages: RefCell<Vec<u32>>,
		busy_during_call: RefCell<Vec<bool>>,
		view: Option<Rc<RefCell<ViewState>>>,
	}

	impl MockBackend {
		fn observing(view: &Rc<RefCell<ViewState>>) -> Self {
			Self {
				view: Some(view.clone()),
				..Self::default()
			}
		}

		fn reply(self, status: u16, body: serde_json::Value) -> Self {
			self.generate.borrow_mut().push_back((status, body.to_string()));
			self
		}

		fn reply_text(self, status: u16, body: &str) -> Self {
			self.generate.borrow_mut().push_back((status, body.to_owned()));
			self
		}

		fn history_reply(self, status: u16, body: serde_json::Value) -> Self {
			self.history.borrow_mut().push_back((status, body.to_string()));
			self
		}
	}

	#[async_trait(?Send)]
	impl GraphBackend for MockBackend {
		async fn generate_graph(&self, user_input: &str) -> Result<CanonicalGraph, ApiError> {
			if let Some(view) = &self.view {
				self.busy_during_call.borrow_mut().push(view.borrow().is_busy());
			}
			let (status, body) = self.generate.borrow_mut().pop_front().expect("no canned reply");
			if user_input.starts_with("slow") {
				tokio::task::yield_now().await;
				tokio::task::yield_now().await;
			}
			decode::<GraphPayload>(status, &body).map(Into::into)
		}

		async fn graph_history(&self, page: u32) -> Result<HistoryPage, ApiError> {
			self.requested_pages.borrow_mut().push(page);
			let (status, body) = self.history.borrow_mut().pop_front().expect("no canned page");
			decode(status, &body)
		}
	}

	fn single_node_payload(label: &str, color: &str, description: &str) -> serde_json::Value {
		json!({
			"elements": {"nodes": [{"data": {"id": "1", "label": label, "color": color}}], "edges": []},
			"meta": {"description": description}
		})
	}

	fn history_item(description: &str, edges: &[(&str, &str)]) -> serde_json::Value {
		let graph: Vec<_> = edges
			.iter()
			.map(|(from, to)| {
				json!({
					"from": {"id": from, "label": from, "type": "t", "color": "#ffeeaa"},
					"to": {"id": to, "label": to, "type": "t", "color": "#ffeeaa"},
					"relationship": {"type": "rel", "color": "#222222", "direction": "forward"}
				})
			})
			.collect();
		json!({
			"metadata": {"unique_id": description, "description": description, "created_on": "c", "last_updated_on": "u"},
			"graph": graph
		})
	}

	#[tokio::test]
	async fn submission_renders_returned_graph() {
		let view = Rc::new(RefCell::new(ViewState::default()));
		let backend = MockBackend::observing(&view).reply(200, single_node_payload("X", "#000000", "d"));
		let orchestrator = RequestOrchestrator::new(backend);

		orchestrator.submit(&*view, "foo").await;

		let state = view.borrow();
		assert_eq!(orchestrator.backend.busy_during_call.borrow().as_slice(), &[true]);
		assert_eq!(state.phase, RequestPhase::Idle);
		assert_eq!(state.error, None);
		assert_eq!(state.description(), "d");

		let rendered = state.rendered.as_ref().unwrap();
		assert_eq!(rendered.graph.nodes.len(), 1);
		let style = NodeStyle::for_node(&rendered.graph.nodes[0]);
		assert_eq!(style.label, "X");
		assert_eq!(style.text_color, LIGHT_TEXT);
	}

	#[tokio::test]
	async fn failed_submission_clears_busy_and_reports() {
		let view = Rc::new(RefCell::new(ViewState::default()));
		let backend = MockBackend::observing(&view).reply(400, json!({"error": "model unavailable"}));
		let orchestrator = RequestOrchestrator::new(backend);

		orchestrator.submit(&*view, "foo").await;

		let state = view.borrow();
		assert!(!state.is_busy());
		let notice = state.error.as_ref().unwrap();
		assert!(!notice.message.is_empty());
		assert!(notice.message.contains("model unavailable"), "{}", notice.message);
		assert!(state.rendered.is_none());
	}

	#[tokio::test]
	async fn undecodable_success_is_reported() {
		let view = RefCell::new(ViewState::default());
		let orchestrator =
			RequestOrchestrator::new(MockBackend::default().reply_text(200, "Error Occurred!"));

		orchestrator.submit(&view, "foo").await;

		let state = view.borrow();
		assert!(!state.is_busy());
		assert!(state.error.is_some());
	}

	#[tokio::test]
	async fn blank_input_is_rejected_without_a_request() {
		let view = RefCell::new(ViewState::default());
		let orchestrator = RequestOrchestrator::new(MockBackend::default());

		orchestrator.submit(&view, "   ").await;

		let state = view.borrow();
		assert!(!state.is_busy());
		assert_eq!(state.error.as_ref().unwrap().message, EMPTY_INPUT_MESSAGE);
	}

	#[tokio::test]
	async fn slower_earlier_response_is_discarded() {
		let view = RefCell::new(ViewState::default());
		let backend = MockBackend::default()
			.reply(200, single_node_payload("Old", "#ffffff", "first"))
			.reply(200, single_node_payload("New", "#ffffff", "second"));
		let orchestrator = RequestOrchestrator::new(backend);

		tokio::join!(
			orchestrator.submit(&view, "slow first"),
			orchestrator.submit(&view, "second"),
		);

		let state = view.borrow();
		assert!(!state.is_busy());
		assert_eq!(state.description(), "second");
		assert_eq!(state.rendered.as_ref().unwrap().graph.nodes[0].label, "New");
	}

	#[test]
	fn busy_follows_the_latest_request() {
		let mut state = ViewState::default();
		let first = state.begin_request();
		let second = state.begin_request();

		// the newer request is still pending
		assert!(!state.finish_request(first, Ok(CanonicalGraph::default())));
		assert!(state.is_busy());
		assert!(state.rendered.is_none());

		assert!(state.finish_request(
			second,
			Err(ApiError::HttpStatus {
				status: 500,
				body: "boom".into()
			})
		));
		assert!(!state.is_busy());
		assert_eq!(
			state.error.as_ref().unwrap().message,
			"server returned HTTP 500: boom"
		);
	}

	#[test]
	fn dismissal_only_hides_the_matching_banner() {
		let mut state = ViewState::default();
		let old = state.raise_error("first");
		let new = state.raise_error("second");
		state.dismiss_error(old);
		assert_eq!(state.error.as_ref().unwrap().message, "second");
		state.dismiss_error(new);
		assert!(state.error.is_none());
	}

	#[tokio::test]
	async fn history_pages_append_with_continuing_positions() {
		let view = RefCell::new(ViewState::default());
		let backend = MockBackend::default()
			.history_reply(
				200,
				json!({"graph_history": [history_item("one", &[("A", "B")]), history_item("two", &[("C", "D")])], "remaining": 1}),
			)
			.history_reply(200, json!({"graph_history": [history_item("three", &[("E", "F")])], "remaining": 0}));
		let orchestrator = RequestOrchestrator::new(backend);

		orchestrator.load_history(&view).await;
		assert!(view.borrow().history.has_more());
		orchestrator.load_history(&view).await;

		let state = view.borrow();
		assert_eq!(orchestrator.backend.requested_pages.borrow().as_slice(), &[1, 2]);
		let listed: Vec<_> = state
			.history
			.entries()
			.iter()
			.map(|e| (e.position, e.metadata.description.as_str()))
			.collect();
		assert_eq!(listed, vec![(1, "one"), (2, "two"), (3, "three")]);
		assert!(!state.history.has_more());
		assert!(!state.history.is_loading());
	}

	#[tokio::test]
	async fn history_failure_shows_error_and_keeps_entries() {
		let view = RefCell::new(ViewState::default());
		let backend = MockBackend::default()
			.history_reply(200, json!({"graph_history": [history_item("kept", &[("A", "B")])], "remaining": 3}))
			.history_reply(500, json!({"error": "Neo4j driver not initialized"}));
		let orchestrator = RequestOrchestrator::new(backend);

		orchestrator.load_history(&view).await;
		orchestrator.load_history(&view).await;

		let state = view.borrow();
		assert_eq!(state.history.entries().len(), 1);
		assert!(!state.history.is_loading());
		let message = &state.error.as_ref().unwrap().message;
		assert!(message.contains("Neo4j driver not initialized"), "{message}");
	}

	#[test]
	fn concurrent_history_loads_are_collapsed() {
		let mut list = HistoryList::default();
		assert_eq!(list.begin_load(), Some(1));
		assert_eq!(list.begin_load(), None);
		list.abort_load();
		assert_eq!(list.begin_load(), Some(1));
	}

	#[tokio::test]
	async fn opening_history_entries_renders_their_own_record() {
		let view = RefCell::new(ViewState::default());
		let backend = MockBackend::default().history_reply(
			200,
			json!({
				"graph_history": [
					history_item("triangle", &[("A", "B"), ("B", "C"), ("A", "C")]),
					{"metadata": {"description": "broken"}, "unexpected": true},
					history_item("pair", &[("X", "Y")])
				],
				"remaining": 0
			}),
		);
		let orchestrator = RequestOrchestrator::new(backend);
		orchestrator.load_history(&view).await;

		let mut state = view.borrow_mut();
		state.open_history_entry(1);
		let first = state.rendered.clone().unwrap();
		assert_eq!(first.graph.description, "triangle");
		assert_eq!(first.graph.nodes.len(), 3);
		assert_eq!(first.graph.edges.len(), 3);
		assert!(state.error.is_none());

		state.open_history_entry(2);
		let message = state.error.as_ref().unwrap().message.clone();
		assert!(message.starts_with("History entry 2:"), "{message}");
		// the canvas keeps the previous graph
		assert_eq!(state.rendered.as_ref().unwrap(), &first);

		state.open_history_entry(1);
		let again = state.rendered.clone().unwrap();
		assert_eq!(again.graph, first.graph);
		assert_ne!(again.seq, first.seq);

		state.open_history_entry(3);
		assert_eq!(state.description(), "pair");
		state.open_history_entry(9);
		assert_eq!(state.description(), "pair");
	}
}
