use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::HttpBackend;
use crate::session::{HistoryEntry, RequestOrchestrator, ViewState};

/// Previously generated graphs. Loads the first page on mount; clicking an
/// entry replays its stored record on the canvas.
#[component]
pub fn HistoryPanel(
	state: RwSignal<ViewState>,
	orchestrator: Rc<RequestOrchestrator<HttpBackend>>,
) -> impl IntoView {
	let load = move || {
		let orchestrator = orchestrator.clone();
		spawn_local(async move {
			orchestrator.load_history(&state).await;
		});
	};
	load();

	let load_more = load.clone();

	view! {
		<aside class="history">
			<h2>"History"</h2>
			<For
				each=move || state.with(|s| s.history.entries().to_vec())
				key=|entry: &HistoryEntry| entry.position
				let:entry
			>
				<HistoryRow state=state entry=entry />
			</For>
			<button
				class="history-more"
				style:display=move || {
					if state.with(|s| s.history.has_more()) { "block" } else { "none" }
				}
				disabled=move || state.with(|s| s.history.is_loading())
				on:click=move |_| load_more()
			>
				"Load more"
			</button>
		</aside>
	}
}

#[component]
fn HistoryRow(state: RwSignal<ViewState>, entry: HistoryEntry) -> impl IntoView {
	let position = entry.position;
	let meta = entry.metadata;

	view! {
		<div class="history-entry" on:click=move |_| state.update(|s| s.open_history_entry(position))>
			<p>
				{format!("{position}. {}", meta.description)}
				<br />
				{format!("- Created On: {}", meta.created_on)}
				<br />
				{format!("- Last Updated On: {}", meta.last_updated_on)}
			</p>
		</div>
	}
}
