use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::SubmitEvent;

use crate::api::HttpBackend;
use crate::components::error_banner::ErrorBanner;
use crate::components::graph_canvas::GraphCanvas;
use crate::components::history_list::HistoryPanel;
use crate::config::AppConfig;
use crate::session::{RequestOrchestrator, ViewState};

/// Input form, graph viewport and history side by side.
#[component]
pub fn Home() -> impl IntoView {
	let config = use_context::<AppConfig>().unwrap_or_else(AppConfig::from_window);
	let state = RwSignal::new(ViewState::default());
	let orchestrator = Rc::new(RequestOrchestrator::new(HttpBackend::new(config.clone())));
	let rendered = Memo::new(move |_| state.with(|s| s.rendered.clone()));
	let input_ref = NodeRef::<leptos::html::Input>::new();

	let submit_with = orchestrator.clone();
	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let text = input_ref.get().map(|input| input.value()).unwrap_or_default();
		let orchestrator = submit_with.clone();
		spawn_local(async move {
			orchestrator.submit(&state, &text).await;
		});
	};

	view! {
		<ErrorBanner state=state timeout=config.error_timeout />

		<main class="graph-page">
			<section class="graph-main">
				<form class="input-form" on:submit=on_submit>
					<input
						node_ref=input_ref
						type="text"
						class="user-input"
						placeholder="Describe something to map as a knowledge graph"
					/>
					<button type="submit">"Generate"</button>
				</form>

				<div
					class="loading"
					style:display=move || if state.with(ViewState::is_busy) { "block" } else { "none" }
				/>

				<p class="graph-description">{move || state.with(|s| s.description().to_owned())}</p>

				<div class="graph-viewport">
					<GraphCanvas graph=rendered layout=config.layout.clone() />
				</div>
			</section>

			<HistoryPanel state=state orchestrator=orchestrator />
		</main>
	}
}
