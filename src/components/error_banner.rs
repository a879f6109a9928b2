use std::time::Duration;

use leptos::prelude::*;

use crate::session::ViewState;

/// Dismissible banner for the current error; each error hides itself after `timeout`.
#[component]
pub fn ErrorBanner(state: RwSignal<ViewState>, timeout: Duration) -> impl IntoView {
	let error_id = Memo::new(move |_| state.with(|s| s.error.as_ref().map(|e| e.id)));

	Effect::new(move |_| {
		if let Some(id) = error_id.get() {
			set_timeout(move || state.update(|s| s.dismiss_error(id)), timeout);
		}
	});

	view! {
		<div
			class="error-message"
			role="alert"
			style:display=move || if error_id.get().is_some() { "flex" } else { "none" }
		>
			<span class="error-text">
				{move || state.with(|s| s.error.as_ref().map(|e| e.message.clone()).unwrap_or_default())}
			</span>
			<button
				class="error-close"
				aria-label="Dismiss"
				on:click=move |_| state.update(|s| s.error = None)
			>
				"×"
			</button>
		</div>
	}
}
