//! Backend location, banner timing and canvas layout parameters.

use std::time::Duration;

use log::warn;

/// Used when the page origin cannot be read, matches the backend's default port.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
/// How long an error banner stays up before dismissing itself.
pub const DEFAULT_ERROR_TIMEOUT: Duration = Duration::from_secs(5);

/// Physics and viewport parameters for the graph canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
	/// Repulsion between every pair of nodes.
	pub force_charge: f32,
	/// Spring stiffness along edges.
	pub force_spring: f32,
	/// Upper bound on the force applied to one node per step.
	pub force_max: f32,
	/// Scales how far a force moves a node per step.
	pub node_speed: f32,
	/// Velocity kept from one step to the next.
	pub damping_factor: f32,
	/// Mass given to every node.
	pub node_mass: f32,
	/// Screen-space margin kept around the graph when fitting.
	pub padding: f64,
	/// Minimum world-space gap between node rectangles.
	pub node_gap: f64,
	/// Largest per-tick node movement still considered at rest.
	pub settle_threshold: f64,
	/// Simulation steps after which the layout is declared settled regardless.
	pub max_ticks: u32,
	/// Smallest scale reachable by fitting or the wheel.
	pub min_zoom: f64,
	/// Largest scale reachable by fitting or the wheel.
	pub max_zoom: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			force_charge: 1200.0,
			force_spring: 0.05,
			force_max: 280.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			node_mass: 10.0,
			padding: 30.0,
			node_gap: 10.0,
			settle_threshold: 0.05,
			max_ticks: 600,
			min_zoom: 0.1,
			max_zoom: 10.0,
		}
	}
}

/// Client configuration, shared with the view tree through context.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	/// Origin the backend routes are resolved against.
	pub api_base: String,
	/// Delay before an error banner hides itself.
	pub error_timeout: Duration,
	/// Canvas layout parameters.
	pub layout: LayoutConfig,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base: DEFAULT_API_BASE.to_owned(),
			error_timeout: DEFAULT_ERROR_TIMEOUT,
			layout: LayoutConfig::default(),
		}
	}
}

impl AppConfig {
	/// Defaults with the backend origin taken from the page that served the app.
	pub fn from_window() -> Self {
		let origin = web_sys::window().and_then(|w| w.location().origin().ok());
		match origin {
			Some(origin) => Self::default().with_api_base(&origin),
			None => {
				warn!("page origin unavailable, using {DEFAULT_API_BASE}");
				Self::default()
			}
		}
	}

	/// Replaces the backend origin; blank values keep the current one.
	pub fn with_api_base(mut self, base: &str) -> Self {
		let base = base.trim().trim_end_matches('/');
		if base.is_empty() || base == "null" {
			warn!("ignoring unusable api base `{base}`");
		} else {
			self.api_base = base.to_owned();
		}
		self
	}

	/// Absolute URL for a backend route such as `/get_graph_history`.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}/{}", self.api_base, path.trim_start_matches('/'))
	}
}
