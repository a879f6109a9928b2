//! Visual encoding of nodes and edges.

use crate::graph::{Edge, Node};

pub const NODE_HEIGHT: f64 = 50.0;
pub const MIN_NODE_WIDTH: f64 = 50.0;
pub const WIDTH_PER_CHAR: f64 = 8.0;
pub const NODE_FONT: &str = "12px sans-serif";
pub const EDGE_FONT: &str = "10px sans-serif";
pub const EDGE_WIDTH: f64 = 3.0;
pub const EDGE_DASH: [f64; 2] = [4.0, 4.0];
pub const ARROW_SIZE: f64 = 10.0;
pub const LABEL_BACKGROUND: &str = "#ffffff";

/// Text color on dark fills.
pub const LIGHT_TEXT: &str = "#ffffff";
/// Text color on everything else.
pub const DARK_TEXT: &str = "#000000";

const FALLBACK_FILL: &str = "#d3d3d3";
const FALLBACK_STROKE: &str = "#999999";
// brightness scaled by 1000 so the cut-off compares exactly
const DARK_BELOW: u32 = 40 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Rgb {
	/// Perceived brightness `0.299R + 0.587G + 0.114B`, times 1000.
	pub fn brightness_milli(self) -> u32 {
		299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32
	}
}

/// Parses `rrggbb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> Option<Rgb> {
	let hex = value.trim().strip_prefix('#').unwrap_or(value.trim());
	if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
		return None;
	}
	let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
	Some(Rgb {
		r: channel(0)?,
		g: channel(2)?,
		b: channel(4)?,
	})
}

/// Readable foreground for text drawn on `background`.
pub fn text_color(background: Rgb) -> &'static str {
	if background.brightness_milli() < DARK_BELOW {
		LIGHT_TEXT
	} else {
		DARK_TEXT
	}
}

/// Rectangle width for a node label: 8px per character, never under 50px.
pub fn node_width(label: &str) -> f64 {
	(label.chars().count() as f64 * WIDTH_PER_CHAR).max(MIN_NODE_WIDTH)
}

/// Everything the canvas needs to draw one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeStyle {
	pub label: String,
	pub fill: String,
	pub text_color: &'static str,
	pub width: f64,
	pub height: f64,
}

impl NodeStyle {
	pub fn for_node(node: &Node) -> Self {
		let (fill, text) = match parse_hex_color(&node.color) {
			Some(rgb) => (node.color.clone(), text_color(rgb)),
			None => (FALLBACK_FILL.to_owned(), DARK_TEXT),
		};
		Self {
			label: node.label.clone(),
			fill,
			text_color: text,
			width: node_width(&node.label),
			height: NODE_HEIGHT,
		}
	}
}

/// Everything the canvas needs to draw one edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeStyle {
	pub label: String,
	pub color: String,
	pub width: f64,
}

impl EdgeStyle {
	pub fn for_edge(edge: &Edge) -> Self {
		let color = if parse_hex_color(&edge.color).is_some() {
			edge.color.clone()
		} else {
			FALLBACK_STROKE.to_owned()
		};
		Self {
			label: edge.label.clone(),
			color,
			width: EDGE_WIDTH,
		}
	}
}
