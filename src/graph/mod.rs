//! Canonical graph model shared by the normalizer, the backend client and the canvas.

pub mod history;

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

pub use history::{HistoryRecord, Metadata, NodeRecord, Relationship, RelationshipInfo};

/// A node as the canvas consumes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
	/// Unique within one graph.
	pub id: String,
	/// Text drawn inside the node.
	#[serde(default)]
	pub label: String,
	/// Free-form category, serialized as `type`.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Hex fill color, `#rrggbb`.
	#[serde(default)]
	pub color: String,
}

/// A directed, labeled edge between two node ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
	/// Id of the node the edge starts at.
	pub source: String,
	/// Id of the node the arrow points to.
	pub target: String,
	/// Text drawn at the edge midpoint.
	#[serde(default)]
	pub label: String,
	/// Hex stroke color.
	#[serde(default)]
	pub color: String,
}

/// Normalized graph handed to the renderer.
///
/// Nodes keep first-seen order, edges keep record order, and every edge endpoint
/// names a node in `nodes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CanonicalGraph {
	/// Unique by id.
	pub nodes: Vec<Node>,
	/// Directed edges in record order.
	pub edges: Vec<Edge>,
	/// Caption shown above the canvas.
	pub description: String,
}

impl CanonicalGraph {
	/// Ids referenced by edges but absent from the node list.
	pub fn dangling_endpoints(&self) -> Vec<&str> {
		let known: HashSet<&str> =
			self.nodes.iter().map(|n| n.id.as_str()).collect();
		let mut missing = Vec::new();
		for edge in &self.edges {
			for end in [edge.source.as_str(), edge.target.as_str()] {
				if !known.contains(end) && !missing.contains(&end) {
					missing.push(end);
				}
			}
		}
		missing
	}
}

/// `{data: {...}}` wrapper used by the element lists on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Element<T> {
	/// The wrapped element.
	pub data: T,
}

/// Element lists of a generated graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Elements {
	/// Node elements.
	#[serde(default)]
	pub nodes: Vec<Element<Node>>,
	/// Edge elements.
	#[serde(default)]
	pub edges: Vec<Element<Edge>>,
}

/// Descriptive block returned with a generated graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PayloadMeta {
	/// Caption for the generated graph.
	#[serde(default)]
	pub description: String,
}

/// Body of a successful `POST /get_response_data`, already in canonical shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphPayload {
	/// Nodes and edges.
	pub elements: Elements,
	/// Description block, absent on older backends.
	#[serde(default)]
	pub meta: PayloadMeta,
}

impl From<GraphPayload> for CanonicalGraph {
	/// Repeated node ids collapse onto their first occurrence.
	fn from(payload: GraphPayload) -> Self {
		let mut seen = HashSet::new();
		let mut nodes = Vec::with_capacity(payload.elements.nodes.len());
		for Element { data: node } in payload.elements.nodes {
			if seen.insert(node.id.clone()) {
				nodes.push(node);
			} else {
				warn!("dropping duplicate node `{}` ({:?})", node.id, node.label);
			}
		}
		Self {
			nodes,
			edges: payload.elements.edges.into_iter().map(|e| e.data).collect(),
			description: payload.meta.description,
		}
	}
}
