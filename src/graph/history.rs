//! Persisted history records and their normalization into a [`CanonicalGraph`].
//!
//! The history endpoint has produced two layouts over time: a single
//! relationship per record, with endpoints named `from`/`to` or
//! `from_node`/`to_node`, and a batch of relationships under a `graph` list that
//! shares one metadata block. Both are detected by field presence and fold into
//! the same canonical graph. New data should use the batch layout.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{CanonicalGraph, Edge, Node};
use crate::error::GraphError;

/// Bookkeeping stored next to every history record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
	/// Store-assigned record id.
	#[serde(default, alias = "uniqueId", deserialize_with = "lenient_text")]
	pub unique_id: String,
	/// Caption of the stored graph.
	#[serde(default, deserialize_with = "lenient_text")]
	pub description: String,
	/// Creation time as the store reports it.
	#[serde(default, alias = "createdOn", deserialize_with = "lenient_text")]
	pub created_on: String,
	/// Last update time as the store reports it.
	#[serde(default, alias = "lastUpdatedOn", deserialize_with = "lenient_text")]
	pub last_updated_on: String,
}

/// Accepts strings, numbers (epoch millis from the graph store) and null.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(match Value::deserialize(deserializer)? {
		Value::String(text) => text,
		Value::Null => String::new(),
		other => other.to_string(),
	})
}

/// Endpoint of a stored relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
	/// Node identity; numeric ids are kept as text.
	#[serde(deserialize_with = "lenient_text")]
	pub id: String,
	/// Text drawn inside the node.
	#[serde(default)]
	pub label: String,
	/// Free-form category, serialized as `type`.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Hex fill color.
	#[serde(default)]
	pub color: String,
}

impl NodeRecord {
	fn to_node(&self) -> Node {
		Node {
			id: self.id.clone(),
			label: self.label.clone(),
			kind: self.kind.clone(),
			color: self.color.clone(),
		}
	}
}

/// Edge attributes of a stored relationship.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInfo {
	/// Relationship name, drawn as the edge label.
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Hex stroke color.
	#[serde(default)]
	pub color: String,
	/// Stored for reference; edges always point from `from` to `to`.
	#[serde(default)]
	pub direction: String,
}

/// One `from -[relationship]-> to` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
	/// Source endpoint, also stored as `from_node`.
	#[serde(alias = "from_node")]
	pub from: NodeRecord,
	/// Target endpoint, also stored as `to_node`.
	#[serde(alias = "to_node")]
	pub to: NodeRecord,
	/// Edge attributes.
	pub relationship: RelationshipInfo,
}

/// A history record in either of its stored layouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryRecord {
	/// One relationship per record.
	Single(Relationship),
	/// A `graph` list of relationships sharing the record's metadata.
	Batch(Vec<Relationship>),
}

impl HistoryRecord {
	/// Classifies a raw record by the fields it carries.
	pub fn detect(raw: &Value) -> Result<Self, GraphError> {
		let Some(fields) = raw.as_object() else {
			return Err(GraphError::malformed("record is not an object"));
		};

		if let Some(graph) = fields.get("graph") {
			let items = graph
				.as_array()
				.ok_or_else(|| GraphError::malformed("`graph` is not a list"))?;
			let relationships = items
				.iter()
				.enumerate()
				.map(|(i, item)| {
					Relationship::deserialize(item)
						.map_err(|e| GraphError::malformed(format!("relationship {}: {e}", i + 1)))
				})
				.collect::<Result<Vec<_>, _>>()?;
			return Ok(Self::Batch(relationships));
		}

		let has_from = fields.contains_key("from") || fields.contains_key("from_node");
		let has_to = fields.contains_key("to") || fields.contains_key("to_node");
		if has_from && has_to && fields.contains_key("relationship") {
			return Relationship::deserialize(raw)
				.map(Self::Single)
				.map_err(|e| GraphError::malformed(e.to_string()));
		}

		Err(GraphError::malformed(
			"expected a `graph` list or `from`/`to`/`relationship` fields",
		))
	}

	/// Relationships in record order.
	pub fn relationships(&self) -> &[Relationship] {
		match self {
			Self::Single(rel) => std::slice::from_ref(rel),
			Self::Batch(rels) => rels,
		}
	}
}

#[derive(Default)]
struct GraphBuilder {
	seen: HashSet<String>,
	nodes: Vec<Node>,
	edges: Vec<Edge>,
}

impl GraphBuilder {
	fn push(&mut self, rel: &Relationship) {
		self.edges.push(Edge {
			source: rel.from.id.clone(),
			target: rel.to.id.clone(),
			label: rel.relationship.kind.clone(),
			color: rel.relationship.color.clone(),
		});
		for end in [&rel.from, &rel.to] {
			if self.seen.insert(end.id.clone()) {
				self.nodes.push(end.to_node());
			}
		}
	}

	fn finish(self, description: &str) -> CanonicalGraph {
		CanonicalGraph {
			nodes: self.nodes,
			edges: self.edges,
			description: description.to_owned(),
		}
	}
}

/// Folds one record into a canonical graph.
pub fn normalize(record: &HistoryRecord, description: &str) -> CanonicalGraph {
	normalize_all(std::slice::from_ref(record), description)
}

/// Folds several records into one canonical graph, deduplicating nodes across all of them.
pub fn normalize_all(records: &[HistoryRecord], description: &str) -> CanonicalGraph {
	let mut builder = GraphBuilder::default();
	for record in records {
		for rel in record.relationships() {
			builder.push(rel);
		}
	}
	builder.finish(description)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn node(id: &str) -> Value {
		json!({"id": id, "label": format!("Label {id}"), "type": "concept", "color": "#aabbcc"})
	}

	fn triple(from: &str, to: &str, kind: &str) -> Value {
		json!({
			"from": node(from),
			"to": node(to),
			"relationship": {"type": kind, "color": "#333333", "direction": "forward"}
		})
	}

	#[test]
	fn batch_shares_endpoints_between_edges() {
		let raw = json!({
			"metadata": {"description": "abc"},
			"graph": [triple("A", "B", "ab"), triple("B", "C", "bc"), triple("A", "C", "ac")]
		});
		let record = HistoryRecord::detect(&raw).unwrap();
		assert!(matches!(record, HistoryRecord::Batch(ref rels) if rels.len() == 3));

		let graph = normalize(&record, "abc");
		let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["A", "B", "C"]);
		assert_eq!(graph.edges.len(), 3);
		assert_eq!(
			graph
				.edges
				.iter()
				.map(|e| (e.source.as_str(), e.target.as_str(), e.label.as_str()))
				.collect::<Vec<_>>(),
			vec![("A", "B", "ab"), ("B", "C", "bc"), ("A", "C", "ac")]
		);
		assert_eq!(graph.description, "abc");
		assert!(graph.dangling_endpoints().is_empty());
	}

	#[test]
	fn single_relationship_yields_two_nodes_one_edge() {
		let record = HistoryRecord::detect(&triple("n1", "n2", "rel")).unwrap();
		assert!(matches!(record, HistoryRecord::Single(_)));

		let graph = normalize(&record, "");
		assert_eq!(graph.nodes.len(), 2);
		assert_eq!(graph.edges.len(), 1);
		assert_eq!(graph.edges[0].color, "#333333");
		assert_eq!(graph.nodes[0].label, "Label n1");
		assert_eq!(graph.nodes[1].kind, "concept");
	}

	#[test]
	fn store_style_endpoint_names_are_accepted() {
		let raw = json!({
			"from_node": {"id": "x", "label": "X", "type": "t", "color": "#010101"},
			"to_node": {"id": "y", "color": "#fefefe"},
			"relationship": {"type": "links", "color": "#123456", "timestamp": 1700000000000u64}
		});
		let graph = normalize(&HistoryRecord::detect(&raw).unwrap(), "store");
		assert_eq!(graph.nodes[0].label, "X");
		// missing labels stay empty
		assert_eq!(graph.nodes[1].label, "");
		assert_eq!(graph.edges[0].label, "links");
	}

	#[test]
	fn self_loop_adds_its_node_once() {
		let record = HistoryRecord::detect(&triple("s", "s", "self")).unwrap();
		let graph = normalize(&record, "");
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(graph.edges.len(), 1);
	}

	#[test]
	fn normalizing_twice_is_identical() {
		let raw = json!({"graph": [triple("A", "B", "x"), triple("B", "A", "y")]});
		let record = HistoryRecord::detect(&raw).unwrap();
		assert_eq!(normalize(&record, "d"), normalize(&record, "d"));
	}

	#[test]
	fn records_merge_across_a_list() {
		let records = vec![
			HistoryRecord::detect(&triple("A", "B", "1")).unwrap(),
			HistoryRecord::detect(&json!({"graph": [triple("B", "C", "2"), triple("A", "B", "1")]}))
				.unwrap(),
		];
		let graph = normalize_all(&records, "merged");
		assert_eq!(graph.nodes.len(), 3);
		// parallel duplicates are kept
		assert_eq!(graph.edges.len(), 3);
	}

	#[test]
	fn unrecognized_shapes_are_rejected() {
		for raw in [
			json!("just text"),
			json!({"metadata": {"description": "nothing else"}}),
			json!({"from": node("a"), "relationship": {"type": "x"}}),
			json!({"graph": {"not": "a list"}}),
			json!({"graph": [{"from": node("a"), "to": {"label": "no id"}, "relationship": {}}]}),
			json!({"error": "Neo4j record could not be read"}),
		] {
			let err = HistoryRecord::detect(&raw).unwrap_err();
			assert!(matches!(err, GraphError::MalformedRecord { .. }), "{raw}");
		}
	}

	#[test]
	fn metadata_accepts_both_namings_and_numeric_timestamps() {
		let snake: Metadata = serde_json::from_value(json!({
			"unique_id": "u1",
			"description": "d",
			"created_on": "2023-07-01",
			"last_updated_on": null
		}))
		.unwrap();
		assert_eq!(snake.unique_id, "u1");
		assert_eq!(snake.created_on, "2023-07-01");
		assert_eq!(snake.last_updated_on, "");

		let camel: Metadata = serde_json::from_value(json!({
			"uniqueId": 7,
			"createdOn": 1688169600000u64,
			"lastUpdatedOn": "later"
		}))
		.unwrap();
		assert_eq!(camel.unique_id, "7");
		assert_eq!(camel.created_on, "1688169600000");
		assert_eq!(camel.last_updated_on, "later");
		assert_eq!(camel.description, "");
	}
}
