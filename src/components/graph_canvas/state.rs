use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, warn};

use super::layout::{Placement, ViewTransform, fit_transform, resolve_overlaps};
use super::style::{EdgeStyle, NodeStyle};
use crate::config::LayoutConfig;
use crate::graph::CanonicalGraph;

// lets the simulation move before a quiet tick counts as settled
const MIN_TICKS: u32 = 30;
const SETTLE_SEPARATION_ROUNDS: usize = 50;

#[derive(Clone, Debug)]
pub struct EdgeLink {
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub style: EdgeStyle,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug)]
pub struct LayoutProgress {
	pub ticks: u32,
	pub settled: bool,
	/// Cleared once the user pans or zooms this graph.
	pub auto_fit: bool,
}

/// Layout and viewport of the graph currently on the canvas.
pub struct CanvasState {
	pub graph: ForceGraph<NodeStyle, ()>,
	pub edges: Vec<EdgeLink>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub layout: LayoutProgress,
	pub width: f64,
	pub height: f64,
	config: LayoutConfig,
}

impl CanvasState {
	pub fn new(data: &CanonicalGraph, width: f64, height: f64, config: &LayoutConfig) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: config.force_charge,
			force_spring: config.force_spring,
			force_max: config.force_max,
			node_speed: config.node_speed,
			damping_factor: config.damping_factor,
		});
		let mut id_to_idx = HashMap::new();
		let mut edges = Vec::new();

		let count = data.nodes.len().max(1) as f64;
		let radius = 60.0 + 25.0 * count;
		for (i, node) in data.nodes.iter().enumerate() {
			let Entry::Vacant(slot) = id_to_idx.entry(node.id.as_str()) else {
				warn!("node `{}` appears more than once, keeping the first", node.id);
				continue;
			};
			let angle = (i as f64) * 2.0 * PI / count;
			slot.insert(graph.add_node(NodeData {
				x: (radius * angle.cos()) as f32,
				y: (radius * angle.sin()) as f32,
				mass: config.node_mass,
				is_anchor: false,
				user_data: NodeStyle::for_node(node),
			}));
		}

		for edge in &data.edges {
			if let (Some(&src), Some(&tgt)) = (
				id_to_idx.get(edge.source.as_str()),
				id_to_idx.get(edge.target.as_str()),
			) {
				// self loops get no spring, they are drawn as a loop only
				if src != tgt {
					graph.add_edge(src, tgt, EdgeData::default());
				}
				edges.push(EdgeLink {
					source: src,
					target: tgt,
					style: EdgeStyle::for_edge(edge),
				});
			} else {
				warn!(
					"skipping edge {} -> {}: endpoint not in graph",
					edge.source, edge.target
				);
			}
		}

		let mut state = Self {
			graph,
			edges,
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			layout: LayoutProgress {
				ticks: 0,
				settled: data.nodes.is_empty(),
				auto_fit: true,
			},
			width,
			height,
			config: config.clone(),
		};
		state.fit();
		state
	}

	/// Node rectangles in world space, in simulation order.
	pub fn placements(&self) -> Vec<(DefaultNodeIdx, Placement)> {
		let mut out = Vec::new();
		self.graph.visit_nodes(|node| {
			let style = &node.data.user_data;
			out.push((
				node.index(),
				Placement {
					x: node.x() as f64,
					y: node.y() as f64,
					width: style.width,
					height: style.height,
					pinned: node.data.is_anchor,
				},
			));
		});
		out
	}

	#[cfg(test)]
	pub fn node_count(&self) -> usize {
		self.placements().len()
	}

	/// Topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.transform.to_world(sx, sy);
		self.placements()
			.into_iter()
			.rev()
			.find(|(_, p)| p.contains(gx, gy))
			.map(|(idx, _)| idx)
	}

	/// Grabs node `idx` at screen position `(sx, sy)` and pins the view so the
	/// node stays under the cursor.
	pub fn begin_drag(&mut self, idx: DefaultNodeIdx, sx: f64, sy: f64) {
		self.layout.auto_fit = false;
		self.drag.active = true;
		self.drag.node_idx = Some(idx);
		self.drag.start_x = sx;
		self.drag.start_y = sy;
		let drag = &mut self.drag;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				drag.node_start_x = node.x();
				drag.node_start_y = node.y();
			}
		});
	}

	/// Moves the dragged node to follow the cursor and anchors it there.
	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(idx) = self.drag.node_idx.filter(|_| self.drag.active) else {
			return;
		};
		let nx = self.drag.node_start_x + ((sx - self.drag.start_x) / self.transform.k) as f32;
		let ny = self.drag.node_start_y + ((sy - self.drag.start_y) / self.transform.k) as f32;
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = nx;
				node.data.y = ny;
				node.data.is_anchor = true;
			}
		});
	}

	/// One simulation step followed by overlap removal. No-op once settled.
	pub fn tick(&mut self, dt: f32) {
		if self.layout.settled {
			return;
		}
		let before: HashMap<DefaultNodeIdx, (f64, f64)> = self
			.placements()
			.into_iter()
			.map(|(idx, p)| (idx, (p.x, p.y)))
			.collect();

		self.graph.update(dt);
		self.separate(1);

		let max_shift = self
			.placements()
			.into_iter()
			.filter_map(|(idx, p)| before.get(&idx).map(|&(x, y)| (p.x - x).hypot(p.y - y)))
			.fold(0.0_f64, f64::max);

		self.layout.ticks += 1;
		let at_rest = self.layout.ticks >= MIN_TICKS && max_shift < self.config.settle_threshold;
		if at_rest || self.layout.ticks >= self.config.max_ticks {
			self.layout.settled = true;
			self.separate(SETTLE_SEPARATION_ROUNDS);
			debug!(
				"layout settled after {} ticks (last shift {max_shift:.3})",
				self.layout.ticks
			);
		}
		if self.layout.auto_fit {
			self.fit();
		}
	}

	/// Runs overlap removal up to `rounds` times and writes the result back into
	/// the simulation.
	fn separate(&mut self, rounds: usize) {
		let (indices, mut boxes): (Vec<_>, Vec<_>) = self.placements().into_iter().unzip();
		let mut moved = false;
		for _ in 0..rounds {
			if !resolve_overlaps(&mut boxes, self.config.node_gap) {
				break;
			}
			moved = true;
		}
		if !moved {
			return;
		}
		let positions: HashMap<DefaultNodeIdx, (f32, f32)> = indices
			.iter()
			.zip(&boxes)
			.map(|(&idx, p)| (idx, (p.x as f32, p.y as f32)))
			.collect();
		self.graph.visit_nodes_mut(|node| {
			if let Some(&(x, y)) = positions.get(&node.index()) {
				node.data.x = x;
				node.data.y = y;
			}
		});
	}

	/// Fits and centers the whole graph in the viewport.
	pub fn fit(&mut self) {
		let boxes: Vec<Placement> = self.placements().into_iter().map(|(_, p)| p).collect();
		self.transform = fit_transform(
			&boxes,
			self.width,
			self.height,
			self.config.padding,
			self.zoom_limits(),
		);
	}

	pub fn zoom_limits(&self) -> (f64, f64) {
		(self.config.min_zoom, self.config.max_zoom)
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		if self.layout.auto_fit {
			self.fit();
		}
	}
}
