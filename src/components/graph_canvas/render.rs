use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::DefaultNodeIdx;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::layout::{Placement, border_point};
use super::state::{CanvasState, EdgeLink};
use super::style::{ARROW_SIZE, EDGE_DASH, EDGE_FONT, LABEL_BACKGROUND, NODE_FONT};

const BACKGROUND: &str = "#ffffff";
const LOOP_RADIUS: f64 = 18.0;
const LABEL_PAD: f64 = 3.0;

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	let boxes: HashMap<DefaultNodeIdx, Placement> = state.placements().into_iter().collect();
	for link in &state.edges {
		if let (Some(from), Some(to)) = (boxes.get(&link.source), boxes.get(&link.target)) {
			if link.source == link.target {
				draw_loop(link, from, ctx);
			} else {
				draw_edge(link, from, to, ctx);
			}
		}
	}
	draw_nodes(state, ctx);
	ctx.restore();
}

fn set_dash(ctx: &CanvasRenderingContext2d, pattern: &[f64]) {
	let array = js_sys::Array::new();
	for step in pattern {
		array.push(&JsValue::from_f64(*step));
	}
	let _ = ctx.set_line_dash(&array);
}

fn draw_edge(link: &EdgeLink, from: &Placement, to: &Placement, ctx: &CanvasRenderingContext2d) {
	let (x1, y1) = border_point((to.x, to.y), from);
	let (tip_x, tip_y) = border_point((from.x, from.y), to);
	let (dx, dy) = (tip_x - x1, tip_y - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let (ux, uy) = (dx / dist, dy / dist);
	let (back_x, back_y) = (tip_x - ux * ARROW_SIZE, tip_y - uy * ARROW_SIZE);

	ctx.set_stroke_style_str(&link.style.color);
	ctx.set_line_width(link.style.width);
	set_dash(ctx, &EDGE_DASH);
	ctx.begin_path();
	ctx.move_to(x1, y1);
	ctx.line_to(back_x, back_y);
	ctx.stroke();
	set_dash(ctx, &[]);

	let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
	ctx.set_fill_style_str(&link.style.color);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();

	draw_edge_label(&link.style.label, (x1 + tip_x) / 2.0, (y1 + tip_y) / 2.0, ctx);
}

/// Self references loop over the node's top edge.
fn draw_loop(link: &EdgeLink, node: &Placement, ctx: &CanvasRenderingContext2d) {
	let (cx, cy) = (node.x, node.y - node.height / 2.0);
	ctx.set_stroke_style_str(&link.style.color);
	ctx.set_line_width(link.style.width);
	set_dash(ctx, &EDGE_DASH);
	ctx.begin_path();
	let _ = ctx.arc(cx, cy, LOOP_RADIUS, PI, 2.0 * PI);
	ctx.stroke();
	set_dash(ctx, &[]);

	// arrow lands back on the border at the arc's right foot
	let (tip_x, tip_y) = (cx + LOOP_RADIUS, cy);
	ctx.set_fill_style_str(&link.style.color);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(tip_x - ARROW_SIZE * 0.5, tip_y - ARROW_SIZE);
	ctx.line_to(tip_x + ARROW_SIZE * 0.5, tip_y - ARROW_SIZE);
	ctx.close_path();
	ctx.fill();

	draw_edge_label(&link.style.label, cx, cy - LOOP_RADIUS, ctx);
}

fn draw_edge_label(label: &str, x: f64, y: f64, ctx: &CanvasRenderingContext2d) {
	if label.is_empty() {
		return;
	}
	ctx.set_font(EDGE_FONT);
	let text_width = ctx
		.measure_text(label)
		.map(|m| m.width())
		.unwrap_or(label.chars().count() as f64 * 6.0);
	let (w, h) = (text_width + 2.0 * LABEL_PAD, 10.0 + 2.0 * LABEL_PAD);
	ctx.set_fill_style_str(LABEL_BACKGROUND);
	ctx.fill_rect(x - w / 2.0, y - h / 2.0, w, h);

	ctx.set_fill_style_str("#000000");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(label, x, y);
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_font(NODE_FONT);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	state.graph.visit_nodes(|node| {
		let style = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);

		ctx.set_fill_style_str(&style.fill);
		ctx.fill_rect(
			x - style.width / 2.0,
			y - style.height / 2.0,
			style.width,
			style.height,
		);

		if !style.label.is_empty() {
			ctx.set_fill_style_str(style.text_color);
			let _ = ctx.fill_text(&style.label, x, y);
		}
	});
}
