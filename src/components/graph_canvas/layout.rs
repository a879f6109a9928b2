//! Geometry applied on top of the force simulation: overlap removal, viewport
//! fitting and edge endpoint clipping.

const OVERLAP_PASSES: usize = 8;

/// A node rectangle in world space, centered on `(x, y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Placement {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	/// Pinned nodes are never moved by overlap removal.
	pub pinned: bool,
}

impl Placement {
	pub fn contains(&self, px: f64, py: f64) -> bool {
		(px - self.x).abs() <= self.width / 2.0 && (py - self.y).abs() <= self.height / 2.0
	}

	fn overlap(&self, other: &Placement, gap: f64) -> Option<(f64, f64)> {
		let ox = (self.width + other.width) / 2.0 + gap - (other.x - self.x).abs();
		let oy = (self.height + other.height) / 2.0 + gap - (other.y - self.y).abs();
		(ox > 0.0 && oy > 0.0).then_some((ox, oy))
	}
}

/// World-to-screen mapping: `screen = world * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	#[cfg(test)]
	pub fn to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
		(wx * self.k + self.x, wy * self.k + self.y)
	}
}

/// Pushes intersecting rectangles apart along their axis of least penetration
/// until each pair is at least `gap` apart. Returns whether anything moved.
pub fn resolve_overlaps(boxes: &mut [Placement], gap: f64) -> bool {
	let mut moved = false;
	for _ in 0..OVERLAP_PASSES {
		let mut pass_moved = false;
		for i in 0..boxes.len() {
			for j in (i + 1)..boxes.len() {
				let (a, b) = (boxes[i], boxes[j]);
				if a.pinned && b.pinned {
					continue;
				}
				let Some((ox, oy)) = a.overlap(&b, gap) else {
					continue;
				};
				let (push_x, push_y) = if ox <= oy {
					(ox * direction(b.x - a.x), 0.0)
				} else {
					(0.0, oy * direction(b.y - a.y))
				};
				let (share_a, share_b) = match (a.pinned, b.pinned) {
					(true, false) => (0.0, 1.0),
					(false, true) => (1.0, 0.0),
					_ => (0.5, 0.5),
				};
				boxes[i].x -= push_x * share_a;
				boxes[i].y -= push_y * share_a;
				boxes[j].x += push_x * share_b;
				boxes[j].y += push_y * share_b;
				pass_moved = true;
			}
		}
		if !pass_moved {
			break;
		}
		moved = true;
	}
	moved
}

// coincident centers separate toward +axis
fn direction(delta: f64) -> f64 {
	if delta < 0.0 { -1.0 } else { 1.0 }
}

/// Transform that fits every rectangle into a `width` x `height` viewport with
/// `padding` on each side, centered.
pub fn fit_transform(
	boxes: &[Placement],
	width: f64,
	height: f64,
	padding: f64,
	zoom: (f64, f64),
) -> ViewTransform {
	if boxes.is_empty() {
		return ViewTransform {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		};
	}

	let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
	let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
	for b in boxes {
		min_x = min_x.min(b.x - b.width / 2.0);
		max_x = max_x.max(b.x + b.width / 2.0);
		min_y = min_y.min(b.y - b.height / 2.0);
		max_y = max_y.max(b.y + b.height / 2.0);
	}

	let avail_w = (width - 2.0 * padding).max(1.0);
	let avail_h = (height - 2.0 * padding).max(1.0);
	let k = (avail_w / (max_x - min_x).max(1e-6))
		.min(avail_h / (max_y - min_y).max(1e-6))
		.clamp(zoom.0, zoom.1);
	let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

	ViewTransform {
		x: width / 2.0 - cx * k,
		y: height / 2.0 - cy * k,
		k,
	}
}

/// Where the segment from `from` toward the center of `to` crosses `to`'s border.
pub fn border_point(from: (f64, f64), to: &Placement) -> (f64, f64) {
	let (dx, dy) = (to.x - from.0, to.y - from.1);
	if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
		return (to.x, to.y);
	}
	let tx = if dx.abs() < f64::EPSILON {
		f64::INFINITY
	} else {
		to.width / 2.0 / dx.abs()
	};
	let ty = if dy.abs() < f64::EPSILON {
		f64::INFINITY
	} else {
		to.height / 2.0 / dy.abs()
	};
	let t = tx.min(ty);
	(to.x - dx * t, to.y - dy * t)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rect(x: f64, y: f64, width: f64) -> Placement {
		Placement {
			x,
			y,
			width,
			height: 50.0,
			pinned: false,
		}
	}

	#[test]
	fn overlapping_pair_is_separated_by_gap() {
		let mut boxes = [rect(0.0, 0.0, 100.0), rect(20.0, 5.0, 60.0)];
		assert!(resolve_overlaps(&mut boxes, 10.0));
		let (a, b) = (boxes[0], boxes[1]);
		let clear_x = (b.x - a.x).abs() >= (a.width + b.width) / 2.0 + 10.0 - 1e-9;
		let clear_y = (b.y - a.y).abs() >= (a.height + b.height) / 2.0 + 10.0 - 1e-9;
		assert!(clear_x || clear_y, "{boxes:?}");
		// shared push keeps the pair's midpoint
		assert!(((a.x + b.x) / 2.0 - 10.0).abs() < 1e-9);
	}

	#[test]
	fn pinned_box_stays_put() {
		let mut pinned = rect(0.0, 0.0, 50.0);
		pinned.pinned = true;
		let mut boxes = [pinned, rect(0.0, 10.0, 50.0)];
		resolve_overlaps(&mut boxes, 0.0);
		assert_eq!(boxes[0], pinned);
		assert!(boxes[1].x.abs() >= 50.0 - 1e-9 || boxes[1].y >= 50.0 - 1e-9);
	}

	#[test]
	fn disjoint_boxes_are_untouched() {
		let mut boxes = [rect(0.0, 0.0, 50.0), rect(200.0, 0.0, 50.0)];
		let before = boxes;
		assert!(!resolve_overlaps(&mut boxes, 10.0));
		assert_eq!(boxes, before);
	}

	#[test]
	fn fit_centers_and_pads_the_bounds() {
		let boxes = [rect(-100.0, 0.0, 100.0), rect(300.0, 100.0, 100.0)];
		let t = fit_transform(&boxes, 800.0, 600.0, 30.0, (0.1, 10.0));

		// bounds are x -150..350, y -25..125
		let (cx, cy) = t.to_screen(100.0, 50.0);
		assert!((cx - 400.0).abs() < 1e-9 && (cy - 300.0).abs() < 1e-9);
		let (left, _) = t.to_screen(-150.0, 0.0);
		let (right, _) = t.to_screen(350.0, 0.0);
		assert!((left - 30.0).abs() < 1e-9, "{left}");
		assert!((right - 770.0).abs() < 1e-9, "{right}");
	}

	#[test]
	fn fit_respects_zoom_limits() {
		let t = fit_transform(&[rect(5.0, 5.0, 50.0)], 800.0, 600.0, 30.0, (0.1, 2.0));
		assert_eq!(t.k, 2.0);
		assert_eq!(t.to_screen(5.0, 5.0), (400.0, 300.0));

		let empty = fit_transform(&[], 800.0, 600.0, 30.0, (0.1, 2.0));
		assert_eq!(empty, ViewTransform { x: 400.0, y: 300.0, k: 1.0 });
	}

	#[test]
	fn screen_and_world_round_trip() {
		let t = ViewTransform { x: 12.0, y: -4.0, k: 2.5 };
		let (sx, sy) = t.to_screen(3.0, 7.0);
		assert_eq!(t.to_world(sx, sy), (3.0, 7.0));
	}

	#[test]
	fn border_point_clips_to_rectangle_edge() {
		let target = rect(100.0, 0.0, 60.0);
		assert_eq!(border_point((0.0, 0.0), &target), (70.0, 0.0));
		assert_eq!(border_point((100.0, -200.0), &target), (100.0, -25.0));
		assert_eq!(border_point((100.0, 0.0), &target), (100.0, 0.0));
	}
}
