//! Force-directed graph viewport drawn on a 2D canvas.

mod component;
pub mod layout;
mod render;
pub mod state;
pub mod style;

pub use component::GraphCanvas;
