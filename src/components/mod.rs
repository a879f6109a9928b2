pub mod error_banner;
pub mod graph_canvas;
pub mod history_list;
