//! HTTP API handlers for briefing-server

pub mod audio;
pub mod buildinfo;
pub mod editions;
pub mod feedback;
pub mod health;
pub mod ui;

pub use audio::serve_audio;
pub use buildinfo::get_build_info;
pub use editions::{get_page, list_editions};
pub use feedback::{export_feedback, list_feedback, submit_feedback};
pub use health::health_routes;
pub use ui::{serve_app_js, serve_index};
