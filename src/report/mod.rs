//! Report rendering and table export.

pub mod export;
pub mod generator;

pub use export::export_tables;
pub use generator::{generate_json_report, generate_markdown_report};
