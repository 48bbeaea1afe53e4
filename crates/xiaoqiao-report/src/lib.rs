//! xiaoqiao-report: standalone HTML rendering of assessment reports.

pub mod html;

pub use html::{generate_html, write_html_report};
