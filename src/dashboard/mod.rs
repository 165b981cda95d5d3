//! Dashboard module
//!
//! Provides an overview page showing totals, a month-to-date chart, and the
//! merged transaction list with filtering and sorting.

mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
