//! This module handles conversion between iCal files and internal representations
//!
//! Parsing is done by the `ical` crate (which takes care of unfolding lines and splitting parameters), the resulting content lines are then assembled into a [`CalendarObject`](crate::CalendarObject) tree.

mod parser;
pub use parser::parse;
mod builder;
pub use builder::build_from;
pub use builder::format_date_time;

use crate::config::{ORG_NAME, PRODUCT_NAME};

pub fn default_prod_id() -> String {
    let org_name = ORG_NAME.lock().map(|s| s.clone()).unwrap_or_default();
    let product_name = PRODUCT_NAME.lock().map(|s| s.clone()).unwrap_or_default();
    format!("-//{}//{}//EN", org_name, product_name)
}
