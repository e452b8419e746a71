// strata-core/src/query.rs
//! Query layer: filter parsing and evaluation, index selection, and the
//! cursor-driven executor. `Collection::find` wires the three together.

pub mod executor;
pub mod filter;
pub mod planner;

pub use executor::execute;
pub use filter::{Clause, Filter, ParseMode};
pub use planner::{plan_scan, select_index};
