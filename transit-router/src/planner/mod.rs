//! Journey planner.
//!
//! Drives the edge traversal rules with an A* search from an origin vertex
//! to a destination vertex, in either direction of time.

mod config;
mod search;


pub use config::SearchConfig;
pub use search::{Planner, SearchError, SearchRequest, SearchResult, lower_bounds};
