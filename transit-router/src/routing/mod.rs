//! Routing requests, search states and their cost model.

mod context;
mod cost;
mod request;
mod state;

pub use context::RoutingContext;
pub use cost::{BoardingCost, CostModel};
pub use request::RoutingRequest;
pub use state::{BoardAlightNote, State, StateEditor};
