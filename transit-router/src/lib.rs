//! Frequency-based transit router.
//!
//! Builds a routing graph from a network description, searches it with
//! time-dependent A*, and keeps it current with live environmental updates.
//! Boarding and alighting frequency-based trips follow the headway model:
//! vehicles leave every `headway` seconds inside each service window.

pub mod calendar;
pub mod domain;
pub mod graph;
pub mod pattern;
pub mod planner;
pub mod routing;
pub mod transfer;
pub mod updater;
