//! Domain types shared by the calendar, graph, router and updaters.

mod environment;
mod ids;
mod mode;
mod time;
mod trip;

pub use environment::{
    EnvironmentalFactor, EnvironmentalFactorThreshold, EnvironmentalFactorType,
    FactorMeasurement, parse_thresholds,
};
pub use ids::{InvalidId, RouteId, ServiceId, StopId, TripId};
pub use mode::{TraverseMode, TraverseModeSet};
pub use time::{SECONDS_PER_DAY, ServiceTime, TimeError, parse_service_time};
pub use trip::Trip;
