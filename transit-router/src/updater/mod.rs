//! Live graph updates.
//!
//! A single writer task owns the graph. Updaters queue closures on it through
//! a [`WriterHandle`]; every finished job publishes a new immutable snapshot
//! that searches pick up.

mod config;
pub mod environmental;
mod error;
mod manager;
mod polling;

pub use config::{ConfiguredUpdater, UpdaterConfig};
pub use environmental::{
    AirStation, EnvironmentalDataSource, EnvironmentalStation, EnvironmentalUpdater, EnvironmentalWriter,
    MadridNoiseDataSource, NoiseStation, OpenAqDataSource, ParameterAir, ParameterNoise, StationMeasurement,
};
pub use error::{ConfigError, SourceError, UpdaterError};
pub use manager::{GraphUpdaterManager, GraphWriter, WriterHandle};
pub use polling::{PollingGraphUpdater, PollingUpdater};
