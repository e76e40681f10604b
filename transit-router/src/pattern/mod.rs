//! Headway-based (frequency) trip patterns.
//!
//! A frequency pattern describes one stop sequence served every `headway`
//! seconds during one or more windows of the service day, rather than by a
//! list of timed trips.

mod frequency;

pub use frequency::{BoardAlightType, FrequencyPattern, HeadwayWindow, PatternError, PatternStop};
