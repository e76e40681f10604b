//! The routing graph: vertices, edges and their traversal rules.
//!
//! Frequency-based transit patterns expand into per-stop arrive/depart
//! vertices joined by board, hop, dwell and alight edges. Street edges
//! and timed transfers connect stops to each other and to the street
//! network.

mod edge;
mod error;
mod model;
mod network;
mod street;
mod transit;


pub use edge::{Edge, EdgeId, EdgeKind, EdgeRef, GraphEdge};
pub use error::{GraphError, Rejected, TraverseResult};
pub use model::{Graph, GraphBuilder, Vertex, VertexId, VertexKind};
pub use network::{
    CalendarDescription, FrequencyDescription, NetworkDescription, PatternDescription,
    PatternStopDescription, StopDescription, StreetDescription, StreetVertexDescription,
    TimedTransferDescription, TransferDescription,
};
pub use street::{StreetEdge, TimedTransfer};
pub use transit::{FrequencyAlight, FrequencyBoard, FrequencyDwell, FrequencyHop};
