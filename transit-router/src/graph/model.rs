//! Graph storage, vertices and the builder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use geo::{Closest, ClosestPoint, Distance, Haversine, Line, Point};

use crate::calendar::ServiceCalendar;
use crate::domain::{EnvironmentalFactor, StopId, TraverseModeSet};
use crate::pattern::FrequencyPattern;
use crate::transfer::TransferTable;

use super::edge::{Edge, EdgeId, GraphEdge};
use super::error::GraphError;
use super::street::{StreetEdge, TimedTransfer};
use super::transit::{FrequencyAlight, FrequencyBoard, FrequencyDwell, FrequencyHop};

/// Index of a vertex in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What a vertex stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexKind {
    /// Street intersection or endpoint.
    Street,

    /// Transit stop, where paths get on and off vehicles.
    Stop(StopId),

    /// On board a pattern's vehicle as it reaches a stop.
    PatternArrive { pattern: usize, stop_index: usize },

    /// On board a pattern's vehicle as it leaves a stop.
    PatternDepart { pattern: usize, stop_index: usize },
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub label: String,
    pub kind: VertexKind,
    /// Longitude / latitude.
    pub point: Point<f64>,
}

#[derive(Debug)]
struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<GraphEdge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    by_label: HashMap<String, VertexId>,
    stops: HashMap<StopId, VertexId>,
    patterns: Vec<Arc<FrequencyPattern>>,
}

/// The routing graph.
///
/// Topology, calendar and transfers are shared behind `Arc`s, so cloning a
/// graph to apply an update copies only what the update touches.
#[derive(Debug, Clone)]
pub struct Graph {
    topology: Arc<Topology>,
    calendar: ServiceCalendar,
    transfers: Arc<TransferTable>,
    conditions: Arc<HashMap<EdgeId, Vec<EnvironmentalFactor>>>,
}

impl Graph {
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.topology.vertices.get(id.0 as usize)
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertices.len()
    }

    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.topology.by_label.get(label).copied()
    }

    pub fn stop_vertex(&self, stop: &StopId) -> Option<VertexId> {
        self.topology.stops.get(stop).copied()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.topology.edges.get(id.0 as usize)
    }

    pub fn edge_count(&self) -> usize {
        self.topology.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.topology.edges.iter()
    }

    pub fn outgoing(&self, vertex: VertexId) -> impl Iterator<Item = &GraphEdge> {
        self.adjacent(&self.topology.outgoing, vertex)
    }

    pub fn incoming(&self, vertex: VertexId) -> impl Iterator<Item = &GraphEdge> {
        self.adjacent(&self.topology.incoming, vertex)
    }

    /// Edges a search in the given direction may take from `vertex`.
    pub fn edges_from(&self, vertex: VertexId, arrive_by: bool) -> impl Iterator<Item = &GraphEdge> {
        let lists = if arrive_by {
            &self.topology.incoming
        } else {
            &self.topology.outgoing
        };
        self.adjacent(lists, vertex)
    }

    fn adjacent<'a>(
        &'a self,
        lists: &'a [Vec<EdgeId>],
        vertex: VertexId,
    ) -> impl Iterator<Item = &'a GraphEdge> {
        lists
            .get(vertex.0 as usize)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edge(*id))
    }

    pub fn patterns(&self) -> &[Arc<FrequencyPattern>] {
        &self.topology.patterns
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    pub fn set_calendar(&mut self, calendar: ServiceCalendar) {
        self.calendar = calendar;
    }

    pub fn transfers(&self) -> &TransferTable {
        &self.transfers
    }

    pub fn set_transfers(&mut self, transfers: TransferTable) {
        self.transfers = Arc::new(transfers);
    }

    /// Environmental factors currently attached to an edge.
    pub fn conditions(&self, edge: EdgeId) -> &[EnvironmentalFactor] {
        self.conditions.get(&edge).map_or(&[], Vec::as_slice)
    }

    pub fn set_conditions(&mut self, edge: EdgeId, factors: Vec<EnvironmentalFactor>) {
        Arc::make_mut(&mut self.conditions).insert(edge, factors);
    }

    /// Number of edges with environmental factors attached.
    pub fn conditioned_edge_count(&self) -> usize {
        self.conditions.len()
    }

    /// Street edges passing within `radius_m` metres of `point`.
    pub fn street_edges_near(&self, point: Point<f64>, radius_m: f64) -> Vec<EdgeId> {
        self.edges()
            .filter(|e| matches!(e.edge(), Edge::Street(_)))
            .filter_map(|e| {
                let from = self.vertex(e.from())?.point;
                let to = self.vertex(e.to())?.point;
                let nearest = match Line::new(from, to).closest_point(&point) {
                    Closest::Intersection(p) | Closest::SinglePoint(p) => p,
                    Closest::Indeterminate => from,
                };
                (Haversine.distance(nearest, point) <= radius_m).then_some(e.id())
            })
            .collect()
    }
}

/// Assembles a [`Graph`].
#[derive(Debug)]
pub struct GraphBuilder {
    vertices: Vec<Vertex>,
    edges: Vec<GraphEdge>,
    by_label: HashMap<String, VertexId>,
    stops: HashMap<StopId, VertexId>,
    patterns: Vec<Arc<FrequencyPattern>>,
    calendar: ServiceCalendar,
    transfers: TransferTable,
}

impl GraphBuilder {
    pub fn new(calendar: ServiceCalendar) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            by_label: HashMap::new(),
            stops: HashMap::new(),
            patterns: Vec::new(),
            calendar,
            transfers: TransferTable::new(),
        }
    }

    fn push_vertex(
        &mut self,
        label: String,
        kind: VertexKind,
        point: Point<f64>,
    ) -> Result<VertexId, GraphError> {
        if self.by_label.contains_key(&label) {
            return Err(GraphError::Invalid(format!("duplicate vertex label {label}")));
        }
        let id = VertexId(self.vertices.len() as u32);
        self.by_label.insert(label.clone(), id);
        self.vertices.push(Vertex {
            id,
            label,
            kind,
            point,
        });
        Ok(id)
    }

    fn push_edge(&mut self, from: VertexId, to: VertexId, edge: Edge) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(GraphEdge::new(id, from, to, edge));
        id
    }

    fn vertex_point(&self, id: VertexId) -> Result<Point<f64>, GraphError> {
        self.vertices
            .get(id.0 as usize)
            .map(|v| v.point)
            .ok_or_else(|| GraphError::UnknownVertex(id.to_string()))
    }

    fn stop_vertex(&self, stop: &StopId) -> Result<VertexId, GraphError> {
        self.stops
            .get(stop)
            .copied()
            .ok_or_else(|| GraphError::UnknownStop(stop.to_string()))
    }

    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.by_label.get(label).copied()
    }

    /// Add a street intersection at longitude `x`, latitude `y`.
    pub fn add_street_vertex(
        &mut self,
        label: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Result<VertexId, GraphError> {
        self.push_vertex(label.into(), VertexKind::Street, Point::new(x, y))
    }

    /// Add a transit stop at longitude `x`, latitude `y`. The stop id doubles
    /// as the vertex label.
    pub fn add_stop(&mut self, stop: StopId, x: f64, y: f64) -> Result<VertexId, GraphError> {
        if self.stops.contains_key(&stop) {
            return Err(GraphError::DuplicateStop(stop));
        }
        let kind = VertexKind::Stop(stop.clone());
        let id = self.push_vertex(stop.to_string(), kind, Point::new(x, y))?;
        self.stops.insert(stop, id);
        Ok(id)
    }

    /// Record that a stop belongs to a parent station, for transfer lookups.
    pub fn set_parent_station(&mut self, stop: StopId, parent: StopId) {
        self.transfers.set_parent(stop, parent);
    }

    /// Add a street between two vertices. Without an explicit length the
    /// great-circle distance is used. Returns one edge, or two when
    /// `bidirectional`.
    pub fn add_street(
        &mut self,
        from: VertexId,
        to: VertexId,
        name: &str,
        length_m: Option<f64>,
        permission: TraverseModeSet,
        bidirectional: bool,
    ) -> Result<Vec<EdgeId>, GraphError> {
        let length_m = match length_m {
            Some(length) if length >= 0.0 => length,
            Some(length) => {
                return Err(GraphError::Invalid(format!("negative street length {length}")));
            }
            None => Haversine.distance(self.vertex_point(from)?, self.vertex_point(to)?),
        };
        let street = StreetEdge::new(name, length_m, permission);
        let mut ids = vec![self.push_edge(from, to, Edge::Street(street.clone()))];
        if bidirectional {
            ids.push(self.push_edge(to, from, Edge::Street(street)));
        }
        Ok(ids)
    }

    /// Link two stops with a timed-transfer edge.
    pub fn add_timed_transfer(&mut self, from: &StopId, to: &StopId) -> Result<EdgeId, GraphError> {
        let from = self.stop_vertex(from)?;
        let to = self.stop_vertex(to)?;
        Ok(self.push_edge(from, to, Edge::TimedTransfer(TimedTransfer)))
    }

    /// Add a frequency pattern with its on-board vertices and board, alight,
    /// hop and dwell edges. Every stop of the pattern must already exist.
    pub fn add_pattern(&mut self, pattern: FrequencyPattern) -> Result<usize, GraphError> {
        let stop_vertices = pattern
            .stops()
            .iter()
            .map(|s| self.stop_vertex(&s.stop))
            .collect::<Result<Vec<_>, _>>()?;

        let index = self.patterns.len();
        let pattern = Arc::new(pattern);
        let last = stop_vertices.len() - 1;
        let trip = pattern.trip().id.clone();

        let mut arrive = Vec::with_capacity(stop_vertices.len());
        let mut depart = Vec::with_capacity(stop_vertices.len());
        for (stop_index, stop_vertex) in stop_vertices.iter().enumerate() {
            let point = self.vertex_point(*stop_vertex)?;
            arrive.push(self.push_vertex(
                format!("{trip}:{stop_index}:arrive"),
                VertexKind::PatternArrive {
                    pattern: index,
                    stop_index,
                },
                point,
            )?);
            depart.push(self.push_vertex(
                format!("{trip}:{stop_index}:depart"),
                VertexKind::PatternDepart {
                    pattern: index,
                    stop_index,
                },
                point,
            )?);
        }

        for (stop_index, stop_vertex) in stop_vertices.iter().copied().enumerate() {
            if stop_index < last {
                self.push_edge(
                    stop_vertex,
                    depart[stop_index],
                    Edge::FrequencyBoard(FrequencyBoard::new(Arc::clone(&pattern), stop_index)),
                );
                self.push_edge(
                    depart[stop_index],
                    arrive[stop_index + 1],
                    Edge::FrequencyHop(FrequencyHop::new(
                        Arc::clone(&pattern),
                        stop_index,
                        stop_index + 1,
                    )),
                );
            }
            if stop_index > 0 {
                self.push_edge(
                    arrive[stop_index],
                    stop_vertex,
                    Edge::FrequencyAlight(FrequencyAlight::new(Arc::clone(&pattern), stop_index)),
                );
            }
            if stop_index > 0 && stop_index < last {
                self.push_edge(
                    arrive[stop_index],
                    depart[stop_index],
                    Edge::FrequencyDwell(FrequencyDwell::new(Arc::clone(&pattern), stop_index)),
                );
            }
        }

        self.patterns.push(pattern);
        Ok(index)
    }

    pub fn transfers_mut(&mut self) -> &mut TransferTable {
        &mut self.transfers
    }

    pub fn build(self) -> Graph {
        let n = self.vertices.len();
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        for edge in &self.edges {
            outgoing[edge.from().0 as usize].push(edge.id());
            incoming[edge.to().0 as usize].push(edge.id());
        }
        Graph {
            topology: Arc::new(Topology {
                vertices: self.vertices,
                edges: self.edges,
                outgoing,
                incoming,
                by_label: self.by_label,
                stops: self.stops,
                patterns: self.patterns,
            }),
            calendar: self.calendar,
            transfers: Arc::new(self.transfers),
            conditions: Arc::new(HashMap::new()),
        }
    }
}
