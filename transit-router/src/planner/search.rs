//! A* search over the routing graph.
//!
//! States are expanded best-first by weight plus a heuristic. The heuristic
//! is the cheapest sum of edge weight lower bounds from each vertex to the
//! destination, found once per search with a reverse Dijkstra. States riding
//! a vehicle use 0, since the alight bound stands for a boarding they have
//! already paid for.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::calendar::CalendarError;
use crate::domain::{StopId, TripId};
use crate::graph::{Graph, VertexId};
use crate::routing::{RoutingContext, RoutingRequest, State};

use super::config::SearchConfig;

/// Error from a search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Invalid search request
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// No service-day window for the request time
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Search ran out of time before finding a path
    #[error("search timed out")]
    Timeout,
}

/// One origin-destination query.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub from: VertexId,
    pub to: VertexId,

    /// Departure time, or arrival time when `routing.arrive_by` is set
    /// (epoch seconds).
    pub time: i64,

    pub routing: RoutingRequest,
}

impl SearchRequest {
    pub fn new(from: VertexId, to: VertexId, time: i64, routing: RoutingRequest) -> Self {
        Self {
            from,
            to,
            time,
            routing,
        }
    }

    fn validate(&self, graph: &Graph) -> Result<(), SearchError> {
        for vertex in [self.from, self.to] {
            if graph.vertex(vertex).is_none() {
                return Err(SearchError::InvalidRequest(format!("unknown vertex {vertex}")));
            }
        }
        Ok(())
    }

    /// Vertex the search starts from: the destination for arrive-by.
    fn origin(&self) -> VertexId {
        if self.routing.arrive_by { self.to } else { self.from }
    }

    fn target(&self) -> VertexId {
        if self.routing.arrive_by { self.from } else { self.to }
    }
}

/// Result of a search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Paths in search order, cheapest first. Arrive-by paths start at the
    /// destination.
    pub paths: Vec<Vec<Arc<State>>>,

    /// Number of states taken off the queue.
    pub states_explored: usize,
}

impl SearchResult {
    /// Create an empty result.
    pub fn empty() -> Self {
        Self {
            paths: Vec::new(),
            states_explored: 0,
        }
    }
}

/// Queue entry ordered so that `BinaryHeap` pops the lowest priority first.
struct Queued {
    priority: f64,
    seq: u64,
    state: Arc<State>,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Where a state stands: its vertex, the trip it rides, and, once off board
/// after a ride, the trip and stop it left. Board edges apply transfer rules
/// from the last two, so states that differ there are not comparable.
type Place = (VertexId, Option<TripId>, Option<(TripId, StopId)>);

/// Weight, time, boardings and last alighting time of an admitted state.
type Label = (f64, i64, u32, Option<i64>);

/// Non-dominated labels per place.
#[derive(Default)]
struct Dominance {
    seen: HashMap<Place, Vec<Label>>,
}

impl Dominance {
    fn place(state: &State) -> Place {
        let transfer_context = if state.is_on_board() {
            None
        } else {
            state
                .previous_trip()
                .zip(state.previous_stop())
                .map(|(trip, stop)| (trip.id.clone(), stop.clone()))
        };
        (state.vertex(), state.trip_id().cloned(), transfer_context)
    }

    /// Record `state` unless an earlier state at the same place is at least
    /// as good in weight, time, boardings and alighting time.
    fn admit(&mut self, state: &State) -> bool {
        let arrive_by = state.arrive_by();
        let better_time = |a: i64, b: i64| if arrive_by { a >= b } else { a <= b };
        // An earlier alighting (later, searching backward) leaves more slack
        // for a minimum transfer time
        let better_alight = |a: Option<i64>, b: Option<i64>| match (a, b) {
            (Some(a), Some(b)) => better_time(a, b),
            (None, None) => true,
            _ => false,
        };
        let dominates = |a: &Label, b: &Label| {
            a.0 <= b.0 && better_time(a.1, b.1) && a.2 <= b.2 && better_alight(a.3, b.3)
        };

        let alighted = if state.is_on_board() {
            None
        } else {
            state.last_alighted_time()
        };
        let label = (state.weight(), state.time(), state.num_boardings(), alighted);
        let seen = self.seen.entry(Self::place(state)).or_default();
        if seen.iter().any(|other| dominates(other, &label)) {
            return false;
        }
        seen.retain(|other| !dominates(&label, other));
        seen.push(label);
        true
    }
}

/// A* planner.
pub struct Planner<'a> {
    config: &'a SearchConfig,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a SearchConfig) -> Self {
        Self { config }
    }

    /// Find up to `max_results` paths for `request` over `graph`.
    pub fn search(
        &self,
        graph: Arc<Graph>,
        request: &SearchRequest,
    ) -> Result<SearchResult, SearchError> {
        request.validate(&graph)?;
        let started = Instant::now();
        let ctx = RoutingContext::new(graph, request.routing.clone(), request.time)?;
        let graph = ctx.graph();
        let target = request.target();
        let heuristic = lower_bounds(&ctx, target);

        let origin = Arc::new(State::new(request.origin(), request.time, ctx.request()));
        let mut queue = BinaryHeap::new();
        let mut dominance = Dominance::default();
        let mut seq = 0u64;
        dominance.admit(&origin);
        queue.push(Queued {
            priority: heuristic_at(&heuristic, &origin),
            seq,
            state: origin,
        });

        let mut paths = Vec::new();
        let mut states_explored = 0;
        let mut timed_out = false;
        while let Some(Queued { state, .. }) = queue.pop() {
            if states_explored >= self.config.max_states {
                debug!(states_explored, "state limit reached");
                break;
            }
            if started.elapsed() > self.config.timeout() {
                timed_out = true;
                break;
            }
            states_explored += 1;

            if state.vertex() == target && !state.is_on_board() {
                paths.push(state.path());
                if paths.len() >= self.config.max_results {
                    break;
                }
                continue;
            }

            for edge in graph.edges_from(state.vertex(), ctx.arrive_by()) {
                let Ok(child) = edge.traverse(&state, &ctx) else {
                    continue;
                };
                if child.num_boardings() > self.config.max_boardings {
                    continue;
                }
                let h = heuristic_at(&heuristic, &child);
                if !h.is_finite() || !dominance.admit(&child) {
                    continue;
                }
                seq += 1;
                queue.push(Queued {
                    priority: child.weight() + h,
                    seq,
                    state: Arc::new(child),
                });
            }
        }

        debug!(
            states_explored,
            paths = paths.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            arrive_by = ctx.arrive_by(),
            "search finished"
        );
        if timed_out && paths.is_empty() {
            return Err(SearchError::Timeout);
        }
        Ok(SearchResult {
            paths,
            states_explored,
        })
    }
}

fn heuristic_at(bounds: &[f64], state: &State) -> f64 {
    if state.is_on_board() {
        return 0.0;
    }
    bounds
        .get(state.vertex().0 as usize)
        .copied()
        .unwrap_or(f64::INFINITY)
}

/// Cheapest sum of weight lower bounds from every vertex to `target`, in the
/// context's search direction. Unreachable vertices get infinity.
pub fn lower_bounds(ctx: &RoutingContext, target: VertexId) -> Vec<f64> {
    let graph = ctx.graph();
    let arrive_by = ctx.arrive_by();
    let mut bounds = vec![f64::INFINITY; graph.vertex_count()];
    let Some(slot) = bounds.get_mut(target.0 as usize) else {
        return bounds;
    };
    *slot = 0.0;

    let mut queue = BinaryHeap::new();
    queue.push(Reverse(0.0, target));
    while let Some(Reverse(cost, vertex)) = queue.pop() {
        if cost > bounds[vertex.0 as usize] {
            continue;
        }
        // Edges that end at `vertex` in the search direction
        for edge in graph.edges_from(vertex, !arrive_by) {
            let bound = edge.weight_lower_bound(ctx);
            if !bound.is_finite() {
                continue;
            }
            let next = edge.source(arrive_by);
            let candidate = cost + bound;
            if candidate < bounds[next.0 as usize] {
                bounds[next.0 as usize] = candidate;
                queue.push(Reverse(candidate, next));
            }
        }
    }
    bounds
}

/// Min-heap entry for the reverse Dijkstra.
struct Reverse(f64, VertexId);

impl PartialEq for Reverse {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Reverse {}

impl PartialOrd for Reverse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reverse {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0).then_with(|| other.1.cmp(&self.1))
    }
}
