//! Everything a traversal may read besides the state itself.

use std::sync::Arc;

use crate::calendar::{CalendarError, ServiceDays};
use crate::graph::Graph;
use crate::transfer::TransferTable;

use super::cost::CostModel;
use super::request::RoutingRequest;

/// Read-only context for one search.
///
/// Holds a snapshot of the graph taken when the search started, so updates
/// published while the search runs are not seen by it.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    graph: Arc<Graph>,
    request: RoutingRequest,
    service_days: Arc<ServiceDays>,
}

impl RoutingContext {
    /// Build a context whose service-day window surrounds `reference_time`.
    pub fn new(
        graph: Arc<Graph>,
        request: RoutingRequest,
        reference_time: i64,
    ) -> Result<Self, CalendarError> {
        let service_days = graph.calendar().service_days(reference_time)?;
        Ok(Self::with_service_days(graph, request, service_days))
    }

    /// Build a context with an explicit service-day window.
    pub fn with_service_days(
        graph: Arc<Graph>,
        request: RoutingRequest,
        service_days: Arc<ServiceDays>,
    ) -> Self {
        Self {
            graph,
            request,
            service_days,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn request(&self) -> &RoutingRequest {
        &self.request
    }

    pub fn arrive_by(&self) -> bool {
        self.request.arrive_by
    }

    pub fn service_days(&self) -> &ServiceDays {
        &self.service_days
    }

    pub fn transfers(&self) -> &TransferTable {
        self.graph.transfers()
    }

    pub fn cost(&self) -> CostModel<'_> {
        CostModel::new(&self.request)
    }
}
