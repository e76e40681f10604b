use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transit_router::domain::StopId;
use transit_router::graph::{Graph, NetworkDescription, VertexId};
use transit_router::planner::{Planner, SearchConfig, SearchRequest};
use transit_router::routing::{RoutingRequest, State};
use transit_router::updater::{GraphUpdaterManager, UpdaterConfig};

const USAGE: &str = "usage: transit-router <from> <to> <rfc3339-time> [--arrive-by]";

struct Args {
    from: String,
    to: String,
    time: i64,
    arrive_by: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut arrive_by = false;
    for arg in std::env::args().skip(1) {
        if arg == "--arrive-by" {
            arrive_by = true;
        } else {
            positional.push(arg);
        }
    }
    let [from, to, time] = <[String; 3]>::try_from(positional).map_err(|_| USAGE.to_string())?;
    let time = DateTime::parse_from_rfc3339(&time)
        .map_err(|e| format!("invalid time '{time}': {e}"))?
        .timestamp();
    Ok(Args {
        from,
        to,
        time,
        arrive_by,
    })
}

/// Resolve a stop id or a street vertex label.
fn resolve(graph: &Graph, name: &str) -> Option<VertexId> {
    StopId::parse(name)
        .ok()
        .and_then(|stop| graph.stop_vertex(&stop))
        .or_else(|| graph.vertex_by_label(name))
}

fn print_path(graph: &Graph, timezone: Tz, index: usize, path: &[Arc<State>]) {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return;
    };
    println!(
        "Itinerary {}: weight {:.0}, {} boarding(s), {} min",
        index + 1,
        last.weight(),
        last.num_boardings(),
        (last.time() - first.time()).abs() / 60
    );
    for state in path {
        let label = graph.vertex(state.vertex()).map_or("?", |v| v.label.as_str());
        let time = DateTime::<Utc>::from_timestamp(state.time(), 0)
            .map(|t| t.with_timezone(&timezone).format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let how = match (state.back_mode(), state.route()) {
            (Some(mode), Some(route)) => format!("{mode} {route}"),
            (Some(mode), None) => mode.to_string(),
            (None, _) => "start".to_string(),
        };
        println!("  {time}  {label:<24} {how}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let Ok(network_path) = std::env::var("NETWORK_PATH") else {
        eprintln!("NETWORK_PATH not set");
        return ExitCode::from(2);
    };
    let graph = match NetworkDescription::load(&network_path).and_then(|n| n.build()) {
        Ok(graph) => graph,
        Err(e) => {
            error!(path = %network_path, error = %e, "failed to build graph");
            return ExitCode::FAILURE;
        }
    };

    let mut manager = GraphUpdaterManager::new(graph);
    if let Ok(updaters_path) = std::env::var("UPDATERS_PATH") {
        let started = UpdaterConfig::load_all(&updaters_path)
            .and_then(|configs| manager.start_updaters(&configs));
        if let Err(e) = started {
            error!(path = %updaters_path, error = %e, "failed to start updaters");
            manager.shutdown().await;
            return ExitCode::FAILURE;
        }
        info!(count = manager.updater_count(), "started updaters");
    }

    let graph = manager.graph();
    let (Some(from), Some(to)) = (resolve(&graph, &args.from), resolve(&graph, &args.to)) else {
        eprintln!("unknown origin or destination");
        manager.shutdown().await;
        return ExitCode::from(2);
    };

    let config = SearchConfig::default();
    let routing = RoutingRequest::new().with_arrive_by(args.arrive_by);
    let request = SearchRequest::new(from, to, args.time, routing);
    let timezone = graph.calendar().timezone();
    let outcome = Planner::new(&config).search(Arc::clone(&graph), &request);

    let code = match outcome {
        Ok(result) if result.paths.is_empty() => {
            println!("No itinerary found ({} states explored)", result.states_explored);
            ExitCode::SUCCESS
        }
        Ok(result) => {
            for (index, path) in result.paths.iter().enumerate() {
                print_path(&graph, timezone, index, path);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("search failed: {e}");
            ExitCode::FAILURE
        }
    };
    manager.shutdown().await;
    code
}
