//! Serialised graph writes and snapshot publication.
//!
//! Every change to the live graph goes through one writer task. A job gets a
//! private copy of the current graph (cheap: the graph shares its parts
//! behind `Arc`s), mutates it, and the result is published as the next
//! snapshot. Searches hold an `Arc<Graph>` snapshot and never see a write
//! in progress.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::graph::Graph;

use super::config::UpdaterConfig;
use super::error::{ConfigError, UpdaterError};

/// Queue depth before `execute` waits for the writer.
const QUEUE_CAPACITY: usize = 64;

/// A graph mutation run by the writer task.
pub type GraphWriter = Box<dyn FnOnce(&mut Graph) + Send>;

struct Job {
    writer: GraphWriter,
    done: Option<oneshot::Sender<()>>,
}

enum Message {
    Job(Job),
    /// Refuse further jobs and stop once the queue is drained.
    Stop,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Job(_) => f.write_str("Job"),
            Message::Stop => f.write_str("Stop"),
        }
    }
}

/// Cloneable handle for queueing writes.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    sender: mpsc::Sender<Message>,
}

impl WriterHandle {
    /// Queue `writer`; returns once it is queued.
    pub async fn execute(
        &self,
        writer: impl FnOnce(&mut Graph) + Send + 'static,
    ) -> Result<(), UpdaterError> {
        self.sender
            .send(Message::Job(Job {
                writer: Box::new(writer),
                done: None,
            }))
            .await
            .map_err(|_| UpdaterError::WriterClosed)
    }

    /// Queue `writer` and wait until its result is published.
    pub async fn execute_and_wait(
        &self,
        writer: impl FnOnce(&mut Graph) + Send + 'static,
    ) -> Result<(), UpdaterError> {
        let (done, finished) = oneshot::channel();
        self.sender
            .send(Message::Job(Job {
                writer: Box::new(writer),
                done: Some(done),
            }))
            .await
            .map_err(|_| UpdaterError::WriterClosed)?;
        finished.await.map_err(|_| UpdaterError::JobDropped)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Owns the writer task and the polling updaters feeding it.
#[derive(Debug)]
pub struct GraphUpdaterManager {
    handle: WriterHandle,
    snapshots: watch::Receiver<Arc<Graph>>,
    writer: JoinHandle<()>,
    updaters: Vec<JoinHandle<()>>,
}

impl GraphUpdaterManager {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn new(graph: Graph) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let (publish, snapshots) = watch::channel(Arc::new(graph));
        let writer = tokio::spawn(run_writer(receiver, publish));
        Self {
            handle: WriterHandle { sender },
            snapshots,
            writer,
            updaters: Vec::new(),
        }
    }

    /// The latest published graph.
    pub fn graph(&self) -> Arc<Graph> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Receiver that is notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Graph>> {
        self.snapshots.clone()
    }

    pub fn handle(&self) -> WriterHandle {
        self.handle.clone()
    }

    pub async fn execute(
        &self,
        writer: impl FnOnce(&mut Graph) + Send + 'static,
    ) -> Result<(), UpdaterError> {
        self.handle.execute(writer).await
    }

    pub async fn execute_and_wait(
        &self,
        writer: impl FnOnce(&mut Graph) + Send + 'static,
    ) -> Result<(), UpdaterError> {
        self.handle.execute_and_wait(writer).await
    }

    /// Track a spawned updater so shutdown can stop it.
    pub fn add_updater(&mut self, updater: JoinHandle<()>) {
        self.updaters.push(updater);
    }

    pub fn updater_count(&self) -> usize {
        self.updaters.len()
    }

    /// Build and start one updater per configuration entry.
    pub fn start_updaters(&mut self, configs: &[UpdaterConfig]) -> Result<(), ConfigError> {
        for config in configs {
            let updater = config.build()?;
            info!(
                name = updater.name(),
                frequency_sec = updater.frequency_sec(),
                "creating environmental updater"
            );
            let task = updater.spawn(self.handle());
            self.add_updater(task);
        }
        Ok(())
    }

    /// Stop the updaters, let the writer drain its queue, and wait for all
    /// tasks.
    pub async fn shutdown(self) {
        for updater in &self.updaters {
            updater.abort();
        }
        if self.handle.sender.send(Message::Stop).await.is_err() {
            debug!("graph writer already stopped");
        }
        let updaters = join_all(self.updaters).await;
        let stopped = updaters.iter().filter(|r| r.is_err()).count();
        debug!(stopped, "updaters stopped");
        if let Err(e) = self.writer.await {
            error!(error = %e, "graph writer task failed");
        }
    }
}

async fn run_writer(mut receiver: mpsc::Receiver<Message>, publish: watch::Sender<Arc<Graph>>) {
    while let Some(message) = receiver.recv().await {
        let job = match message {
            Message::Job(job) => job,
            Message::Stop => {
                receiver.close();
                continue;
            }
        };
        let mut graph = Graph::clone(&publish.borrow());
        let writer = job.writer;
        match catch_unwind(AssertUnwindSafe(|| writer(&mut graph))) {
            Ok(()) => {
                publish.send_replace(Arc::new(graph));
            }
            Err(_) => error!("graph writer job panicked; snapshot unchanged"),
        }
        if let Some(done) = job.done {
            let _ = done.send(());
        }
    }
    debug!("graph writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ServiceCalendar;
    use crate::domain::{EnvironmentalFactor, EnvironmentalFactorType, TraverseModeSet};
    use crate::graph::{EdgeId, GraphBuilder};

    fn graph() -> Graph {
        let mut builder = GraphBuilder::new(ServiceCalendar::new(chrono_tz::UTC));
        let a = builder.add_street_vertex("a", 0.0, 0.0).unwrap();
        let b = builder.add_street_vertex("b", 0.001, 0.0).unwrap();
        builder
            .add_street(a, b, "Main", None, TraverseModeSet::walk_and_transit(), false)
            .unwrap();
        builder.build()
    }

    fn noise(level: f64) -> Vec<EnvironmentalFactor> {
        EnvironmentalFactor::combine(EnvironmentalFactorType::Noise, &[level])
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn execute_and_wait_publishes() {
        let manager = GraphUpdaterManager::new(graph());
        let before = manager.graph();

        manager
            .execute_and_wait(|g| g.set_conditions(EdgeId(0), noise(60.0)))
            .await
            .unwrap();

        let after = manager.graph();
        assert_eq!(after.conditions(EdgeId(0)).len(), 1);
        // Earlier snapshots are untouched
        assert!(before.conditions(EdgeId(0)).is_empty());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn jobs_run_in_order() {
        let manager = GraphUpdaterManager::new(graph());
        let mut snapshots = manager.subscribe();

        manager
            .execute(|g| g.set_conditions(EdgeId(0), noise(50.0)))
            .await
            .unwrap();
        manager
            .execute(|g| g.set_conditions(EdgeId(0), noise(70.0)))
            .await
            .unwrap();
        manager.execute_and_wait(|_| {}).await.unwrap();

        assert!(snapshots.has_changed().unwrap());
        let latest = snapshots.borrow_and_update().clone();
        assert_eq!(latest.conditions(EdgeId(0))[0].peak, 70.0);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn panicking_job_keeps_snapshot() {
        let manager = GraphUpdaterManager::new(graph());
        manager
            .execute_and_wait(|g| g.set_conditions(EdgeId(0), noise(55.0)))
            .await
            .unwrap();

        manager
            .execute_and_wait(|_| panic!("bad writer"))
            .await
            .unwrap();

        assert_eq!(manager.graph().conditions(EdgeId(0))[0].peak, 55.0);
        // The writer survives
        manager.execute_and_wait(|_| {}).await.unwrap();
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn closed_writer_rejects_jobs() {
        let manager = GraphUpdaterManager::new(graph());
        let handle = manager.handle();
        manager.shutdown().await;

        assert!(handle.is_closed());
        let err = handle.execute(|_| {}).await.unwrap_err();
        assert!(matches!(err, UpdaterError::WriterClosed));
    }

    #[tokio::test]
    async fn start_updaters_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let feed = dir.path().join("latest.json");
        std::fs::write(&feed, r#"{"results": []}"#).unwrap();

        let mut manager = GraphUpdaterManager::new(graph());
        let configs = UpdaterConfig::from_json(&format!(
            r#"[{{"type": "environmental-updater", "sourceType": "openaq", "url": "{}"}},
                {{"type": "environmental-updater", "sourceType": "medio-ambiente-madrid",
                  "urlStationsPosition": "{}", "urlStationsData": "{}"}}]"#,
            feed.display(),
            dir.path().join("estaciones.csv").display(),
            dir.path().join("ruido.txt").display()
        ))
        .unwrap();
        manager.start_updaters(&configs).unwrap();
        assert_eq!(manager.updater_count(), 2);

        let bad = UpdaterConfig::from_json(r#"[{"type": "bike-rental"}]"#).unwrap();
        let err = manager.start_updaters(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType(_)));
        assert_eq!(manager.updater_count(), 2);
        manager.shutdown().await;
    }
}
