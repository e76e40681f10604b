//! Periodic updaters.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::UpdaterError;
use super::manager::WriterHandle;

/// One polling step of an updater: fetch new data and queue graph writes.
pub trait PollingGraphUpdater: Send + 'static {
    fn name(&self) -> &str;

    fn run_polling(
        &mut self,
        writer: &WriterHandle,
    ) -> impl Future<Output = Result<(), UpdaterError>> + Send;
}

/// Runs a [`PollingGraphUpdater`] every `frequency_sec` seconds. A frequency
/// of zero or less runs it once.
#[derive(Debug)]
pub struct PollingUpdater<U> {
    updater: U,
    frequency_sec: i64,
}

impl<U: PollingGraphUpdater> PollingUpdater<U> {
    pub fn new(updater: U, frequency_sec: i64) -> Self {
        Self {
            updater,
            frequency_sec,
        }
    }

    pub fn name(&self) -> &str {
        self.updater.name()
    }

    pub fn frequency_sec(&self) -> i64 {
        self.frequency_sec
    }

    /// Poll until the writer shuts down. Source failures are logged and the
    /// next tick tries again.
    pub async fn run(mut self, writer: WriterHandle) -> U {
        let Ok(seconds) = u64::try_from(self.frequency_sec) else {
            self.poll_once(&writer).await;
            return self.updater;
        };
        if seconds == 0 {
            self.poll_once(&writer).await;
            return self.updater;
        }

        let mut interval = tokio::time::interval(Duration::from_secs(seconds));
        loop {
            interval.tick().await;
            if !self.poll_once(&writer).await {
                break;
            }
        }
        self.updater
    }

    /// Returns false once the writer is gone.
    async fn poll_once(&mut self, writer: &WriterHandle) -> bool {
        match self.updater.run_polling(writer).await {
            Ok(()) => true,
            Err(UpdaterError::WriterClosed) => {
                debug!(updater = self.updater.name(), "writer closed, stopping");
                false
            }
            Err(e) => {
                warn!(updater = self.updater.name(), error = %e, "polling failed");
                true
            }
        }
    }

    pub fn spawn(self, writer: WriterHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(writer).await;
        })
    }
}
