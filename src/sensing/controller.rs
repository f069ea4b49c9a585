use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::locations::LocationRegistry;
use crate::session::{MonitorState, SessionStore};

use super::loop_worker::{monitor_loop, EndOutcome, LoopTiming, MonitorCommand};
use super::network::NetworkSensor;

const COMMAND_QUEUE_DEPTH: usize = 16;

/// Owns the monitor task: starts it once and stops it on shutdown.
pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    state: Arc<RwLock<MonitorState>>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            state: Arc::new(RwLock::new(MonitorState::new())),
        }
    }

    /// Spawn the monitor loop and return a handle for the query surface.
    pub fn start_monitoring<N, S>(
        &mut self,
        sensor: N,
        store: S,
        registry: Arc<LocationRegistry>,
        timing: LoopTiming,
    ) -> Result<MonitorHandle>
    where
        N: NetworkSensor,
        S: SessionStore,
    {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        let handle = tokio::spawn(monitor_loop(
            sensor,
            store,
            self.state.clone(),
            registry,
            command_rx,
            timing,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);

        Ok(MonitorHandle {
            state: self.state.clone(),
            commands: command_tx,
        })
    }

    /// Cancel the loop and wait for it to save any running session.
    pub async fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            info!("Stopping monitor loop");
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}

/// Read access to the monitor state plus the end-session command.
#[derive(Clone)]
pub struct MonitorHandle {
    state: Arc<RwLock<MonitorState>>,
    commands: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Point-in-time copy; holds the read lock only for the clone.
    pub async fn snapshot(&self) -> MonitorState {
        self.state.read().await.clone()
    }

    pub async fn end_session(&self) -> Result<EndOutcome, MonitorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(MonitorCommand::EndSession { reply })
            .await
            .map_err(|_| MonitorError::NotRunning)?;

        reply_rx.await.map_err(|_| MonitorError::NotRunning)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::loop_worker::test_support::{RecordingStore, ScriptedSensor};
    use crate::models::{LocationInput, NetworkSpec};
    use tokio::time::{self, Duration};

    fn registry(dir: &tempfile::TempDir) -> Arc<LocationRegistry> {
        let registry = LocationRegistry::load_from_disk(dir.path().join("locations.json"));
        registry
            .replace_all(vec![LocationInput {
                name: "home".into(),
                networks: NetworkSpec::One("A".into()),
            }])
            .expect("locations");
        Arc::new(registry)
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_to_start_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = MonitorController::new();
        controller
            .start_monitoring(
                ScriptedSensor::new([Ok(None)]),
                RecordingStore::default(),
                registry(&dir),
                LoopTiming::default(),
            )
            .expect("first start");

        let second = controller.start_monitoring(
            ScriptedSensor::new([Ok(None)]),
            RecordingStore::default(),
            registry(&dir),
            LoopTiming::default(),
        );

        assert!(second.is_err());
        controller.stop_monitoring().await.unwrap();
        assert!(controller.handle.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_saves_running_session_and_disconnects_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        let mut controller = MonitorController::new();
        let handle = controller
            .start_monitoring(
                ScriptedSensor::new([Ok(Some("A".into()))]),
                store.clone(),
                registry(&dir),
                LoopTiming::default(),
            )
            .expect("start");

        time::sleep(Duration::from_secs(1)).await;
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.current_network.as_deref(), Some("A"));
        assert!(snapshot.active_session.is_some());

        controller.stop_monitoring().await.unwrap();

        assert_eq!(store.sessions().len(), 1);
        assert!(handle.snapshot().await.active_session.is_none());
        assert_eq!(handle.end_session().await, Err(MonitorError::NotRunning));
    }

    #[tokio::test]
    async fn stop_without_start_is_fine() {
        let mut controller = MonitorController::new();
        controller.stop_monitoring().await.unwrap();
    }
}
