use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{MonitorError, SensorError};
use crate::locations::LocationRegistry;
use crate::models::Session;
use crate::session::{MonitorState, SessionStore};

use super::network::NetworkSensor;

// Set to false to silence this module's logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const POLL_INTERVAL_SECS: u64 = 5;
const ERROR_BACKOFF_SECS: u64 = 10;
const SENSOR_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Wait after a successful lookup.
    pub poll_interval: Duration,
    /// Wait after a failed lookup.
    pub error_backoff: Duration,
    pub sensor_timeout: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            error_backoff: Duration::from_secs(ERROR_BACKOFF_SECS),
            sensor_timeout: Duration::from_secs(SENSOR_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    Ended(Session),
    NoActiveSession,
}

pub enum MonitorCommand {
    EndSession {
        reply: oneshot::Sender<Result<EndOutcome, MonitorError>>,
    },
}

/// Poll the sensor until cancelled.
///
/// This task is the only writer of `state`. Readers take short read locks to
/// copy a snapshot; external commands arrive over `commands` and are applied
/// between samples, or while a lookup is still in flight.
pub async fn monitor_loop<N, S>(
    sensor: N,
    store: S,
    state: Arc<RwLock<MonitorState>>,
    registry: Arc<LocationRegistry>,
    mut commands: mpsc::Receiver<MonitorCommand>,
    timing: LoopTiming,
    cancel_token: CancellationToken,
) where
    N: NetworkSensor,
    S: SessionStore,
{
    log_info!(
        "monitor loop started (poll every {:?}, backoff {:?})",
        timing.poll_interval,
        timing.error_backoff
    );

    loop {
        let lookup = sample_network(&sensor, timing.sensor_timeout);
        tokio::pin!(lookup);

        let sampled = loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break None,
                Some(command) = commands.recv() => handle_command(command, &store, &state).await,
                result = &mut lookup => break Some(result),
            }
        };
        let Some(sampled) = sampled else {
            break;
        };

        let delay = match sampled {
            Ok(sample) => {
                apply_sample(&store, &state, &registry, sample).await;
                timing.poll_interval
            }
            Err(err) => {
                log_warn!(
                    "network lookup failed, retrying in {:?}: {err}",
                    timing.error_backoff
                );
                timing.error_backoff
            }
        };

        let wake_at = Instant::now() + delay;
        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break true,
                Some(command) = commands.recv() => handle_command(command, &store, &state).await,
                _ = time::sleep_until(wake_at) => break false,
            }
        };

        if cancelled {
            break;
        }
    }

    finish_on_shutdown(&store, &state).await;
    log_info!("monitor loop shutting down");
}

async fn sample_network<N: NetworkSensor>(
    sensor: &N,
    timeout: Duration,
) -> Result<Option<String>, SensorError> {
    match time::timeout(timeout, sensor.sense()).await {
        Ok(result) => result,
        Err(_) => Err(SensorError::Timeout(timeout)),
    }
}

async fn apply_sample<S: SessionStore>(
    store: &S,
    state: &RwLock<MonitorState>,
    registry: &LocationRegistry,
    sample: Option<String>,
) {
    let previous = state.read().await.current_network.clone();
    if previous == sample {
        return;
    }

    log_info!("network changed: {:?} -> {:?}", previous, sample);

    let locations = registry.list();
    let transition = state.write().await.observe(sample, &locations, now());

    if let Some(session) = transition.ended {
        // A lost write is logged inside; the loop carries on regardless.
        let _ = persist_session(store, &session).await;
    }

    match transition.started {
        Some(active) => {
            log_info!(
                "started session at {} on {}",
                active.location.name,
                active.network
            );
        }
        None => {
            log_debug!("no location matches the current network");
        }
    }
}

async fn handle_command<S: SessionStore>(
    command: MonitorCommand,
    store: &S,
    state: &RwLock<MonitorState>,
) {
    match command {
        MonitorCommand::EndSession { reply } => {
            let ended = state.write().await.end_session(now());
            let outcome = match ended {
                Some(session) => {
                    log_info!("session at {} ended on request", session.location);
                    persist_session(store, &session)
                        .await
                        .map(|()| EndOutcome::Ended(session))
                }
                None => Ok(EndOutcome::NoActiveSession),
            };

            if reply.send(outcome).is_err() {
                log_warn!("end-session caller went away before the reply");
            }
        }
    }
}

async fn finish_on_shutdown<S: SessionStore>(store: &S, state: &RwLock<MonitorState>) {
    let ended = state.write().await.end_session(now());
    if let Some(session) = ended {
        log_info!("saving session at {} before shutdown", session.location);
        let _ = persist_session(store, &session).await;
    }
}

/// Wall-clock time at the precision the session log stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Write a finished session. Failures are not retried; the session is lost.
async fn persist_session<S: SessionStore>(
    store: &S,
    session: &Session,
) -> Result<(), MonitorError> {
    match store.record_session(session).await {
        Ok(()) => {
            log_info!(
                "saved session {}: {}s at {} (productivity {})",
                session.id,
                session.duration_secs,
                session.location,
                session.productivity
            );
            Ok(())
        }
        Err(err) => {
            log_error!(
                "failed to save session {} at {} ({}s), dropping it: {err:#}",
                session.id,
                session.location,
                session.duration_secs
            );
            Err(MonitorError::Persistence(format!("{err:#}")))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Utc};

    use super::*;

    pub type Step = Result<Option<String>, ()>;

    /// Plays back a script of samples, then repeats the last one.
    #[derive(Clone, Default)]
    pub struct ScriptedSensor {
        script: Arc<Mutex<VecDeque<Step>>>,
        last: Arc<Mutex<Option<Step>>>,
        calls: Arc<Mutex<Vec<Instant>>>,
        delay: Duration,
    }

    impl ScriptedSensor {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                script: Arc::new(Mutex::new(steps.into_iter().collect())),
                ..Self::default()
            }
        }

        /// Every lookup takes `delay` before answering.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NetworkSensor for ScriptedSensor {
        async fn sense(&self) -> Result<Option<String>, SensorError> {
            self.calls.lock().unwrap().push(Instant::now());
            let step = {
                let mut script = self.script.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(next) = script.pop_front() {
                    *last = Some(next.clone());
                }
                last.clone().unwrap_or(Ok(None))
            };
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            step.map_err(|()| SensorError::Unsupported("scripted failure".into()))
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingStore {
        sessions: Arc<Mutex<Vec<Session>>>,
        fail: bool,
    }

    impl RecordingStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sessions(&self) -> Vec<Session> {
            self.sessions.lock().unwrap().clone()
        }
    }

    impl SessionStore for RecordingStore {
        async fn record_session(&self, session: &Session) -> Result<()> {
            if self.fail {
                return Err(anyhow!("disk full"));
            }
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }

        async fn sessions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>> {
            let mut sessions: Vec<_> = self
                .sessions()
                .into_iter()
                .filter(|s| s.start_time > cutoff)
                .collect();
            sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
            Ok(sessions)
        }
    }
}
