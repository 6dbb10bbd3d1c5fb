//! Pipeline supervision.
//!
//! One pipeline attempt authenticates, opens a session and streams until the
//! connection ends. Attempt outcomes are fed back to the supervisor as
//! [`PipelineEvent`]s and an abnormal end starts the next attempt right away.
//! Supervision ends on a normal close, on cancellation, or when the first
//! attempt fails to log in or open a session.

use std::sync::Arc;

use async_trait::async_trait;
use sam_auth::Authenticator;
use sam_core::{CookieJar, SessionInfo};
use sam_store::ValueStore;
use sam_telemetry::metrics::{PIPELINE_FAILURES_TOTAL, PIPELINE_RESTARTS_TOTAL};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::connection::{CloseKind, run_connection};
use crate::errors::PipelineError;

/// Credentials for one realtime connection.
#[derive(Clone, Debug)]
pub struct Session {
    /// Engine handshake answer.
    pub info: SessionInfo,
    /// Cookies, the session cookie included.
    pub jar: CookieJar,
}

/// The restartable unit of work.
#[async_trait]
pub trait Pipeline: Send + Sync + 'static {
    /// Authenticate and open a session.
    async fn initialize(&self) -> Result<Session, PipelineError>;

    /// Stream from the controller until the connection ends.
    async fn stream(
        &self,
        session: Session,
        cancel: CancellationToken,
    ) -> Result<CloseKind, PipelineError>;
}

/// The real pipeline: HTTP login, polling handshake, websocket stream.
#[derive(Debug)]
pub struct ControllerPipeline {
    auth: Authenticator,
    store: ValueStore,
}

impl ControllerPipeline {
    /// Pipeline writing into `store`.
    pub fn new(auth: Authenticator, store: ValueStore) -> Self {
        Self { auth, store }
    }
}

#[async_trait]
impl Pipeline for ControllerPipeline {
    async fn initialize(&self) -> Result<Session, PipelineError> {
        let mut jar = self.auth.login().await?;
        let info = self.auth.open_session(&mut jar).await?;
        Ok(Session { info, jar })
    }

    async fn stream(
        &self,
        session: Session,
        cancel: CancellationToken,
    ) -> Result<CloseKind, PipelineError> {
        Ok(run_connection(
            self.auth.endpoint(),
            &session.info,
            &session.jar,
            self.store.clone(),
            cancel,
        )
        .await?)
    }
}

/// Messages driving the supervisor.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Start a new attempt.
    Start,
    /// The attempt's connection ended.
    Terminated(CloseKind),
    /// The attempt failed before or while connecting.
    Failed(PipelineError),
}

/// Why supervision ended.
#[derive(Debug)]
pub enum SupervisorExit {
    /// The controller closed the connection normally.
    Closed,
    /// The cancellation token fired.
    Cancelled,
    /// The first attempt could not log in or open a session.
    Fatal(PipelineError),
}

/// Restarts the pipeline after every abnormal end.
pub struct Supervisor<P> {
    pipeline: Arc<P>,
    attempts: u64,
    restarts: u64,
}

impl<P: Pipeline> Supervisor<P> {
    /// Supervise `pipeline`.
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            attempts: 0,
            restarts: 0,
        }
    }

    /// Number of restarts so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Run attempts until the pipeline ends for good or `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) -> SupervisorExit {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _ = tx.send(PipelineEvent::Start);

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => return SupervisorExit::Cancelled,
                event = rx.recv() => event,
            };
            let Some(event) = event else {
                return SupervisorExit::Cancelled;
            };

            match event {
                PipelineEvent::Start => {
                    self.attempts += 1;
                    let _ = tokio::spawn(attempt(
                        Arc::clone(&self.pipeline),
                        tx.clone(),
                        cancel.child_token(),
                    ));
                }
                PipelineEvent::Terminated(CloseKind::Normal) => {
                    info!("controller closed the connection normally, stopping");
                    return SupervisorExit::Closed;
                }
                PipelineEvent::Terminated(CloseKind::Abnormal(code)) => {
                    self.restart(format_args!("connection closed with code {code}"));
                    let _ = tx.send(PipelineEvent::Start);
                }
                PipelineEvent::Failed(err) if self.attempts == 1 && err.is_fatal() => {
                    error!(error = %err, kind = err.error_kind(), "pipeline failed, stopping");
                    metrics::counter!(PIPELINE_FAILURES_TOTAL, "kind" => err.error_kind()).increment(1);
                    return SupervisorExit::Fatal(err);
                }
                PipelineEvent::Failed(err) => {
                    metrics::counter!(PIPELINE_FAILURES_TOTAL, "kind" => err.error_kind()).increment(1);
                    self.restart(format_args!("{err}"));
                    let _ = tx.send(PipelineEvent::Start);
                }
            }
        }
    }

    fn restart(&mut self, reason: std::fmt::Arguments<'_>) {
        self.restarts += 1;
        metrics::counter!(PIPELINE_RESTARTS_TOTAL).increment(1);
        warn!(restarts = self.restarts, %reason, "restarting pipeline");
    }
}

async fn attempt<P: Pipeline>(
    pipeline: Arc<P>,
    tx: mpsc::UnboundedSender<PipelineEvent>,
    cancel: CancellationToken,
) {
    let outcome = match pipeline.initialize().await {
        Ok(session) => {
            info!(sid = %session.info.sid, "session established");
            pipeline.stream(session, cancel).await
        }
        Err(err) => Err(err),
    };
    let event = match outcome {
        Ok(kind) => PipelineEvent::Terminated(kind),
        Err(err) => PipelineEvent::Failed(err),
    };
    let _ = tx.send(event);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
