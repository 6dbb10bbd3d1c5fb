//! Realtime connection driver over `tokio-tungstenite`.
//!
//! Runs one websocket connection to completion: feeds inbound text to the
//! [`Protocol`], carries out its [`Action`]s and fires the keep-alive timers.

use futures::{SinkExt, StreamExt};
use sam_core::clock::now_ms;
use sam_core::{ControllerEndpoint, CookieJar, SessionInfo};
use sam_store::ValueStore;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::TransportError;
use crate::protocol::{Action, Protocol, Timer};

/// Close code of an intentional shutdown.
pub const NORMAL_CLOSE: u16 = 1000;
/// Close code reported for a close frame without a status.
pub const NO_STATUS_CLOSE: u16 = 1005;
/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;

/// How a connection ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseKind {
    /// Expected termination; the pipeline stops.
    Normal,
    /// Unexpected termination with the given close code; the pipeline restarts.
    Abnormal(u16),
}

impl CloseKind {
    /// Classify a close code.
    pub fn from_code(code: u16) -> Self {
        if code == NORMAL_CLOSE {
            Self::Normal
        } else {
            Self::Abnormal(code)
        }
    }
}

#[derive(Default)]
struct Timers {
    heartbeat: Option<Interval>,
    alive: Option<Interval>,
    ping: Option<Interval>,
}

impl Timers {
    fn slot(&mut self, timer: Timer) -> &mut Option<Interval> {
        match timer {
            Timer::Heartbeat => &mut self.heartbeat,
            Timer::Alive => &mut self.alive,
            Timer::Ping => &mut self.ping,
        }
    }

    /// Start `timer`; the first tick is one period from now.
    fn start(&mut self, timer: Timer) {
        let period = timer.period();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *self.slot(timer) = Some(interval);
    }

    fn cancel(&mut self) {
        *self = Self::default();
    }
}

async fn tick(slot: &mut Option<Interval>) {
    match slot {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Open the realtime connection for `session` and run it until it closes
/// or `cancel` fires.
///
/// Returns an error only when the connection cannot be established; once
/// open, every way the connection can end is reported as a [`CloseKind`].
#[tracing::instrument(skip_all, fields(sid = %session.sid))]
pub async fn run_connection(
    endpoint: &ControllerEndpoint,
    session: &SessionInfo,
    jar: &CookieJar,
    store: ValueStore,
    cancel: CancellationToken,
) -> Result<CloseKind, TransportError> {
    let mut protocol = Protocol::new(store);
    protocol.on_connecting();

    let mut request = endpoint
        .websocket_url(&session.sid)
        .into_client_request()
        .map_err(TransportError::Request)?;
    if !jar.is_empty() {
        let _ = request
            .headers_mut()
            .insert(COOKIE, HeaderValue::from_str(&jar.header_value())?);
    }

    let (ws, _) = connect_async(request)
        .await
        .map_err(TransportError::Connect)?;
    info!("realtime connection open");
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut timers = Timers::default();
    let mut outbox = protocol.on_open();

    let kind = 'conn: loop {
        for action in outbox.drain(..) {
            match action {
                Action::Send(text) => {
                    if let Err(error) = ws_tx.send(Message::Text(text.into())).await {
                        warn!(%error, "send failed");
                        break 'conn CloseKind::Abnormal(ABNORMAL_CLOSE);
                    }
                }
                Action::StartTimer(timer) => timers.start(timer),
                Action::CancelTimers => timers.cancel(),
            }
        }

        tokio::select! {
            () = cancel.cancelled() => {
                let frame = CloseFrame { code: CloseCode::Normal, reason: "shutdown".into() };
                let _ = ws_tx.send(Message::Close(Some(frame))).await;
                break CloseKind::Normal;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    outbox = protocol.on_text(text.as_str(), now_ms());
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS_CLOSE, |f| u16::from(f.code));
                    break CloseKind::from_code(code);
                }
                Some(Ok(other)) => debug!(kind = message_kind(&other), "ignoring non-text message"),
                Some(Err(error)) => {
                    warn!(%error, "realtime connection failed");
                    break CloseKind::Abnormal(ABNORMAL_CLOSE);
                }
                None => break CloseKind::Abnormal(ABNORMAL_CLOSE),
            },
            () = tick(&mut timers.heartbeat) => outbox.push(Action::Send(Timer::Heartbeat.frame(now_ms()))),
            () = tick(&mut timers.alive) => outbox.push(Action::Send(Timer::Alive.frame(now_ms()))),
            () = tick(&mut timers.ping) => outbox.push(Action::Send(Timer::Ping.frame(now_ms()))),
        }
    };

    let _ = protocol.on_close();
    timers.cancel();
    let _ = ws_tx.close().await;
    match kind {
        CloseKind::Normal => info!("realtime connection closed normally"),
        CloseKind::Abnormal(code) => warn!(code, "realtime connection closed unexpectedly"),
    }
    Ok(kind)
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
