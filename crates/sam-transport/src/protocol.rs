//! Connection state machine, free of I/O.
//!
//! The [`Protocol`] consumes raw inbound text and produces [`Action`]s for
//! the connection driver to carry out. Metric updates and liveness go
//! straight into the [`ValueStore`].

use std::time::Duration;

use sam_store::ValueStore;
use sam_telemetry::metrics::{
    EVENTS_FILTERED_TOTAL, EVENTS_STORED_TOTAL, FRAME_DECODE_ERRORS_TOTAL, FRAMES_RECEIVED_TOTAL,
};
use serde_json::json;
use tracing::{debug, info, trace, warn};

use crate::event::ParsedEvent;
use crate::frame::{CODE_CLOSING, CODE_EVENT, CODE_HANDSHAKE_ACK, CODE_PING, CODE_UPGRADE, Frame};

/// Connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempt yet.
    Disconnected,
    /// Opening the realtime connection.
    Connecting,
    /// Probe sent, waiting for return code 3.
    AwaitingHandshake,
    /// Sending the subscription sequence.
    Subscribing,
    /// Subscribed and receiving events.
    Steady,
    /// The connection has ended.
    Closed,
}

/// Periodic keep-alive frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timer {
    /// `42["hmiHeartbeat",<ms>]` every second.
    Heartbeat,
    /// `42["alive",<ms>]` every ten seconds.
    Alive,
    /// Bare `2` every ten seconds.
    Ping,
}

impl Timer {
    /// All timers, in start order.
    pub const ALL: [Self; 3] = [Self::Heartbeat, Self::Alive, Self::Ping];

    /// Firing period.
    pub fn period(self) -> Duration {
        match self {
            Self::Heartbeat => Duration::from_secs(1),
            Self::Alive | Self::Ping => Duration::from_secs(10),
        }
    }

    /// Frame to send when the timer fires at `now_ms`.
    pub fn frame(self, now_ms: i64) -> String {
        match self {
            Self::Heartbeat => Frame::new(CODE_EVENT, json!(["hmiHeartbeat", now_ms])).encode(),
            Self::Alive => Frame::new(CODE_EVENT, json!(["alive", now_ms])).encode(),
            Self::Ping => Frame::bare(CODE_PING).encode(),
        }
    }
}

/// Something the driver must do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Send an encoded frame.
    Send(String),
    /// Start a periodic timer.
    StartTimer(Timer),
    /// Stop all periodic timers.
    CancelTimers,
}

/// Controller requests sent once after the handshake: `(target, parameters)`.
///
/// `parameters` is the JSON text the controller expects, not a JSON value.
const SUBSCRIPTION_REQUESTS: [(&str, Option<&str>); 12] = [
    ("tm/getTexts", Some("\"en_GB\"")),
    ("rm/getAllParameters", Some("\"\"")),
    ("hull/getAllParameters", Some("\"\"")),
    ("simulation/getAllParameters", Some("\"\"")),
    ("rm/getReportHistory", Some("\"\"")),
    ("hull/getCurrentState", Some("\"\"")),
    ("dr_ng/getAvailableIids", None),
    ("importer/getsdcardstate", Some("{}")),
    ("si/getConfiguration", None),
    ("si/getConfiguration", None),
    ("sysmon/hasIotNetConflict", Some("\"\"")),
    ("exporter/getRsyncState", Some("\"\"")),
];

/// Rooms joined after the handshake.
const ROOMS: [&str; 2] = ["HMI", "remoteHMI"];

/// The fixed initialization sequence sent on return code 3.
pub fn subscription_frames() -> Vec<String> {
    let mut frames = vec![
        Frame::bare(CODE_UPGRADE).encode(),
        Frame::new(CODE_EVENT, json!(["initReady"])).encode(),
    ];
    frames.extend(
        ROOMS
            .iter()
            .map(|room| Frame::new(CODE_EVENT, json!(["joinroom", room])).encode()),
    );
    frames.extend(
        SUBSCRIPTION_REQUESTS
            .iter()
            .zip(1u32..)
            .map(|((target, parameters), msg_id)| {
                Frame::new(
                    CODE_EVENT,
                    json!(["tomedi", {
                        "endpoint": "",
                        "target": target,
                        "parameters": parameters,
                        "msgId": msg_id,
                    }]),
                )
                .encode()
            }),
    );
    frames
}

/// Protocol engine for one connection.
#[derive(Debug)]
pub struct Protocol {
    state: ConnectionState,
    store: ValueStore,
}

impl Protocol {
    /// Engine writing into `store`.
    pub fn new(store: ValueStore) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            store,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The connection is being opened.
    pub fn on_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The connection is open: send the probe.
    pub fn on_open(&mut self) -> Vec<Action> {
        self.state = ConnectionState::AwaitingHandshake;
        vec![Action::Send(Frame::new(CODE_PING, "probe").encode())]
    }

    /// The connection has ended.
    pub fn on_close(&mut self) -> Vec<Action> {
        self.state = ConnectionState::Closed;
        vec![Action::CancelTimers]
    }

    /// Handle one inbound text message received at `now_ms`.
    pub fn on_text(&mut self, raw: &str, now_ms: i64) -> Vec<Action> {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "dropping undecodable frame");
                metrics::counter!(FRAME_DECODE_ERRORS_TOTAL).increment(1);
                return Vec::new();
            }
        };

        trace!(code = frame.code, "frame received");
        metrics::counter!(FRAMES_RECEIVED_TOTAL, "code" => frame.code.to_string()).increment(1);
        self.store.touch(now_ms);

        match frame.code {
            CODE_HANDSHAKE_ACK => self.on_handshake_ack(),
            CODE_CLOSING => {
                info!("controller is closing the connection");
                vec![Action::CancelTimers]
            }
            CODE_EVENT => {
                self.on_event(&frame);
                Vec::new()
            }
            code => {
                debug!(code, payload = ?frame.payload, "unhandled return code");
                Vec::new()
            }
        }
    }

    fn on_handshake_ack(&mut self) -> Vec<Action> {
        if self.state != ConnectionState::AwaitingHandshake {
            trace!(state = ?self.state, "handshake ack outside handshake");
            return Vec::new();
        }

        self.state = ConnectionState::Subscribing;
        let mut actions: Vec<Action> = Timer::ALL.into_iter().map(Action::StartTimer).collect();
        actions.extend(subscription_frames().into_iter().map(Action::Send));
        self.state = ConnectionState::Steady;
        info!(frames = actions.len() - Timer::ALL.len(), "subscribed to controller events");
        actions
    }

    fn on_event(&self, frame: &Frame) {
        let event = match ParsedEvent::from_frame(frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!("ignoring non-controller event");
                return;
            }
            Err(error) => {
                debug!(%error, "dropping malformed controller event");
                return;
            }
        };

        if event.is_filtered() {
            trace!(metric = %event.metric, "filtered event");
            metrics::counter!(EVENTS_FILTERED_TOTAL, "metric" => event.metric).increment(1);
            return;
        }

        let key = event.store_key();
        trace!(metric = %key, "storing event");
        self.store.set(key, event.data);
        metrics::counter!(EVENTS_STORED_TOTAL).increment(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use sam_store::path;
    use serde_json::Value;

    use super::*;

    fn event(metric: &str, body: &Value) -> String {
        Frame::new(
            CODE_EVENT,
            json!(["frommedi", {"data": {"header": {"from": metric}, "body": body.to_string()}}]),
        )
        .encode()
    }

    fn handshaken() -> (Protocol, ValueStore) {
        let store = ValueStore::new();
        let mut protocol = Protocol::new(store.clone());
        protocol.on_connecting();
        let _ = protocol.on_open();
        let _ = protocol.on_text("3probe", 1_000);
        (protocol, store)
    }

    #[test]
    fn starts_disconnected() {
        let protocol = Protocol::new(ValueStore::new());
        assert_eq!(protocol.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn open_sends_probe() {
        let mut protocol = Protocol::new(ValueStore::new());
        protocol.on_connecting();
        assert_eq!(protocol.state(), ConnectionState::Connecting);
        let actions = protocol.on_open();
        assert_eq!(actions, vec![Action::Send("2probe".to_string())]);
        assert_eq!(protocol.state(), ConnectionState::AwaitingHandshake);
    }

    #[test]
    fn handshake_starts_three_timers_and_subscribes() {
        let mut protocol = Protocol::new(ValueStore::new());
        let _ = protocol.on_open();
        let actions = protocol.on_text("3probe", 0);

        let timers: Vec<&Action> = actions
            .iter()
            .filter(|a| matches!(a, Action::StartTimer(_)))
            .collect();
        assert_eq!(
            timers,
            vec![
                &Action::StartTimer(Timer::Heartbeat),
                &Action::StartTimer(Timer::Alive),
                &Action::StartTimer(Timer::Ping),
            ]
        );

        let sent: Vec<String> = actions
            .into_iter()
            .filter_map(|a| match a {
                Action::Send(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(sent, subscription_frames());
        assert_eq!(protocol.state(), ConnectionState::Steady);
    }

    #[test]
    fn second_handshake_ack_does_not_restart_timers() {
        let (mut protocol, store) = handshaken();
        let actions = protocol.on_text("3", 2_000);
        assert!(actions.is_empty());
        assert_eq!(store.liveness(), Some(2_000));
    }

    #[test]
    fn subscription_sequence_is_exact() {
        let frames = subscription_frames();
        assert_eq!(frames.len(), 16);
        assert_eq!(frames[0], "5");
        assert_eq!(frames[1], r#"42["initReady"]"#);
        assert_eq!(frames[2], r#"42["joinroom","HMI"]"#);
        assert_eq!(frames[3], r#"42["joinroom","remoteHMI"]"#);

        let first: Value = serde_json::from_str(&frames[4][2..]).unwrap();
        assert_eq!(
            first,
            json!(["tomedi", {"endpoint": "", "target": "tm/getTexts", "parameters": "\"en_GB\"", "msgId": 1}])
        );
        let iids: Value = serde_json::from_str(&frames[10][2..]).unwrap();
        assert_eq!(iids[1]["target"], "dr_ng/getAvailableIids");
        assert_eq!(iids[1]["parameters"], Value::Null);
        assert_eq!(iids[1]["msgId"], 7);
        let last: Value = serde_json::from_str(&frames[15][2..]).unwrap();
        assert_eq!(last[1]["target"], "exporter/getRsyncState");
        assert_eq!(last[1]["msgId"], 12);
    }

    #[test]
    fn closing_cancels_timers() {
        let (mut protocol, _) = handshaken();
        assert_eq!(protocol.on_text("41", 0), vec![Action::CancelTimers]);
    }

    #[test]
    fn close_ends_connection() {
        let (mut protocol, _) = handshaken();
        assert_eq!(protocol.on_close(), vec![Action::CancelTimers]);
        assert_eq!(protocol.state(), ConnectionState::Closed);
    }

    #[test]
    fn events_are_stored_last_write_wins() {
        let (mut protocol, store) = handshaken();
        let _ = protocol.on_text(&event("hull/currentState", &json!({"pressure": 7.0})), 2_000);
        let _ = protocol.on_text(&event("hull/currentState", &json!({"pressure": 7.4})), 3_000);
        assert_eq!(store.get(&path!["hull/currentState", "pressure"]), Some(json!(7.4)));
        assert_eq!(store.liveness(), Some(3_000));
    }

    #[test]
    fn filtered_events_are_not_stored() {
        let (mut protocol, store) = handshaken();
        let _ = protocol.on_text(&event("tm/getTexts", &json!({"huge": true})), 2_000);
        assert_eq!(store.get(&path!["tm/getTexts"]), None);
        assert_eq!(store.liveness(), Some(2_000));
    }

    #[test]
    fn discriminated_events_get_separate_keys() {
        let (mut protocol, store) = handshaken();
        let _ = protocol.on_text(&event("dr_ng/values", &json!({"iid": 1, "v": "a"})), 0);
        let _ = protocol.on_text(&event("dr_ng/values", &json!({"iid": 2, "v": "b"})), 0);
        assert_eq!(store.get(&path!["dr_ng/values:1", "v"]), Some(json!("a")));
        assert_eq!(store.get(&path!["dr_ng/values:2", "v"]), Some(json!("b")));
    }

    #[test]
    fn unknown_codes_refresh_liveness_only() {
        let (mut protocol, store) = handshaken();
        let before = store.len();
        assert!(protocol.on_text("40", 5_000).is_empty());
        assert_eq!(store.liveness(), Some(5_000));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn undecodable_frames_are_dropped_without_liveness() {
        let (mut protocol, store) = handshaken();
        assert!(protocol.on_text("garbage", 9_000).is_empty());
        assert_eq!(store.liveness(), Some(1_000));
        assert_eq!(protocol.state(), ConnectionState::Steady);
    }

    #[test]
    fn malformed_events_are_dropped() {
        let (mut protocol, store) = handshaken();
        let before = store.len();
        let raw = r#"42["frommedi",{"data":{"header":{"from":"m"},"body":"{oops"}}]"#;
        assert!(protocol.on_text(raw, 0).is_empty());
        assert_eq!(store.len(), before);
    }

    #[test]
    fn timer_frames() {
        assert_eq!(Timer::Heartbeat.frame(42), r#"42["hmiHeartbeat",42]"#);
        assert_eq!(Timer::Alive.frame(7), r#"42["alive",7]"#);
        assert_eq!(Timer::Ping.frame(7), "2");
        assert_eq!(Timer::Heartbeat.period(), Duration::from_secs(1));
        assert_eq!(Timer::Alive.period(), Duration::from_secs(10));
        assert_eq!(Timer::Ping.period(), Duration::from_secs(10));
    }
}
