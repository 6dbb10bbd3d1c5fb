//! Realtime connection tests against a local websocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use sam_core::{ControllerEndpoint, CookieJar, SessionInfo};
use sam_store::{LIVENESS_KEY, ValueStore, path};
use sam_transport::protocol::subscription_frames;
use sam_transport::{CloseKind, TransportError, run_connection};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

type ServerWs = WebSocketStream<TcpStream>;

struct Accepted {
    ws: ServerWs,
    uri: String,
    cookie: Option<String>,
}

async fn accept(listener: &TcpListener) -> Accepted {
    let (stream, _) = listener.accept().await.unwrap();
    let mut uri = String::new();
    let mut cookie = None;
    let ws = accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            uri = req.uri().to_string();
            cookie = req
                .headers()
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(resp)
        },
    )
    .await
    .unwrap();
    Accepted { ws, uri, cookie }
}

async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = msg {
            return text.as_str().to_string();
        }
    }
}

async fn close_with(ws: &mut ServerWs, code: u16) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: "".into(),
    };
    ws.send(Message::Close(Some(frame))).await.unwrap();
}

fn session() -> (SessionInfo, CookieJar) {
    let info: SessionInfo = serde_json::from_value(json!({
        "sid": "abc",
        "upgrades": [],
        "pingInterval": 25000,
        "pingTimeout": 60000
    }))
    .unwrap();
    let mut jar = CookieJar::from_set_cookie(["PHPSESSID=x; path=/"]);
    jar.push("io", &info.sid);
    (info, jar)
}

async fn start() -> (
    TcpListener,
    ValueStore,
    CancellationToken,
    JoinHandle<Result<CloseKind, TransportError>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let endpoint = ControllerEndpoint::new("127.0.0.1", port);
    let store = ValueStore::new();
    let cancel = CancellationToken::new();
    let (info, jar) = session();

    let client_store = store.clone();
    let client_cancel = cancel.clone();
    let client = tokio::spawn(async move {
        run_connection(&endpoint, &info, &jar, client_store, client_cancel).await
    });
    (listener, store, cancel, client)
}

async fn handshake(ws: &mut ServerWs) {
    assert_eq!(next_text(ws).await, "2probe");
    ws.send(Message::Text("3probe".into())).await.unwrap();
    for expected in subscription_frames() {
        assert_eq!(next_text(ws).await, expected);
    }
}

#[tokio::test]
async fn handshake_subscribes_and_stores_events() {
    let (listener, store, _cancel, client) = start().await;
    let mut server = accept(&listener).await;

    assert_eq!(server.uri, "/socket.io/?EIO=3&transport=websocket&sid=abc");
    assert_eq!(server.cookie.as_deref(), Some("PHPSESSID=x; io=abc"));

    handshake(&mut server.ws).await;

    let body = json!({"pressure": 7.3}).to_string();
    let event = json!(["frommedi", {"data": {"header": {"from": "hull/currentState"}, "body": body}}]);
    server
        .ws
        .send(Message::Text(format!("42{event}").into()))
        .await
        .unwrap();
    close_with(&mut server.ws, 1000).await;

    let kind = timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    assert_eq!(kind, CloseKind::Normal);
    assert_eq!(
        store.get(&path!["hull/currentState", "pressure"]),
        Some(json!(7.3))
    );
    assert!(store.get(&path![LIVENESS_KEY]).is_some());
}

#[tokio::test]
async fn heartbeat_runs_until_server_closes() {
    let (listener, _store, _cancel, client) = start().await;
    let mut server = accept(&listener).await;
    handshake(&mut server.ws).await;

    let beat = next_text(&mut server.ws).await;
    assert!(beat.starts_with(r#"42["hmiHeartbeat","#), "{beat}");

    server.ws.send(Message::Text("41".into())).await.unwrap();
    let quiet = timeout(Duration::from_millis(1_500), server.ws.next()).await;
    assert!(quiet.is_err(), "timers still running after 41");

    close_with(&mut server.ws, 1000).await;
    let kind = timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    assert_eq!(kind, CloseKind::Normal);
}

#[tokio::test]
async fn unexpected_close_code_is_abnormal() {
    let (listener, _store, _cancel, client) = start().await;
    let mut server = accept(&listener).await;
    handshake(&mut server.ws).await;

    close_with(&mut server.ws, 4000).await;

    let kind = timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    assert_eq!(kind, CloseKind::Abnormal(4000));
}

#[tokio::test]
async fn dropped_connection_is_abnormal() {
    let (listener, _store, _cancel, client) = start().await;
    let mut server = accept(&listener).await;
    assert_eq!(next_text(&mut server.ws).await, "2probe");
    drop(server);

    let kind = timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    assert_eq!(kind, CloseKind::Abnormal(1006));
}

#[tokio::test]
async fn cancellation_closes_normally() {
    let (listener, _store, cancel, client) = start().await;
    let mut server = accept(&listener).await;
    handshake(&mut server.ws).await;

    cancel.cancel();

    let kind = timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    assert_eq!(kind, CloseKind::Normal);
    loop {
        let msg = timeout(TIMEOUT, server.ws.next()).await.unwrap();
        match msg {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(frame.code, CloseCode::Normal);
                break;
            }
            Some(Ok(_)) => {}
            other => panic!("expected a close frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn refused_connection_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let endpoint = ControllerEndpoint::new("127.0.0.1", port);
    let (info, jar) = session();
    let result = run_connection(
        &endpoint,
        &info,
        &jar,
        ValueStore::new(),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(TransportError::Connect(_))));
}
