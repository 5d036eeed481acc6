use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use shipdesk::identity::{AccessToken, Identity, Role, Session, SessionStore};
use shipdesk::realtime::{HubClient, HubEvent};
use shipdesk::storage::MemoryStore;
use shipdesk::ClientConfig;

const SEP: char = '\u{1e}';

#[derive(Clone, Copy)]
enum Script {
    // Handshake plus one notification in the same frame, then stay open.
    Notify,
    // First connection drops after `release`; the second gets a close record.
    DropThenClose,
}

struct MockHub {
    script: Script,
    connections: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
    release: Notify,
}

async fn hub(ws: WebSocketUpgrade, Query(q): Query<HashMap<String, String>>, State(h): State<Arc<MockHub>>) -> Response {
    h.tokens.lock().push(q.get("access_token").cloned());
    ws.on_upgrade(move |socket| serve(socket, h))
}

async fn serve(mut socket: WebSocket, h: Arc<MockHub>) {
    let n = h.connections.fetch_add(1, Ordering::SeqCst);
    match socket.recv().await {
        Some(Ok(Message::Text(t))) if t.as_str().contains(r#""protocol":"json""#) => {}
        _ => return,
    }
    match (h.script, n) {
        (Script::Notify, _) => {
            let invocation = json!({"type": 1, "target": "NewOrderNotification", "arguments": [{"orderId": 42, "city": "Alexandria"}]});
            let other = json!({"type": 1, "target": "SomethingElse", "arguments": []});
            let frame = format!("{{}}{SEP}{invocation}{SEP}{}{SEP}", json!({"type": 6}));
            let _ = socket.send(Message::Text(frame.into())).await;
            let _ = socket.send(Message::Text(format!("{other}{SEP}").into())).await;
            while let Some(Ok(_)) = socket.recv().await {}
        }
        (Script::DropThenClose, 0) => {
            let _ = socket.send(Message::Text(format!("{{}}{SEP}").into())).await;
            h.release.notified().await;
        }
        (Script::DropThenClose, _) => {
            let _ = socket.send(Message::Text(format!("{{}}{SEP}").into())).await;
            let _ = socket.send(Message::Text(format!("{}{SEP}", json!({"type": 7})).into())).await;
            while let Some(Ok(_)) = socket.recv().await {}
        }
    }
}

// Start the mock hub on an ephemeral localhost port. Abort the handle to stop it.
async fn start_hub(script: Script) -> (JoinHandle<()>, Arc<MockHub>, ClientConfig) {
    let state = Arc::new(MockHub { script, connections: AtomicUsize::new(0), tokens: Mutex::new(Vec::new()), release: Notify::new() });
    let app = Router::new().route("/api/hub", get(hub)).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock hub error: {e:?}");
        }
    });
    (handle, state, config_for(port, "0,10"))
}

fn config_for(port: u16, delays: &str) -> ClientConfig {
    let base = format!("http://127.0.0.1:{}/api", port);
    let delays = delays.to_string();
    ClientConfig::from_lookup(|k| match k {
        "SHIPDESK_API_BASE" => Some(base.clone()),
        "SHIPDESK_HUB_RECONNECT_MS" => Some(delays.clone()),
        _ => None,
    })
    .unwrap()
}

fn signed_in(token: &str) -> SessionStore {
    let store = SessionStore::new(Arc::new(MemoryStore::new()));
    let user = Identity { id: "k1".into(), full_name: "Nile Freight".into(), phone_number: "201112223334".into(), email: None, role: Role::Company };
    store.set_session(Session::authenticated(AccessToken::new(token), user));
    store
}

async fn next(events: &mut mpsc::UnboundedReceiver<HubEvent>) -> HubEvent {
    timeout(Duration::from_secs(5), events.recv()).await.expect("hub event in time").expect("event channel open")
}

#[tokio::test]
async fn delivers_new_order_notifications() {
    let (server, mock, cfg) = start_hub(Script::Notify).await;
    let (handle, mut events) = HubClient::new(&cfg, signed_in("t1")).unwrap().start();

    assert_eq!(next(&mut events).await, HubEvent::Connected);
    match next(&mut events).await {
        HubEvent::NewOrder { arguments, .. } => {
            assert_eq!(arguments, vec![json!({"orderId": 42, "city": "Alexandria"})]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(mock.tokens.lock().clone(), vec![Some("t1".to_string())]);

    handle.stop().await.unwrap();
    assert_eq!(next(&mut events).await, HubEvent::Disconnected { reason: None });
    assert!(events.recv().await.is_none());
    server.abort();
}

#[tokio::test]
async fn reconnects_with_current_token_and_honours_close() {
    let (server, mock, cfg) = start_hub(Script::DropThenClose).await;
    let store = signed_in("t1");
    let (handle, mut events) = HubClient::new(&cfg, store.clone()).unwrap().start();

    assert_eq!(next(&mut events).await, HubEvent::Connected);
    store.set_session(Session::authenticated(AccessToken::new("t2"), store.session().identity().cloned().unwrap()));
    mock.release.notify_one();

    assert_eq!(next(&mut events).await, HubEvent::Reconnecting { attempt: 1, delay: Duration::ZERO });
    assert_eq!(next(&mut events).await, HubEvent::Connected);
    assert_eq!(next(&mut events).await, HubEvent::Disconnected { reason: None });
    assert_eq!(mock.tokens.lock().clone(), vec![Some("t1".to_string()), Some("t2".to_string())]);

    handle.stop().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn gives_up_after_the_delay_list() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let cfg = config_for(port, "0,10");
    let (handle, mut events) = HubClient::new(&cfg, SessionStore::new(Arc::new(MemoryStore::new()))).unwrap().start();

    assert_eq!(next(&mut events).await, HubEvent::Reconnecting { attempt: 1, delay: Duration::ZERO });
    assert_eq!(next(&mut events).await, HubEvent::Reconnecting { attempt: 2, delay: Duration::from_millis(10) });
    assert!(matches!(next(&mut events).await, HubEvent::Disconnected { reason: Some(_) }));
    handle.stop().await.unwrap();
}

#[test]
fn anonymous_connect_url_has_no_token() {
    let cfg = config_for(5245, "0");
    let anon = HubClient::new(&cfg, SessionStore::new(Arc::new(MemoryStore::new()))).unwrap();
    assert_eq!(anon.connect_url().as_str(), "ws://127.0.0.1:5245/api/hub");
    let authed = HubClient::new(&cfg, signed_in("a b+c")).unwrap();
    assert_eq!(authed.connect_url().as_str(), "ws://127.0.0.1:5245/api/hub?access_token=a+b%2Bc");
}
