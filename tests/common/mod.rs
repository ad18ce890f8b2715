#![allow(dead_code)]

use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use socha_client::{
    ClientConfig, ClientError, ClientHandler, Move, NoStateError, Outcome, RoomId, Session,
    SessionOutcome, Snapshot,
};

pub const ROOM: &str = "r1";
pub const MOVE_XML: &str = "<to x=\"3\" y=\"4\"/>";
pub const WAIT: Duration = Duration::from_secs(3);

pub fn config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..ClientConfig::default()
    }
}

pub fn state(turn: u32) -> String {
    format!("<state class=\"state\" turn=\"{turn}\"><startTeam>ONE</startTeam></state>")
}

pub fn joined() -> String {
    format!("<joined roomId=\"{ROOM}\"/>")
}

pub fn memento(turn: u32) -> String {
    format!(
        "<room roomId=\"{ROOM}\"><data class=\"memento\">{}</data></room>",
        state(turn)
    )
}

pub fn move_request() -> String {
    format!("<room roomId=\"{ROOM}\"><data class=\"moveRequest\"/></room>")
}

pub fn result(winner: &str) -> String {
    format!(
        "<room roomId=\"{ROOM}\"><data class=\"result\"><score cause=\"REGULAR\"/><winner team=\"{winner}\"/></data></room>"
    )
}

pub fn submitted_move() -> String {
    format!("<room roomId=\"{ROOM}\"><data class=\"move\">{MOVE_XML}</data></room>")
}

/// Game server stand-in on an ephemeral port.
pub struct Stub {
    listener: TcpListener,
    pub port: u16,
}

impl Stub {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub async fn accept(&self) -> ServerConn {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("client did not connect")
            .expect("accept failed");
        ServerConn {
            stream,
            received: String::new(),
            cursor: 0,
        }
    }
}

pub struct ServerConn {
    stream: TcpStream,
    received: String,
    cursor: usize,
}

impl ServerConn {
    pub async fn send(&mut self, xml: &str) {
        self.stream.write_all(xml.as_bytes()).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Wait until `needle` shows up in what the client sent after the last match.
    pub async fn expect(&mut self, needle: &str) {
        let found = tokio::time::timeout(WAIT, async {
            loop {
                if let Some(at) = self.received[self.cursor..].find(needle) {
                    self.cursor += at + needle.len();
                    return true;
                }
                let mut buf = [0u8; 4096];
                let n = self.stream.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    return false;
                }
                self.received.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        })
        .await
        .unwrap_or(false);
        assert!(found, "client never sent {needle:?}, got {:?}", self.received);
    }

    /// Stop sending; the client sees end of stream.
    pub async fn close_write(&mut self) {
        self.stream.shutdown().await.unwrap();
    }

    /// Everything the client sent until it closed its side.
    pub async fn drain(mut self) -> String {
        let mut rest = Vec::new();
        tokio::time::timeout(WAIT, self.stream.read_to_end(&mut rest))
            .await
            .expect("client did not close")
            .unwrap();
        self.received.push_str(&String::from_utf8_lossy(&rest));
        self.received
    }
}

#[derive(Debug, Default)]
pub struct Log {
    pub updates: Vec<String>,
    pub computed: Vec<Option<String>>,
    pub results: Vec<String>,
    pub errors: Vec<(&'static str, String)>,
    pub joined: Vec<RoomId>,
    pub welcomes: Vec<Option<String>>,
    pub room_messages: Vec<(String, String)>,
    pub left: Vec<RoomId>,
    pub idle_calls: usize,
}

impl Log {
    pub fn error_kinds(&self) -> Vec<&'static str> {
        self.errors.iter().map(|(kind, _)| *kind).collect()
    }
}

/// Player logic that records every callback.
#[derive(Clone, Default)]
pub struct Recorder {
    pub log: Arc<Mutex<Log>>,
    gate: Option<Arc<Mutex<std_mpsc::Receiver<()>>>>,
    started: Option<mpsc::UnboundedSender<()>>,
    idle_rounds: usize,
}

impl Recorder {
    /// A recorder whose `compute_move` reports when it starts and then blocks
    /// until the returned sender fires.
    pub fn gated() -> (Self, std_mpsc::Sender<()>, mpsc::UnboundedReceiver<()>) {
        let (gate_tx, gate_rx) = std_mpsc::channel();
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        let recorder = Self {
            log: Arc::default(),
            gate: Some(Arc::new(Mutex::new(gate_rx))),
            started: Some(started_tx),
            idle_rounds: 0,
        };
        (recorder, gate_tx, started_rx)
    }

    /// A recorder that keeps idling for `rounds` polls after disconnecting.
    pub fn idling(rounds: usize) -> Self {
        Self {
            idle_rounds: rounds,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }

    /// Poll the log until `cond` holds.
    pub async fn wait_for(&self, cond: impl Fn(&Log) -> bool) {
        tokio::time::timeout(WAIT, async {
            while !cond(&self.log.lock().unwrap()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }
}

impl ClientHandler for Recorder {
    fn on_update(&self, snapshot: &Snapshot) {
        self.log.lock().unwrap().updates.push(snapshot.as_str().to_string());
    }

    fn compute_move(&self, snapshot: Result<Snapshot, NoStateError>) -> anyhow::Result<Move> {
        self.log
            .lock()
            .unwrap()
            .computed
            .push(snapshot.as_ref().ok().map(|s| s.as_str().to_string()));
        if let Some(started) = &self.started {
            let _ = started.send(());
        }
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        let _state = snapshot?;
        Ok(Move::new(MOVE_XML))
    }

    fn on_game_over(&self, outcome: &Outcome) {
        self.log.lock().unwrap().results.push(outcome.as_str().to_string());
    }

    fn on_error(&self, error: &ClientError) {
        self.log
            .lock()
            .unwrap()
            .errors
            .push((error.context(), error.to_string()));
    }

    fn on_joined(&self, room_id: &RoomId) {
        self.log.lock().unwrap().joined.push(room_id.clone());
    }

    fn on_welcome(&self, _room_id: &RoomId, team: Option<&str>) {
        self.log.lock().unwrap().welcomes.push(team.map(str::to_string));
    }

    fn on_room_message(&self, _room_id: &RoomId, class: &str, payload: &str) {
        self.log
            .lock()
            .unwrap()
            .room_messages
            .push((class.to_string(), payload.to_string()));
    }

    fn on_left(&self, room_id: &RoomId) {
        self.log.lock().unwrap().left.push(room_id.clone());
    }

    fn while_disconnected(&self) -> bool {
        let mut log = self.log.lock().unwrap();
        log.idle_calls += 1;
        log.idle_calls > self.idle_rounds
    }
}

/// Connect and run a session on its own task.
pub fn spawn_session(
    config: ClientConfig,
    handler: Recorder,
) -> JoinHandle<(Session<Recorder>, SessionOutcome)> {
    tokio::spawn(async move {
        let mut session = Session::connect(&config, handler)
            .await
            .expect("connect failed");
        let outcome = session.run().await;
        (session, outcome)
    })
}

pub async fn ended(
    task: JoinHandle<(Session<Recorder>, SessionOutcome)>,
) -> (Session<Recorder>, SessionOutcome) {
    tokio::time::timeout(WAIT, task)
        .await
        .expect("session did not end")
        .expect("session task panicked")
}
