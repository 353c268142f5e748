//! A scripted cluster service on a Unix socket.
//!
//! [`FakeService`] speaks the framed protocol well enough for client tests:
//! it answers sign-on and queries from its script, records every frame it
//! receives and lets the test push notifications, replies and disconnects.

use clustermon_protocol::{
    check_frame_len, AdminReply, ConfigDocument, Frame, ResultCode, UpdateEvent,
    DIFF_NOTIFY_TOPIC,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct ServiceState {
    signon_rc: ResultCode,
    query_rc: ResultCode,
    document: Option<ConfigDocument>,
    received: Vec<Frame>,
    connections: usize,
    queries: usize,
}

enum Outbound {
    Frame(Frame),
    Close,
}

/// A scripted service for client tests.
///
/// Serves one connection at a time. Must be created inside a Tokio runtime.
pub struct FakeService {
    _dir: TempDir,
    path: PathBuf,
    state: Arc<Mutex<ServiceState>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

impl FakeService {
    /// Binds a fresh socket and starts serving.
    pub fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("service.sock");
        let listener = UnixListener::bind(&path).expect("Failed to bind service socket");
        let state = Arc::new(Mutex::new(ServiceState {
            signon_rc: ResultCode::OK,
            query_rc: ResultCode::OK,
            document: None,
            received: Vec::new(),
            connections: 0,
            queries: 0,
        }));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve(listener, Arc::clone(&state), outbound_rx));

        Self {
            _dir: dir,
            path,
            state,
            outbound,
            task,
        }
    }

    /// Returns the socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ServiceState> {
        self.state.lock().expect("service state poisoned")
    }

    /// Sets the document returned by queries.
    pub fn set_document(&self, document: ConfigDocument) {
        self.state().document = Some(document);
    }

    /// Sets the code answered to sign-on.
    pub fn set_signon_rc(&self, rc: ResultCode) {
        self.state().signon_rc = rc;
    }

    /// Sets the code answered to queries.
    pub fn set_query_rc(&self, rc: ResultCode) {
        self.state().query_rc = rc;
    }

    /// Frames received so far.
    pub fn received(&self) -> Vec<Frame> {
        self.state().received.clone()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.state().connections
    }

    /// Queries answered so far.
    pub fn queries(&self) -> usize {
        self.state().queries
    }

    /// Sends a frame on the current (or next) connection.
    pub fn push(&self, frame: Frame) {
        // the serving task only stops when the service is dropped
        let _ = self.outbound.send(Outbound::Frame(frame));
    }

    /// Sends an update notification.
    pub fn notify(&self, event: &UpdateEvent) {
        self.notify_raw(event.encode().expect("failed to encode update"));
    }

    /// Sends an update notification with an arbitrary payload.
    pub fn notify_raw(&self, payload: Vec<u8>) {
        self.push(Frame::Notify {
            topic: DIFF_NOTIFY_TOPIC.to_string(),
            payload,
        });
    }

    /// Sends a controller reply.
    pub fn reply(&self, reply: &AdminReply) {
        self.reply_raw(reply.encode().expect("failed to encode reply"));
    }

    /// Sends a controller message with an arbitrary payload.
    pub fn reply_raw(&self, payload: Vec<u8>) {
        self.push(Frame::Reply { payload });
    }

    /// Closes the current connection.
    pub fn disconnect(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    /// Waits until at least `count` frames were received.
    pub async fn wait_for_frames(&self, count: usize) -> Vec<Frame> {
        for _ in 0..500 {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("service received fewer than {count} frames");
    }

    /// Waits until at least `count` queries were answered.
    pub async fn wait_for_queries(&self, count: usize) {
        for _ in 0..500 {
            if self.queries() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("service answered fewer than {count} queries");
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: UnixListener,
    state: Arc<Mutex<ServiceState>>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        state.lock().expect("service state poisoned").connections += 1;

        let (read_half, mut write_half) = stream.into_split();
        let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_frames(read_half, inbound_tx));

        loop {
            tokio::select! {
                frame = inbound.recv() => match frame {
                    Some(frame) => {
                        if let Some(response) = answer(&state, frame) {
                            if write_frame(&mut write_half, &response).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                },
                out = outbound.recv() => match out {
                    Some(Outbound::Frame(frame)) => {
                        if write_frame(&mut write_half, &frame).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close) => break,
                    None => {
                        reader.abort();
                        return;
                    }
                },
            }
        }
        reader.abort();
    }
}

fn answer(state: &Mutex<ServiceState>, frame: Frame) -> Option<Frame> {
    let mut state = state.lock().expect("service state poisoned");
    let answer = match &frame {
        Frame::Signon { .. } => Some(Frame::SignonResult {
            rc: state.signon_rc,
        }),
        Frame::Query { .. } => {
            state.queries += 1;
            let rc = state.query_rc;
            Some(Frame::QueryResult {
                rc,
                document: if rc.is_ok() { state.document.clone() } else { None },
            })
        }
        _ => None,
    };
    state.received.push(frame);
    answer
}

async fn read_frames(mut reader: OwnedReadHalf, inbound: mpsc::UnboundedSender<Frame>) {
    loop {
        let Ok(len) = reader.read_u32().await else {
            return;
        };
        if check_frame_len(len as usize).is_err() {
            return;
        }
        let mut body = vec![0u8; len as usize];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }
        let Ok(frame) = Frame::decode_body(&body) else {
            continue;
        };
        if inbound.send(frame).is_err() {
            return;
        }
    }
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Frame) -> std::io::Result<()> {
    let bytes = frame
        .encode()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    writer.write_all(&bytes).await?;
    writer.flush().await
}
