//! Unix socket transport.
//!
//! Frames are a 4-byte big-endian length followed by a CBOR body. A reader
//! task owns the read half: answers to sign-on and queries are routed to the
//! caller waiting for them, notifications and replies go to the event stream,
//! and end of stream is reported as [`Event::Disconnect`].

use crate::channel::Channel;
use crate::error::{ClientError, ClientResult};
use crate::event::{Event, EventSender};
use bytes::Bytes;
use clustermon_protocol::{check_frame_len, ConfigDocument, ConnectMode, Frame, QueryScope};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default time to wait for a sign-on or query answer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Caller waiting for a sign-on or query answer.
#[derive(Debug)]
struct Waiter {
    /// Frame kind that answers the request.
    answer: &'static str,
    tx: oneshot::Sender<Frame>,
}

/// Answers owed by the service, in request order.
#[derive(Debug, Default)]
struct Answers {
    waiter: Option<Waiter>,
    /// Kinds of answers whose callers gave up waiting. The service still
    /// sends them, ahead of any later answer.
    late: VecDeque<&'static str>,
}

/// State shared with the reader task.
#[derive(Debug, Default)]
struct Shared {
    answers: Mutex<Answers>,
    /// Set once sign-on succeeded; losing the connection before that is
    /// reported to the connecting caller only.
    established: AtomicBool,
}

/// A [`Channel`] over a Unix domain socket.
#[derive(Debug)]
pub struct IpcChannel {
    path: PathBuf,
    events: EventSender,
    request_timeout: Duration,
    writer: Option<OwnedWriteHalf>,
    reader: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl IpcChannel {
    /// Creates a channel for the socket at `path`, delivering events to `events`.
    pub fn new(path: impl Into<PathBuf>, events: EventSender) -> Self {
        Self {
            path: path.into(),
            events,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            writer: None,
            reader: None,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Sets how long to wait for sign-on and query answers.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_frame(&mut self, frame: &Frame) -> ClientResult<()> {
        let writer = self.writer.as_mut().ok_or(ClientError::NotConnected)?;
        let bytes = frame.encode()?;
        trace!(kind = frame.kind(), len = bytes.len(), "sending frame");
        writer.write_all(&bytes).await.map_err(map_io_error)?;
        writer.flush().await.map_err(map_io_error)
    }

    /// Sends `frame` and waits for the frame of kind `answer` replying to it.
    async fn round_trip(&mut self, frame: &Frame, answer: &'static str) -> ClientResult<Frame> {
        let (tx, rx) = oneshot::channel();
        self.shared.answers.lock().waiter = Some(Waiter { answer, tx });

        if let Err(e) = self.write_frame(frame).await {
            self.shared.answers.lock().waiter = None;
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(ClientError::Disconnected(self.path.display().to_string())),
            Err(_) => {
                let mut answers = self.shared.answers.lock();
                if let Some(waiter) = answers.waiter.take() {
                    answers.late.push_back(waiter.answer);
                }
                Err(ClientError::Timeout {
                    waited: self.request_timeout,
                })
            }
        }
    }

    fn teardown(&mut self) {
        self.writer = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.shared = Arc::new(Shared::default());
    }
}

impl Channel for IpcChannel {
    async fn connect(&mut self, identity: &str, mode: ConnectMode) -> ClientResult<()> {
        self.teardown();

        let stream = UnixStream::connect(&self.path)
            .await
            .map_err(map_io_error)?;
        let (read_half, write_half) = stream.into_split();
        self.writer = Some(write_half);
        self.reader = Some(tokio::spawn(read_loop(
            read_half,
            self.events.clone(),
            Arc::clone(&self.shared),
        )));

        let signon = Frame::Signon {
            identity: identity.to_string(),
            mode,
        };
        let result = match self.round_trip(&signon, "signon_result").await {
            Ok(Frame::SignonResult { rc }) if rc.is_ok() => Ok(()),
            Ok(Frame::SignonResult { rc }) => Err(ClientError::from_result_code(rc)),
            Ok(other) => Err(ClientError::Protocol(format!(
                "expected signon_result, got {}",
                other.kind()
            ))),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.shared.established.store(true, Ordering::SeqCst);
                debug!(path = %self.path.display(), identity, ?mode, "connected");
                Ok(())
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    async fn subscribe(&mut self, topic: &str) -> ClientResult<()> {
        self.write_frame(&Frame::Subscribe {
            topic: topic.to_string(),
        })
        .await
    }

    async fn send(&mut self, frame: Frame) -> ClientResult<()> {
        self.write_frame(&frame).await
    }

    async fn query(&mut self, scope: QueryScope) -> ClientResult<ConfigDocument> {
        match self.round_trip(&Frame::Query { scope }, "query_result").await? {
            Frame::QueryResult {
                rc,
                document: Some(document),
            } if rc.is_ok() => Ok(document),
            Frame::QueryResult { rc, .. } if rc.is_ok() => {
                Err(ClientError::Protocol("query result without a document".into()))
            }
            Frame::QueryResult { rc, .. } => Err(ClientError::from_result_code(rc)),
            other => Err(ClientError::Protocol(format!(
                "expected query_result, got {}",
                other.kind()
            ))),
        }
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
            && self
                .reader
                .as_ref()
                .map(|reader| !reader.is_finished())
                .unwrap_or(false)
    }

    async fn close(&mut self) -> ClientResult<()> {
        if let Some(mut writer) = self.writer.take() {
            // the peer may already be gone
            let _ = writer.shutdown().await;
        }
        self.teardown();
        Ok(())
    }
}

impl Drop for IpcChannel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

async fn read_loop(mut reader: OwnedReadHalf, events: EventSender, shared: Arc<Shared>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(body)) => match Frame::decode_body(&body) {
                Ok(frame) => route(frame, &events, &shared),
                Err(e) => warn!(error = %e, "discarding undecodable frame"),
            },
            Ok(None) => {
                debug!("peer closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "connection failed");
                break;
            }
        }
    }

    shared.answers.lock().waiter = None;
    if shared.established.load(Ordering::SeqCst) {
        // the receiver is gone once the client loop has exited
        let _ = events.send(Event::Disconnect);
    }
}

async fn read_frame(reader: &mut OwnedReadHalf) -> ClientResult<Option<Vec<u8>>> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(map_io_error(e)),
    };
    check_frame_len(len)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(map_io_error)?;
    Ok(Some(body))
}

fn route(frame: Frame, events: &EventSender, shared: &Shared) {
    trace!(kind = frame.kind(), "received frame");
    match frame {
        Frame::SignonResult { .. } | Frame::QueryResult { .. } => {
            let kind = frame.kind();
            let mut answers = shared.answers.lock();
            if answers.late.front() == Some(&kind) {
                answers.late.pop_front();
                debug!(kind, "discarding answer to an abandoned request");
                return;
            }
            match answers.waiter.take() {
                Some(waiter) if waiter.answer == kind => {
                    // the waiter may have timed out
                    let _ = waiter.tx.send(frame);
                }
                Some(waiter) => {
                    warn!(expected = waiter.answer, kind, "discarding mismatched answer");
                    answers.waiter = Some(waiter);
                }
                None => warn!(kind, "discarding unsolicited answer"),
            }
        }
        Frame::Notify { topic, payload } => {
            let _ = events.send(Event::Notify {
                topic,
                payload: Bytes::from(payload),
            });
        }
        Frame::Reply { payload } => {
            let _ = events.send(Event::Reply(Bytes::from(payload)));
        }
        other => debug!(kind = other.kind(), "ignoring frame"),
    }
}

fn map_io_error(e: io::Error) -> ClientError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => ClientError::NotConnected,
        io::ErrorKind::PermissionDenied => ClientError::PermissionDenied(e.to_string()),
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => ClientError::Disconnected(e.to_string()),
        _ => ClientError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_protocol::{ConfigNode, ResultCode};

    #[test]
    fn io_errors_map_to_client_errors() {
        let err = map_io_error(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ClientError::NotConnected));
        let err = map_io_error(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(err, ClientError::NotConnected));
        let err = map_io_error(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ClientError::PermissionDenied(_)));
        let err = map_io_error(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, ClientError::Disconnected(_)));
    }

    async fn read_request(stream: &mut UnixStream) -> Frame {
        let len = stream.read_u32().await.unwrap() as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await.unwrap();
        Frame::decode_body(&body).unwrap()
    }

    async fn write_answer(stream: &mut UnixStream, frame: Frame) {
        stream.write_all(&frame.encode().unwrap()).await.unwrap();
    }

    fn query_result(epoch: &str) -> Frame {
        Frame::QueryResult {
            rc: ResultCode::OK,
            document: Some(ConfigDocument::new(ConfigNode::new("cib").with_attr("epoch", epoch))),
        }
    }

    #[tokio::test]
    async fn late_answer_is_not_given_to_the_next_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let service = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            assert!(matches!(read_request(&mut stream).await, Frame::Signon { .. }));
            write_answer(&mut stream, Frame::SignonResult { rc: ResultCode::OK }).await;

            // hold the first answer back until the client has asked again
            assert!(matches!(read_request(&mut stream).await, Frame::Query { .. }));
            assert!(matches!(read_request(&mut stream).await, Frame::Query { .. }));
            write_answer(&mut stream, query_result("1")).await;
            write_answer(&mut stream, query_result("2")).await;
            // keep the connection open until the client closes it
            let _ = stream.read_u32().await;
        });

        let (tx, _rx) = crate::event::event_channel();
        let mut channel =
            IpcChannel::new(&path, tx).with_request_timeout(Duration::from_millis(50));
        channel.connect("test", ConnectMode::Query).await.unwrap();

        let first = channel.query(QueryScope::Local).await;
        assert!(matches!(first, Err(ClientError::Timeout { .. })));

        channel.request_timeout = Duration::from_secs(5);
        let second = channel.query(QueryScope::Local).await.unwrap();
        assert_eq!(second.root().attr("epoch"), Some("2"));

        channel.close().await.unwrap();
        service.await.unwrap();
    }

    #[tokio::test]
    async fn missing_socket_is_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = crate::event::event_channel();
        let mut channel = IpcChannel::new(dir.path().join("absent.sock"), tx);
        let result = channel.connect("test", ConnectMode::Query).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert!(!channel.is_connected());
    }
}
