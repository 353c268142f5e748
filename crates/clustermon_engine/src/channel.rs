//! Connection abstraction for cluster services.

use crate::error::{ClientError, ClientResult};
use clustermon_protocol::{AdminRequest, ConfigDocument, ConnectMode, Frame, QueryScope, ResultCode};
use std::collections::VecDeque;
use std::future::Future;

/// A connection to a cluster service.
///
/// This trait abstracts the IPC layer so the client loops can run against
/// the real socket transport or a scripted mock.
pub trait Channel: Send {
    /// Signs on to the service.
    fn connect(
        &mut self,
        identity: &str,
        mode: ConnectMode,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    /// Subscribes to a notification topic.
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = ClientResult<()>> + Send;

    /// Sends a frame.
    fn send(&mut self, frame: Frame) -> impl Future<Output = ClientResult<()>> + Send;

    /// Requests the complete configuration document.
    fn query(
        &mut self,
        scope: QueryScope,
    ) -> impl Future<Output = ClientResult<ConfigDocument>> + Send;

    /// Checks if the channel is signed on.
    fn is_connected(&self) -> bool;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = ClientResult<()>> + Send;
}

/// A mock channel for testing.
///
/// Connection and query results are scripted in order; once the query
/// script is exhausted the configured document is returned.
#[derive(Debug, Default)]
pub struct MockChannel {
    connected: bool,
    connect_results: VecDeque<ClientResult<()>>,
    query_results: VecDeque<ClientResult<ConfigDocument>>,
    document: Option<ConfigDocument>,
    sent: Vec<Frame>,
    subscriptions: Vec<String>,
    connect_attempts: usize,
    query_count: usize,
}

impl MockChannel {
    /// Creates a disconnected mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock channel that is already signed on.
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Sets the document returned by queries.
    pub fn set_document(&mut self, document: ConfigDocument) {
        self.document = Some(document);
    }

    /// Queues the result of the next connection attempt.
    pub fn push_connect_result(&mut self, result: ClientResult<()>) {
        self.connect_results.push_back(result);
    }

    /// Queues the result of the next query.
    pub fn push_query_result(&mut self, result: ClientResult<ConfigDocument>) {
        self.query_results.push_back(result);
    }

    /// Sets the connected state.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Frames sent so far.
    pub fn sent(&self) -> &[Frame] {
        &self.sent
    }

    /// Admin requests sent so far.
    pub fn requests(&self) -> Vec<&AdminRequest> {
        self.sent
            .iter()
            .filter_map(|frame| match frame {
                Frame::Request(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Topics subscribed so far.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Number of connection attempts.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    /// Number of queries issued.
    pub fn query_count(&self) -> usize {
        self.query_count
    }
}

impl Channel for MockChannel {
    async fn connect(&mut self, _identity: &str, _mode: ConnectMode) -> ClientResult<()> {
        self.connect_attempts += 1;
        let result = self.connect_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.connected = true;
        }
        result
    }

    async fn subscribe(&mut self, topic: &str) -> ClientResult<()> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn send(&mut self, frame: Frame) -> ClientResult<()> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        self.sent.push(frame);
        Ok(())
    }

    async fn query(&mut self, _scope: QueryScope) -> ClientResult<ConfigDocument> {
        self.query_count += 1;
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        if let Some(result) = self.query_results.pop_front() {
            return result;
        }
        self.document
            .clone()
            .ok_or(ClientError::QueryFailed(ResultCode::NO_SUCH_ENTRY))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.connected = false;
        Ok(())
    }
}
