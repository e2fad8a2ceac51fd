//! The connection driver.
//!
//! A [`Connection`] owns two tasks. The writer drains a queue of encoded
//! messages onto the stream; callers only ever enqueue, so submitting a
//! request never waits on the network. The reader pulls frames off the
//! stream, decodes them, and routes each message to its pending operation
//! by message ID.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ldapkit_core::ResultCode;
use ldapkit_protocol::op::{AbandonRequest, NOTICE_OF_DISCONNECTION_OID};
use ldapkit_protocol::{Control, LdapMessage, OperationResult, ProtocolOp};

use crate::config::ConnectionOptions;
use crate::framed::{FramedReader, decode_frame};
use crate::listener::{
    AsyncRequest, AsyncRequestId, ChannelListener, ResponseListener,
    UnsolicitedNotificationHandler,
};
use crate::message_id::MessageIdGenerator;
use crate::pending::{AbandonHandler, PendingOperations};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::{Error, Result};

/// Work for the writer task.
#[derive(Debug)]
enum Outbound {
    /// An encoded message.
    Message(Bytes),
    /// Flush, shut the stream down, and stop.
    Close,
}

/// Queues messages for the writer task.
#[derive(Debug, Clone)]
struct Outbox {
    sender: mpsc::UnboundedSender<Outbound>,
    message_ids: Arc<MessageIdGenerator>,
}

impl Outbox {
    fn send(&self, message: &LdapMessage) -> Result<()> {
        self.sender
            .send(Outbound::Message(message.encode()))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn send_abandon(&self, message_id: i32) -> Result<()> {
        let request = LdapMessage::new(self.message_ids.next(), AbandonRequest { message_id });
        self.send(&request)
    }

    fn close(&self) {
        // The writer may already be gone.
        let _ = self.sender.send(Outbound::Close);
    }
}

impl AbandonHandler for Outbox {
    fn abandon(&self, message_id: i32) -> Result<()> {
        self.send_abandon(message_id)
    }
}

/// An LDAP connection that correlates responses with requests.
pub struct Connection {
    options: ConnectionOptions,
    outbox: Outbox,
    pending: Arc<PendingOperations>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Starts the reader and writer tasks on `stream`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new<S>(stream: S, options: ConnectionOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::start(stream, options, Arc::new(TokioScheduler), None)
    }

    /// Starts a connection that passes unsolicited notifications to
    /// `handler`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_unsolicited_handler<S>(
        stream: S,
        options: ConnectionOptions,
        handler: Arc<dyn UnsolicitedNotificationHandler>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::start(stream, options, Arc::new(TokioScheduler), Some(handler))
    }

    /// Starts a connection whose timers run on `scheduler`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start<S>(
        stream: S,
        options: ConnectionOptions,
        scheduler: Arc<dyn Scheduler>,
        handler: Option<Arc<dyn UnsolicitedNotificationHandler>>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (sender, receiver) = mpsc::unbounded_channel();
        let outbox = Outbox {
            sender,
            message_ids: Arc::new(MessageIdGenerator::new(options.initial_message_id)),
        };

        let mut pending = PendingOperations::new(scheduler);
        if options.abandon_on_timeout {
            pending = pending.with_abandon_handler(Arc::new(outbox.clone()));
        }
        let pending = Arc::new(pending);
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_loop(
            write_half,
            receiver,
            pending.clone(),
            closed.clone(),
        ));
        let reader = tokio::spawn(
            Dispatcher {
                pending: pending.clone(),
                closed: closed.clone(),
                handler,
            }
            .run(FramedReader::new(read_half, options.max_message_size)),
        );

        Self {
            options,
            outbox,
            pending,
            closed,
            reader,
        }
    }

    /// Returns the options the connection was started with.
    #[must_use]
    pub const fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Sends a request and returns a handle that yields its responses.
    ///
    /// # Errors
    ///
    /// Returns an error if the op is not a request that gets a response,
    /// or the connection is closed.
    pub fn submit(
        &self,
        op: impl Into<ProtocolOp>,
        controls: Vec<Control>,
    ) -> Result<AsyncRequest> {
        let (listener, receiver) = ChannelListener::channel();
        let id = self.submit_with_listener(op, controls, Arc::new(listener))?;
        Ok(AsyncRequest::new(id, receiver))
    }

    /// Sends a request whose responses go to `listener`.
    ///
    /// # Errors
    ///
    /// Returns an error if the op is not a request that gets a response,
    /// or the connection is closed.
    pub fn submit_with_listener(
        &self,
        op: impl Into<ProtocolOp>,
        controls: Vec<Control>,
        listener: Arc<dyn ResponseListener>,
    ) -> Result<AsyncRequestId> {
        let op = op.into();
        if !op.is_request() {
            return Err(Error::Param(format!("{} is not a request", op.name())));
        }
        let kind = op
            .operation_type()
            .ok_or_else(|| Error::Param(format!("{} has no operation type", op.name())))?;
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let timeout = self.options.response_timeout_for(kind);
        let id = loop {
            let message_id = self.outbox.message_ids.next();
            if self.pending.contains(message_id) {
                continue;
            }
            match self
                .pending
                .register(message_id, kind, timeout, listener.clone())
            {
                Err(Error::DuplicateMessageId(_)) => {}
                other => break other?,
            }
        };
        // The reader may have failed everything between the first check
        // and the registration.
        if self.is_closed() {
            self.pending.abandon(id.message_id());
            return Err(Error::ConnectionClosed);
        }

        let message = LdapMessage::new(id.message_id(), op).with_controls(controls);
        if let Err(error) = self.outbox.send(&message) {
            self.pending.abandon(id.message_id());
            return Err(error);
        }
        tracing::debug!(message_id = id.message_id(), operation = %kind, "request sent");
        Ok(id)
    }

    /// Abandons an operation.
    ///
    /// The operation's listener hears nothing further, not even a final
    /// result. An abandon request is sent to the server regardless of
    /// whether the operation was still pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the request could not be
    /// queued.
    pub fn abandon(&self, id: AsyncRequestId) -> Result<()> {
        self.pending.abandon(id.message_id());
        self.outbox.send_abandon(id.message_id())
    }

    /// Sends an unbind request and closes the connection.
    ///
    /// Operations still pending are finished with `userCanceled`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection was already
    /// closed.
    pub fn unbind(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        let message = LdapMessage::new(self.outbox.message_ids.next(), ProtocolOp::UnbindRequest);
        let sent = self.outbox.send(&message);
        self.outbox.close();
        self.pending.fail_all(
            ResultCode::USER_CANCELED,
            "the connection was closed by an unbind request",
        );
        sent
    }

    /// Returns the number of operations waiting for a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true once the connection can no longer send requests.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.outbox.close();
        self.reader.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn write_loop<S>(
    mut writer: WriteHalf<S>,
    mut receiver: mpsc::UnboundedReceiver<Outbound>,
    pending: Arc<PendingOperations>,
    closed: Arc<AtomicBool>,
) where
    S: AsyncWrite,
{
    while let Some(outbound) = receiver.recv().await {
        let written = match outbound {
            Outbound::Message(bytes) => match writer.write_all(&bytes).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            },
            Outbound::Close => {
                if let Err(error) = writer.shutdown().await {
                    tracing::debug!(%error, "failed to shut down the stream");
                }
                return;
            }
        };
        if let Err(error) = written {
            tracing::error!(%error, "write failed, closing connection");
            closed.store(true, Ordering::SeqCst);
            pending.fail_all(
                ResultCode::SERVER_DOWN,
                &format!("an error occurred while writing to the connection: {error}"),
            );
            return;
        }
    }
}

/// Routes inbound messages to pending operations.
struct Dispatcher {
    pending: Arc<PendingOperations>,
    closed: Arc<AtomicBool>,
    handler: Option<Arc<dyn UnsolicitedNotificationHandler>>,
}

impl Dispatcher {
    async fn run<S>(self, mut framed: FramedReader<ReadHalf<S>>)
    where
        S: AsyncRead,
    {
        let reason = loop {
            let frame = match framed.read_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break "the server closed the connection".to_string(),
                Err(error) => {
                    tracing::error!(%error, "failed to read from the connection");
                    break format!("an error occurred while reading from the connection: {error}");
                }
            };
            match decode_frame(&frame, framed.max_message_size()) {
                Ok(message) => self.dispatch(message),
                Err(error) if error.is_framing() => {
                    tracing::error!(%error, "malformed message framing");
                    break format!("the connection received a malformed message: {error}");
                }
                Err(error) => self.decode_failed(&error),
            }
        };
        self.closed.store(true, Ordering::SeqCst);
        let failed = self.pending.fail_all(ResultCode::SERVER_DOWN, &reason);
        tracing::debug!(failed, %reason, "reader stopped");
    }

    fn dispatch(&self, message: LdapMessage) {
        let message_id = message.message_id;
        if message_id == 0 {
            self.unsolicited(&message);
            return;
        }
        match message.op {
            ProtocolOp::SearchResultEntry(entry) => {
                self.pending.deliver_entry(message_id, entry);
            }
            ProtocolOp::SearchResultReference(reference) => {
                self.pending.deliver_reference(message_id, reference);
            }
            ProtocolOp::IntermediateResponse(response) => {
                self.pending.deliver_intermediate(message_id, response);
            }
            op => {
                let message = LdapMessage {
                    message_id,
                    op,
                    controls: message.controls,
                };
                self.pending.complete(message_id, |progress| {
                    let unexpected = || {
                        tracing::warn!(
                            message_id,
                            response = message.op.name(),
                            operation = %progress.operation_type,
                            "response does not match the pending operation"
                        );
                        progress.client_result(
                            ResultCode::DECODING_ERROR,
                            format!(
                                "unexpected {} in response to message {message_id}",
                                message.op.name()
                            ),
                        )
                    };
                    if message.op.operation_type() != Some(progress.operation_type) {
                        return unexpected();
                    }
                    OperationResult::from_message(
                        &message,
                        progress.entries_returned,
                        progress.references_returned,
                        None,
                    )
                    .unwrap_or_else(unexpected)
                });
            }
        }
    }

    fn decode_failed(&self, error: &ldapkit_protocol::Error) {
        let Some(message_id) = error.message_id().filter(|id| *id > 0) else {
            tracing::warn!(%error, "failed to decode message");
            return;
        };
        tracing::warn!(%error, message_id, "failed to decode response");
        self.pending.complete(message_id, |progress| {
            progress.client_result(ResultCode::DECODING_ERROR, error.to_string())
        });
    }

    fn unsolicited(&self, message: &LdapMessage) {
        let Some(OperationResult::Extended(notification)) =
            OperationResult::from_message(message, 0, 0, None)
        else {
            tracing::warn!(op = message.op.name(), "ignoring unsolicited message");
            return;
        };
        tracing::warn!(
            oid = ?notification.oid(),
            result_code = %notification.result_code(),
            "unsolicited notification"
        );
        if let Some(handler) = &self.handler {
            handler.handle_unsolicited_notification(&notification);
        }
        if notification.oid() == Some(NOTICE_OF_DISCONNECTION_OID) {
            self.closed.store(true, Ordering::SeqCst);
            let reason = format!(
                "the server sent a notice of disconnection: {}",
                notification.diagnostic_message().unwrap_or("no reason given")
            );
            self.pending.fail_all(ResultCode::SERVER_DOWN, &reason);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ldapkit_protocol::op::DeleteRequest;
    use ldapkit_protocol::{LdapResponse, OperationType, SearchResultEntry};
    use tokio::io::DuplexStream;

    struct Server {
        requests: FramedReader<ReadHalf<DuplexStream>>,
        responses: WriteHalf<DuplexStream>,
    }

    impl Server {
        async fn next_request(&mut self) -> LdapMessage {
            self.requests.read_message().await.unwrap().unwrap()
        }

        async fn reply(&mut self, message_id: i32, op: impl Into<ProtocolOp>) {
            let bytes = LdapMessage::new(message_id, op).encode();
            self.responses.write_all(&bytes).await.unwrap();
        }
    }

    fn connect(options: ConnectionOptions) -> (Connection, Server) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (read_half, write_half) = tokio::io::split(server);
        let server = Server {
            requests: FramedReader::new(read_half, 1 << 20),
            responses: write_half,
        };
        (Connection::new(client, options), server)
    }

    fn delete(dn: &str) -> DeleteRequest {
        DeleteRequest { dn: dn.into() }
    }

    #[tokio::test]
    async fn test_delete_round_trip() {
        let (connection, mut server) = connect(ConnectionOptions::default());
        let request = connection.submit(delete("cn=a,dc=example"), Vec::new()).unwrap();
        assert_eq!(request.id().message_id(), 1);
        assert_eq!(connection.pending_count(), 1);

        let sent = server.next_request().await;
        assert_eq!(sent.message_id, 1);
        assert_eq!(sent.op.operation_type(), Some(OperationType::Delete));
        server
            .reply(1, ProtocolOp::DeleteResponse(LdapResponse::success()))
            .await;

        let result = request.result().await.unwrap();
        assert_eq!(result.result_code(), ResultCode::SUCCESS);
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_responses_and_unregistrable_requests() {
        let (connection, _server) = connect(ConnectionOptions::default());
        let entry = SearchResultEntry::new("cn=a", Vec::new());
        assert!(matches!(
            connection.submit(entry, Vec::new()),
            Err(Error::Param(_))
        ));
        assert!(matches!(
            connection.submit(AbandonRequest { message_id: 3 }, Vec::new()),
            Err(Error::NotRegistrable(OperationType::Abandon))
        ));
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unbind_cancels_pending() {
        let (connection, mut server) = connect(ConnectionOptions::default());
        let request = connection.submit(delete("cn=a"), Vec::new()).unwrap();
        connection.unbind().unwrap();

        let result = request.result().await.unwrap();
        assert_eq!(result.result_code(), ResultCode::USER_CANCELED);
        assert!(connection.is_closed());
        assert!(matches!(
            connection.submit(delete("cn=b"), Vec::new()),
            Err(Error::ConnectionClosed)
        ));
        assert!(matches!(connection.unbind(), Err(Error::ConnectionClosed)));

        assert_eq!(server.next_request().await.message_id, 1);
        let unbind = server.next_request().await;
        assert_eq!(unbind.op, ProtocolOp::UnbindRequest);
        assert!(server.requests.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mismatched_response_type_is_a_decoding_error() {
        let (connection, mut server) = connect(ConnectionOptions::default());
        let search = ldapkit_protocol::SearchRequest::new(
            "dc=example",
            ldapkit_core::SearchScope::SUB,
            ldapkit_protocol::Filter::parse("(cn=*)").unwrap(),
        );
        let request = connection.submit(search, Vec::new()).unwrap();
        let id = server.next_request().await.message_id;
        server
            .reply(id, ProtocolOp::DeleteResponse(LdapResponse::success()))
            .await;

        let result = request.result().await.unwrap();
        assert_eq!(result.result_code(), ResultCode::DECODING_ERROR);
        assert!(result.as_search().is_some());
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_server_close_fails_pending() {
        let (connection, server) = connect(ConnectionOptions::default());
        let request = connection.submit(delete("cn=a"), Vec::new()).unwrap();
        drop(server);

        let result = request.result().await.unwrap();
        assert_eq!(result.result_code(), ResultCode::SERVER_DOWN);
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_abandon_silences_operation() {
        let (connection, mut server) = connect(ConnectionOptions::default());
        let mut request = connection.submit(delete("cn=a"), Vec::new()).unwrap();
        connection.abandon(request.id()).unwrap();
        assert_eq!(connection.pending_count(), 0);

        assert_eq!(server.next_request().await.message_id, 1);
        let abandon = server.next_request().await;
        assert_eq!(
            abandon.op,
            ProtocolOp::AbandonRequest(AbandonRequest { message_id: 1 })
        );
        assert_eq!(abandon.message_id, 2);

        server
            .reply(1, ProtocolOp::DeleteResponse(LdapResponse::success()))
            .await;
        drop(connection);
        assert!(matches!(
            request.next_event().await,
            Err(Error::ConnectionClosed)
        ));
    }
}
