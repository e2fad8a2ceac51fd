//! Delivery of responses to the code that issued a request.
//!
//! The correlation layer hands every response for an operation to a
//! [`ResponseListener`]. Callers that would rather await a future use
//! [`AsyncRequest`], which sits on the receiving end of a
//! [`ChannelListener`].

use std::fmt;

use tokio::sync::mpsc;

use ldapkit_protocol::op::IntermediateResponse;
use ldapkit_protocol::{
    ExtendedResult, LdapResult, OperationResult, SearchResult, SearchResultEntry,
    SearchResultReference,
};

use crate::{Error, Result};

/// Identifies an operation submitted on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsyncRequestId(i32);

impl AsyncRequestId {
    /// Wraps a message ID.
    #[must_use]
    pub const fn new(message_id: i32) -> Self {
        Self(message_id)
    }

    /// Returns the message ID.
    #[must_use]
    pub const fn message_id(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AsyncRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncRequestID(messageID={})", self.0)
    }
}

/// Receives the responses for one operation.
///
/// Search entries, references and intermediate responses are delivered in
/// the order the server sent them, and always before the final result.
/// After [`ResponseListener::result_received`] nothing else is delivered
/// for that operation.
///
/// Callbacks run on the connection's reader task or on a timer task, and
/// the next response for the same operation waits until the callback
/// returns. Keep them short; hand heavy work off to another task.
/// Calling back into the connection or its pending-operation table from a
/// callback is allowed, including
/// finishing or abandoning the operation being delivered.
pub trait ResponseListener: Send + Sync {
    /// Called once with the final result, which may be a synthesized
    /// timeout or failure.
    fn result_received(&self, request_id: AsyncRequestId, result: OperationResult);

    /// Called for each search result entry.
    fn entry_returned(&self, request_id: AsyncRequestId, entry: SearchResultEntry) {
        let _ = (request_id, entry);
    }

    /// Called for each search result reference.
    fn reference_returned(&self, request_id: AsyncRequestId, reference: SearchResultReference) {
        let _ = (request_id, reference);
    }

    /// Called for each intermediate response.
    fn intermediate_response_returned(
        &self,
        request_id: AsyncRequestId,
        response: IntermediateResponse,
    ) {
        let _ = (request_id, response);
    }
}

/// Receives notifications the server sends outside any operation.
pub trait UnsolicitedNotificationHandler: Send + Sync {
    /// Called for each unsolicited notification.
    fn handle_unsolicited_notification(&self, notification: &ExtendedResult);
}

/// One response delivered through a [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// A search result entry.
    Entry(SearchResultEntry),
    /// A search result reference.
    Reference(SearchResultReference),
    /// An intermediate response.
    Intermediate(IntermediateResponse),
    /// The final result.
    Result(OperationResult),
}

/// Listener that forwards every response into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ResponseEvent>,
}

impl ChannelListener {
    /// Creates a listener and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResponseEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, request_id: AsyncRequestId, event: ResponseEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!(message_id = request_id.message_id(), "response receiver dropped");
        }
    }
}

impl ResponseListener for ChannelListener {
    fn result_received(&self, request_id: AsyncRequestId, result: OperationResult) {
        self.send(request_id, ResponseEvent::Result(result));
    }

    fn entry_returned(&self, request_id: AsyncRequestId, entry: SearchResultEntry) {
        self.send(request_id, ResponseEvent::Entry(entry));
    }

    fn reference_returned(&self, request_id: AsyncRequestId, reference: SearchResultReference) {
        self.send(request_id, ResponseEvent::Reference(reference));
    }

    fn intermediate_response_returned(
        &self,
        request_id: AsyncRequestId,
        response: IntermediateResponse,
    ) {
        self.send(request_id, ResponseEvent::Intermediate(response));
    }
}

/// An operation in flight, awaited through a channel.
#[derive(Debug)]
pub struct AsyncRequest {
    id: AsyncRequestId,
    receiver: mpsc::UnboundedReceiver<ResponseEvent>,
    finished: bool,
}

impl AsyncRequest {
    /// Wraps the receiving end of a [`ChannelListener`].
    #[must_use]
    pub const fn new(id: AsyncRequestId, receiver: mpsc::UnboundedReceiver<ResponseEvent>) -> Self {
        Self {
            id,
            receiver,
            finished: false,
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn id(&self) -> AsyncRequestId {
        self.id
    }

    /// Returns the next response, or `None` once the final result has been
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection went away
    /// before the final result arrived.
    pub async fn next_event(&mut self) -> Result<Option<ResponseEvent>> {
        if self.finished {
            return Ok(None);
        }
        let event = self.receiver.recv().await.ok_or(Error::ConnectionClosed)?;
        if matches!(event, ResponseEvent::Result(_)) {
            self.finished = true;
        }
        Ok(Some(event))
    }

    /// Waits for the final result.
    ///
    /// Search entries and references that arrive first are collected into
    /// the returned [`SearchResult`]. Intermediate responses are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection went away
    /// before the final result arrived.
    pub async fn result(mut self) -> Result<OperationResult> {
        let mut entries = Vec::new();
        let mut references = Vec::new();
        while let Some(event) = self.next_event().await? {
            match event {
                ResponseEvent::Entry(entry) => entries.push(entry),
                ResponseEvent::Reference(reference) => references.push(reference),
                ResponseEvent::Intermediate(_) => {}
                ResponseEvent::Result(OperationResult::Search(search)) => {
                    let result = LdapResult::from(search);
                    return Ok(OperationResult::Search(SearchResult::with_entries(
                        result, entries, references,
                    )));
                }
                ResponseEvent::Result(other) => return Ok(other),
            }
        }
        Err(Error::ConnectionClosed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ldapkit_core::ResultCode;
    use ldapkit_protocol::OperationType;

    fn done(id: i32, kind: OperationType) -> OperationResult {
        OperationResult::for_operation(
            LdapResult::new(id, kind, ResultCode::SUCCESS, None, None, vec![], vec![]),
            0,
            0,
        )
    }

    #[tokio::test]
    async fn test_result_collects_entries() {
        let (listener, receiver) = ChannelListener::channel();
        let id = AsyncRequestId::new(3);
        listener.entry_returned(id, SearchResultEntry::new("cn=a", vec![]));
        let reference = SearchResultReference {
            urls: vec!["ldap://b".into()],
        };
        listener.reference_returned(id, reference);
        listener.entry_returned(id, SearchResultEntry::new("cn=c", vec![]));
        listener.result_received(id, done(3, OperationType::Search));

        let result = AsyncRequest::new(id, receiver).result().await.unwrap();
        let search = result.as_search().unwrap();
        assert_eq!(search.entries_returned(), 2);
        assert_eq!(search.references_returned(), 1);
        let dns: Vec<&str> = search.entries().unwrap().iter().map(|e| e.dn.as_str()).collect();
        assert_eq!(dns, ["cn=a", "cn=c"]);
    }

    #[tokio::test]
    async fn test_next_event_stops_after_result() {
        let (listener, receiver) = ChannelListener::channel();
        let id = AsyncRequestId::new(1);
        listener.result_received(id, done(1, OperationType::Delete));
        let mut request = AsyncRequest::new(id, receiver);
        assert!(matches!(
            request.next_event().await.unwrap(),
            Some(ResponseEvent::Result(OperationResult::Generic(_)))
        ));
        assert!(request.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (listener, receiver) = ChannelListener::channel();
        drop(listener);
        let err = AsyncRequest::new(AsyncRequestId::new(1), receiver)
            .result()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(AsyncRequestId::new(9).to_string(), "AsyncRequestID(messageID=9)");
    }
}
