//! The pending-operation table.
//!
//! Every request that expects a response is registered here under its
//! message ID until its final result is delivered. The final result comes
//! from exactly one of three places: the server's response, the operation's
//! timeout timer, or [`PendingOperations::fail_all`] when the connection
//! goes down. Whichever gets there first wins; the others find the
//! operation already finished and do nothing.
//!
//! Two locks guard each operation. The delivery gate serializes calls into
//! the listener, so a timeout cannot overtake an entry that is being
//! delivered. The gate remembers the thread holding it; a listener that
//! calls back into the table for its own operation passes straight through
//! instead of waiting on itself. The state lock is only ever held briefly.
//! The table lock is never held while a listener runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::time::Instant;

use ldapkit_core::ResultCode;
use ldapkit_protocol::op::IntermediateResponse;
use ldapkit_protocol::{
    LdapResult, OperationResult, OperationType, SearchResultEntry, SearchResultReference,
};

use crate::listener::{AsyncRequestId, ResponseListener};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::{Error, Result};

/// Sends abandon requests for operations that time out.
pub trait AbandonHandler: Send + Sync {
    /// Asks the server to abandon the operation with `message_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be queued. The timeout
    /// result is delivered regardless.
    fn abandon(&self, message_id: i32) -> Result<()>;
}

/// What is known about an operation at the moment it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationProgress {
    /// Message ID of the request.
    pub message_id: i32,
    /// Kind of operation.
    pub operation_type: OperationType,
    /// Search entries delivered so far.
    pub entries_returned: usize,
    /// Search references delivered so far.
    pub references_returned: usize,
    /// Time since the operation was registered.
    pub elapsed: Duration,
}

impl OperationProgress {
    /// Builds a client-side result for this operation.
    #[must_use]
    pub fn client_result(&self, code: ResultCode, message: impl Into<String>) -> OperationResult {
        OperationResult::for_operation(
            LdapResult::client_side(self.message_id, self.operation_type, code, message),
            self.entries_returned,
            self.references_returned,
        )
    }
}

#[derive(Debug, Default)]
struct DeliveryState {
    done: bool,
    entries_returned: usize,
    references_returned: usize,
    timer: Option<TimerHandle>,
}

struct PendingOperation {
    id: AsyncRequestId,
    kind: OperationType,
    created: Instant,
    listener: Arc<dyn ResponseListener>,
    gate: Mutex<()>,
    gate_holder: Mutex<Option<ThreadId>>,
    state: Mutex<DeliveryState>,
}

impl PendingOperation {
    fn message_id(&self) -> i32 {
        self.id.message_id()
    }

    /// Takes the delivery gate, or returns `None` if this thread already
    /// holds it.
    fn enter(&self) -> Option<GateGuard<'_>> {
        let current = thread::current().id();
        if *lock(&self.gate_holder) == Some(current) {
            return None;
        }
        let guard = lock(&self.gate);
        *lock(&self.gate_holder) = Some(current);
        Some(GateGuard {
            operation: self,
            _guard: guard,
        })
    }
}

struct GateGuard<'a> {
    operation: &'a PendingOperation,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.operation.gate_holder) = None;
    }
}

/// How a finishing operation treats its timer.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Finish {
    /// The response or a failure arrived; stop the timer.
    CancelTimer,
    /// The timer itself fired.
    TimerFired,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operations waiting for their final response, keyed by message ID.
pub struct PendingOperations {
    operations: Mutex<HashMap<i32, Arc<PendingOperation>>>,
    scheduler: Arc<dyn Scheduler>,
    abandon_handler: Option<Arc<dyn AbandonHandler>>,
}

impl PendingOperations {
    /// Creates an empty table whose timers run on `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            operations: Mutex::new(HashMap::new()),
            scheduler,
            abandon_handler: None,
        }
    }

    /// Abandons operations through `handler` when they time out.
    #[must_use]
    pub fn with_abandon_handler(mut self, handler: Arc<dyn AbandonHandler>) -> Self {
        self.abandon_handler = Some(handler);
        self
    }

    /// Registers an operation and arms its timer.
    ///
    /// A `timeout` of `None` or zero waits forever.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistrable`] for abandon and unbind, which get
    /// no response, and [`Error::DuplicateMessageId`] if the ID is taken.
    pub fn register(
        self: &Arc<Self>,
        message_id: i32,
        kind: OperationType,
        timeout: Option<Duration>,
        listener: Arc<dyn ResponseListener>,
    ) -> Result<AsyncRequestId> {
        if !kind.expects_response() {
            return Err(Error::NotRegistrable(kind));
        }
        if message_id <= 0 {
            return Err(Error::Param(format!(
                "message ID {message_id} cannot be registered"
            )));
        }
        let id = AsyncRequestId::new(message_id);
        let operation = Arc::new(PendingOperation {
            id,
            kind,
            created: Instant::now(),
            listener,
            gate: Mutex::new(()),
            gate_holder: Mutex::new(None),
            state: Mutex::new(DeliveryState::default()),
        });
        match lock(&self.operations).entry(message_id) {
            Entry::Occupied(_) => return Err(Error::DuplicateMessageId(message_id)),
            Entry::Vacant(slot) => {
                slot.insert(operation.clone());
            }
        }
        tracing::debug!(message_id, operation = %kind, ?timeout, "registered operation");

        if let Some(delay) = timeout.filter(|d| !d.is_zero()) {
            let table = Arc::downgrade(self);
            let target = Arc::downgrade(&operation);
            let timer = self.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let (Some(table), Some(operation)) = (table.upgrade(), target.upgrade()) {
                        table.expire(&operation);
                    }
                }),
            );
            let mut state = lock(&operation.state);
            if state.done {
                drop(state);
                timer.cancel();
            } else {
                state.timer = Some(timer);
            }
        }
        Ok(id)
    }

    /// Delivers a search result entry.
    ///
    /// Returns false if the operation is unknown, is not a search, or has
    /// already finished.
    pub fn deliver_entry(&self, message_id: i32, entry: SearchResultEntry) -> bool {
        self.deliver(
            message_id,
            "search result entry",
            |operation, state| {
                state.entries_returned += 1;
                operation.kind == OperationType::Search
            },
            |operation| operation.listener.entry_returned(operation.id, entry),
        )
    }

    /// Delivers a search result reference.
    ///
    /// Returns false if the operation is unknown, is not a search, or has
    /// already finished.
    pub fn deliver_reference(&self, message_id: i32, reference: SearchResultReference) -> bool {
        self.deliver(
            message_id,
            "search result reference",
            |operation, state| {
                state.references_returned += 1;
                operation.kind == OperationType::Search
            },
            |operation| operation.listener.reference_returned(operation.id, reference),
        )
    }

    /// Delivers an intermediate response.
    ///
    /// Returns false if the operation is unknown or has already finished.
    pub fn deliver_intermediate(&self, message_id: i32, response: IntermediateResponse) -> bool {
        self.deliver(
            message_id,
            "intermediate response",
            |_, _| true,
            |operation| {
                operation
                    .listener
                    .intermediate_response_returned(operation.id, response);
            },
        )
    }

    /// Finishes an operation with the result `build` produces.
    ///
    /// Returns false, without calling `build`, if the operation is unknown
    /// or already finished.
    pub fn complete(
        &self,
        message_id: i32,
        build: impl FnOnce(&OperationProgress) -> OperationResult,
    ) -> bool {
        let Some(operation) = self.get(message_id) else {
            tracing::warn!(message_id, "response for unknown message ID");
            return false;
        };
        let delivered = self.finish(&operation, Finish::CancelTimer, |_| {}, build);
        if delivered {
            tracing::debug!(message_id, "completed operation");
        }
        delivered
    }

    /// Times out an operation as if its timer had fired.
    ///
    /// Returns false if the operation is unknown or already finished.
    pub fn on_timeout(&self, message_id: i32) -> bool {
        self.get(message_id)
            .is_some_and(|operation| self.expire(&operation))
    }

    /// Forgets an operation without delivering a result.
    ///
    /// Anything the server still sends for it is dropped. Returns false if
    /// the operation is unknown or already finished.
    pub fn abandon(&self, message_id: i32) -> bool {
        let Some(operation) = self.get(message_id) else {
            return false;
        };
        let timer = {
            let mut state = lock(&operation.state);
            if state.done {
                return false;
            }
            state.done = true;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
        self.remove(&operation);
        tracing::debug!(message_id, "abandoned operation");
        true
    }

    /// Finishes every pending operation with a client-side result.
    ///
    /// Returns the number of operations that were finished.
    pub fn fail_all(&self, code: ResultCode, message: &str) -> usize {
        let operations: Vec<_> = lock(&self.operations)
            .drain()
            .map(|(_, operation)| operation)
            .collect();
        operations
            .iter()
            .filter(|operation| {
                self.finish(operation, Finish::CancelTimer, |_| {}, |progress| {
                    progress.client_result(code, message)
                })
            })
            .count()
    }

    /// Returns true if an operation with `message_id` is pending.
    #[must_use]
    pub fn contains(&self, message_id: i32) -> bool {
        lock(&self.operations).contains_key(&message_id)
    }

    /// Returns the kind of the pending operation with `message_id`.
    #[must_use]
    pub fn operation_type(&self, message_id: i32) -> Option<OperationType> {
        self.get(message_id).map(|operation| operation.kind)
    }

    /// Returns the number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.operations).len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.operations).is_empty()
    }

    fn get(&self, message_id: i32) -> Option<Arc<PendingOperation>> {
        lock(&self.operations).get(&message_id).cloned()
    }

    fn remove(&self, operation: &Arc<PendingOperation>) {
        let mut operations = lock(&self.operations);
        if operations
            .get(&operation.message_id())
            .is_some_and(|current| Arc::ptr_eq(current, operation))
        {
            operations.remove(&operation.message_id());
        }
    }

    fn deliver(
        &self,
        message_id: i32,
        what: &'static str,
        admit: impl FnOnce(&PendingOperation, &mut DeliveryState) -> bool,
        invoke: impl FnOnce(&PendingOperation),
    ) -> bool {
        let Some(operation) = self.get(message_id) else {
            tracing::warn!(message_id, what, "response for unknown message ID");
            return false;
        };
        let _gate = operation.enter();
        {
            let mut state = lock(&operation.state);
            if state.done {
                return false;
            }
            if !admit(operation.as_ref(), &mut *state) {
                tracing::warn!(
                    message_id,
                    what,
                    operation = %operation.kind,
                    "unexpected response type"
                );
                return false;
            }
        }
        tracing::debug!(message_id, what, "delivering response");
        invoke(operation.as_ref());
        true
    }

    fn expire(&self, operation: &Arc<PendingOperation>) -> bool {
        let abandon = self.abandon_handler.clone();
        self.finish(
            operation,
            Finish::TimerFired,
            |progress| {
                if let Some(handler) = &abandon
                    && let Err(error) = handler.abandon(progress.message_id)
                {
                    tracing::warn!(
                        message_id = progress.message_id,
                        %error,
                        "failed to send abandon request"
                    );
                }
            },
            |progress| {
                let millis = progress.elapsed.as_millis();
                let message = if abandon.is_some() {
                    format!(
                        "The asynchronous operation with message ID {} did not complete within {millis} ms and has been abandoned",
                        progress.message_id
                    )
                } else {
                    format!(
                        "The asynchronous operation with message ID {} did not complete within the maximum response time ({millis} ms)",
                        progress.message_id
                    )
                };
                tracing::debug!(
                    message_id = progress.message_id,
                    elapsed_ms = %millis,
                    "operation timed out"
                );
                progress.client_result(ResultCode::TIMEOUT, message)
            },
        )
    }

    fn finish(
        &self,
        operation: &Arc<PendingOperation>,
        how: Finish,
        before_delivery: impl FnOnce(&OperationProgress),
        build: impl FnOnce(&OperationProgress) -> OperationResult,
    ) -> bool {
        let _gate = operation.enter();
        let (progress, timer) = {
            let mut state = lock(&operation.state);
            if state.done {
                return false;
            }
            state.done = true;
            let progress = OperationProgress {
                message_id: operation.message_id(),
                operation_type: operation.kind,
                entries_returned: state.entries_returned,
                references_returned: state.references_returned,
                elapsed: operation.created.elapsed(),
            };
            (progress, state.timer.take())
        };
        if let Some(timer) = timer
            && how == Finish::CancelTimer
        {
            timer.cancel();
        }
        self.remove(operation);
        before_delivery(&progress);
        let result = build(&progress);
        operation.listener.result_received(operation.id, result);
        true
    }
}

impl fmt::Debug for PendingOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperations")
            .field("pending", &self.len())
            .field("scheduler", &self.scheduler)
            .field("abandon_on_timeout", &self.abandon_handler.is_some())
            .finish()
    }
}
