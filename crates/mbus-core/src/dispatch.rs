//! Function-code dispatch table and the request/response correlator.

use std::{collections::HashMap, sync::Mutex};

use mbus_proto::LogicalMessage;
use tracing::warn;

/// What a handler can do back to the bus that invoked it.
///
/// Handlers run on the receiver thread and must not block waiting
/// on a response they themselves caused to be sent, but may fire off a
/// send without a wait. This trait is the narrow surface a handler gets,
/// so it cannot reach into the receiver loop's own state.
pub trait SendHandle: Send + Sync {
    /// Encode and write a message without waiting for a response.
    fn send_no_wait(&self, receiver: u16, function_code: u16, message_id: u8, is_response: bool, payload: Vec<u8>);
}

/// A handler invoked for one function code's requests.
pub type Handler = Box<dyn Fn(&dyn SendHandle, &LogicalMessage) + Send + Sync>;

/// Function code → handler. Populated before `start`; read-only while the
/// receiver runs.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<u16, Handler>,
}

impl HandlerTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `function_code`.
    pub fn register(&mut self, function_code: u16, handler: Handler) {
        self.handlers.insert(function_code, handler);
    }

    /// Invoke the handler for `msg.function_code`, if one is registered.
    /// Logs a warning and drops the message otherwise.
    pub fn dispatch(&self, send_handle: &dyn SendHandle, msg: &LogicalMessage) {
        match self.handlers.get(&msg.function_code) {
            Some(handler) => handler(send_handle, msg),
            None => warn!(function_code = msg.function_code, "no handler registered, dropping frame"),
        }
    }
}

/// The pending-response map keyed by message id, guarded by a single lock
/// held only for O(1) work.
#[derive(Default)]
pub struct PendingResponses {
    slots: Mutex<HashMap<u8, LogicalMessage>>,
}

impl PendingResponses {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the slot for `msg.message_id`. Called by the
    /// receiver loop when a response frame arrives.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn store(&self, msg: LogicalMessage) {
        let mut slots = self.slots.lock().expect("pending-response mutex poisoned");
        slots.insert(msg.message_id, msg);
    }

    /// Remove and return the slot for `message_id`, if present. Called by
    /// a waiter that found its response.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn take(&self, message_id: u8) -> Option<LogicalMessage> {
        let mut slots = self.slots.lock().expect("pending-response mutex poisoned");
        slots.remove(&message_id)
    }
}

/// Route one decoded message: responses go to the pending map,
/// requests go to the handler table. Exactly one of those two things
/// happens per frame — never both, and never the fallthrough-style
/// double-handling a microcontroller source variant exhibited.
pub fn route(pending: &PendingResponses, handlers: &HandlerTable, send_handle: &dyn SendHandle, msg: LogicalMessage) {
    if msg.is_response {
        pending.store(msg);
    } else {
        handlers.dispatch(send_handle, &msg);
    }
}
