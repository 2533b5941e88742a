//! The per-instance state tying the link, codec, dispatcher, and receiver
//! loop into the `send`/`start`/`stop` surface callers actually use.

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use mbus_proto::{LogicalMessage, ProtocolError};
use tracing::warn;

use crate::{
    dispatch::{Handler, HandlerTable, PendingResponses, SendHandle},
    error::{BusError, Result},
    link::Link,
    receiver::{FrameDecoder, ReceiverHandle, POLL_INTERVAL},
};

/// Turns a [`LogicalMessage`] into the bytes a binding's [`Link`] carries.
/// The XBee binding writes `mbus_proto::xbee::encode` output directly; the
/// CAN binding additionally frames its fixed-size record so it can share
/// this same byte-oriented interface.
pub trait FrameEncoder: Send + Sync {
    /// Encode `msg` to bytes ready to hand to [`Link::write`].
    fn encode(&self, msg: &LogicalMessage) -> std::result::Result<Vec<u8>, ProtocolError>;
}

/// One endpoint on the bus: owns the link, the codec, the handler table,
/// the pending-response map, and the receiver worker's lifecycle.
///
/// Always constructed behind an `Arc` ([`Bus::new`] returns one directly)
/// because the receiver worker needs a handle back to `send_no_wait` for
/// handlers, and that handle must outlive the call that spawned it.
pub struct Bus<L: Link + 'static> {
    own_address: u16,
    broadcast_address: u16,
    /// Mask applied to the message-id counter: `0x0F` on CAN, `0xFF` on
    /// XBee, matching each binding's field width.
    id_mask: u8,
    link: Arc<Mutex<L>>,
    encoder: Arc<dyn FrameEncoder>,
    decoder: Arc<dyn FrameDecoder>,
    handlers: Arc<Mutex<HandlerTable>>,
    pending: Arc<PendingResponses>,
    receiver: Mutex<ReceiverHandle>,
    next_id: AtomicU8,
}

impl<L: Link + 'static> Bus<L> {
    /// Construct a new instance around an already-open link.
    pub fn new(
        link: L,
        own_address: u16,
        broadcast_address: u16,
        id_mask: u8,
        encoder: Arc<dyn FrameEncoder>,
        decoder: Arc<dyn FrameDecoder>,
    ) -> Arc<Self> {
        Arc::new(Self {
            own_address,
            broadcast_address,
            id_mask,
            link: Arc::new(Mutex::new(link)),
            encoder,
            decoder,
            handlers: Arc::new(Mutex::new(HandlerTable::new())),
            pending: Arc::new(PendingResponses::new()),
            receiver: Mutex::new(ReceiverHandle::idle()),
            next_id: AtomicU8::new(0),
        })
    }

    /// Register a handler for `function_code`. Intended to be called
    /// before [`Bus::start`]; the table is read-only while the
    /// receiver runs, but mutation is still serialized under the same
    /// lock the receiver reads through, so a late registration is
    /// safe, just not guaranteed to apply to frames already in flight.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn register_handler(&self, function_code: u16, handler: Handler) {
        self.handlers.lock().expect("handler table mutex poisoned").register(function_code, handler);
    }

    /// Start the receiver worker. Returns [`BusError::AlreadyListening`]
    /// if one is already running.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let send_handle: Arc<dyn SendHandle> = Arc::clone(self) as Arc<dyn SendHandle>;
        self.receiver.lock().expect("receiver mutex poisoned").start(
            Arc::clone(&self.link),
            Arc::clone(&self.decoder),
            self.own_address,
            self.broadcast_address,
            Arc::clone(&self.pending),
            Arc::clone(&self.handlers),
            send_handle,
        )
    }

    /// Stop and join the receiver worker. A no-op if it was never started.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn stop(&self) {
        self.receiver.lock().expect("receiver mutex poisoned").stop_and_join();
    }

    /// Whether the receiver worker is currently running.
    #[must_use]
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn is_running(&self) -> bool {
        self.receiver.lock().expect("receiver mutex poisoned").is_running()
    }

    /// Encode and write a message, then optionally block for its
    /// correlated response.
    ///
    /// `message_id` defaults to the next value of the per-instance
    /// counter if `None`; callers producing a response pass the request's
    /// id explicitly. `timeout == Duration::ZERO` returns immediately
    /// after the write. Otherwise this polls the pending-response map at
    /// [`POLL_INTERVAL`] until the response arrives, the deadline passes
    /// (`BusError::Timeout`), or the receiver stops mid-wait
    /// (`BusError::Cancelled`).
    pub fn send(
        &self,
        receiver: u16,
        function_code: u16,
        payload: Vec<u8>,
        message_id: Option<u8>,
        is_response: bool,
        timeout: Duration,
    ) -> Result<Option<LogicalMessage>> {
        let id = message_id.unwrap_or_else(|| self.next_id());
        self.write_frame(receiver, function_code, id, is_response, payload)?;

        if timeout.is_zero() {
            return Ok(None);
        }

        self.wait_for(id, timeout).map(Some)
    }

    /// Block for up to `timeout` until a response tagged `message_id`
    /// lands in the pending-response map, without sending anything.
    ///
    /// This is the primitive the harness's `wait-for` operation is built
    /// on — useful when a caller already issued the request (via
    /// [`Bus::send`] with `timeout == Duration::ZERO`, or from a handler)
    /// and wants to wait on its id separately. At most one waiter per
    /// message id should be outstanding at a time.
    pub fn wait_for(&self, message_id: u8, timeout: Duration) -> Result<LogicalMessage> {
        let start = Instant::now();
        let mut was_running = self.is_running();

        loop {
            if let Some(response) = self.pending.take(message_id) {
                return Ok(response);
            }

            let running_now = self.is_running();
            if was_running && !running_now {
                return Err(BusError::Cancelled { message_id });
            }
            was_running = running_now;

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(BusError::Timeout { elapsed, message_id });
            }

            thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }

    fn next_id(&self) -> u8 {
        let mut current = self.next_id.load(Ordering::SeqCst);
        loop {
            let next = current.wrapping_add(1) & self.id_mask;
            match self.next_id.compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(issued) => return issued,
                Err(actual) => current = actual,
            }
        }
    }

    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn write_frame(&self, receiver: u16, function_code: u16, message_id: u8, is_response: bool, payload: Vec<u8>) -> Result<()> {
        let msg = LogicalMessage {
            receiver,
            sender: self.own_address,
            function_code,
            message_id,
            is_response,
            priority: None,
            function_mode: None,
            payload,
        };
        let bytes = self.encoder.encode(&msg)?;
        let mut link = self.link.lock().expect("link mutex poisoned");
        link.write(&bytes).map_err(|err| BusError::WriteFailed { reason: err.to_string() })?;
        Ok(())
    }
}

impl<L: Link + 'static> SendHandle for Bus<L> {
    fn send_no_wait(&self, receiver: u16, function_code: u16, message_id: u8, is_response: bool, payload: Vec<u8>) {
        if let Err(err) = self.write_frame(receiver, function_code, message_id, is_response, payload) {
            warn!(error = %err, "handler-initiated send failed");
        }
    }
}

impl<L: Link + 'static> Drop for Bus<L> {
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn drop(&mut self) {
        self.receiver.lock().expect("receiver mutex poisoned").stop_and_join();
        if let Ok(mut link) = self.link.lock() {
            let _ = link.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use mbus_proto::{message::BROADCAST_8BIT, xbee};

    use super::*;
    use crate::link::LoopbackLink;

    struct XbeeEncoder;
    impl FrameEncoder for XbeeEncoder {
        fn encode(&self, msg: &LogicalMessage) -> std::result::Result<Vec<u8>, ProtocolError> {
            xbee::encode(msg)
        }
    }

    struct XbeeDecoder;
    impl FrameDecoder for XbeeDecoder {
        fn decode_many(&self, buf: &[u8], own: u16, broadcast: u16) -> (Vec<std::result::Result<LogicalMessage, ProtocolError>>, usize) {
            xbee::decode_many(buf, own, broadcast)
        }
    }

    fn xbee_bus(link: LoopbackLink, own: u16) -> Arc<Bus<LoopbackLink>> {
        Bus::new(link, own, BROADCAST_8BIT, 0xFF, Arc::new(XbeeEncoder), Arc::new(XbeeDecoder))
    }

    #[test]
    fn scenario_5_correlated_request_response() {
        let (link_a, link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);
        let bus_b = xbee_bus(link_b, 0x02);

        let bus_b_clone = Arc::clone(&bus_b);
        bus_b.register_handler(
            0x50,
            Box::new(move |_handle, msg| {
                bus_b_clone
                    .send(msg.sender, msg.function_code, vec![0x01], Some(msg.message_id), true, Duration::ZERO)
                    .expect("reply send succeeds");
            }),
        );

        bus_a.start().expect("starts cleanly");
        bus_b.start().expect("starts cleanly");

        let response = bus_a
            .send(0x02, 0x50, Vec::new(), Some(5), false, Duration::from_millis(1000))
            .expect("request completes")
            .expect("response present");

        assert_eq!(response.payload, vec![0x01]);
        assert!(bus_a.pending.take(5).is_none());
    }

    #[test]
    fn send_with_zero_timeout_never_blocks_or_times_out() {
        let (link_a, _link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);

        let result = bus_a.send(0x02, 0x07, Vec::new(), None, false, Duration::ZERO).expect("send succeeds");
        assert!(result.is_none());
    }

    #[test]
    fn send_with_wait_times_out_without_a_response() {
        let (link_a, _link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);
        bus_a.start().expect("starts cleanly");

        let err = bus_a.send(0x02, 0x07, Vec::new(), Some(9), false, Duration::from_millis(30)).unwrap_err();
        assert!(matches!(err, BusError::Timeout { message_id: 9, .. }));
    }

    #[test]
    fn message_id_defaults_wrap_at_the_mask_width() {
        let (link_a, _link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);

        let mut seen = Vec::new();
        for _ in 0..257 {
            seen.push(bus_a.next_id());
        }
        assert_eq!(seen[0], 0);
        assert_eq!(seen[255], 255);
        assert_eq!(seen[256], 0);
    }

    #[test]
    fn scenario_6_drop_stops_worker_and_closes_link_quickly() {
        let (link_a, _link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);
        bus_a.start().expect("starts cleanly");
        assert!(bus_a.is_running());

        let start = Instant::now();
        drop(bus_a);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn start_twice_returns_already_listening() {
        let (link_a, _link_b) = LoopbackLink::pair();
        let bus_a = xbee_bus(link_a, 0x01);
        bus_a.start().expect("starts cleanly");
        assert!(matches!(bus_a.start().unwrap_err(), BusError::AlreadyListening));
    }
}
