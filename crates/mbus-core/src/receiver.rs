//! The background worker that polls a link, decodes frames, and routes them.
//!
//! ```text
//!   idle ──start──▶ running ──stop──▶ stopping ──join──▶ joined
//! ```

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use mbus_proto::{LogicalMessage, ProtocolError};
use tracing::{debug, warn};

use crate::{
    dispatch::{HandlerTable, PendingResponses, SendHandle},
    error::{BusError, Result},
    link::Link,
};

/// Polling granularity: the worker observes the stop flag, and readers
/// react to new bytes, at least this often.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Bridges a binding's wire format to decoded messages over a byte
/// buffer, so the receiver loop stays identical for CAN and XBee.
///
/// `mbus-xbee` implements this directly over [`mbus_proto::xbee::decode_many`];
/// `mbus-can` implements it over a fixed-size record framing so raw CAN
/// frames can flow through the same byte-oriented [`Link`] abstraction.
pub trait FrameDecoder: Send + Sync {
    /// Decode as many complete frames as `buf` holds. Returns the decoded
    /// results (including per-frame errors, so the worker can log and
    /// skip past corrupt data without losing sync) and the number of
    /// bytes consumed from the front of `buf`.
    fn decode_many(&self, buf: &[u8], own: u16, broadcast: u16) -> (Vec<std::result::Result<LogicalMessage, ProtocolError>>, usize);
}

/// Owns the receiver worker's lifecycle: the atomic running flag and the
/// join handle. A [`crate::instance::Bus`] holds one of these.
pub struct ReceiverHandle {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// An idle handle with no worker started.
    #[must_use]
    pub fn idle() -> Self {
        Self { running: Arc::new(AtomicBool::new(false)), worker: None }
    }

    /// Whether the worker is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the worker. Returns [`BusError::AlreadyListening`] if one is
    /// already running.
    pub fn start<L: Link + 'static>(
        &mut self,
        link: Arc<Mutex<L>>,
        decoder: Arc<dyn FrameDecoder>,
        own: u16,
        broadcast: u16,
        pending: Arc<PendingResponses>,
        handlers: Arc<Mutex<HandlerTable>>,
        send_handle: Arc<dyn SendHandle>,
    ) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BusError::AlreadyListening);
        }

        let running = Arc::clone(&self.running);
        let handle = thread::spawn(move || {
            worker_loop(&link, decoder.as_ref(), own, broadcast, &pending, &handlers, send_handle.as_ref(), &running);
        });
        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the worker to stop and join it. Idempotent: a no-op if the
    /// worker was never started or has already been joined.
    pub fn stop_and_join(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("receiver worker panicked");
            }
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[allow(clippy::too_many_arguments)]
#[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
fn worker_loop<L: Link>(
    link: &Arc<Mutex<L>>,
    decoder: &dyn FrameDecoder,
    own: u16,
    broadcast: u16,
    pending: &PendingResponses,
    handlers: &Mutex<HandlerTable>,
    send_handle: &dyn SendHandle,
    running: &AtomicBool,
) {
    let mut buf: Vec<u8> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let available = {
            let mut link = link.lock().expect("link mutex poisoned");
            link.available()
        };

        match available {
            Ok(0) => thread::sleep(POLL_INTERVAL),
            Ok(n) => {
                let mut chunk = vec![0u8; n];
                let read = {
                    let mut link = link.lock().expect("link mutex poisoned");
                    link.read_into(&mut chunk)
                };
                match read {
                    Ok(got) => {
                        buf.extend_from_slice(&chunk[..got]);
                        let (results, consumed) = decoder.decode_many(&buf, own, broadcast);
                        buf.drain(..consumed);
                        for result in results {
                            match result {
                                Ok(msg) => {
                                    let handlers = handlers.lock().expect("handler table mutex poisoned");
                                    crate::dispatch::route(pending, &handlers, send_handle, msg);
                                },
                                Err(ProtocolError::AddressMismatch { .. }) => {},
                                Err(err) => warn!(error = %err, "dropping malformed frame"),
                            }
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "read failed, retrying next poll");
                        thread::sleep(POLL_INTERVAL);
                    },
                }
            },
            Err(err) => {
                warn!(error = %err, "availability check failed, retrying next poll");
                thread::sleep(POLL_INTERVAL);
            },
        }
    }

    debug!("receiver worker observed stop flag, exiting");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use mbus_proto::xbee;

    use super::*;
    use crate::link::LoopbackLink;

    struct XbeeTestDecoder;
    impl FrameDecoder for XbeeTestDecoder {
        fn decode_many(&self, buf: &[u8], own: u16, broadcast: u16) -> (Vec<std::result::Result<LogicalMessage, ProtocolError>>, usize) {
            xbee::decode_many(buf, own, broadcast)
        }
    }

    struct NoopHandle;
    impl SendHandle for NoopHandle {
        fn send_no_wait(&self, _receiver: u16, _function_code: u16, _message_id: u8, _is_response: bool, _payload: Vec<u8>) {}
    }

    #[test]
    fn worker_dispatches_frames_delivered_on_the_link() {
        let (local, remote) = LoopbackLink::pair();
        let link = Arc::new(Mutex::new(local));
        let decoder: Arc<dyn FrameDecoder> = Arc::new(XbeeTestDecoder);
        let pending = Arc::new(PendingResponses::new());
        let mut handlers = HandlerTable::new();
        let invoked = Arc::new(AtomicUsize::new(0));
        let invoked_clone = Arc::clone(&invoked);
        handlers.register(0x07, Box::new(move |_h, _m| {
            invoked_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let handlers = Arc::new(Mutex::new(handlers));

        let mut receiver = ReceiverHandle::idle();
        receiver
            .start(Arc::clone(&link), decoder, 0x03, 0xFF, Arc::clone(&pending), handlers, Arc::new(NoopHandle))
            .expect("starts cleanly");

        let msg = LogicalMessage::request(0x03, 0x01, 0x07, 0);
        let frame = xbee::encode(&msg).expect("encodes");
        let mut remote = remote;
        remote.write(&frame).expect("write succeeds");

        let deadline = std::time::Instant::now() + Duration::from_millis(500);
        while invoked.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(invoked.load(Ordering::SeqCst), 1);
        receiver.stop_and_join();
    }

    #[test]
    fn start_while_running_returns_already_listening() {
        let (local, _remote) = LoopbackLink::pair();
        let link = Arc::new(Mutex::new(local));
        let decoder: Arc<dyn FrameDecoder> = Arc::new(XbeeTestDecoder);
        let pending = Arc::new(PendingResponses::new());
        let handlers = Arc::new(Mutex::new(HandlerTable::new()));

        let mut receiver = ReceiverHandle::idle();
        receiver
            .start(Arc::clone(&link), Arc::clone(&decoder), 0x01, 0xFF, Arc::clone(&pending), Arc::clone(&handlers), Arc::new(NoopHandle))
            .expect("starts cleanly");

        let err = receiver
            .start(link, decoder, 0x01, 0xFF, pending, handlers, Arc::new(NoopHandle))
            .unwrap_err();
        assert!(matches!(err, BusError::AlreadyListening));

        receiver.stop_and_join();
    }

    #[test]
    fn stop_and_join_is_idempotent() {
        let mut receiver = ReceiverHandle::idle();
        receiver.stop_and_join();
        receiver.stop_and_join();
    }
}
