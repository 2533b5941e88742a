//! The minimal transport interface both bindings and tests implement.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
};

/// What the codec/receiver loop needs from an underlying device.
///
/// `mbus-can` and `mbus-xbee` implement this over a raw CAN socket and a
/// serial port respectively. Neither blocks: `available` and `read_into`
/// are polled by the receiver loop on its own ≤10ms cadence.
pub trait Link: Send {
    /// Number of bytes immediately available to read, without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` currently-available bytes. Returns the
    /// number of bytes actually read; may be fewer than `buf.len()`.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `bytes` to the link. Returns the number of bytes written.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Close the underlying device. Idempotent.
    fn close(&mut self) -> io::Result<()>;
}

#[derive(Debug, Default)]
struct Shared {
    inbox: VecDeque<u8>,
    closed: bool,
}

/// The writable half of an in-memory duplex pipe, handed to whatever is
/// standing in for "the peer" in a test.
#[derive(Debug, Clone)]
pub struct LoopbackPeer {
    inner: Arc<Mutex<Shared>>,
}

impl LoopbackPeer {
    /// Push bytes into this link's read side, as if received from the wire.
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    pub fn deliver(&self, bytes: &[u8]) {
        let mut shared = self.inner.lock().expect("loopback peer mutex poisoned");
        shared.inbox.extend(bytes);
    }
}

/// An in-memory, non-blocking [`Link`] used by tests in place of a real
/// CAN socket or serial port.
///
/// `LoopbackLink::pair()` returns two ends; writing to one makes the
/// bytes available to read on the other, modeling a back-to-back wire
/// with no real device in between.
#[derive(Debug)]
pub struct LoopbackLink {
    read_side: Arc<Mutex<Shared>>,
    write_side: Arc<Mutex<Shared>>,
}

impl LoopbackLink {
    /// Create two connected ends: writing to `a` is readable from `b`, and
    /// vice versa.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(Shared::default()));
        let b_to_a = Arc::new(Mutex::new(Shared::default()));

        let a = Self { read_side: Arc::clone(&b_to_a), write_side: Arc::clone(&a_to_b) };
        let b = Self { read_side: b_to_a, write_side: a_to_b };
        (a, b)
    }

    /// A handle to this link's read side, for injecting bytes directly
    /// (bypassing the paired write side) from test code.
    #[must_use]
    pub fn peer_handle(&self) -> LoopbackPeer {
        LoopbackPeer { inner: Arc::clone(&self.read_side) }
    }
}

impl Link for LoopbackLink {
    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn available(&mut self) -> io::Result<usize> {
        let shared = self.read_side.lock().expect("loopback mutex poisoned");
        Ok(shared.inbox.len())
    }

    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.read_side.lock().expect("loopback mutex poisoned");
        let n = shared.inbox.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = shared.inbox.pop_front().expect("checked length above");
        }
        Ok(n)
    }

    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut shared = self.write_side.lock().expect("loopback mutex poisoned");
        if shared.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "loopback link closed"));
        }
        shared.inbox.extend(bytes);
        Ok(bytes.len())
    }

    #[allow(clippy::expect_used, reason = "lock poisoning means a prior panic already corrupted shared state")]
    fn close(&mut self) -> io::Result<()> {
        self.write_side.lock().expect("loopback mutex poisoned").closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_delivers_bytes_across_ends() {
        let (mut a, mut b) = LoopbackLink::pair();
        a.write(&[1, 2, 3]).expect("write succeeds");

        assert_eq!(b.available().expect("available succeeds"), 3);
        let mut buf = [0u8; 3];
        let n = b.read_into(&mut buf).expect("read succeeds");
        assert_eq!(n, 3);
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn partial_read_retains_remaining_bytes() {
        let (mut a, mut b) = LoopbackLink::pair();
        a.write(&[1, 2, 3, 4]).expect("write succeeds");

        let mut buf = [0u8; 2];
        assert_eq!(b.read_into(&mut buf).expect("read succeeds"), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(b.available().expect("available succeeds"), 2);
    }

    #[test]
    fn write_after_close_fails() {
        let (mut a, _b) = LoopbackLink::pair();
        a.close().expect("close succeeds");
        assert!(a.write(&[1]).is_err());
    }

    #[test]
    fn peer_handle_injects_bytes_directly() {
        let (a, mut _b) = LoopbackLink::pair();
        let mut a = a;
        let peer = a.peer_handle();
        peer.deliver(&[9, 9]);
        assert_eq!(a.available().expect("available succeeds"), 2);
    }
}
