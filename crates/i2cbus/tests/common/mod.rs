//! Recording mock transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use i2cbus::Transport;
use parking_lot::Mutex;

pub const MOCK_BUSES: usize = 4;

/// One call observed at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open { bus: usize, address: u16 },
    Close { id: usize },
    Write { id: usize, bytes: Vec<u8>, locked: Option<bool> },
    Read { id: usize, len: usize, locked: Option<bool> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug)]
pub struct MockConn {
    pub id: usize,
    pub bus: usize,
    pub address: u16,
}

type Probe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Transport double that records every call.
///
/// Writes and reads can be slowed down with `latency` to widen race
/// windows; `overlaps` counts calls that started while another call on the
/// same bus was still in flight.
pub struct MockTransport {
    calls: Mutex<Vec<(Instant, Call)>>,
    next_id: AtomicUsize,
    in_flight: [AtomicUsize; MOCK_BUSES],
    overlaps: AtomicUsize,
    latency: Duration,
    fail_open: AtomicBool,
    fail_write: AtomicBool,
    fail_read: AtomicBool,
    short_write: Mutex<Option<usize>>,
    short_read: Mutex<Option<usize>>,
    reply: Mutex<Vec<u8>>,
    probe: Mutex<Option<Probe>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            in_flight: Default::default(),
            overlaps: AtomicUsize::new(0),
            latency,
            fail_open: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            fail_read: AtomicBool::new(false),
            short_write: Mutex::new(None),
            short_read: Mutex::new(None),
            reply: Mutex::new(Vec::new()),
            probe: Mutex::new(None),
        }
    }

    /// Make the next `open` fail.
    pub fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    /// Make the next `write` fail after it is recorded.
    pub fn fail_next_write(&self) {
        self.fail_write.store(true, Ordering::SeqCst);
    }

    /// Make the next `read` fail after it is recorded.
    pub fn fail_next_read(&self) {
        self.fail_read.store(true, Ordering::SeqCst);
    }

    /// Cap every write at `n` bytes.
    pub fn short_writes(&self, n: Option<usize>) {
        *self.short_write.lock() = n;
    }

    /// Cap every read at `n` bytes.
    pub fn short_reads(&self, n: Option<usize>) {
        *self.short_read.lock() = n;
    }

    /// Bytes handed out by reads, repeated as needed.
    pub fn set_reply(&self, bytes: &[u8]) {
        *self.reply.lock() = bytes.to_vec();
    }

    /// Sample `probe` on every write and read and store the result in the
    /// recorded call.
    pub fn set_probe(&self, probe: impl Fn() -> bool + Send + Sync + 'static) {
        *self.probe.lock() = Some(Arc::new(probe));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((Instant::now(), call));
    }

    fn sample(&self) -> Option<bool> {
        let probe = self.probe.lock().clone();
        probe.map(|p| p())
    }

    fn in_flight<R>(&self, bus: usize, f: impl FnOnce() -> R) -> R {
        if self.in_flight[bus].fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let result = f();
        self.in_flight[bus].fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl Transport for MockTransport {
    type Handle = MockConn;
    type Error = MockError;

    fn open(&self, bus: usize, address: u16) -> Result<MockConn, MockError> {
        self.record(Call::Open { bus, address });
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(MockError);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MockConn { id, bus, address })
    }

    fn close(&self, handle: MockConn) -> Result<(), MockError> {
        self.record(Call::Close { id: handle.id });
        Ok(())
    }

    fn write(
        &self,
        handle: &mut MockConn,
        buf: &[u8],
    ) -> Result<usize, MockError> {
        self.in_flight(handle.bus, || {
            let locked = self.sample();
            self.record(Call::Write {
                id: handle.id,
                bytes: buf.to_vec(),
                locked,
            });
            if self.fail_write.swap(false, Ordering::SeqCst) {
                return Err(MockError);
            }
            let cap = self.short_write.lock().unwrap_or(buf.len());
            Ok(buf.len().min(cap))
        })
    }

    fn read(
        &self,
        handle: &mut MockConn,
        buf: &mut [u8],
    ) -> Result<usize, MockError> {
        self.in_flight(handle.bus, || {
            let locked = self.sample();
            self.record(Call::Read { id: handle.id, len: buf.len(), locked });
            if self.fail_read.swap(false, Ordering::SeqCst) {
                return Err(MockError);
            }
            let cap = self.short_read.lock().unwrap_or(buf.len());
            let n = buf.len().min(cap);
            let reply = self.reply.lock();
            for (i, byte) in buf[..n].iter_mut().enumerate() {
                *byte = if reply.is_empty() {
                    0xEE
                } else {
                    reply[i % reply.len()]
                };
            }
            Ok(n)
        })
    }
}
