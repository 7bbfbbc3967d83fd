//! Recording mock transport.
//!
//! [`MockTransport`] implements the [`Transport`] trait entirely in memory.
//! Everything sent through it is recorded, inbound bytes are scripted with
//! [`queue_inbound`](MockTransport::queue_inbound), and send failures can be
//! injected. Because drivers take ownership of their transports, inspection
//! goes through a cloned [`MockHandle`].
//!
//! # Example
//!
//! ```
//! use sdrlib_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! let handle = mock.handle();
//! mock.queue_inbound(&[0, 0, 128, 63, 0, 0, 0, 0]);
//! // ... hand `mock` to a driver, then inspect `handle.sent_words()` ...
//! # let _ = handle;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use sdrlib_core::error::{Error, Result};
use sdrlib_core::transport::Transport;

/// Shared, ordered record of release events across several mocks.
///
/// Each entry is the label of a transport at the moment it was first closed
/// or, if never closed, dropped.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct MockState {
    label: String,
    /// One entry per `send()` call.
    sent: Vec<Vec<u8>>,
    /// Bytes returned by subsequent `receive()` calls.
    inbound: VecDeque<u8>,
    connected: bool,
    fail_sends: bool,
    journal: Option<Journal>,
}

/// An in-memory [`Transport`] that records what is sent through it.
///
/// `receive()` drains the scripted inbound bytes; once they are exhausted it
/// returns [`Error::ConnectionLost`], as a TCP peer at end-of-stream would.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Inspection handle onto a [`MockTransport`] that has been moved elsewhere.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                label: "mock".to_string(),
                sent: Vec::new(),
                inbound: VecDeque::new(),
                connected: true,
                fail_sends: false,
                journal: None,
            })),
        }
    }

    /// Name this transport and record its release in `journal`.
    pub fn with_journal(self, label: &str, journal: &Journal) -> Self {
        {
            let mut state = lock(&self.state);
            state.label = label.to_string();
            state.journal = Some(Arc::clone(journal));
        }
        self
    }

    /// Get an inspection handle that stays valid after the mock is moved.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Append bytes for subsequent `receive()` calls.
    pub fn queue_inbound(&self, data: &[u8]) {
        self.handle().queue_inbound(data);
    }

    /// Make subsequent `send()` calls fail with [`Error::ConnectionLost`].
    pub fn set_fail_sends(&self, fail: bool) {
        self.handle().set_fail_sends(fail);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Append bytes for subsequent `receive()` calls.
    pub fn queue_inbound(&self, data: &[u8]) {
        lock(&self.state).inbound.extend(data.iter().copied());
    }

    /// Make subsequent `send()` calls fail with [`Error::ConnectionLost`].
    pub fn set_fail_sends(&self, fail: bool) {
        lock(&self.state).fail_sends = fail;
    }

    /// All data sent so far, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    /// All data sent so far, decoded as big-endian 32-bit words.
    ///
    /// Trailing bytes that do not form a whole word are ignored.
    pub fn sent_words(&self) -> Vec<u32> {
        let bytes: Vec<u8> = lock(&self.state).sent.concat();
        bytes
            .chunks_exact(4)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
            .collect()
    }

    /// Whether the transport is still open.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

/// Mark the transport closed, journaling the first release only.
fn release(state: &Mutex<MockState>) {
    let mut state = lock(state);
    if state.connected {
        state.connected = false;
        if let Some(journal) = &state.journal {
            journal
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(state.label.clone());
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_sends {
            return Err(Error::ConnectionLost);
        }
        state.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.inbound.is_empty() {
            return Err(Error::ConnectionLost);
        }
        let n = state.inbound.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        release(&self.state);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        release(&self.state);
    }
}
