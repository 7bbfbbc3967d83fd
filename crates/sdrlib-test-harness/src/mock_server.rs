//! Mock two-socket streaming server for protocol-level testing.
//!
//! [`MockStreamServer`] imitates a remote tuner/streaming server that
//! expects two TCP connections to the same port, each opened with a 4-byte
//! big-endian role word (0 = control, 1 = data). It writes a scripted sample
//! payload to the data connection and records every command word received
//! on the control connection until the client closes it.
//!
//! # Example
//!
//! ```
//! use sdrlib_test_harness::MockStreamServer;
//!
//! # async fn example() -> sdrlib_core::Result<()> {
//! let mut server = MockStreamServer::new().await?;
//! server.data_payload(&[0u8; 64]);
//! let addr = server.addr().to_string();
//! server.start();
//! // ... connect a driver to `addr`, tune it, close it ...
//! let recording = server.wait().await.expect("server failed");
//! assert_eq!(recording.handshakes, vec![0, 1]);
//! # Ok(())
//! # }
//! ```

use sdrlib_core::error::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the server observed during one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    /// Role words in the order the connections were accepted.
    pub handshakes: Vec<u32>,
    /// Command words received on the control connection, in order.
    pub commands: Vec<u32>,
}

/// A loopback server speaking the control/data handshake.
pub struct MockStreamServer {
    /// The address the server is listening on (e.g. "127.0.0.1:54321").
    addr: String,
    /// Held from `new()` until `start()` so that no client can race the bind.
    listener: Option<TcpListener>,
    /// Bytes written to the data connection once both handshakes are in.
    payload: Vec<u8>,
    server_handle: Option<JoinHandle<std::result::Result<Recording, String>>>,
}

impl MockStreamServer {
    /// Bind a new mock server on a random loopback port.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock server: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            payload: Vec::new(),
            server_handle: None,
        })
    }

    /// Get the address the server is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Append bytes to send on the data connection.
    pub fn data_payload(&mut self, bytes: &[u8]) {
        self.payload.extend_from_slice(bytes);
    }

    /// Start accepting the two connections in a background task.
    ///
    /// Call [`wait`](Self::wait) after the client has closed its control
    /// connection to collect the [`Recording`].
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let payload = std::mem::take(&mut self.payload);

        let handle = tokio::spawn(async move {
            let mut recording = Recording::default();
            let mut control: Option<TcpStream> = None;
            let mut data: Option<TcpStream> = None;

            for i in 0..2 {
                let (mut stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| format!("connection {i}: accept failed: {e}"))?;

                let mut word = [0u8; 4];
                stream
                    .read_exact(&mut word)
                    .await
                    .map_err(|e| format!("connection {i}: no handshake: {e}"))?;
                let role = u32::from_be_bytes(word);
                recording.handshakes.push(role);

                match role {
                    0 => control = Some(stream),
                    1 => data = Some(stream),
                    other => return Err(format!("connection {i}: unknown role {other}")),
                }
            }

            let mut control = control.ok_or("no control connection")?;
            let mut data = data.ok_or("no data connection")?;

            data.write_all(&payload)
                .await
                .map_err(|e| format!("data write error: {e}"))?;
            data.flush()
                .await
                .map_err(|e| format!("data flush error: {e}"))?;

            let mut bytes = Vec::new();
            control
                .read_to_end(&mut bytes)
                .await
                .map_err(|e| format!("control read error: {e}"))?;

            if bytes.len() % 4 != 0 {
                return Err(format!(
                    "control stream ended mid-word after {} bytes",
                    bytes.len()
                ));
            }
            recording.commands = bytes
                .chunks_exact(4)
                .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
                .collect();

            Ok(recording)
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the session to end and return what was recorded.
    pub async fn wait(self) -> std::result::Result<Recording, String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?,
            None => Err("server was never started".to_string()),
        }
    }
}
