//! RedPitayaBuilder -- fluent builder for constructing [`RedPitayaSource`]
//! instances.
//!
//! Separates configuration from construction so that callers can set the
//! server address (directly or from a parsed device address) before the
//! two TCP connections are opened.
//!
//! # Example
//!
//! ```no_run
//! use sdrlib_core::DeviceArgs;
//! use sdrlib_redpitaya::RedPitayaBuilder;
//!
//! # async fn example() -> sdrlib_core::Result<()> {
//! let args = DeviceArgs::parse("redpitaya=192.168.1.100:1001")?;
//! let source = RedPitayaBuilder::from_args(&args)?.build().await?;
//! # Ok(())
//! # }
//! ```

use sdrlib_core::DeviceArgs;
use sdrlib_core::error::{Error, Result};
use sdrlib_core::transport::Transport;
use sdrlib_transport::TcpTransport;

use crate::protocol::{self, DEFAULT_HOST, DEFAULT_PORT, SocketRole};
use crate::source::{RedPitayaSource, SessionState};

/// Device address key selecting this backend; its value is `host[:port]`.
pub const ARG_KEY: &str = "redpitaya";

/// Pre-connected transports for constructing a [`RedPitayaSource`] without
/// opening sockets, e.g. `MockTransport`s from `sdrlib-test-harness`.
pub struct RedPitayaTransports {
    /// Connection that will carry tuning commands.
    pub control: Box<dyn Transport>,
    /// Connection that will carry the sample stream.
    pub data: Box<dyn Transport>,
}

/// Fluent builder for [`RedPitayaSource`].
#[derive(Debug, Clone)]
pub struct RedPitayaBuilder {
    host: String,
    port: u16,
}

impl RedPitayaBuilder {
    /// Create a builder targeting the default server address.
    pub fn new() -> Self {
        RedPitayaBuilder {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    /// Configure from a device address carrying `redpitaya=host[:port]`.
    ///
    /// An empty host or a port of `0` keep the defaults, as does a value
    /// with more than one `:`. A port that is not a number is
    /// [`Error::MalformedAddress`]. Without the key, defaults are used.
    pub fn from_args(args: &DeviceArgs) -> Result<Self> {
        let mut builder = RedPitayaBuilder::new();

        if let Some(value) = args.get(ARG_KEY) {
            let tokens: Vec<&str> = value.split(':').collect();

            if tokens.len() <= 2 {
                builder = builder.host(tokens[0]);
            }
            if let [_, port] = tokens.as_slice() {
                let port = port.parse::<u16>().map_err(|e| {
                    Error::MalformedAddress(format!("invalid port '{port}' in '{value}': {e}"))
                })?;
                builder = builder.port(port);
            }
        }

        Ok(builder)
    }

    /// Set the server host name or IP address. Empty keeps the default.
    pub fn host(mut self, host: &str) -> Self {
        self.host = if host.is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            host.to_string()
        };
        self
    }

    /// Set the server TCP port. `0` keeps the default.
    pub fn port(mut self, port: u16) -> Self {
        self.port = if port == 0 { DEFAULT_PORT } else { port };
        self
    }

    /// The `host:port` both connections are opened to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the control and data connections and perform the handshakes.
    ///
    /// The control connection is opened and announced first, then the data
    /// connection. If anything fails, every connection opened so far is
    /// closed before the error is returned.
    pub async fn build(self) -> Result<RedPitayaSource> {
        self.build_with_connector(|addr| async move {
            let transport = TcpTransport::connect(&addr).await?;
            Ok::<_, Error>(Box::new(transport) as Box<dyn Transport>)
        })
        .await
    }

    /// Like [`build`](Self::build), but each connection is opened by
    /// calling `connect` with the `host:port` address.
    ///
    /// `connect` is called once for the control role and then once for the
    /// data role.
    pub async fn build_with_connector<F, Fut>(self, mut connect: F) -> Result<RedPitayaSource>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Box<dyn Transport>>>,
    {
        let addr = self.addr();

        let control = open_role(&mut connect, &addr, SocketRole::Control).await?;
        let data = match open_role(&mut connect, &addr, SocketRole::Data).await {
            Ok(data) => data,
            Err(e) => {
                close_quietly(control, SocketRole::Control).await;
                return Err(e);
            }
        };

        tracing::info!(addr = %addr, state = %SessionState::Streaming, "Red Pitaya source ready");
        Ok(RedPitayaSource::new(addr, control, data))
    }

    /// Build from pre-connected transports, performing both handshakes.
    ///
    /// On a handshake failure both transports are closed, data first.
    pub async fn build_with_transport(
        self,
        transports: RedPitayaTransports,
    ) -> Result<RedPitayaSource> {
        let RedPitayaTransports {
            mut control,
            mut data,
        } = transports;

        tracing::debug!(state = %SessionState::Handshaking, "Announcing socket roles");

        let result = match handshake(control.as_mut(), SocketRole::Control).await {
            Ok(()) => handshake(data.as_mut(), SocketRole::Data).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            close_quietly(data, SocketRole::Data).await;
            close_quietly(control, SocketRole::Control).await;
            return Err(e);
        }

        Ok(RedPitayaSource::new(self.addr(), control, data))
    }
}

impl Default for RedPitayaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Connect one socket and announce its role.
async fn open_role<F, Fut>(
    connect: &mut F,
    addr: &str,
    role: SocketRole,
) -> Result<Box<dyn Transport>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Box<dyn Transport>>>,
{
    tracing::debug!(addr = %addr, role = %role, state = %SessionState::Connecting, "Opening connection");
    let mut transport = connect(addr.to_string()).await?;

    tracing::debug!(addr = %addr, role = %role, state = %SessionState::Handshaking, "Sending handshake");
    if let Err(e) = handshake(transport.as_mut(), role).await {
        close_quietly(transport, role).await;
        return Err(e);
    }
    Ok(transport)
}

async fn handshake(transport: &mut dyn Transport, role: SocketRole) -> Result<()> {
    transport.send(&protocol::encode(role.word())).await
}

async fn close_quietly(mut transport: Box<dyn Transport>, role: SocketRole) {
    if let Err(e) = transport.close().await {
        tracing::warn!(role = %role, error = %e, "Failed to close connection during cleanup");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdrlib_test_harness::{Journal, MockTransport};
    use std::collections::VecDeque;

    type Dialed = VecDeque<Result<Box<dyn Transport>>>;

    fn connected(mock: MockTransport) -> Result<Box<dyn Transport>> {
        Ok(Box::new(mock))
    }

    #[test]
    fn defaults() {
        let builder = RedPitayaBuilder::new();
        assert_eq!(builder.addr(), "192.168.1.100:1001");
    }

    #[test]
    fn from_args_host_and_port() {
        let args = DeviceArgs::parse("redpitaya=10.0.0.7:2002").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "10.0.0.7:2002");
    }

    #[test]
    fn from_args_host_only() {
        let args = DeviceArgs::parse("redpitaya=rp-f0abcd.local").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "rp-f0abcd.local:1001");
    }

    #[test]
    fn from_args_empty_host_and_zero_port_fall_back() {
        let args = DeviceArgs::parse("redpitaya=:0").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "192.168.1.100:1001");

        let args = DeviceArgs::parse("redpitaya=").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "192.168.1.100:1001");
    }

    #[test]
    fn from_args_too_many_colons_keeps_defaults() {
        let args = DeviceArgs::parse("redpitaya=a:b:c").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "192.168.1.100:1001");
    }

    #[test]
    fn from_args_bad_port_is_malformed() {
        let args = DeviceArgs::parse("redpitaya=10.0.0.7:http").unwrap();
        assert!(matches!(
            RedPitayaBuilder::from_args(&args),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn from_args_without_key_uses_defaults() {
        let args = DeviceArgs::parse("label=bench").unwrap();
        let builder = RedPitayaBuilder::from_args(&args).unwrap();
        assert_eq!(builder.addr(), "192.168.1.100:1001");
    }

    #[tokio::test]
    async fn build_with_transport_sends_role_handshakes() {
        let control = MockTransport::new();
        let data = MockTransport::new();
        let (control_log, data_log) = (control.handle(), data.handle());

        let source = RedPitayaBuilder::new()
            .build_with_transport(RedPitayaTransports {
                control: Box::new(control),
                data: Box::new(data),
            })
            .await
            .unwrap();

        assert_eq!(control_log.sent_words(), vec![0]);
        assert_eq!(data_log.sent_words(), vec![1]);
        assert_eq!(source.state().await, SessionState::Streaming);
    }

    #[tokio::test]
    async fn failed_data_handshake_closes_both_in_reverse_order() {
        let journal = Journal::default();
        let control = MockTransport::new().with_journal("control", &journal);
        let data = MockTransport::new().with_journal("data", &journal);
        data.set_fail_sends(true);
        let control_log = control.handle();

        let result = RedPitayaBuilder::new()
            .build_with_transport(RedPitayaTransports {
                control: Box::new(control),
                data: Box::new(data),
            })
            .await;

        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert!(!control_log.is_connected());
        assert_eq!(*journal.lock().unwrap(), vec!["data", "control"]);
    }

    #[tokio::test]
    async fn build_fails_when_nothing_listens() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = RedPitayaBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .build()
            .await;
        assert!(matches!(result, Err(Error::ConnectionFailure(_))));
    }

    #[tokio::test]
    async fn build_with_connector_opens_control_then_data() {
        let control = MockTransport::new();
        let data = MockTransport::new();
        let (control_log, data_log) = (control.handle(), data.handle());
        let mut pending: Dialed = VecDeque::from([connected(control), connected(data)]);
        let mut dialed = Vec::new();

        let source = RedPitayaBuilder::new()
            .host("10.0.0.9")
            .build_with_connector(|addr| {
                dialed.push(addr);
                let next = pending.pop_front().unwrap_or(Err(Error::NotConnected));
                async move { next }
            })
            .await
            .unwrap();

        assert_eq!(dialed, vec!["10.0.0.9:1001", "10.0.0.9:1001"]);
        assert_eq!(control_log.sent_words(), vec![0]);
        assert_eq!(data_log.sent_words(), vec![1]);
        assert_eq!(source.addr(), "10.0.0.9:1001");
    }

    #[tokio::test]
    async fn data_connect_failure_closes_control() {
        let journal = Journal::default();
        let control = MockTransport::new().with_journal("control", &journal);
        let control_log = control.handle();
        let mut pending: Dialed = VecDeque::from([
            connected(control),
            Err(Error::ConnectionFailure("connection refused".into())),
        ]);

        let result = RedPitayaBuilder::new()
            .build_with_connector(|_| {
                let next = pending.pop_front().unwrap_or(Err(Error::NotConnected));
                async move { next }
            })
            .await;

        assert!(matches!(result, Err(Error::ConnectionFailure(_))));
        assert_eq!(control_log.sent_words(), vec![0]);
        assert!(!control_log.is_connected());
        assert_eq!(*journal.lock().unwrap(), vec!["control"]);
    }

    #[tokio::test]
    async fn data_handshake_failure_on_connect_path_closes_both() {
        let journal = Journal::default();
        let control = MockTransport::new().with_journal("control", &journal);
        let data = MockTransport::new().with_journal("data", &journal);
        data.set_fail_sends(true);
        let mut pending: Dialed = VecDeque::from([connected(control), connected(data)]);

        let result = RedPitayaBuilder::new()
            .build_with_connector(|_| {
                let next = pending.pop_front().unwrap_or(Err(Error::NotConnected));
                async move { next }
            })
            .await;

        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(*journal.lock().unwrap(), vec!["data", "control"]);
    }

    #[tokio::test]
    async fn control_connect_failure_opens_nothing_else() {
        let mut calls = 0;
        let result = RedPitayaBuilder::new()
            .build_with_connector(|_| {
                calls += 1;
                async { Err::<Box<dyn Transport>, _>(Error::ConnectionFailure("no route to host".into())) }
            })
            .await;

        assert!(matches!(result, Err(Error::ConnectionFailure(_))));
        assert_eq!(calls, 1);
    }
}
