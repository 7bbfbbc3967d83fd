//! Error types for sdrlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Address parsing, connection setup,
//! data-path and registry failures are all captured here.
//!
//! Requests for values a device cannot achieve (an unsupported sample rate,
//! an out-of-range frequency) are not errors: setters leave state unchanged
//! and return the previous value.

/// The error type for all sdrlib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A device address string violated the `key=value` grammar.
    #[error("malformed device address: {0}")]
    MalformedAddress(String),

    /// A socket could not be created or connected.
    ///
    /// Fatal to driver construction; no partially connected driver exists.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// A transport-level error other than a connect failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection to the remote server was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// An invalid parameter was passed, such as a channel index the device
    /// does not have.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A backend's device probe failed.
    ///
    /// The device registry absorbs this and treats the backend as having
    /// found zero devices.
    #[error("backend probe failed: {0}")]
    BackendProbe(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_malformed_address() {
        let e = Error::MalformedAddress("token 'foo' has no '='".into());
        assert_eq!(
            e.to_string(),
            "malformed device address: token 'foo' has no '='"
        );
    }

    #[test]
    fn error_display_connection_failure() {
        let e = Error::ConnectionFailure("could not connect to 10.0.0.1:1001".into());
        assert_eq!(
            e.to_string(),
            "connection failure: could not connect to 10.0.0.1:1001"
        );
    }

    #[test]
    fn error_display_connection_lost() {
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("channel 3 out of range".into());
        assert_eq!(e.to_string(), "invalid parameter: channel 3 out of range");
    }

    #[test]
    fn error_display_backend_probe() {
        let e = Error::BackendProbe("usb enumeration failed".into());
        assert_eq!(e.to_string(), "backend probe failed: usb enumeration failed");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
