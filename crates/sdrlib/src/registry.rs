//! Device registry -- aggregates the devices every compiled-in backend can
//! offer into one ordered list.
//!
//! The registry performs no I/O itself; it calls each backend's probe in
//! registration order and parses the returned address strings. Probes may
//! open and close hardware handles that are not reentrant, so every
//! [`find`](DeviceRegistry::find) in the process is serialized behind one
//! lock. A probe that fails or panics counts as zero devices for that
//! backend and does not stop the scan.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use sdrlib_core::DeviceArgs;
use sdrlib_core::error::{Error, Result};

/// Enumerates the address strings a backend can offer.
///
/// Receives the caller's hint so that a backend can honor keys such as
/// `fake`.
pub type ProbeFn = fn(&DeviceArgs) -> Result<Vec<String>>;

/// Process-wide guard held for the duration of each `find()`.
static ENUMERATION_LOCK: Mutex<()> = Mutex::new(());

/// One backend known to the registry.
#[derive(Debug, Clone, Copy)]
pub struct Backend {
    /// Human-readable backend name, for logging.
    pub name: &'static str,
    /// Address key that selects this backend, e.g. `"redpitaya"`.
    pub key: &'static str,
    pub probe: ProbeFn,
}

/// Ordered list of backends to enumerate.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    backends: Vec<Backend>,
}

impl DeviceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        DeviceRegistry {
            backends: Vec::new(),
        }
    }

    /// A registry holding every backend enabled by cargo features.
    pub fn with_compiled_backends() -> Self {
        #[allow(unused_mut)]
        let mut registry = DeviceRegistry::new();

        #[cfg(feature = "redpitaya")]
        registry.register(Backend {
            name: "Red Pitaya",
            key: sdrlib_redpitaya::ARG_KEY,
            probe: |hint| sdrlib_redpitaya::get_devices(hint.contains_key("fake")),
        });

        registry
    }

    /// Append a backend; enumeration follows registration order.
    pub fn register(&mut self, backend: Backend) {
        self.backends.push(backend);
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Enumerate devices from every selected backend.
    ///
    /// If `hint` contains the key of any registered backend, only those
    /// backends are probed; otherwise all are. Results are concatenated in
    /// registration order with no deduplication across backends.
    pub fn find(&self, hint: &DeviceArgs) -> Vec<DeviceArgs> {
        let _guard = ENUMERATION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let named: Vec<&Backend> = self
            .backends
            .iter()
            .filter(|b| hint.contains_key(b.key))
            .collect();
        let selected: Vec<&Backend> = if named.is_empty() {
            self.backends.iter().collect()
        } else {
            named
        };

        let mut devices = Vec::new();
        for backend in selected {
            let addresses = match probe_isolated(backend, hint) {
                Ok(addresses) => addresses,
                Err(e) => {
                    tracing::warn!(backend = backend.name, error = %e, "Device probe failed, skipping backend");
                    continue;
                }
            };

            tracing::debug!(backend = backend.name, count = addresses.len(), "Backend probed");

            for address in addresses {
                match DeviceArgs::parse(&address) {
                    Ok(args) => devices.push(args),
                    Err(e) => {
                        tracing::warn!(
                            backend = backend.name,
                            address = %address,
                            error = %e,
                            "Skipping unparsable device address"
                        );
                    }
                }
            }
        }

        devices
    }
}

/// Run a probe, turning a panic into [`Error::BackendProbe`].
fn probe_isolated(backend: &Backend, hint: &DeviceArgs) -> Result<Vec<String>> {
    panic::catch_unwind(AssertUnwindSafe(|| (backend.probe)(hint))).unwrap_or_else(|_| {
        Err(Error::BackendProbe(format!(
            "{} probe panicked",
            backend.name
        )))
    })
}

/// Enumerate devices from every compiled-in backend.
///
/// # Example
///
/// ```
/// use sdrlib::DeviceArgs;
///
/// let hint = DeviceArgs::parse("fake=1").unwrap();
/// for device in sdrlib::find(&hint) {
///     println!("{}", device.to_pretty_string());
/// }
/// ```
pub fn find(hint: &DeviceArgs) -> Vec<DeviceArgs> {
    DeviceRegistry::with_compiled_backends().find(hint)
}
