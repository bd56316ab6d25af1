// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Bus backends served by the privileged helper.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use ddc_app::normalize_name;
use ddc_core::{BusDescriptor, DdcResult, DynResult, TransferRequest};

mod dispatch;
mod dummy;
#[cfg(all(feature = "i2cdev", target_os = "linux"))]
mod i2c_dev;

pub use dispatch::Dispatcher;
pub use dummy::{DummyBus, DummyMonitor};

pub type BusFuture<'a, T> = Pin<Box<dyn Future<Output = DdcResult<T>> + Send + 'a>>;

/// Raw access to the I2C buses the helper is allowed to touch.
///
/// At most one bus is open at a time. Errors are reported as
/// `DdcError::Open` / `DdcError::Transfer` carrying the negative status that
/// goes back on the wire.
pub trait BusBackend: Send {
    fn name(&self) -> &str;

    fn enumerate<'a>(&'a mut self) -> BusFuture<'a, Vec<BusDescriptor>>;

    fn open<'a>(&'a mut self, bus: BusDescriptor) -> BusFuture<'a, ()>;

    /// Perform one transfer on the open bus.
    ///
    /// Returns the bytes read, or an empty buffer for writes.
    fn transfer<'a>(&'a mut self, request: TransferRequest) -> BusFuture<'a, Vec<u8>>;

    fn close<'a>(&'a mut self) -> BusFuture<'a, ()>;
}

/// Settings handed to backend factories; each backend reads what it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Directory scanned for `i2c-N` nodes.
    pub dev_dir: PathBuf,
    /// Number of emulated monitors exposed by the dummy backend.
    pub emulated_monitors: usize,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
            emulated_monitors: 2,
        }
    }
}

pub type BackendFactory = fn(&BackendOptions) -> DynResult<Box<dyn BusBackend>>;

/// Context for registering and instantiating bus backends.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, BackendFactory>,
}

impl RegistrationContext {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory under a stable name (e.g. "i2cdev").
    pub fn register_backend(&mut self, name: &str, factory: BackendFactory) {
        self.factories.insert(normalize_name(name), factory);
    }

    pub fn is_backend_registered(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_name(name))
    }

    /// List registered backend names.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate a backend by name.
    pub fn build_backend(
        &self,
        name: &str,
        options: &BackendOptions,
    ) -> DynResult<Box<dyn BusBackend>> {
        let factory = self
            .factories
            .get(&normalize_name(name))
            .ok_or_else(|| format!("Unknown bus backend: {}", name))?;
        factory(options)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Register all built-in backends available on this platform.
pub fn register_builtin_backends_on(context: &mut RegistrationContext) {
    context.register_backend("dummy", dummy_factory);
    #[cfg(all(feature = "i2cdev", target_os = "linux"))]
    context.register_backend("i2cdev", i2cdev_factory);
}

fn dummy_factory(options: &BackendOptions) -> DynResult<Box<dyn BusBackend>> {
    if options.emulated_monitors > 16 {
        return Err(format!(
            "dummy backend supports at most 16 monitors, got {}",
            options.emulated_monitors
        )
        .into());
    }
    Ok(Box::new(DummyBus::with_monitor_count(
        options.emulated_monitors,
    )))
}

#[cfg(all(feature = "i2cdev", target_os = "linux"))]
fn i2cdev_factory(options: &BackendOptions) -> DynResult<Box<dyn BusBackend>> {
    if !options.dev_dir.is_dir() {
        return Err(format!("{} is not a directory", options.dev_dir.display()).into());
    }
    Ok(Box::new(i2c_dev::I2cDevBus::new(options.dev_dir.clone())))
}
