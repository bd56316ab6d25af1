// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Control change notifications.
//!
//! Listeners are told about writes only after the display acknowledged them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::control::ControlChanged;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Trait for components that want to receive control events.
pub trait ControlListener: Send + Sync {
    /// Called after a control write completed successfully.
    fn on_control_changed(&self, _event: &ControlChanged) {}
}

/// Manages registered listeners and dispatches events.
pub struct ControlEventEmitter {
    listeners: Vec<(ListenerId, Arc<dyn ControlListener>)>,
}

impl Default for ControlEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlEventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener to receive events.
    /// Returns an ID that can be used to unregister the listener.
    pub fn register(&mut self, listener: Arc<dyn ControlListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_control_changed(&self, event: &ControlChanged) {
        for (_, listener) in &self.listeners {
            listener.on_control_changed(event);
        }
    }
}
