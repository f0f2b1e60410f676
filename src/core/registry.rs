//! Process-wide named handler registry
//!
//! Lets unrelated code discover an already-installed pipeline handler by
//! its stable name, without being handed a reference explicitly. This is
//! the one intentional global in the crate.

use super::handler::QueueHandler;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

static REGISTRY: Lazy<RwLock<HashMap<String, QueueHandler>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Name -> handler lookup table with process lifetime.
///
/// The registry is a best-effort discovery mechanism, not an ownership
/// authority: registering under an existing name replaces the prior
/// mapping (last-writer-wins), and a stopped pipeline's handler stays
/// registered; its `enqueue` simply fails fast.
pub struct HandlerRegistry;

impl HandlerRegistry {
    /// Register a handler under `name`, replacing and returning any
    /// previous mapping. Last-writer-wins is documented behavior, not an
    /// error.
    pub fn register(name: impl Into<String>, handler: QueueHandler) -> Option<QueueHandler> {
        REGISTRY.write().insert(name.into(), handler)
    }

    /// Look up a handler by name.
    ///
    /// Returns `None` when nothing was installed under that name.
    /// Callers must handle absence; no default handler is fabricated.
    pub fn lookup(name: &str) -> Option<QueueHandler> {
        REGISTRY.read().get(name).cloned()
    }

    /// Remove and return the handler registered under `name`.
    pub fn unregister(name: &str) -> Option<QueueHandler> {
        REGISTRY.write().remove(name)
    }

    /// Whether a handler is registered under `name`.
    pub fn contains(name: &str) -> bool {
        REGISTRY.read().contains_key(name)
    }
}
