//! Named savepoints.
//!
//! Every connection owns a [`SavepointStack`]. Whether a driver kind has a
//! native savepoint API is probed once per driver name and memoized in a
//! [`CapabilityCache`] shared by all connections; when the API is missing
//! the connection emulates savepoints with plain SQL (see
//! [`crate::connection::Connection::create_savepoint`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::driver::{Capability, Driver, NativeSavepoint};
use crate::error::{AdapterError, Result};

/// A live savepoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavepointEntry {
    pub name: String,
    /// Set when the savepoint was created through the driver API.
    pub native: Option<NativeSavepoint>,
}

/// The savepoints of one session, oldest first.
#[derive(Debug, Default)]
pub struct SavepointStack {
    entries: Vec<SavepointEntry>,
}

impl SavepointStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of live savepoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no savepoint is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is live.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Looks up a live savepoint.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SavepointEntry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// Names of live savepoints, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Pushes a new savepoint. A name that is already live is rejected.
    pub fn push(&mut self, entry: SavepointEntry) -> Result<()> {
        if self.contains(&entry.name) {
            return Err(AdapterError::state(format!(
                "could not create savepoint: '{}' (already set)",
                entry.name
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Drops every savepoint created after `name`; `name` stays live.
    /// Returns `false` when `name` is not live.
    pub fn truncate_after(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.entries.truncate(i + 1);
                true
            }
            None => false,
        }
    }

    /// Removes `name` and every savepoint created after it.
    pub fn remove(&mut self, name: &str) -> Option<SavepointEntry> {
        let i = self.position(name)?;
        self.entries.drain(i..).next()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}

/// Rejects savepoint names that could not be interpolated into SQL
/// verbatim: empty, not starting with a letter or underscore, or containing
/// anything but ASCII alphanumerics and underscores.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AdapterError::state(
            "create_savepoint (without name) not implemented!",
        ));
    }
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AdapterError::state(format!(
            "invalid savepoint name: '{name}' (expected [A-Za-z_][A-Za-z0-9_]*)"
        )));
    }
    Ok(())
}

/// Memo of capability probes, keyed by driver name.
///
/// Operator overrides live in [`crate::AdapterConfig::savepoints`] and are
/// consulted before the cache.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    probed: Mutex<HashMap<(String, Capability), bool>>,
}

static SHARED: OnceLock<Arc<CapabilityCache>> = OnceLock::new();

impl CapabilityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every connection of the process.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Answers whether `driver` has `capability`, probing at most once per
    /// driver name.
    pub fn supports(&self, driver: &dyn Driver, capability: Capability) -> bool {
        let key = (driver.name().to_string(), capability);
        let mut probed = self.probed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&known) = probed.get(&key) {
            return known;
        }
        let available = driver.probe(capability);
        debug!(driver = %key.0, ?capability, available, "capability probed");
        probed.insert(key, available);
        available
    }

    /// Returns the memoized answer without probing.
    #[must_use]
    pub fn cached(&self, driver_name: &str, capability: Capability) -> Option<bool> {
        self.probed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(driver_name.to_string(), capability))
            .copied()
    }
}
