//! # Install Registry
//!
//! Tracks which process-wide hooks are installed and by whom.
//!
//! Crash reporting hooks into global handlers (signal handlers, the panic
//! hook, uncaught-exception handlers). Installing one twice chains the
//! handler into itself; installing it from two SDK instances makes them fight
//! over it. The registry gives every hook a key and records the owner that
//! installed it, so a repeated install from the same owner is a no-op and a
//! competing install is refused with a descriptive error.
//!
//! The registry is an ordinary value. Hosts that need one per process keep
//! it in their own `static`.
//!
//! ## Example
//!
//! ```rust
//! use stackmark_core::registry::InstallRegistry;
//!
//! let registry = InstallRegistry::new();
//! registry.install("panic_hook", 1).unwrap();
//! registry.install("panic_hook", 1).unwrap(); // idempotent
//! assert!(registry.install("panic_hook", 2).is_err());
//!
//! registry.uninstall("panic_hook", 1);
//! assert!(!registry.is_installed("panic_hook"));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{Result, StackmarkError};

/// Mutex-guarded map of installed hook keys to their owners.
#[derive(Debug, Default)]
pub struct InstallRegistry
{
    installed: Mutex<HashMap<String, u64>>,
}

impl InstallRegistry
{
    /// Empty registry.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record that `owner` installed the hook `key`.
    ///
    /// ## Parameters
    ///
    /// - `key`: Name of the hook (e.g. `"sigsegv"`, `"panic_hook"`)
    /// - `owner`: Identifier of the installing instance
    ///
    /// ## Returns
    ///
    /// `Ok(())` if the hook is now held by `owner`, including when it already
    /// was.
    ///
    /// ## Errors
    ///
    /// - `StackmarkError::InvalidArgument`: `key` is empty
    /// - `StackmarkError::AlreadyInstalled`: another owner holds the hook
    pub fn install(&self, key: &str, owner: u64) -> Result<()>
    {
        if key.is_empty() {
            return Err(StackmarkError::InvalidArgument("hook key must not be empty".into()));
        }

        let mut installed = self.lock();
        match installed.get(key) {
            Some(&current) if current == owner => Ok(()),
            Some(&current) => {
                warn!(key, owner, current, "refusing competing hook install");
                Err(StackmarkError::AlreadyInstalled {
                    key: key.to_owned(),
                    owner: current,
                })
            }
            None => {
                installed.insert(key.to_owned(), owner);
                debug!(key, owner, "hook installed");
                Ok(())
            }
        }
    }

    /// Release the hook `key` if `owner` holds it.
    ///
    /// Returns whether the hook was released. Releasing a hook that is not
    /// installed, or that another owner holds, changes nothing.
    pub fn uninstall(&self, key: &str, owner: u64) -> bool
    {
        let mut installed = self.lock();
        if installed.get(key) != Some(&owner) {
            return false;
        }

        installed.remove(key);
        debug!(key, owner, "hook uninstalled");
        true
    }

    /// Whether any owner holds the hook `key`.
    pub fn is_installed(&self, key: &str) -> bool
    {
        self.lock().contains_key(key)
    }

    /// The owner holding the hook `key`.
    pub fn owner(&self, key: &str) -> Option<u64>
    {
        self.lock().get(key).copied()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>>
    {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
