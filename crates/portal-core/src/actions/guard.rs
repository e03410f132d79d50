use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::ActionKey;

/// Keys of actions whose remote call has not resolved yet.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check+insert. Hands the key back if it is already taken.
    pub fn try_acquire(&self, key: ActionKey) -> Result<InFlightGuard, ActionKey> {
        let mut keys = self.keys.lock();
        if keys.contains(&key) {
            return Err(key);
        }
        keys.insert(key.clone());
        Ok(InFlightGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn contains(&self, key: &ActionKey) -> bool {
        self.keys.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

/// Releases its key when dropped, on every exit path.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
    key: ActionKey,
}

impl InFlightGuard {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}
