//! Render gate: a shared flag that stops frame production.
//!
//! Closing the window, losing the surface, or a fatal frame error all close
//! the gate. Anything holding a clone (the redraw handler, deferred GPU
//! callbacks) checks it before touching the device, so no work lands on a
//! context that is being torn down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheap-to-clone cancellation token. Starts open; closing is permanent.
#[derive(Debug, Clone)]
pub struct RenderGate {
    open: Arc<AtomicBool>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_starts_open() {
        assert!(RenderGate::new().is_open());
    }

    /// Clones observe a close from any holder.
    #[test]
    fn test_close_is_shared() {
        let gate = RenderGate::new();
        let clone = gate.clone();
        clone.close();
        assert!(!gate.is_open());
        assert!(!clone.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let gate = RenderGate::new();
        gate.close();
        gate.close();
        assert!(!gate.is_open());
    }
}
