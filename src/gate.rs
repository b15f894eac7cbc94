use std::sync::atomic::{AtomicBool, Ordering};

/// Admits one analysis at a time. The webview can fire the trigger again
/// while a stream is still running; the second call is turned away.
#[derive(Debug, Default)]
pub struct AnalysisGate {
    busy: AtomicBool,
}

impl AnalysisGate {
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { gate: self })
    }
}

/// Releases the gate when dropped, including on early returns.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a AnalysisGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
