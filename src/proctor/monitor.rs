use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::runner::Inner;
use super::{IntegritySignal, SecurityWarning};

/// What a reported signal resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Dropped: the monitor is detached, the runner closed, the attempt is
    /// already over, or a submission is in flight.
    Ignored,
    /// Counted; the warning carries the remaining allowance.
    Warned(SecurityWarning),
    /// Counted; the violation limit was crossed and submission fired.
    AutoSubmitted,
}

/// Scoped observer handle for one test attempt. The host surface reports
/// every integrity signal through [`IntegrityMonitor::record`]; a handle
/// outliving its attempt goes inert instead of feeding the next one.
///
/// Dropping the handle detaches it.
pub struct IntegrityMonitor {
    runner: Arc<Inner>,
    attempt: u64,
    detached: AtomicBool,
}

impl IntegrityMonitor {
    pub(crate) fn new(runner: Arc<Inner>, attempt: u64) -> Self {
        Self {
            runner,
            attempt,
            detached: AtomicBool::new(false),
        }
    }

    /// Single registration path for all four signal classes.
    pub async fn record(&self, signal: IntegritySignal) -> SignalOutcome {
        if self.detached.load(Ordering::SeqCst) {
            return SignalOutcome::Ignored;
        }
        self.runner.register_violation(self.attempt, signal).await
    }

    /// Detaches the handle; further signals are dropped.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for IntegrityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityMonitor")
            .field("attempt", &self.attempt)
            .field("detached", &self.detached.load(Ordering::SeqCst))
            .finish()
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}
