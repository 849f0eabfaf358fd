//! One-shot flush at startup

use std::sync::atomic::{AtomicBool, Ordering};

use super::FlushPolicy;

/// Answers `true` to the first `should_flush` call, then `false` forever
///
/// `reset` does not re-arm the policy, so it fires once per process even
/// across pipeline restarts.
#[derive(Debug, Default)]
pub struct StartupPolicy {
    fired: AtomicBool,
}

impl StartupPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlushPolicy for StartupPolicy {
    fn name(&self) -> &'static str {
        "startup"
    }

    fn should_flush(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }
}
