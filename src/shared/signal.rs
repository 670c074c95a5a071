use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Cooperative stop request shared between the Ctrl-C handler and a conversion loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    // Route Ctrl-C into a fresh flag. Only one handler may be installed per process.
    pub fn install_ctrlc() -> Result<Self> {
        let flag = Self::new();
        let for_signal = flag.clone();
        ctrlc::set_handler(move || for_signal.stop())
            .context("installing Ctrl-C handler failed")?;
        Ok(flag)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_stop() {
        let flag = StopFlag::new();
        let worker_view = flag.clone();
        assert!(!worker_view.is_stopped());
        flag.stop();
        assert!(worker_view.is_stopped());
    }
}
