//! Pacing between steps
//!
//! Every step shares one rate budget with the remote model, so the engine
//! pauses after each step except the last. How long is decided by a
//! `CooldownPolicy`; a step's own `cooldown_after_secs` takes precedence.

use std::time::Duration;

/// Decides how long to pause after a step
pub trait CooldownPolicy: Send + Sync {
    /// Pause after the 1-based `step_index` completes
    fn cooldown(&self, step_index: usize) -> Duration;
}

/// The same pause after every step
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown(pub Duration);

impl FixedCooldown {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl CooldownPolicy for FixedCooldown {
    fn cooldown(&self, _step_index: usize) -> Duration {
        self.0
    }
}

/// No pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCooldown;

impl CooldownPolicy for NoCooldown {
    fn cooldown(&self, _step_index: usize) -> Duration {
        Duration::ZERO
    }
}
