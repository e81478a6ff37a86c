//! Client-side minimum spacing between AI calls.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{ForgeError, Result};

/// Rejects a call made within `min_interval` of the previously admitted one.
///
/// This is a guard, not a queue: a rejected call is not remembered and the
/// caller is expected to surface a "wait and retry" message.
#[derive(Debug)]
pub struct CallThrottle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl CallThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Admits a call happening now.
    pub fn check(&self) -> Result<()> {
        self.check_at(Instant::now())
    }

    /// Admits a call happening at `now`, recording it on success.
    pub fn check_at(&self, now: Instant) -> Result<()> {
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last_call {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.min_interval {
                return Err(ForgeError::rate_limited(
                    "Please wait a moment before trying again.",
                    Some(self.min_interval - elapsed),
                ));
            }
        }

        *last_call = Some(now);
        Ok(())
    }

    /// Forgets the last admitted call.
    pub fn reset(&self) {
        *self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
