use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{SketchError, SketchResult};

/// How often a transient encoder failure may be retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retries.
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub const NEVER: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        backoff_ms: 0,
    };

    pub fn validate(&self) -> SketchResult<()> {
        if self.max_attempts == 0 {
            return Err(SketchError::input("retry max_attempts must be >= 1"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Run `op`, retrying only errors that report themselves transient.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> SketchResult<T>) -> SketchResult<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts && e.is_transient() => {
                    tracing::warn!(
                        operation = what,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "transient failure, retrying"
                    );
                    attempt += 1;
                    if self.backoff_ms > 0 {
                        std::thread::sleep(self.backoff());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
