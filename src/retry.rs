//! Retry bookkeeping for a single outstanding request.
//!
//! A request moves through `Attempting -> BackingOff -> Attempting` until it
//! either succeeds or runs out of attempts. The transitions here are pure; the
//! caller does the actual waiting.

use std::time::Duration;

/// Bounds for retrying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubled for each attempt after.
    pub base_delay: Duration,
    /// Ceiling for any wait, including server-provided hints.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for a failed `attempt` (1-based), capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Starts tracking a fresh request.
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            phase: RetryPhase::Attempting { attempt: 1 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Attempting { attempt: u32 },
    BackingOff { attempt: u32, wait: Duration },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

/// State of one request under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    phase: RetryPhase,
}

impl RetryState {
    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    /// Number of attempts made or in flight so far.
    pub fn attempt(&self) -> u32 {
        match self.phase {
            RetryPhase::Attempting { attempt } | RetryPhase::BackingOff { attempt, .. } => attempt,
            RetryPhase::Succeeded { attempts } | RetryPhase::Failed { attempts } => attempts,
        }
    }

    /// The current attempt succeeded.
    pub fn succeed(&mut self) -> RetryPhase {
        if let RetryPhase::Attempting { attempt } = self.phase {
            self.phase = RetryPhase::Succeeded { attempts: attempt };
        }
        self.phase
    }

    /// The current attempt failed with a retryable condition.
    ///
    /// `hint` is a wait suggested by the server; without one the policy's
    /// exponential backoff applies. Returns `BackingOff` with the wait to
    /// observe, or `Failed` once the attempt budget is spent.
    pub fn fail(&mut self, hint: Option<Duration>) -> RetryPhase {
        if let RetryPhase::Attempting { attempt } = self.phase {
            self.phase = if attempt >= self.policy.max_attempts {
                RetryPhase::Failed { attempts: attempt }
            } else {
                let wait = hint
                    .map(|h| h.min(self.policy.max_delay))
                    .unwrap_or_else(|| self.policy.backoff(attempt));
                RetryPhase::BackingOff { attempt, wait }
            };
        }
        self.phase
    }

    /// The backoff wait is over; the next attempt begins.
    pub fn resume(&mut self) -> RetryPhase {
        if let RetryPhase::BackingOff { attempt, .. } = self.phase {
            self.phase = RetryPhase::Attempting {
                attempt: attempt + 1,
            };
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy(10);
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(4), Duration::from_millis(800));
        assert_eq!(p.backoff(5), Duration::from_millis(1000));
        assert_eq!(p.backoff(40), Duration::from_millis(1000));
    }

    #[test]
    fn first_success_takes_one_attempt() {
        let mut state = policy(3).start();
        assert_eq!(state.phase(), RetryPhase::Attempting { attempt: 1 });
        assert_eq!(state.succeed(), RetryPhase::Succeeded { attempts: 1 });
    }

    #[test]
    fn failure_backs_off_then_resumes() {
        let mut state = policy(3).start();
        assert_eq!(
            state.fail(None),
            RetryPhase::BackingOff {
                attempt: 1,
                wait: Duration::from_millis(100)
            }
        );
        assert_eq!(state.resume(), RetryPhase::Attempting { attempt: 2 });
        assert_eq!(state.succeed(), RetryPhase::Succeeded { attempts: 2 });
    }

    #[test]
    fn server_hint_overrides_backoff_but_is_capped() {
        let mut state = policy(3).start();
        assert_eq!(
            state.fail(Some(Duration::from_millis(30))),
            RetryPhase::BackingOff {
                attempt: 1,
                wait: Duration::from_millis(30)
            }
        );
        state.resume();
        assert_eq!(
            state.fail(Some(Duration::from_secs(3600))),
            RetryPhase::BackingOff {
                attempt: 2,
                wait: Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn budget_exhaustion_fails() {
        let mut state = policy(2).start();
        state.fail(None);
        state.resume();
        assert_eq!(state.fail(None), RetryPhase::Failed { attempts: 2 });
        assert_eq!(state.attempt(), 2);
    }

    #[test]
    fn single_attempt_policy_never_backs_off() {
        let mut state = policy(1).start();
        assert_eq!(state.fail(None), RetryPhase::Failed { attempts: 1 });
    }

    #[test]
    fn terminal_phases_are_sticky() {
        let mut state = policy(3).start();
        state.succeed();
        assert_eq!(state.fail(None), RetryPhase::Succeeded { attempts: 1 });
        assert_eq!(state.resume(), RetryPhase::Succeeded { attempts: 1 });
    }
}
