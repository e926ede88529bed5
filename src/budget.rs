//! Step budget, deadline, and cancellation plumbing.
//!
//! Every state expansion in the product search and every instruction the
//! verification VM executes ticks the same [`Budget`]. The step counter is
//! the primary bound; the wall clock and the cancellation flag are checked
//! at a coarser interval since each tick is O(1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How many ticks between wall-clock / cancellation checks.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Why a bounded search stopped early.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    #[error("step budget exhausted")]
    StepsExhausted,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("cancelled by caller")]
    Cancelled,
}

/// Shared cancellation handle.
///
/// Clone it, hand one clone to the engine call, keep the other; flipping it
/// makes the engine return promptly with a timeout-equivalent result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A consumable budget spanning one engine call.
///
/// Not shared between calls; each `check` allocates its own.
#[derive(Debug)]
pub struct Budget {
    steps_left: u64,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
    until_clock_check: u64,
}

impl Budget {
    pub fn new(max_steps: u64, timeout: Option<Duration>, cancel: Option<CancelToken>) -> Self {
        Self {
            steps_left: max_steps,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
            until_clock_check: CLOCK_CHECK_INTERVAL,
        }
    }

    /// An effectively unlimited budget, for tests and small fixed work.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(u64::MAX, None, None)
    }

    /// Consume one step.
    ///
    /// Returns the interrupt reason if the budget is spent, the deadline has
    /// passed, or the caller cancelled. The clock and the cancel flag are
    /// only consulted every [`CLOCK_CHECK_INTERVAL`] ticks.
    #[inline]
    pub fn tick(&mut self) -> Result<(), Interrupt> {
        if self.steps_left == 0 {
            return Err(Interrupt::StepsExhausted);
        }
        self.steps_left -= 1;

        self.until_clock_check -= 1;
        if self.until_clock_check == 0 {
            self.until_clock_check = CLOCK_CHECK_INTERVAL;
            self.check_clock()?;
        }
        Ok(())
    }

    /// Consume `n` steps at once (used by the VM for backreference scans).
    #[inline]
    pub fn tick_n(&mut self, n: u64) -> Result<(), Interrupt> {
        if self.steps_left < n {
            self.steps_left = 0;
            return Err(Interrupt::StepsExhausted);
        }
        self.steps_left -= n;
        self.check_clock()
    }

    /// Force an immediate deadline + cancellation check.
    pub fn check_clock(&self) -> Result<(), Interrupt> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(Interrupt::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Steps still available.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.steps_left
    }
}
