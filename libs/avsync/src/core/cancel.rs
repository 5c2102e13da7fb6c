// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Cooperative cancellation for session loops.
//!
//! A [`CancelFlag`] is cloned into whatever wants to stop a session (a signal
//! handler, a UI thread) and polled by the session between units of work.
//! Nothing is interrupted mid-call: a blocking read or a pacing sleep always
//! completes first.
//!
//! # Example
//! ```
//! use avsync::core::cancel::{cancellable_loop, CancelFlag, LoopControl, LoopExit};
//!
//! let flag = CancelFlag::new();
//! let mut n = 0;
//! let exit = cancellable_loop(&flag, || {
//!     n += 1;
//!     if n == 3 {
//!         return Ok::<_, ()>(LoopControl::Break);
//!     }
//!     Ok(LoopControl::Continue)
//! });
//! assert_eq!(exit, Ok(LoopExit::Completed));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!("Cancellation requested");
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Control flow for cancellable loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Continue loop iteration
    Continue,
    /// Break loop and exit gracefully
    Break,
}

/// How a cancellable loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The body returned [`LoopControl::Break`].
    Completed,
    /// The flag was raised between iterations.
    Cancelled,
}

/// Run `f` until it breaks, fails, or `flag` is raised.
///
/// The flag is checked before every iteration (one atomic load).
///
/// # Errors
/// Returns the error from the closure if it fails.
pub fn cancellable_loop<F, E>(flag: &CancelFlag, mut f: F) -> Result<LoopExit, E>
where
    F: FnMut() -> Result<LoopControl, E>,
{
    loop {
        if flag.is_cancelled() {
            tracing::debug!("Cancel flag set, exiting loop");
            return Ok(LoopExit::Cancelled);
        }

        match f()? {
            LoopControl::Continue => continue,
            LoopControl::Break => {
                tracing::trace!("Loop exited via LoopControl::Break");
                return Ok(LoopExit::Completed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_loop_control_break() {
        let flag = CancelFlag::new();
        let mut count = 0;

        let result = cancellable_loop(&flag, || {
            count += 1;
            if count >= 5 {
                return Ok(LoopControl::Break);
            }
            Ok::<LoopControl, ()>(LoopControl::Continue)
        });

        assert_eq!(result, Ok(LoopExit::Completed));
        assert_eq!(count, 5);
    }

    #[test]
    fn test_cancel_from_another_thread_exits_loop() {
        let flag = CancelFlag::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let loop_flag = flag.clone();

        let handle = std::thread::spawn(move || {
            cancellable_loop(&loop_flag, || {
                counter_clone.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(Duration::from_millis(10));
                Ok::<LoopControl, ()>(LoopControl::Continue)
            })
        });

        std::thread::sleep(Duration::from_millis(50));
        flag.cancel();

        let result = handle.join().expect("loop thread panicked");
        assert_eq!(result, Ok(LoopExit::Cancelled));

        let final_count = counter.load(Ordering::Relaxed);
        assert!(final_count > 0, "Loop should have run at least once");
        assert!(final_count < 100, "Loop should have stopped after cancel");
    }

    #[test]
    fn test_already_cancelled_never_runs_body() {
        let flag = CancelFlag::new();
        flag.cancel();
        flag.cancel();
        let result = cancellable_loop(&flag, || -> Result<LoopControl, ()> {
            panic!("body must not run");
        });
        assert_eq!(result, Ok(LoopExit::Cancelled));
    }

    #[test]
    fn test_error_propagation() {
        let flag = CancelFlag::new();
        let result = cancellable_loop(&flag, || Err::<LoopControl, &str>("test error"));
        assert_eq!(result, Err("test error"));
    }
}
