// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Running test bodies in a forked child

use std::panic::{self, AssertUnwindSafe};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};

/// Status reported when the child body panics
pub const PANIC_STATUS: i32 = 101;

/// How a forked child ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Exited(i32),
    Signaled(Signal),
}

impl ChildExit {
    pub fn success(self) -> bool {
        self == ChildExit::Exited(0)
    }
}

/// Fork, run `body` in the child and wait for it
///
/// The child exits with the status `body` returns, or [`PANIC_STATUS`] if it
/// panics. `body` may also replace the process image; the status of the new
/// program is reported instead. The child never returns into the test
/// harness and skips its exit handlers.
pub fn run_in_child<F>(body: F) -> nix::Result<ChildExit>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the child only runs `body` and then calls `_exit`.
    match unsafe { fork() }? {
        ForkResult::Child => {
            let status = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(PANIC_STATUS);
            // SAFETY: `_exit` never returns.
            unsafe { libc::_exit(status) }
        }
        ForkResult::Parent { child } => loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(ChildExit::Exited(code)),
                Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(ChildExit::Signaled(signal)),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno),
            }
        },
    }
}
