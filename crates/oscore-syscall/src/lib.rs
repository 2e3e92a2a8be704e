// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Interrupted-system-call handling for the oscore primitives
//!
//! Every blocking call made by the oscore crates goes through [`retry`]. When the
//! kernel reports `EINTR`, the registered interrupt hook runs first (a language
//! runtime installs its pending-signal servicing routine there) and the call is
//! then reissued. Callers never observe the interruption itself.

use std::sync::RwLock;

use nix::errno::Errno;
use tracing::trace;

/// Callback invoked before an interrupted call is retried
pub type InterruptHook = fn();

static INTERRUPT_HOOK: RwLock<Option<InterruptHook>> = RwLock::new(None);

/// Install the hook that services pending interrupts, returning the previous one
pub fn set_interrupt_hook(hook: InterruptHook) -> Option<InterruptHook> {
    match INTERRUPT_HOOK.write() {
        Ok(mut slot) => slot.replace(hook),
        Err(poisoned) => poisoned.into_inner().replace(hook),
    }
}

/// Remove the interrupt hook, returning it if one was installed
pub fn clear_interrupt_hook() -> Option<InterruptHook> {
    match INTERRUPT_HOOK.write() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Run the registered interrupt hook, if any
pub fn service_interrupts() {
    let hook = match INTERRUPT_HOOK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    };
    if let Some(hook) = hook {
        hook();
    }
}

/// Issue `call` until it returns something other than `EINTR`
///
/// `op` names the call for trace output.
pub fn retry<T, F>(op: &str, mut call: F) -> nix::Result<T>
where
    F: FnMut() -> nix::Result<T>,
{
    loop {
        match call() {
            Err(Errno::EINTR) => {
                trace!(op, "interrupted, servicing pending interrupts before retry");
                service_interrupts();
            }
            other => return other,
        }
    }
}

/// Convert a raw libc return value into a `nix::Result`, reading `errno` on `-1`
pub fn check(ret: libc::c_int) -> nix::Result<libc::c_int> {
    Errno::result(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_hook() {
        HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    #[serial]
    fn test_retry_services_hook_on_each_interrupt() {
        HOOK_CALLS.store(0, Ordering::SeqCst);
        set_interrupt_hook(counting_hook);

        let mut attempts = 0;
        let result = retry("test", || {
            attempts += 1;
            if attempts < 3 {
                Err(Errno::EINTR)
            } else {
                Ok(attempts)
            }
        });

        clear_interrupt_hook();
        assert_eq!(result, Ok(3));
        assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[serial]
    fn test_retry_surfaces_genuine_errors() {
        clear_interrupt_hook();
        let mut attempts = 0;
        let result: nix::Result<()> = retry("test", || {
            attempts += 1;
            Err(Errno::EBADF)
        });
        assert_eq!(result, Err(Errno::EBADF));
        assert_eq!(attempts, 1);
    }

    #[test]
    #[serial]
    fn test_set_interrupt_hook_returns_previous() {
        clear_interrupt_hook();
        assert!(set_interrupt_hook(counting_hook).is_none());
        assert!(set_interrupt_hook(counting_hook).is_some());
        assert!(clear_interrupt_hook().is_some());
        assert!(clear_interrupt_hook().is_none());
    }

    #[test]
    fn test_check_maps_minus_one_to_errno() {
        assert_eq!(check(5), Ok(5));
        assert!(check(-1).is_err());
    }
}
