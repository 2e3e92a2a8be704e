// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The calling process's own descriptor table

use std::fs;
use std::os::fd::RawFd;

use nix::errno::Errno;
use oscore_syscall::check;

use crate::error::{ExecError, Result};
use crate::plan::DescriptorTable;

/// Upper bound (exclusive) on descriptor numbers, from `sysconf(_SC_OPEN_MAX)`
pub fn descriptor_bound() -> Result<RawFd> {
    Errno::clear();
    // SAFETY: sysconf has no memory-safety preconditions.
    let value = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
    if value < 0 {
        return match Errno::last() {
            Errno::UnknownErrno => Ok(RawFd::MAX),
            errno => Err(ExecError::DescriptorBound(errno)),
        };
    }
    Ok(RawFd::try_from(value).unwrap_or(RawFd::MAX))
}

/// Check that `fd` is an open descriptor
pub(crate) fn probe(fd: RawFd) -> nix::Result<()> {
    // SAFETY: F_GETFD only reads the descriptor flags.
    check(unsafe { libc::fcntl(fd, libc::F_GETFD) }).map(|_| ())
}

pub fn is_open(fd: RawFd) -> bool {
    probe(fd).is_ok()
}

/// Descriptor table of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTable;

impl ProcessTable {
    pub fn new() -> Self {
        Self
    }
}

impl DescriptorTable for ProcessTable {
    fn duplicate(&mut self, fd: RawFd) -> nix::Result<RawFd> {
        // SAFETY: dup only operates on the descriptor number.
        restart(|| check(unsafe { libc::dup(fd) }))
    }

    fn duplicate_onto(&mut self, source: RawFd, target: RawFd) -> nix::Result<()> {
        // SAFETY: dup2 only operates on descriptor numbers.
        restart(|| check(unsafe { libc::dup2(source, target) })).map(|_| ())
    }

    fn keep_on_exec(&mut self, fd: RawFd) -> nix::Result<()> {
        // SAFETY: fcntl with F_GETFD/F_SETFD takes and returns plain integers.
        let flags = check(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
        if flags & libc::FD_CLOEXEC != 0 {
            check(unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) })?;
        }
        Ok(())
    }

    fn close(&mut self, fd: RawFd) -> nix::Result<()> {
        // SAFETY: the caller owns the decision to close `fd`; no Rust object
        // is used after this point in the replaced process.
        match check(unsafe { libc::close(fd) }) {
            // The descriptor is released even when close is interrupted.
            Ok(_) | Err(Errno::EINTR) => Ok(()),
            Err(errno) => Err(errno),
        }
    }

    fn open_descriptors(&mut self, bound: RawFd) -> Vec<RawFd> {
        listed_descriptors("/proc/self/fd", bound)
            .or_else(|| listed_descriptors("/dev/fd", bound))
            .unwrap_or_else(|| (0..bound).filter(|fd| is_open(*fd)).collect())
    }
}

/// Reissue `call` while it fails with `EINTR`
///
/// Runs while descriptors are being remapped, so it neither logs nor runs
/// the interrupt hook.
fn restart<T>(mut call: impl FnMut() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match call() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

/// Read a descriptor directory such as `/proc/self/fd`
///
/// The directory handle used for reading shows up in the listing, so each
/// entry is checked again after the handle is closed.
fn listed_descriptors(dir: &str, bound: RawFd) -> Option<Vec<RawFd>> {
    let entries = fs::read_dir(dir).ok()?;
    let mut fds: Vec<RawFd> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .filter(|fd| *fd < bound)
        .collect();
    fds.retain(|fd| is_open(*fd));
    fds.sort_unstable();
    if fds.is_empty() {
        return None;
    }
    Some(fds)
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serial_test::serial;

    use super::*;

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count_hook() {
        HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_descriptor_bound_is_positive() {
        let bound = descriptor_bound().unwrap();
        assert!(bound > 2);
    }

    #[test]
    #[serial]
    fn test_open_descriptors_lists_new_pipe() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let bound = descriptor_bound().unwrap();
        let fds = ProcessTable.open_descriptors(bound);
        assert!(fds.contains(&read_end.as_raw_fd()));
        assert!(fds.contains(&write_end.as_raw_fd()));
        assert!(fds.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    #[serial]
    fn test_is_open_tracks_close() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let fd = read_end.as_raw_fd();
        assert!(is_open(fd));
        drop(read_end);
        assert!(!is_open(fd));
        drop(write_end);
    }

    #[test]
    #[serial]
    fn test_keep_on_exec_clears_cloexec() {
        let (read_end, _write_end) = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).unwrap();
        let fd = read_end.as_raw_fd();
        ProcessTable.keep_on_exec(fd).unwrap();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_eq!(flags & libc::FD_CLOEXEC, 0);
    }

    #[test]
    #[serial]
    fn test_duplicate_refers_to_same_pipe() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let copy = ProcessTable.duplicate(write_end.as_raw_fd()).unwrap();
        drop(write_end);

        let written = unsafe { libc::write(copy, b"x".as_ptr().cast(), 1) };
        assert_eq!(written, 1);
        let mut buf = [0u8; 1];
        let read = unsafe { libc::read(read_end.as_raw_fd(), buf.as_mut_ptr().cast(), 1) };
        assert_eq!(read, 1);
        assert_eq!(&buf, b"x");
        ProcessTable.close(copy).unwrap();
    }

    #[test]
    #[serial]
    fn test_restart_skips_interrupt_hook() {
        HOOK_CALLS.store(0, Ordering::SeqCst);
        oscore_syscall::set_interrupt_hook(count_hook);

        let mut attempts = 0;
        let result = restart(|| {
            attempts += 1;
            if attempts < 3 {
                Err(Errno::EINTR)
            } else {
                Ok(attempts)
            }
        });
        oscore_syscall::clear_interrupt_hook();

        assert_eq!(result, Ok(3));
        assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_restart_surfaces_other_errors() {
        let mut attempts = 0;
        let result: nix::Result<()> = restart(|| {
            attempts += 1;
            Err(Errno::EBADF)
        });
        assert_eq!(result, Err(Errno::EBADF));
        assert_eq!(attempts, 1);
    }
}
