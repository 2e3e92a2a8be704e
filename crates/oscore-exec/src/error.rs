// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for process replacement

use std::fmt;
use std::os::fd::RawFd;

use nix::errno::Errno;
use thiserror::Error;

use crate::replace::FATAL_EXIT_STATUS;

/// Result type alias for the recoverable part of process replacement
pub type Result<T> = std::result::Result<T, ExecError>;

/// Problems detected before any descriptor is modified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("argument list must have at least one element")]
    EmptyArgv,

    #[error("{what} contains an interior NUL byte: {value:?}")]
    NulByte { what: &'static str, value: String },

    #[error("iomap entry {index}: target descriptor must be non-negative, but got {target}")]
    NegativeTarget { index: usize, target: RawFd },

    #[error("iomap entry {index}: target descriptor {target} is beyond the descriptor table limit {bound}")]
    TargetOutOfRange {
        index: usize,
        target: RawFd,
        bound: RawFd,
    },

    #[error("iomap entry {index}: source descriptor must be non-negative, but got {fd}")]
    NegativeSource { index: usize, fd: RawFd },

    #[error("iomap entry {index}: {handle} is not associated with a file descriptor")]
    NoDescriptor { index: usize, handle: String },

    #[error("iomap entry {index}: {required} handle required to make it descriptor {target}, but got {handle}")]
    Direction {
        index: usize,
        target: RawFd,
        required: &'static str,
        handle: String,
    },

    #[error("iomap entry {index}: source descriptor {fd} is not open: {errno}")]
    ClosedSource {
        index: usize,
        fd: RawFd,
        errno: Errno,
    },

    #[error("couldn't determine the descriptor table limit: {0}")]
    DescriptorBound(#[source] Errno),
}

/// A failure after descriptor remapping has begun
///
/// Never handed back to the caller: the only way to consume it is
/// [`FatalError::terminate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    pub op: &'static str,
    pub fd: Option<RawFd>,
    pub source: Errno,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fd {
            Some(fd) => write!(f, "{} failed on descriptor {}: {}", self.op, fd, self.source),
            None => write!(f, "{} failed: {}", self.op, self.source),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl FatalError {
    pub fn new(op: &'static str, fd: Option<RawFd>, source: Errno) -> Self {
        Self { op, fd, source }
    }

    /// Write the diagnostic straight to descriptor 2 and end the process
    ///
    /// `_exit(2)` is used so that no destructor or buffered writer can push
    /// data into descriptors that have already been remapped.
    pub fn terminate(self) -> ! {
        let message = format!("oscore-exec: fatal: {}\n", self);
        let bytes = message.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            // SAFETY: the pointer and length describe the live `bytes` slice.
            let ret = unsafe {
                libc::write(
                    libc::STDERR_FILENO,
                    bytes[written..].as_ptr().cast(),
                    bytes.len() - written,
                )
            };
            if ret > 0 {
                written += ret as usize;
            } else if ret < 0 && Errno::last() == Errno::EINTR {
                continue;
            } else {
                break;
            }
        }
        // SAFETY: `_exit` takes no pointers and never returns.
        unsafe { libc::_exit(FATAL_EXIT_STATUS) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::new("dup2", Some(4), Errno::EBADF);
        assert_eq!(err.to_string(), format!("dup2 failed on descriptor 4: {}", Errno::EBADF));

        let err = FatalError::new("execvp", None, Errno::ENOENT);
        assert_eq!(err.to_string(), format!("execvp failed: {}", Errno::ENOENT));
    }

    #[test]
    fn test_exec_error_names_offending_value() {
        let err = ExecError::Direction {
            index: 1,
            target: 0,
            required: "input",
            handle: "port \"log\"".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("entry 1"));
        assert!(text.contains("input handle required"));
        assert!(text.contains("port \"log\""));
    }
}
