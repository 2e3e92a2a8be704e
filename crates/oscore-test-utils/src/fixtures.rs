// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Descriptor fixtures

use std::os::fd::{AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use nix::sys::stat::fstat;
use nix::unistd::{read, write};

/// Both ends of an anonymous pipe
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> nix::Result<Self> {
        let (read, write) = nix::unistd::pipe()?;
        Ok(Self { read, write })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    pub fn write_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }

    /// Close the write end and return everything written so far
    pub fn drain(self) -> nix::Result<Vec<u8>> {
        drop(self.write);
        read_all(self.read.as_raw_fd())
    }

    /// Give up ownership of both ends, e.g. before handing them to a child
    /// that closes them itself
    pub fn into_raw(self) -> (RawFd, RawFd) {
        (self.read.into_raw_fd(), self.write.into_raw_fd())
    }
}

/// Borrow a raw descriptor number for a nix call
fn borrow(fd: RawFd) -> BorrowedFd<'static> {
    // SAFETY: callers pass descriptors they keep open for the duration of
    // the call; a closed number makes the call fail with EBADF.
    unsafe { BorrowedFd::borrow_raw(fd) }
}

/// Write all of `bytes` to `fd`
pub fn write_all(fd: RawFd, mut bytes: &[u8]) -> nix::Result<()> {
    while !bytes.is_empty() {
        match write(borrow(fd), bytes) {
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
    Ok(())
}

/// Read from `fd` until end of file
pub fn read_all(fd: RawFd) -> nix::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match read(borrow(fd), &mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
}

/// Whether `fd` is currently open in this process
pub fn is_open(fd: RawFd) -> bool {
    fcntl(borrow(fd), FcntlArg::F_GETFD).is_ok()
}

/// `(device, inode)` identity of the file behind `fd`
pub fn file_identity(fd: RawFd) -> nix::Result<(u64, u64)> {
    let stat = fstat(borrow(fd))?;
    Ok((stat.st_dev as u64, stat.st_ino as u64))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_pipe_round_trip() {
        let pipe = Pipe::new().unwrap();
        write_all(pipe.write_fd(), b"hello").unwrap();
        assert_eq!(pipe.drain().unwrap(), b"hello");
    }

    #[test]
    #[serial]
    fn test_write_to_read_end_fails() {
        let pipe = Pipe::new().unwrap();
        assert_eq!(write_all(pipe.read_fd(), b"x"), Err(Errno::EBADF));
        assert!(is_open(pipe.write_fd()));
    }

    #[test]
    #[serial]
    fn test_pipe_ends_share_identity() {
        let pipe = Pipe::new().unwrap();
        assert!(is_open(pipe.read_fd()));
        assert_eq!(
            file_identity(pipe.read_fd()).unwrap(),
            file_identity(pipe.write_fd()).unwrap()
        );
    }
}
