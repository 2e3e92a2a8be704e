// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Descriptor mappings requested by the caller of process replacement
//!
//! A mapping is an ordered list of `(target, source)` entries. The source is
//! either a plain descriptor number or a borrowed [`DescriptorHandle`], the
//! equivalent of a language runtime port: something that may or may not be
//! backed by an OS descriptor and that has a direction.

use std::fmt;
use std::fs::File;
use std::io::{Stderr, Stdin, Stdout};
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use tracing::debug;

use crate::error::{ExecError, Result};
use crate::plan::{DescriptorPlan, Move};
use crate::table;

/// Which way data flows through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Duplex,
}

impl Direction {
    pub fn readable(self) -> bool {
        matches!(self, Direction::Input | Direction::Duplex)
    }

    pub fn writable(self) -> bool {
        matches!(self, Direction::Output | Direction::Duplex)
    }

    /// Direction of an open descriptor, from its access mode
    pub fn of_descriptor(fd: RawFd) -> nix::Result<Direction> {
        // SAFETY: F_GETFL only reads the descriptor's status flags.
        let flags = oscore_syscall::check(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
        Ok(match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Direction::Input,
            libc::O_WRONLY => Direction::Output,
            _ => Direction::Duplex,
        })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
            Direction::Duplex => write!(f, "input/output"),
        }
    }
}

/// Something that may carry an OS descriptor
pub trait DescriptorHandle {
    /// The backing descriptor, if there is one
    fn descriptor(&self) -> Option<RawFd>;

    fn direction(&self) -> Direction;

    /// Human-readable description used in error messages
    fn describe(&self) -> String {
        match self.descriptor() {
            Some(fd) => format!("{} handle on descriptor {}", self.direction(), fd),
            None => format!("{} handle without a descriptor", self.direction()),
        }
    }
}

impl<T: DescriptorHandle + ?Sized> DescriptorHandle for &T {
    fn descriptor(&self) -> Option<RawFd> {
        (**self).descriptor()
    }

    fn direction(&self) -> Direction {
        (**self).direction()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl DescriptorHandle for Stdin {
    fn descriptor(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }

    fn direction(&self) -> Direction {
        Direction::Input
    }
}

impl DescriptorHandle for Stdout {
    fn descriptor(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }

    fn direction(&self) -> Direction {
        Direction::Output
    }
}

impl DescriptorHandle for Stderr {
    fn descriptor(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }

    fn direction(&self) -> Direction {
        Direction::Output
    }
}

impl DescriptorHandle for UnixStream {
    fn descriptor(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }

    fn direction(&self) -> Direction {
        Direction::Duplex
    }
}

macro_rules! access_mode_handle {
    ($($ty:ty),*) => {
        $(
            impl DescriptorHandle for $ty {
                fn descriptor(&self) -> Option<RawFd> {
                    Some(self.as_raw_fd())
                }

                fn direction(&self) -> Direction {
                    // A descriptor whose flags cannot be read is rejected as a
                    // closed source during validation.
                    Direction::of_descriptor(self.as_raw_fd()).unwrap_or(Direction::Duplex)
                }
            }
        )*
    };
}

access_mode_handle!(File, OwnedFd, BorrowedFd<'_>);

/// A runtime port as seen by the exec layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    fd: Option<RawFd>,
    direction: Direction,
}

impl Port {
    /// A port backed by descriptor `fd`
    pub fn new(name: impl Into<String>, fd: RawFd, direction: Direction) -> Self {
        Self {
            name: name.into(),
            fd: Some(fd),
            direction,
        }
    }

    /// A port with no OS descriptor behind it, such as an in-memory string port
    pub fn detached(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            fd: None,
            direction,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DescriptorHandle for Port {
    fn descriptor(&self) -> Option<RawFd> {
        self.fd
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn describe(&self) -> String {
        format!("{} port \"{}\"", self.direction, self.name)
    }
}

/// Where a mapped descriptor comes from
#[derive(Clone, Copy)]
pub enum DescriptorSource<'a> {
    Fd(RawFd),
    Handle(&'a dyn DescriptorHandle),
}

impl fmt::Debug for DescriptorSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorSource::Fd(fd) => f.debug_tuple("Fd").field(fd).finish(),
            DescriptorSource::Handle(handle) => f.debug_tuple("Handle").field(&handle.describe()).finish(),
        }
    }
}

impl From<RawFd> for DescriptorSource<'_> {
    fn from(fd: RawFd) -> Self {
        DescriptorSource::Fd(fd)
    }
}

impl<'a, H: DescriptorHandle> From<&'a H> for DescriptorSource<'a> {
    fn from(handle: &'a H) -> Self {
        DescriptorSource::Handle(handle)
    }
}

/// One `(target, source)` request
#[derive(Debug, Clone, Copy)]
pub struct MappingEntry<'a> {
    pub target: RawFd,
    pub source: DescriptorSource<'a>,
}

/// Ordered descriptor mapping for the replaced process
///
/// Targets are not required to be unique; a later entry for the same target
/// wins, as with consecutive `dup2(2)` calls.
#[derive(Debug, Clone, Default)]
pub struct DescriptorMapping<'a> {
    entries: Vec<MappingEntry<'a>>,
}

impl<'a> DescriptorMapping<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: RawFd, source: impl Into<DescriptorSource<'a>>) {
        self.entries.push(MappingEntry {
            target,
            source: source.into(),
        });
    }

    /// Map descriptor `fd` onto `target`
    pub fn map_fd(mut self, target: RawFd, fd: RawFd) -> Self {
        self.push(target, fd);
        self
    }

    /// Map the descriptor behind `handle` onto `target`
    pub fn map_handle(mut self, target: RawFd, handle: &'a dyn DescriptorHandle) -> Self {
        self.push(target, DescriptorSource::Handle(handle));
        self
    }

    pub fn entries(&self) -> &[MappingEntry<'a>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry and turn the mapping into a [`DescriptorPlan`]
    ///
    /// Only reads descriptor flags; nothing is duplicated or closed. `bound`
    /// is the descriptor table limit every target must stay below.
    pub fn validate(&self, bound: RawFd) -> Result<DescriptorPlan> {
        let mut moves = Vec::with_capacity(self.entries.len());

        for (index, entry) in self.entries.iter().enumerate() {
            let target = entry.target;
            if target < 0 {
                return Err(ExecError::NegativeTarget { index, target });
            }
            if target >= bound {
                return Err(ExecError::TargetOutOfRange {
                    index,
                    target,
                    bound,
                });
            }

            let source = match entry.source {
                DescriptorSource::Fd(fd) if fd < 0 => {
                    return Err(ExecError::NegativeSource { index, fd });
                }
                DescriptorSource::Fd(fd) => fd,
                DescriptorSource::Handle(handle) => resolve_handle(index, target, handle)?,
            };

            if let Err(errno) = table::probe(source) {
                return Err(ExecError::ClosedSource {
                    index,
                    fd: source,
                    errno,
                });
            }

            moves.push(Move { target, source });
        }

        debug!(entries = moves.len(), "validated descriptor mapping");
        Ok(DescriptorPlan::new(moves))
    }
}

impl FromIterator<(RawFd, RawFd)> for DescriptorMapping<'_> {
    fn from_iter<I: IntoIterator<Item = (RawFd, RawFd)>>(iter: I) -> Self {
        let mut mapping = DescriptorMapping::new();
        for (target, fd) in iter {
            mapping.push(target, fd);
        }
        mapping
    }
}

/// Resolve a handle to its descriptor, enforcing directionality for the
/// standard input, output and error targets
fn resolve_handle(index: usize, target: RawFd, handle: &dyn DescriptorHandle) -> Result<RawFd> {
    let fd = handle.descriptor().ok_or_else(|| ExecError::NoDescriptor {
        index,
        handle: handle.describe(),
    })?;

    let direction = handle.direction();
    let required = match target {
        libc::STDIN_FILENO if !direction.readable() => Some("input"),
        libc::STDOUT_FILENO | libc::STDERR_FILENO if !direction.writable() => Some("output"),
        _ => None,
    };

    match required {
        Some(required) => Err(ExecError::Direction {
            index,
            target,
            required,
            handle: handle.describe(),
        }),
        None => Ok(fd),
    }
}
