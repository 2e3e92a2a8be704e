// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Conflict-free execution of a validated descriptor mapping

use std::collections::BTreeSet;
use std::os::fd::RawFd;

use nix::errno::Errno;

use crate::error::FatalError;

/// Operations on a descriptor table
///
/// [`crate::ProcessTable`] drives the real process table; tests substitute an
/// in-memory model so that remapping can be checked without touching the
/// test runner's own descriptors.
pub trait DescriptorTable {
    /// Duplicate `fd` onto the lowest free descriptor
    fn duplicate(&mut self, fd: RawFd) -> nix::Result<RawFd>;

    /// Make `target` refer to whatever `source` refers to
    fn duplicate_onto(&mut self, source: RawFd, target: RawFd) -> nix::Result<()>;

    /// Ensure `fd` stays open across exec
    fn keep_on_exec(&mut self, fd: RawFd) -> nix::Result<()>;

    fn close(&mut self, fd: RawFd) -> nix::Result<()>;

    /// Every open descriptor below `bound`, in ascending order
    fn open_descriptors(&mut self, bound: RawFd) -> Vec<RawFd>;
}

/// A single validated `(target, source)` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub target: RawFd,
    pub source: RawFd,
}

/// What [`DescriptorPlan::apply`] actually did, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    /// Source and target were already the same descriptor
    Keep { fd: RawFd },
    /// `fd` was about to be overwritten while a later entry still needed it,
    /// so it was first duplicated to `saved`
    Preserve { fd: RawFd, saved: RawFd },
    /// `source` was duplicated onto `target`
    Move { source: RawFd, target: RawFd },
}

/// A validated descriptor mapping ready to be applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorPlan {
    moves: Vec<Move>,
}

impl DescriptorPlan {
    pub(crate) fn new(moves: Vec<Move>) -> Self {
        Self { moves }
    }

    /// Build a plan from raw `(target, source)` pairs without validation
    pub fn from_pairs(pairs: impl IntoIterator<Item = (RawFd, RawFd)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(target, source)| Move { target, source })
                .collect(),
        )
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Distinct target descriptors, ascending
    pub fn targets(&self) -> BTreeSet<RawFd> {
        self.moves.iter().map(|m| m.target).collect()
    }

    /// Whether `fd` survives the close sweep
    pub fn retains(&self, fd: RawFd) -> bool {
        self.moves.iter().any(|m| m.target == fd)
    }

    /// Rearrange `table` so that every target refers to its requested source
    ///
    /// Entries are processed in order. Before a target is overwritten, any
    /// later entry that still reads from it is redirected to a fresh
    /// duplicate, which makes swaps and longer cycles come out right. The
    /// check is repeated for every entry, so a duplicate that happens to land
    /// on a later target is itself preserved in turn.
    pub fn apply<T: DescriptorTable + ?Sized>(&self, table: &mut T) -> Result<Vec<PlanStep>, FatalError> {
        let mut sources: Vec<RawFd> = self.moves.iter().map(|m| m.source).collect();
        let mut steps = Vec::with_capacity(self.moves.len());

        for (i, m) in self.moves.iter().enumerate() {
            let target = m.target;
            let source = sources[i];

            if source == target {
                table
                    .keep_on_exec(target)
                    .map_err(|errno| FatalError::new("fcntl", Some(target), errno))?;
                steps.push(PlanStep::Keep { fd: target });
                continue;
            }

            if sources[i + 1..].contains(&target) {
                let saved = table
                    .duplicate(target)
                    .map_err(|errno| FatalError::new("dup", Some(target), errno))?;
                for later in sources[i + 1..].iter_mut().filter(|s| **s == target) {
                    *later = saved;
                }
                steps.push(PlanStep::Preserve { fd: target, saved });
            }

            table
                .duplicate_onto(source, target)
                .map_err(|errno| FatalError::new("dup2", Some(target), errno))?;
            steps.push(PlanStep::Move { source, target });
        }

        Ok(steps)
    }

    /// Close every open descriptor below `bound` that is not a target
    ///
    /// Descriptors that turn out to be closed already are skipped. Returns
    /// the number of descriptors closed.
    pub fn close_unretained<T: DescriptorTable + ?Sized>(
        &self,
        table: &mut T,
        bound: RawFd,
    ) -> Result<usize, FatalError> {
        let targets = self.targets();
        let mut closed = 0;
        for fd in table.open_descriptors(bound) {
            if targets.contains(&fd) {
                continue;
            }
            match table.close(fd) {
                Ok(()) => closed += 1,
                Err(Errno::EBADF) => {}
                Err(errno) => return Err(FatalError::new("close", Some(fd), errno)),
            }
        }
        Ok(closed)
    }
}
