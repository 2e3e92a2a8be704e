// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bounded descriptor bit-set

use std::fmt;
use std::os::fd::RawFd;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{Result, WaitError};

/// Number of descriptors a set can hold, `FD_SETSIZE`
pub const CAPACITY: usize = libc::FD_SETSIZE as usize;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = CAPACITY / WORD_BITS;

/// A set of descriptors in `0..CAPACITY` with a cached maximum member
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DescriptorSet {
    words: [u64; WORDS],
    max: Option<RawFd>,
}

fn slot(fd: RawFd) -> Option<(usize, u64)> {
    let index = usize::try_from(fd).ok().filter(|index| *index < CAPACITY)?;
    Some((index / WORD_BITS, 1u64 << (index % WORD_BITS)))
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from descriptor numbers, rejecting any outside the range
    pub fn from_fds(fds: impl IntoIterator<Item = RawFd>) -> Result<Self> {
        let mut set = Self::new();
        for fd in fds {
            set.insert(fd)?;
        }
        Ok(set)
    }

    /// Add `fd`; returns whether it was newly inserted
    pub fn insert(&mut self, fd: RawFd) -> Result<bool> {
        let (word, bit) = slot(fd).ok_or(WaitError::DescriptorOutOfRange {
            fd,
            capacity: CAPACITY,
        })?;
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        if self.max.map_or(true, |max| fd > max) {
            self.max = Some(fd);
        }
        Ok(fresh)
    }

    /// Remove `fd`; returns whether it was a member
    pub fn remove(&mut self, fd: RawFd) -> bool {
        let Some((word, bit)) = slot(fd) else {
            return false;
        };
        if self.words[word] & bit == 0 {
            return false;
        }
        self.words[word] &= !bit;
        if self.max == Some(fd) {
            self.max = self.scan_max();
        }
        true
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        slot(fd).is_some_and(|(word, bit)| self.words[word] & bit != 0)
    }

    /// Highest member, if any
    pub fn max(&self) -> Option<RawFd> {
        self.max
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_none()
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
        self.max = None;
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        let end = self.max.map_or(0, |max| max + 1);
        (0..end).filter(move |fd| self.contains(*fd))
    }

    fn scan_max(&self) -> Option<RawFd> {
        self.words.iter().enumerate().rev().find(|(_, word)| **word != 0).map(|(index, word)| {
            let bit = WORD_BITS - 1 - word.leading_zeros() as usize;
            (index * WORD_BITS + bit) as RawFd
        })
    }

    /// The OS representation of this set
    pub fn to_fd_set(&self) -> libc::fd_set {
        let mut raw = std::mem::MaybeUninit::<libc::fd_set>::uninit();
        // SAFETY: FD_ZERO initializes the whole set; every member is below
        // FD_SETSIZE.
        unsafe {
            libc::FD_ZERO(raw.as_mut_ptr());
            let mut raw = raw.assume_init();
            for fd in self.iter() {
                libc::FD_SET(fd, &mut raw);
            }
            raw
        }
    }

    /// Replace the contents with the members of `raw` below `nfds`
    pub fn assign_from_fd_set(&mut self, raw: &libc::fd_set, nfds: RawFd) {
        self.clear();
        let end = nfds.clamp(0, CAPACITY as RawFd);
        for fd in 0..end {
            // SAFETY: `fd` is below FD_SETSIZE and `raw` is initialized.
            if unsafe { libc::FD_ISSET(fd, raw) } {
                let (word, bit) = (fd as usize / WORD_BITS, 1u64 << (fd as usize % WORD_BITS));
                self.words[word] |= bit;
                self.max = Some(fd);
            }
        }
    }
}

impl fmt::Debug for DescriptorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for DescriptorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for fd in self.iter() {
            seq.serialize_element(&fd)?;
        }
        seq.end()
    }
}
