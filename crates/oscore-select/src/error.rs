// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for multiplex waits

use std::os::fd::RawFd;

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WaitError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("timeout must be non-negative, but got {value}")]
    NegativeTimeout { value: String },

    #[error("malformed timeout {text:?}: expected none, <micros>, <secs>,<micros> or <secs>:<micros>")]
    MalformedTimeout { text: String },

    #[error("descriptor {fd} is outside the range 0..{capacity} a descriptor set can hold")]
    DescriptorOutOfRange { fd: RawFd, capacity: usize },

    #[error("wait failed: {source}")]
    Select {
        #[source]
        source: Errno,
    },
}
