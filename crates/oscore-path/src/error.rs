// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for path resolution

use nix::errno::Errno;
use thiserror::Error;

/// Result type alias for path resolution
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur while resolving a path string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("couldn't get home directory of user \"{user}\": no such user")]
    NoSuchUser { user: String },

    #[error("couldn't get home directory of the effective user")]
    NoHomeDirectory,

    #[error("user database lookup for {query} failed: {source}")]
    UserDatabase {
        query: String,
        #[source]
        source: Errno,
    },

    #[error("couldn't get current directory: {0}")]
    CurrentDir(#[source] Errno),
}
