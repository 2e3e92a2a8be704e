// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The user-database and working-directory queries that path resolution needs

use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

use nix::unistd::{geteuid, getcwd, User};
use tracing::debug;

use crate::error::{ResolveError, Result};

/// Source of home directories and the current working directory
///
/// All values are raw byte strings.
pub trait PathEnvironment {
    /// Home directory of the effective user
    fn effective_user_home(&self) -> Result<Vec<u8>>;

    /// Home directory of the named user
    fn user_home(&self, user: &[u8]) -> Result<Vec<u8>>;

    /// Current working directory
    fn current_dir(&self) -> Result<Vec<u8>>;
}

/// [`PathEnvironment`] backed by the passwd database and `getcwd(3)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl PathEnvironment for SystemEnvironment {
    fn effective_user_home(&self) -> Result<Vec<u8>> {
        let uid = geteuid();
        let user = oscore_syscall::retry("getpwuid", || User::from_uid(uid)).map_err(|source| {
            ResolveError::UserDatabase {
                query: format!("uid {}", uid),
                source,
            }
        })?;

        match user {
            Some(user) => Ok(path_bytes(user.dir)),
            None => {
                debug!(%uid, "effective user has no passwd entry");
                Err(ResolveError::NoHomeDirectory)
            }
        }
    }

    fn user_home(&self, user: &[u8]) -> Result<Vec<u8>> {
        // The passwd database only holds UTF-8 names on the systems we target;
        // anything else cannot match an entry.
        let name = std::str::from_utf8(user).map_err(|_| ResolveError::NoSuchUser {
            user: String::from_utf8_lossy(user).into_owned(),
        })?;

        let entry = oscore_syscall::retry("getpwnam", || User::from_name(name)).map_err(|source| {
            ResolveError::UserDatabase {
                query: format!("user \"{}\"", name),
                source,
            }
        })?;

        entry.map(|user| path_bytes(user.dir)).ok_or_else(|| ResolveError::NoSuchUser {
            user: name.to_string(),
        })
    }

    fn current_dir(&self) -> Result<Vec<u8>> {
        getcwd().map(path_bytes).map_err(ResolveError::CurrentDir)
    }
}

fn path_bytes(path: PathBuf) -> Vec<u8> {
    path.into_os_string().into_vec()
}
