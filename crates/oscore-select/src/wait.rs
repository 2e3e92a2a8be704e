// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The `select(2)` call itself

use std::os::fd::RawFd;
use std::ptr;

use oscore_syscall::{check, retry};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Result, WaitError};
use crate::set::DescriptorSet;
use crate::timeout::Timeout;

/// Result of a non-destructive [`wait`]
///
/// Each set holds exactly the members that became ready for that kind of
/// interest; a set that was not passed in stays `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitOutcome {
    pub ready: usize,
    pub read: Option<DescriptorSet>,
    pub write: Option<DescriptorSet>,
    pub except: Option<DescriptorSet>,
}

/// Wait on copies of the given sets; the caller's sets are left untouched
pub fn wait(
    read: Option<&DescriptorSet>,
    write: Option<&DescriptorSet>,
    except: Option<&DescriptorSet>,
    timeout: Timeout,
) -> Result<WaitOutcome> {
    let mut read = read.cloned();
    let mut write = write.cloned();
    let mut except = except.cloned();
    let ready = wait_in_place(read.as_mut(), write.as_mut(), except.as_mut(), timeout)?;
    Ok(WaitOutcome {
        ready,
        read,
        write,
        except,
    })
}

/// Wait and overwrite the given sets with their ready members
///
/// Returns the total number of ready descriptors as counted by the OS, which
/// counts a descriptor once per set it is ready in.
pub fn wait_in_place(
    mut read: Option<&mut DescriptorSet>,
    mut write: Option<&mut DescriptorSet>,
    mut except: Option<&mut DescriptorSet>,
    timeout: Timeout,
) -> Result<usize> {
    let mut timeval = timeout.to_timeval()?;

    let interest = [
        read.as_deref().map(DescriptorSet::to_fd_set),
        write.as_deref().map(DescriptorSet::to_fd_set),
        except.as_deref().map(DescriptorSet::to_fd_set),
    ];
    let nfds: RawFd = [read.as_deref(), write.as_deref(), except.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(DescriptorSet::max)
        .max()
        .map_or(0, |max| max + 1);

    debug!(nfds, %timeout, "waiting for descriptors");

    // Each attempt starts from the caller's interest; an interrupted select
    // may have clobbered the previous copies. The timeval is shared so that
    // systems which report the remaining time keep counting down.
    let (count, ready) = retry("select", || {
        let mut sets = interest;
        let [r, w, e] = &mut sets;
        let tv = timeval.as_mut().map_or(ptr::null_mut(), |tv| tv as *mut libc::timeval);
        // SAFETY: every pointer is null or refers to a live local value.
        let count = check(unsafe { libc::select(nfds, raw(r), raw(w), raw(e), tv) })?;
        Ok((count, sets))
    })
    .map_err(|source| WaitError::Select { source })?;

    let [r, w, e] = ready;
    for (set, raw) in [(read.as_deref_mut(), r), (write.as_deref_mut(), w), (except.as_deref_mut(), e)] {
        if let (Some(set), Some(raw)) = (set, raw) {
            set.assign_from_fd_set(&raw, nfds);
        }
    }

    trace!(ready = count, "wait finished");
    Ok(count as usize)
}

fn raw(set: &mut Option<libc::fd_set>) -> *mut libc::fd_set {
    set.as_mut().map_or(ptr::null_mut(), |set| set as *mut libc::fd_set)
}
