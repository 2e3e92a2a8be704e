// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `oscore wait`

use std::os::fd::RawFd;

use anyhow::Context;
use clap::Args;
use oscore_select::{wait, wait_in_place, DescriptorSet, Timeout, WaitOutcome};
use tracing::info;

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Wait for FD to become readable; may repeat
    #[arg(long = "read", value_name = "FD")]
    read: Vec<RawFd>,

    /// Wait for FD to become writable; may repeat
    #[arg(long = "write", value_name = "FD")]
    write: Vec<RawFd>,

    /// Wait for an exceptional condition on FD; may repeat
    #[arg(long = "except", value_name = "FD")]
    except: Vec<RawFd>,

    /// `none`, microseconds, or SECS,MICROS
    #[arg(long, env = "OSCORE_WAIT_TIMEOUT", default_value = "none", allow_hyphen_values = true)]
    timeout: Timeout,

    /// Reuse the interest sets as result sets instead of copying them
    #[arg(long)]
    in_place: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

/// Descriptors given for one kind of interest; no flag means no set at all
fn interest(fds: &[RawFd]) -> anyhow::Result<Option<DescriptorSet>> {
    if fds.is_empty() {
        return Ok(None);
    }
    Ok(Some(DescriptorSet::from_fds(fds.iter().copied())?))
}

impl WaitArgs {
    pub fn outcome(&self) -> anyhow::Result<WaitOutcome> {
        let read = interest(&self.read)?;
        let write = interest(&self.write)?;
        let except = interest(&self.except)?;

        if self.in_place {
            let (mut read, mut write, mut except) = (read, write, except);
            let ready = wait_in_place(read.as_mut(), write.as_mut(), except.as_mut(), self.timeout)?;
            Ok(WaitOutcome {
                ready,
                read,
                write,
                except,
            })
        } else {
            Ok(wait(read.as_ref(), write.as_ref(), except.as_ref(), self.timeout)?)
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let outcome = self.outcome().context("waiting for descriptors")?;
        info!(ready = outcome.ready, "wait returned");

        if self.json {
            println!("{}", serde_json::to_string(&outcome)?);
            return Ok(());
        }

        println!("ready: {}", outcome.ready);
        for (label, set) in [("read", &outcome.read), ("write", &outcome.write), ("except", &outcome.except)] {
            if let Some(set) = set {
                let members: Vec<String> = set.iter().map(|fd| fd.to_string()).collect();
                println!("{}: {}", label, members.join(" "));
            }
        }
        Ok(())
    }
}
