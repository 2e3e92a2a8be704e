// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path commands

use std::ffi::OsString;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;

use anyhow::Context;
use clap::Args;
use oscore_path::{basename, dirname, resolve, ResolveOptions};
use tracing::debug;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Replace a leading `~` or `~user` with the home directory
    #[arg(long)]
    expand_tilde: bool,

    /// Prefix relative paths with the current directory
    #[arg(long)]
    absolute: bool,

    /// Collapse `.`, `..` and repeated separators without touching the filesystem
    #[arg(long)]
    canonicalize: bool,

    /// Paths to resolve, one result per line
    #[arg(required = true)]
    paths: Vec<OsString>,
}

impl ResolveArgs {
    pub fn options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::NONE;
        if self.expand_tilde {
            options |= ResolveOptions::EXPAND_TILDE;
        }
        if self.absolute {
            options |= ResolveOptions::FORCE_ABSOLUTE;
        }
        if self.canonicalize {
            options |= ResolveOptions::CANONICALIZE;
        }
        options
    }

    pub fn run(self) -> anyhow::Result<()> {
        let options = self.options();
        debug!(?options, count = self.paths.len(), "resolving paths");

        let mut out = io::stdout().lock();
        for path in &self.paths {
            let resolved = resolve(path.as_bytes(), options)
                .with_context(|| format!("resolving {}", path.to_string_lossy()))?;
            out.write_all(&resolved)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ComponentArgs {
    path: OsString,
}

impl ComponentArgs {
    pub fn run_basename(self) -> anyhow::Result<()> {
        print_line(basename(self.path.as_bytes()))
    }

    pub fn run_dirname(self) -> anyhow::Result<()> {
        print_line(dirname(self.path.as_bytes()))
    }
}

fn print_line(bytes: &[u8]) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
