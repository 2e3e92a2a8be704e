// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `oscore exec`

use std::ffi::OsString;
use std::os::fd::RawFd;
use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use oscore_exec::{replace_process, DescriptorMapping};

/// One `--map TARGET=SOURCE` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSpec {
    pub target: RawFd,
    pub source: RawFd,
}

impl FromStr for MapSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, source) = s
            .split_once('=')
            .ok_or_else(|| format!("expected TARGET=SOURCE, got {:?}", s))?;
        let number = |part: &str| {
            part.trim()
                .parse::<RawFd>()
                .map_err(|err| format!("invalid descriptor {:?} in {:?}: {}", part, s, err))
        };
        Ok(MapSpec {
            target: number(target)?,
            source: number(source)?,
        })
    }
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Make descriptor TARGET refer to SOURCE in the new program; may repeat.
    /// When any mapping is given, every other descriptor is closed.
    #[arg(long = "map", value_name = "TARGET=SOURCE")]
    maps: Vec<MapSpec>,

    /// Zeroth argument for the new program (defaults to PROGRAM)
    #[arg(long)]
    argv0: Option<OsString>,

    /// Program to run, looked up on PATH
    program: OsString,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

impl ExecArgs {
    pub fn mapping(&self) -> Option<DescriptorMapping<'static>> {
        if self.maps.is_empty() {
            return None;
        }
        Some(self.maps.iter().map(|spec| (spec.target, spec.source)).collect())
    }

    pub fn argv(&self) -> Vec<OsString> {
        let argv0 = self.argv0.clone().unwrap_or_else(|| self.program.clone());
        std::iter::once(argv0).chain(self.args.iter().cloned()).collect()
    }

    pub fn run(self) -> anyhow::Result<()> {
        let never = replace_process(&self.program, self.argv(), self.mapping())
            .with_context(|| format!("cannot exec {}", self.program.to_string_lossy()))?;
        match never {}
    }
}
