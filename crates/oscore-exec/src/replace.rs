// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Replacing the current process image

use std::convert::Infallible;
use std::ffi::{CString, OsStr};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;

use tracing::{debug, info};

use crate::error::{ExecError, FatalError, Result};
use crate::mapping::DescriptorMapping;
use crate::plan::DescriptorPlan;
use crate::table::{descriptor_bound, ProcessTable};

/// Exit status used when the process cannot continue after remapping began
pub const FATAL_EXIT_STATUS: i32 = 127;

/// Builder for a process image replacement
#[derive(Debug)]
pub struct ProcessReplacer<'a> {
    program: CString,
    argv: Vec<CString>,
    mapping: Option<DescriptorMapping<'a>>,
}

fn to_cstring(what: &'static str, value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|_| ExecError::NulByte {
        what,
        value: value.to_string_lossy().into_owned(),
    })
}

impl<'a> ProcessReplacer<'a> {
    /// `program` is looked up on `PATH` the way `execvp(3)` does; `argv`
    /// becomes the new image's argument vector, including its zeroth element.
    pub fn new<I, S>(program: impl AsRef<OsStr>, argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = to_cstring("program name", program.as_ref())?;
        let argv = argv
            .into_iter()
            .map(|arg| to_cstring("argument", arg.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if argv.is_empty() {
            return Err(ExecError::EmptyArgv);
        }
        Ok(Self {
            program,
            argv,
            mapping: None,
        })
    }

    /// Remap descriptors before exec. Without a mapping the descriptor table
    /// is inherited unchanged.
    pub fn with_mapping(mut self, mapping: DescriptorMapping<'a>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Run every check that can fail without side effects
    pub fn prepare(self) -> Result<PreparedExec> {
        let (plan, bound) = match &self.mapping {
            Some(mapping) => {
                let bound = descriptor_bound()?;
                (Some(mapping.validate(bound)?), bound)
            }
            None => (None, 0),
        };
        Ok(PreparedExec {
            program: self.program,
            argv: self.argv,
            plan,
            bound,
        })
    }
}

/// A replacement that passed validation; the next step is irreversible
#[derive(Debug)]
pub struct PreparedExec {
    program: CString,
    argv: Vec<CString>,
    plan: Option<DescriptorPlan>,
    bound: i32,
}

impl PreparedExec {
    pub fn plan(&self) -> Option<&DescriptorPlan> {
        self.plan.as_ref()
    }

    pub fn program(&self) -> &CString {
        &self.program
    }

    /// Remap descriptors and exec. Never returns: on any failure the process
    /// reports to descriptor 2 and exits with [`FATAL_EXIT_STATUS`].
    pub fn exec(self) -> ! {
        info!(
            program = %self.program.to_string_lossy(),
            args = self.argv.len(),
            remap = self.plan.as_ref().map_or(0, |plan| plan.moves().len()),
            "replacing process image"
        );

        // Buffered output must reach its destination before the descriptors
        // behind it change.
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        if let Some(plan) = &self.plan {
            debug!(moves = ?plan.moves(), "applying descriptor plan");
            if let Err(err) = remap(plan, self.bound) {
                err.terminate();
            }
        }

        // No logging past this point: descriptor 2 may now be something else.
        let err = match nix::unistd::execvp(&self.program, &self.argv) {
            Err(errno) => errno,
            Ok(never) => match never {},
        };
        FatalError::new("execvp", None, err).terminate()
    }
}

fn remap(plan: &DescriptorPlan, bound: i32) -> std::result::Result<(), FatalError> {
    let mut table = ProcessTable::new();
    plan.apply(&mut table)?;
    plan.close_unretained(&mut table, bound)?;
    Ok(())
}

/// Replace the current process image with `program`
///
/// Returns only when validation fails; every later failure terminates the
/// process.
pub fn replace_process<'a, I, S>(
    program: impl AsRef<OsStr>,
    argv: I,
    mapping: Option<DescriptorMapping<'a>>,
) -> Result<Infallible>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut replacer = ProcessReplacer::new(program, argv)?;
    if let Some(mapping) = mapping {
        replacer = replacer.with_mapping(mapping);
    }
    replacer.prepare()?.exec()
}
