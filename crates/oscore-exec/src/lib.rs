// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Process image replacement with precise descriptor remapping
//!
//! [`replace_process`] runs `execvp(3)` in the current process. When a
//! [`DescriptorMapping`] is supplied, the descriptor table is first rearranged
//! so that each requested target number refers to the requested source, and
//! every other descriptor is closed.
//!
//! Failures are split in two:
//!
//! - Everything that can be checked up front (argument shape, mapping entries,
//!   handle directionality) is reported as an ordinary [`ExecError`] before a
//!   single descriptor is touched.
//! - Anything that fails once remapping has begun is a [`FatalError`]. By then
//!   the caller's standard descriptors may already point elsewhere, so the
//!   process writes a diagnostic to descriptor 2 and exits immediately with
//!   [`FATAL_EXIT_STATUS`].

pub mod error;
pub mod mapping;
pub mod plan;
pub mod replace;
pub mod table;

pub use error::{ExecError, FatalError, Result};
pub use mapping::{DescriptorHandle, DescriptorMapping, DescriptorSource, Direction, MappingEntry, Port};
pub use plan::{DescriptorPlan, DescriptorTable, Move, PlanStep};
pub use replace::{replace_process, PreparedExec, ProcessReplacer, FATAL_EXIT_STATUS};
pub use table::{descriptor_bound, is_open, ProcessTable};
