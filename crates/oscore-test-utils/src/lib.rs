// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test infrastructure shared by the oscore crates
//!
//! - [`TestLogger`] gives every test its own log file under
//!   `target/test-logs`, printing one line on success and the log location
//!   on failure.
//! - [`Pipe`] and the descriptor probes make it easy to observe descriptor
//!   tables from inside a test.
//! - [`run_in_child`] forks, runs a closure in the child and reports how the
//!   child ended. Tests that replace the process image or rearrange
//!   descriptors 0-2 must do so in a child, never in the test runner.

pub mod child;
pub mod fixtures;
pub mod logging;

pub use child::{run_in_child, ChildExit};
pub use fixtures::{file_identity, is_open, read_all, write_all, Pipe};
pub use logging::{create_unique_test_log, TestLogError, TestLogger};
