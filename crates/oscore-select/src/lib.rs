// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blocking multiplex wait over descriptor sets
//!
//! [`wait`] leaves the caller's sets alone and returns the ready members in a
//! [`WaitOutcome`]; [`wait_in_place`] overwrites the caller's sets with the
//! ready members instead. Both accept up to three optional
//! [`DescriptorSet`]s (read, write, exceptional) and a [`Timeout`].

pub mod error;
pub mod set;
pub mod timeout;
pub mod wait;

pub use error::{Result, WaitError};
pub use set::{DescriptorSet, CAPACITY};
pub use timeout::Timeout;
pub use wait::{wait, wait_in_place, WaitOutcome};
