// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path string resolution for the oscore runtime primitives
//!
//! Paths are handled as raw byte strings: `/` is the only byte with structural
//! meaning and nothing here requires valid UTF-8. The only I/O performed is the
//! user-database lookup behind `~` expansion and reading the working directory,
//! both routed through [`PathEnvironment`] so they can be substituted in tests.

pub mod components;
pub mod environment;
pub mod error;
pub mod options;
pub mod resolve;

pub use components::{basename, dirname};
pub use environment::{PathEnvironment, SystemEnvironment};
pub use error::{ResolveError, Result};
pub use options::ResolveOptions;
pub use resolve::{canonicalize, resolve, resolve_with};
