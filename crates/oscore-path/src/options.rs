// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::ops::{BitOr, BitOrAssign};

/// Which transformations [`resolve`](crate::resolve) may apply
///
/// At most one of them fires per call, in the order tilde expansion,
/// absolute resolution, canonicalization. With no flag set the path is
/// returned unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResolveOptions {
    /// Replace a leading `~` or `~user` with the matching home directory
    pub expand_tilde: bool,
    /// Prefix relative paths with the current working directory
    pub force_absolute: bool,
    /// Lexically remove redundant separators and `.`/`..` segments
    pub canonicalize: bool,
}

impl ResolveOptions {
    pub const NONE: Self = Self {
        expand_tilde: false,
        force_absolute: false,
        canonicalize: false,
    };

    pub const EXPAND_TILDE: Self = Self {
        expand_tilde: true,
        ..Self::NONE
    };

    pub const FORCE_ABSOLUTE: Self = Self {
        force_absolute: true,
        ..Self::NONE
    };

    pub const CANONICALIZE: Self = Self {
        canonicalize: true,
        ..Self::NONE
    };

    pub const fn is_empty(self) -> bool {
        !(self.expand_tilde || self.force_absolute || self.canonicalize)
    }
}

impl BitOr for ResolveOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            expand_tilde: self.expand_tilde || rhs.expand_tilde,
            force_absolute: self.force_absolute || rhs.force_absolute,
            canonicalize: self.canonicalize || rhs.canonicalize,
        }
    }
}

impl BitOrAssign for ResolveOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
