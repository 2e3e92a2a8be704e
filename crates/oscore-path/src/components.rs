// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Purely lexical path component helpers

/// Last component of `path`, ignoring trailing separators
///
/// Empty and all-separator inputs yield an empty string.
pub fn basename(path: &[u8]) -> &[u8] {
    let trimmed = trim_trailing_separators(path);
    match trimmed.iter().rposition(|&b| b == b'/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything before the last component of `path`
///
/// Returns `.` when there is no directory part and `/` when the directory
/// part is the root.
pub fn dirname(path: &[u8]) -> &[u8] {
    if path.is_empty() {
        return b".";
    }

    let trimmed = trim_trailing_separators(path);
    if trimmed.is_empty() {
        return b"/";
    }

    match trimmed.iter().rposition(|&b| b == b'/') {
        None => b".",
        Some(idx) => {
            let parent = trim_trailing_separators(&trimmed[..idx]);
            if parent.is_empty() {
                b"/"
            } else {
                parent
            }
        }
    }
}

fn trim_trailing_separators(path: &[u8]) -> &[u8] {
    let end = path.iter().rposition(|&b| b != b'/').map_or(0, |idx| idx + 1);
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename(b"/usr/lib"), b"lib");
        assert_eq!(basename(b"/usr/lib//"), b"lib");
        assert_eq!(basename(b"lib"), b"lib");
        assert_eq!(basename(b"/"), b"");
        assert_eq!(basename(b""), b"");
        assert_eq!(basename(b"a/."), b".");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname(b"/usr/lib"), b"/usr");
        assert_eq!(dirname(b"/usr/lib/"), b"/usr");
        assert_eq!(dirname(b"a//b"), b"a");
        assert_eq!(dirname(b"usr"), b".");
        assert_eq!(dirname(b"/usr"), b"/");
        assert_eq!(dirname(b"//usr"), b"/");
        assert_eq!(dirname(b"///"), b"/");
        assert_eq!(dirname(b""), b".");
    }
}
