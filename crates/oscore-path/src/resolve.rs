// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Tilde expansion, absolute resolution and lexical canonicalization

use tracing::trace;

use crate::environment::{PathEnvironment, SystemEnvironment};
use crate::error::Result;
use crate::options::ResolveOptions;

/// Resolve `path` against the running system
///
/// See [`resolve_with`].
pub fn resolve(path: &[u8], options: ResolveOptions) -> Result<Vec<u8>> {
    resolve_with(&SystemEnvironment, path, options)
}

/// Resolve `path` using `env` for home directories and the working directory
///
/// Exactly one transformation applies, the first that is both requested and
/// applicable:
///
/// 1. `expand_tilde` when the path starts with `~`
/// 2. `force_absolute` when the path does not start with `/`
/// 3. `canonicalize`
///
/// Otherwise the path is returned unchanged.
pub fn resolve_with<E>(env: &E, path: &[u8], options: ResolveOptions) -> Result<Vec<u8>>
where
    E: PathEnvironment + ?Sized,
{
    let resolved = if options.expand_tilde && path.first() == Some(&b'~') {
        expand_tilde(env, path)?
    } else if options.force_absolute && path.first() != Some(&b'/') {
        make_absolute(env, path)?
    } else if options.canonicalize {
        canonicalize(path)
    } else {
        path.to_vec()
    };

    trace!(
        path = %String::from_utf8_lossy(path),
        resolved = %String::from_utf8_lossy(&resolved),
        ?options,
        "resolved path"
    );
    Ok(resolved)
}

/// Replace the leading `~` or `~user` token with the corresponding home directory
///
/// A separator is placed between the home directory and whatever followed the
/// token, so `~` alone yields the home directory exactly while `~/` and
/// `~/src` yield `home/` and `home/src`.
fn expand_tilde<E>(env: &E, path: &[u8]) -> Result<Vec<u8>>
where
    E: PathEnvironment + ?Sized,
{
    let token_end = find_from(path, 1, b'/').unwrap_or(path.len());
    let user = &path[1..token_end];

    let home = if user.is_empty() {
        env.effective_user_home()?
    } else {
        env.user_home(user)?
    };

    let rest = skip_separators(path, token_end);

    let mut out = Vec::with_capacity(home.len() + 1 + path.len() - rest);
    out.extend_from_slice(&home);
    if token_end < path.len() && out.last() != Some(&b'/') {
        out.push(b'/');
    }
    out.extend_from_slice(&path[rest..]);
    Ok(out)
}

fn make_absolute<E>(env: &E, path: &[u8]) -> Result<Vec<u8>>
where
    E: PathEnvironment + ?Sized,
{
    let mut out = env.current_dir()?;
    out.reserve(path.len() + 1);
    if out.last() != Some(&b'/') {
        out.push(b'/');
    }
    out.extend_from_slice(path);
    Ok(out)
}

/// Lexically canonicalize `path` without touching the filesystem
///
/// - runs of `/` collapse to a single separator
/// - `.` segments are dropped, except a `.` that is the final byte of the
///   input, which is kept as written (`a/.` stays `a/.`)
/// - `..` removes the previously emitted segment; when there is none, a
///   literal `../` is emitted and every later `..` is kept literally as well
/// - a leading `/` is preserved
pub fn canonicalize(path: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len());
    let mut pos = 0;

    let root = if path.first() == Some(&b'/') {
        out.push(b'/');
        pos = skip_separators(path, 0);
        1
    } else {
        0
    };

    let mut below_root = false;

    while pos < path.len() {
        let end = find_from(path, pos, b'/').unwrap_or(path.len());
        let at_end = end == path.len();

        match &path[pos..end] {
            b"." if at_end => out.push(b'.'),
            b"." => {}
            b".." if !below_root => {
                if out.len() > root {
                    back_up(&mut out, root);
                } else {
                    below_root = true;
                    out.extend_from_slice(b"../");
                }
            }
            segment => {
                out.extend_from_slice(segment);
                if !at_end {
                    out.push(b'/');
                }
            }
        }

        pos = skip_separators(path, end);
    }

    out
}

/// Drop the last emitted segment (and its separator) from `out`
///
/// `out` holds `root` bytes of root prefix followed by complete `segment/` entries.
fn back_up(out: &mut Vec<u8>, root: usize) {
    let last_separator = out.len() - 1;
    let cut = out[root..last_separator]
        .iter()
        .rposition(|&b| b == b'/')
        .map_or(root, |idx| root + idx + 1);
    out.truncate(cut);
}

fn find_from(bytes: &[u8], start: usize, needle: u8) -> Option<usize> {
    bytes[start..].iter().position(|&b| b == needle).map(|idx| start + idx)
}

fn skip_separators(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().position(|&b| b != b'/').map_or(bytes.len(), |idx| start + idx)
}
