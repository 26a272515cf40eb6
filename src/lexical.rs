//! Purely lexical path processing.
//!
//! Nothing here touches the filesystem. Paths are processed as byte strings so
//! separators, `.` and `..` elements are seen exactly as written; on unix the
//! bytes round-trip losslessly, elsewhere non-UTF-8 sequences are replaced.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::MAIN_SEPARATOR;
use std::path::PathBuf;

use crate::errors::Error;

const SEP: u8 = MAIN_SEPARATOR as u8;

fn is_sep(b: u8) -> bool {
    b.is_ascii() && std::path::is_separator(b as char)
}

#[cfg(unix)]
pub(crate) fn to_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(s.as_bytes())
}

#[cfg(not(unix))]
pub(crate) fn to_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    match s.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(unix)]
pub(crate) fn from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
pub(crate) fn from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Shortest path equivalent to `path`.
///
/// Repeated separators collapse, `.` elements are dropped, `..` cancels the
/// preceding normal element, `..` right after the root is dropped, and an
/// empty result becomes `.`.
pub(crate) fn clean(path: &[u8]) -> Vec<u8> {
    if path.is_empty() {
        return b".".to_vec();
    }
    let n = path.len();
    let rooted = is_sep(path[0]);
    let mut out = Vec::with_capacity(n);
    let mut r = 0;
    // Index in `out` below which `..` may not backtrack.
    let mut dotdot = 0;
    if rooted {
        out.push(SEP);
        r = 1;
        dotdot = 1;
    }

    while r < n {
        if is_sep(path[r]) {
            r += 1;
        } else if path[r] == b'.' && (r + 1 == n || is_sep(path[r + 1])) {
            r += 1;
        } else if path[r] == b'.'
            && path.get(r + 1) == Some(&b'.')
            && (r + 2 == n || is_sep(path[r + 2]))
        {
            r += 2;
            if out.len() > dotdot {
                let mut w = out.len() - 1;
                while w > dotdot && !is_sep(out[w]) {
                    w -= 1;
                }
                out.truncate(w);
            } else if !rooted {
                if !out.is_empty() {
                    out.push(SEP);
                }
                out.extend_from_slice(b"..");
                dotdot = out.len();
            }
        } else {
            if (rooted && out.len() != 1) || (!rooted && !out.is_empty()) {
                out.push(SEP);
            }
            while r < n && !is_sep(path[r]) {
                out.push(path[r]);
                r += 1;
            }
        }
    }

    if out.is_empty() {
        out.push(b'.');
    }
    out
}

/// Joins the non-empty elements with the separator and cleans the result.
/// Returns an empty vector if every element is empty.
pub(crate) fn join<'a, I>(elems: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut joined = Vec::new();
    let mut any = false;
    for elem in elems.into_iter().filter(|e| !e.is_empty()) {
        if any {
            joined.push(SEP);
        }
        joined.extend_from_slice(elem);
        any = true;
    }
    if any { clean(&joined) } else { joined }
}

/// Everything before the last separator, cleaned.
pub(crate) fn dir(path: &[u8]) -> Vec<u8> {
    let end = path.iter().rposition(|b| is_sep(*b)).map_or(0, |i| i + 1);
    clean(&path[..end])
}

/// Last element, ignoring trailing separators.
pub(crate) fn base(path: &[u8]) -> Vec<u8> {
    if path.is_empty() {
        return b".".to_vec();
    }
    let trimmed = match path.iter().rposition(|b| !is_sep(*b)) {
        Some(last) => &path[..=last],
        None => return vec![SEP],
    };
    let start = trimmed.iter().rposition(|b| is_sep(*b)).map_or(0, |i| i + 1);
    trimmed[start..].to_vec()
}

/// Extension of the last element including the leading dot, or empty.
pub(crate) fn ext(path: &[u8]) -> &[u8] {
    for (i, b) in path.iter().enumerate().rev() {
        if is_sep(*b) {
            break;
        }
        if *b == b'.' {
            return &path[i..];
        }
    }
    &[]
}

/// Path that, joined to `base`, is lexically equivalent to `target`.
pub(crate) fn rel(base: &[u8], target: &[u8]) -> Result<Vec<u8>, Error> {
    let mut base = clean(base);
    let targ = clean(target);
    if base == targ {
        return Ok(b".".to_vec());
    }
    if base == b"." {
        base.clear();
    }

    let cannot = || Error::InvalidPath {
        what: format!(
            "can't make {} relative to {}",
            String::from_utf8_lossy(&targ),
            String::from_utf8_lossy(&base)
        ),
    };

    let base_rooted = base.first().is_some_and(|b| is_sep(*b));
    let targ_rooted = targ.first().is_some_and(|b| is_sep(*b));
    if base_rooted != targ_rooted {
        return Err(cannot());
    }

    let (bl, tl) = (base.len(), targ.len());
    let (mut b0, mut bi, mut t0, mut ti) = (0, 0, 0, 0);
    loop {
        while bi < bl && !is_sep(base[bi]) {
            bi += 1;
        }
        while ti < tl && !is_sep(targ[ti]) {
            ti += 1;
        }
        if targ[t0..ti] != base[b0..bi] {
            break;
        }
        if bi < bl {
            bi += 1;
        }
        if ti < tl {
            ti += 1;
        }
        b0 = bi;
        t0 = ti;
    }

    if &base[b0..bi] == b".." {
        return Err(cannot());
    }
    if b0 != bl {
        let seps = base[b0..].iter().filter(|b| is_sep(**b)).count();
        let mut out = Vec::with_capacity(2 + seps * 3 + tl - t0 + 1);
        out.extend_from_slice(b"..");
        for _ in 0..seps {
            out.push(SEP);
            out.extend_from_slice(b"..");
        }
        if t0 != tl {
            out.push(SEP);
            out.extend_from_slice(&targ[t0..]);
        }
        return Ok(out);
    }
    Ok(targ[t0..].to_vec())
}
