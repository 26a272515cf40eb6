use std::io;
use std::path::Component;
use std::path::Path as StdPath;
use std::path::PathBuf;

use crate::lexical;

/// Upper bound on links expanded while resolving one path.
const MAX_LINKS: usize = 255;

/// Resolves every symlink in `path`, element by element.
///
/// Relative paths stay relative unless a link points somewhere absolute, and
/// `..` is applied to the already resolved prefix. The result is cleaned.
pub(crate) fn eval_symlinks(path: &StdPath) -> io::Result<PathBuf> {
    let mut dest = PathBuf::new();
    let mut links = 0;
    // Elements still to visit, next one on top.
    let mut remaining: Vec<PathBuf> = path
        .components()
        .rev()
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect();

    while let Some(elem) = remaining.pop() {
        let comp = match elem.components().next() {
            Some(comp) => comp,
            None => continue,
        };
        match comp {
            Component::Prefix(_) | Component::RootDir => {
                dest.push(comp);
                continue;
            }
            Component::CurDir => continue,
            Component::ParentDir => {
                match dest.components().next_back() {
                    Some(Component::Normal(_)) => {
                        dest.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => dest.push(".."),
                }
                continue;
            }
            Component::Normal(name) => {
                let candidate = dest.join(name);
                let meta = std::fs::symlink_metadata(&candidate)?;
                if !meta.file_type().is_symlink() {
                    dest = candidate;
                    continue;
                }

                links += 1;
                if links > MAX_LINKS {
                    return Err(io::Error::other(format!(
                        "too many links resolving {}",
                        path.display()
                    )));
                }
                let target = std::fs::read_link(&candidate)?;
                if target.is_absolute() {
                    dest = PathBuf::new();
                }
                remaining.extend(
                    target
                        .components()
                        .rev()
                        .map(|c| PathBuf::from(c.as_os_str())),
                );
            }
        }
    }

    let cleaned = lexical::clean(&lexical::to_bytes(dest.as_os_str()));
    Ok(lexical::from_bytes(cleaned))
}
