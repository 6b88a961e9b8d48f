//! Containment check for archive entries (zip-slip protection).

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Symlink hops allowed while resolving one path, matching Linux `MAXSYMLINKS`.
const MAX_SYMLINK_HOPS: usize = 40;

/// One step of a path walk. Leading prefix and root are kept together.
enum Part {
    Root(PathBuf),
    Parent,
    Name(OsString),
}

/// Pushes the parts of `path` onto `stack` so that they pop in path order.
fn push_parts(stack: &mut Vec<Part>, path: &Path) {
    let mut root = PathBuf::new();
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => parts.push(Part::Parent),
            Component::Normal(name) => parts.push(Part::Name(name.to_os_string())),
        }
    }
    if !root.as_os_str().is_empty() {
        parts.insert(0, Part::Root(root));
    }
    stack.extend(parts.into_iter().rev());
}

/// Absolute form of `path` with every symlink and `..` resolved.
///
/// Walks one component at a time the way the kernel does: an existing
/// symlink is replaced by its target before the walk goes on, so `..` always
/// applies to a real directory. Components that do not exist yet are taken
/// as plain directories, which is what extraction will create there.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut pending = Vec::new();
    push_parts(&mut pending, &absolute);
    let mut resolved = PathBuf::new();
    let mut hops = 0;

    while let Some(part) = pending.pop() {
        match part {
            Part::Root(root) => resolved = root,
            Part::Parent => {
                resolved.pop();
            }
            Part::Name(name) => {
                let next = resolved.join(&name);
                match fs::symlink_metadata(&next) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        hops += 1;
                        if hops > MAX_SYMLINK_HOPS {
                            return Err(io::Error::new(
                                io::ErrorKind::Other,
                                format!("too many levels of symbolic links at {}", next.display()),
                            ));
                        }
                        let target = fs::read_link(&next)?;
                        push_parts(&mut pending, &target);
                    }
                    _ => resolved = next,
                }
            }
        }
    }
    Ok(resolved)
}

/// True if `candidate`, once resolved, lies inside (or is) `base`.
///
/// Comparison is per path component, so `/out2` is not inside `/out`.
/// Paths that cannot be resolved are treated as outside.
pub fn is_contained_within(base: &Path, candidate: &Path) -> bool {
    match (resolve_path(base), resolve_path(candidate)) {
        (Ok(base), Ok(candidate)) => candidate.starts_with(&base),
        _ => false,
    }
}

/// Extraction root with its resolved form cached; hands out checked output paths.
#[derive(Debug)]
pub(crate) struct ExtractRoot {
    root: PathBuf,
}

impl ExtractRoot {
    /// `dir` must already exist.
    pub fn new(dir: &Path) -> Result<Self> {
        let root = resolve_path(dir).map_err(|e| Error::io("resolve", dir, e))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Output path for archive entry `entry`, or `Security` if it escapes the root.
    pub fn resolve(&self, entry: &Path) -> Result<PathBuf> {
        self.contain(entry, &self.root.join(entry))
    }

    /// Where a link entry itself goes: the entry's parent is resolved, the
    /// final name is not, so an existing link at that name is not followed.
    pub fn resolve_link_location(&self, entry: &Path) -> Result<PathBuf> {
        let name = entry.file_name().ok_or_else(|| Error::Security {
            entry: entry.display().to_string(),
            resolved: self.root.join(entry),
        })?;
        let parent = entry.parent().unwrap_or_else(|| Path::new(""));
        Ok(self.resolve(parent)?.join(name))
    }

    /// Check an arbitrary `candidate` (e.g. a link target) on behalf of `entry`.
    pub fn contain(&self, entry: &Path, candidate: &Path) -> Result<PathBuf> {
        let resolved = resolve_path(candidate).map_err(|e| Error::io("resolve", candidate, e))?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(Error::Security {
                entry: entry.display().to_string(),
                resolved,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_relative_entry_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_contained_within(dir.path(), &dir.path().join("a/b/c.txt")));
        assert!(is_contained_within(dir.path(), dir.path()));
    }

    #[test]
    fn traversal_entry_is_not_contained() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        assert!(!is_contained_within(&out, &out.join("../../etc/passwd")));
        assert!(!is_contained_within(&out, &out.join("a/../../x")));
        assert!(is_contained_within(&out, &out.join("a/../x")));
    }

    #[test]
    fn sibling_with_common_prefix_is_not_contained() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        assert!(!is_contained_within(&out, &dir.path().join("out2/file")));
    }

    #[test]
    fn absolute_entry_escapes_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = ExtractRoot::new(dir.path()).unwrap();
        let err = root.resolve(Path::new("/etc/passwd")).unwrap_err();
        assert!(err.is_security());
    }

    #[test]
    fn resolve_normalizes_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = fs::canonicalize(dir.path()).unwrap();
        let resolved = resolve_path(&dir.path().join("x/./y/../z")).unwrap();
        assert_eq!(resolved, canonical.join("x/z"));
    }

    #[test]
    fn parent_of_filesystem_root_is_root() {
        let resolved = resolve_path(Path::new("/../..")).unwrap();
        assert_eq!(resolved, PathBuf::from("/"));
    }

    #[cfg(unix)]
    #[test]
    fn dotdot_after_missing_dir_still_follows_later_symlink() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::create_dir(out.join("x")).unwrap();
        symlink("s/x/../..", out.join("a")).unwrap();
        symlink(".", out.join("s")).unwrap();

        let root = ExtractRoot::new(&out).unwrap();
        let err = root.resolve(Path::new("nope/../a/evil.txt")).unwrap_err();
        assert!(err.is_security());
        assert!(!is_contained_within(&out, &out.join("nope/../a/evil.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn dotdot_through_symlink_to_root_escapes() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        symlink(".", out.join("s")).unwrap();

        let root = ExtractRoot::new(&out).unwrap();
        assert!(root.resolve(Path::new("s/../evil.txt")).unwrap_err().is_security());
        assert!(root.resolve(Path::new("s/ok.txt")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_an_error() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        symlink("b", dir.path().join("a")).unwrap();
        symlink("a", dir.path().join("b")).unwrap();
        assert!(resolve_path(&dir.path().join("a/file")).is_err());
        assert!(!is_contained_within(dir.path(), &dir.path().join("a/file")));
    }

    #[cfg(unix)]
    #[test]
    fn link_location_does_not_follow_final_symlink() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        symlink("/etc", out.join("etc")).unwrap();

        let root = ExtractRoot::new(&out).unwrap();
        let location = root.resolve_link_location(Path::new("etc")).unwrap();
        assert_eq!(location, root.path().join("etc"));
        assert!(root.resolve_link_location(Path::new("..")).unwrap_err().is_security());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_pointing_outside_is_not_contained() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir(&out).unwrap();
        fs::create_dir(&elsewhere).unwrap();
        std::os::unix::fs::symlink(&elsewhere, out.join("link")).unwrap();

        assert!(!is_contained_within(&out, &out.join("link/file.txt")));
        let root = ExtractRoot::new(&out).unwrap();
        assert!(root.resolve(Path::new("link/file.txt")).unwrap_err().is_security());
    }
}
