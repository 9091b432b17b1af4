//! Confining untrusted relative paths.
//!
//! Archive entry names and repository names come from remote data. Before
//! anything is joined onto a directory on disk, it goes through [`confine`].

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalise an untrusted relative path so it can be safely joined onto a root
/// directory.
///
/// - `.` components, repeated and trailing separators are dropped.
/// - A leading `/` is dropped: absolute names are re-rooted, not rejected.
/// - `..` pops the previous component; popping past the root is an error.
/// - NUL bytes, Windows prefixes and paths that normalise to nothing are errors.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kure_archive::confine;
///
/// assert_eq!(confine("NetKAN-master/NetKAN/Foo.netkan").unwrap(), Path::new("NetKAN-master/NetKAN/Foo.netkan"));
/// assert_eq!(confine("/etc/passwd").unwrap(), Path::new("etc/passwd"));
/// assert_eq!(confine("a/../b//./c/").unwrap(), Path::new("b/c"));
/// assert!(confine("../../etc/evil").is_err());
/// assert!(confine("a/../../b").is_err());
/// assert!(confine("a\0b").is_err());
/// ```
pub fn confine(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Path::components() lets NUL through on Unix, and the syscall
                // would silently truncate at it.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

/// Like [`confine`], but the result must be exactly one component: a bare
/// file or directory name such as a repository name.
pub fn confine_name(name: impl AsRef<Path>) -> Result<PathBuf> {
    let original = name.as_ref();
    let confined = confine(original)?;
    if confined.as_os_str() != original.as_os_str() || confined.components().count() != 1 {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(confined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NetKAN-master/", "NetKAN-master")]
    #[case("NetKAN-master/NetKAN/Foo.netkan", "NetKAN-master/NetKAN/Foo.netkan")]
    #[case("./CKAN-Meta-master//Foo/Foo-1.0.ckan", "CKAN-Meta-master/Foo/Foo-1.0.ckan")]
    #[case("/absolute/entry.netkan", "absolute/entry.netkan")]
    #[case("a/b/..", "a")]
    fn test_confined(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(confine(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../../etc/evil")]
    #[case("..")]
    #[case("repo/../../outside")]
    #[case("")]
    #[case(".")]
    #[case("//")]
    #[case("bad\0name")]
    fn test_rejected(#[case] input: &str) {
        let err = confine(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[rstest]
    #[case("Official Netkan", true)]
    #[case("mirror", true)]
    #[case("nested/name", false)]
    #[case("../escape", false)]
    #[case("trailing/", false)]
    #[case("./mirror", false)]
    #[case("..", false)]
    fn test_confine_name(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(confine_name(input).is_ok(), valid);
    }
}
