//! Extraction path resolution with traversal protection.

use crate::error::{ArchiveError, ArchiveResult};
use std::path::{Component, Path, PathBuf};

/// Resolves an archive entry name against an extraction root.
///
/// Returns the absolute target path, or [`ArchiveError::PathTraversal`] if
/// the entry would resolve outside `root`. The check is purely lexical:
/// the target usually does not exist yet, so the path is normalized
/// component by component instead of canonicalized through the filesystem.
///
/// Rejected entry names:
/// - absolute paths (`/etc/passwd`) and paths with a drive or UNC prefix
/// - any name whose `..` components climb above `root`
/// - the empty name (it resolves to `root` itself, not a descendant)
///
/// # Errors
///
/// Returns [`ArchiveError::PathTraversal`] for every rejected name.
pub fn safe_join(root: &Path, entry_name: &str) -> ArchiveResult<PathBuf> {
    // Zip entry names use `/` regardless of platform; `\` appears in
    // archives produced by some Windows tools and must not be treated as a
    // plain filename character on Unix.
    let normalized = entry_name.replace('\\', "/");
    let entry = Path::new(&normalized);

    let mut resolved = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(ArchiveError::path_traversal(entry_name));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::path_traversal(entry_name));
            }
        }
    }

    if resolved.as_os_str().is_empty() {
        return Err(ArchiveError::path_traversal(entry_name));
    }

    Ok(root.join(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/tmp/extract")
    }

    #[test]
    fn plain_names_resolve_under_root() {
        let p = safe_join(&root(), "save.dat").unwrap();
        assert_eq!(p, root().join("save.dat"));

        let p = safe_join(&root(), "slot1/save.dat").unwrap();
        assert_eq!(p, root().join("slot1").join("save.dat"));
    }

    #[test]
    fn current_dir_components_are_dropped() {
        let p = safe_join(&root(), "./slot1/./save.dat").unwrap();
        assert_eq!(p, root().join("slot1").join("save.dat"));
    }

    #[test]
    fn internal_parent_dirs_are_allowed_if_contained() {
        // `a/../b` stays inside the root and resolves to `b`.
        let p = safe_join(&root(), "a/../b").unwrap();
        assert_eq!(p, root().join("b"));
    }

    #[test]
    fn escaping_parent_dirs_are_rejected() {
        for name in [
            "../evil",
            "../../evil",
            "a/../../evil",
            "a/b/../../../evil",
            "..",
        ] {
            let err = safe_join(&root(), name).unwrap_err();
            assert!(
                matches!(err, ArchiveError::PathTraversal { .. }),
                "expected traversal for {name:?}"
            );
        }
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let err = safe_join(&root(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, ArchiveError::PathTraversal { .. }));
    }

    #[test]
    fn backslash_traversal_is_rejected() {
        let err = safe_join(&root(), "..\\..\\evil").unwrap_err();
        assert!(matches!(err, ArchiveError::PathTraversal { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(safe_join(&root(), "").is_err());
        assert!(safe_join(&root(), ".").is_err());
    }
}
