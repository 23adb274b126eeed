//! Locates the extracted release files inside the download cache.
//!
//! Release archives are not extracted uniformly: depending on the tool that
//! unpacked them the architecture folders sit directly under the release
//! directory, under a kept `name-version` archive root, under some other
//! single directory, or the libraries sit flat at the release root. The
//! locator tolerates all four shapes.

use std::fs;
use std::path::{Path, PathBuf};

/// Finds the directory holding the replacement libraries for one release.
///
/// `release_root` is `<variant cache root>/<release>`; `arch_folder` is the
/// archive's `x32`/`x64` segment. Probes, first hit wins:
///
/// 1. `release_root/arch`
/// 2. `release_root/<name>-<release>/arch` (archive root not stripped)
/// 3. any immediate subdirectory with an `arch` child
/// 4. `release_root` itself, if library files sit flat at the top
///
/// Returns `None` when nothing matches so the caller can raise the
/// distinguishable cache-missing failure instead of a bare I/O error.
pub fn locate_library_dir(
    release_root: &Path,
    release: &str,
    arch_folder: &str,
) -> Option<PathBuf> {
    if !release_root.is_dir() {
        return None;
    }

    let direct = release_root.join(arch_folder);
    if direct.is_dir() {
        return Some(direct);
    }

    let children = subdirectories(release_root);

    let archive_root_suffix = format!("-{release}");
    if let Some(nested) = children
        .iter()
        .find(|dir| dir_name_ends_with(dir, &archive_root_suffix))
    {
        let arch_dir = nested.join(arch_folder);
        if arch_dir.is_dir() {
            return Some(arch_dir);
        }
    }

    // Arbitrary single level of nesting from the extraction step.
    for child in &children {
        let arch_dir = child.join(arch_folder);
        if arch_dir.is_dir() {
            return Some(arch_dir);
        }
    }

    // Last resort: no arch split at all, libraries at the release root.
    if contains_library_files(release_root) {
        return Some(release_root.to_path_buf());
    }

    None
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect()
        })
        .unwrap_or_default()
}

fn dir_name_ends_with(dir: &Path, suffix: &str) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(suffix))
}

fn contains_library_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"))
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn release_root(cache: &Path) -> PathBuf {
        cache.join("dxvk").join("2.3")
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"stub").unwrap();
    }

    #[test]
    fn finds_standard_layout() {
        let cache = tempfile::tempdir().unwrap();
        let root = release_root(cache.path());
        touch(&root.join("x64").join("d3d11.dll"));

        let found = locate_library_dir(&root, "2.3", "x64").unwrap();
        assert_eq!(found, root.join("x64"));
    }

    #[test]
    fn finds_nested_archive_root_layout() {
        let cache = tempfile::tempdir().unwrap();
        let root = release_root(cache.path());
        touch(&root.join("dxvk-2.3").join("x64").join("d3d11.dll"));

        let found = locate_library_dir(&root, "2.3", "x64").unwrap();
        assert_eq!(found, root.join("dxvk-2.3").join("x64"));
    }

    #[test]
    fn finds_arbitrarily_named_nesting() {
        let cache = tempfile::tempdir().unwrap();
        let root = release_root(cache.path());
        touch(&root.join("extracted_files").join("x32").join("d3d9.dll"));

        let found = locate_library_dir(&root, "2.3", "x32").unwrap();
        assert_eq!(found, root.join("extracted_files").join("x32"));
    }

    #[test]
    fn falls_back_to_flat_layout() {
        let cache = tempfile::tempdir().unwrap();
        let root = release_root(cache.path());
        touch(&root.join("d3d11.dll"));
        touch(&root.join("dxgi.dll"));

        let found = locate_library_dir(&root, "2.3", "x64").unwrap();
        assert_eq!(found, root);
    }

    #[test]
    fn missing_release_is_a_miss() {
        let cache = tempfile::tempdir().unwrap();
        let root = release_root(cache.path());
        assert!(locate_library_dir(&root, "2.3", "x64").is_none());

        // An empty release directory is a miss too.
        fs::create_dir_all(&root).unwrap();
        assert!(locate_library_dir(&root, "2.3", "x64").is_none());
    }
}
