//! Preserves the vendor libraries a patch displaces and puts them back on
//! removal.
//!
//! Backups are plain files, no metadata: the artifact's existence is the
//! record. Two placements are supported and the store only ever looks where
//! its configured strategy writes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{map_library_io_error, PatchError};

const BACKUP_SUFFIX: &str = "bak";
const BACKUP_DIR_NAME: &str = "dxvk-backup";

/// Where backup copies of originals live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupStrategy {
    /// Sibling files next to the target, `d3d11.dll.bak` style.
    #[default]
    Suffix,
    /// Original-named copies under a `dxvk-backup` subdirectory.
    Subdir,
}

/// What `backup` actually preserved.
#[derive(Debug, Default)]
pub struct BackupReport {
    /// Libraries moved aside. Empty is a valid outcome: a first install
    /// into a directory with no vendor libraries has nothing to preserve.
    pub preserved: Vec<String>,
}

/// Per-name results of a restore pass.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct BackupStore {
    strategy: BackupStrategy,
}

impl BackupStore {
    pub fn new(strategy: BackupStrategy) -> Self {
        Self { strategy }
    }

    fn backup_path(&self, target_dir: &Path, name: &str) -> PathBuf {
        match self.strategy {
            BackupStrategy::Suffix => target_dir.join(format!("{name}.{BACKUP_SUFFIX}")),
            BackupStrategy::Subdir => target_dir.join(BACKUP_DIR_NAME).join(name),
        }
    }

    /// True iff any of `names` has a backup artifact present.
    pub fn has_backup(&self, target_dir: &Path, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.backup_path(target_dir, name).is_file())
    }

    /// Moves every library currently present in `target_dir` to its backup
    /// location. A backup that already exists is presumed to hold the
    /// genuine original and is never overwritten; the incumbent file is
    /// discarded instead. A library another process holds locked surfaces
    /// as [`PatchError::FileInUse`], the same way a failing copy does.
    pub fn backup(&self, target_dir: &Path, names: &[&str]) -> Result<BackupReport, PatchError> {
        let mut report = BackupReport::default();
        for name in names {
            let current = target_dir.join(name);
            if !current.is_file() {
                continue;
            }
            let backup = self.backup_path(target_dir, name);
            if backup.is_file() {
                warn!(library = name, "backup already present, discarding current file");
                clear_readonly(&current).map_err(|err| map_library_io_error(err, &current))?;
                fs::remove_file(&current).map_err(|err| map_library_io_error(err, &current))?;
                continue;
            }
            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)?;
            }
            // Move, not copy: the original must not linger in the target dir.
            fs::rename(&current, &backup).map_err(|err| map_library_io_error(err, &current))?;
            debug!(library = name, "moved original aside");
            report.preserved.push((*name).to_string());
        }
        Ok(report)
    }

    /// Puts every backed-up library back, independently per name: delete the
    /// current file, copy the backup over, drop the backup. A name that
    /// fails leaves its backup in place for a later retry.
    pub fn restore(&self, target_dir: &Path, names: &[&str]) -> RestoreReport {
        let mut report = RestoreReport::default();
        for name in names {
            let backup = self.backup_path(target_dir, name);
            if !backup.is_file() {
                continue;
            }
            let current = target_dir.join(name);
            match restore_one(&backup, &current) {
                Ok(()) => report.restored.push((*name).to_string()),
                Err(err) => {
                    warn!(library = name, %err, "failed to restore backup");
                    report.failed.push((*name).to_string());
                }
            }
        }
        if self.strategy == BackupStrategy::Subdir {
            // Drop the backup directory once it holds nothing.
            let _ = fs::remove_dir(target_dir.join(BACKUP_DIR_NAME));
        }
        report
    }
}

fn restore_one(backup: &Path, current: &Path) -> io::Result<()> {
    if current.exists() {
        clear_readonly(current)?;
        fs::remove_file(current)?;
    }
    fs::copy(backup, current)?;
    fs::remove_file(backup)?;
    Ok(())
}

/// Installed libraries are sometimes flagged read-only; strip the flag
/// before replacing or deleting.
pub(crate) fn clear_readonly(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn backup_moves_instead_of_copying() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d3d9.dll", b"vendor bytes");
        let store = BackupStore::new(BackupStrategy::Suffix);

        let report = store.backup(dir.path(), &["d3d9.dll", "dxgi.dll"]).unwrap();

        assert_eq!(report.preserved, vec!["d3d9.dll"]);
        assert!(!dir.path().join("d3d9.dll").exists());
        assert_eq!(
            fs::read(dir.path().join("d3d9.dll.bak")).unwrap(),
            b"vendor bytes"
        );
    }

    #[test]
    fn backup_never_overwrites_an_existing_backup() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d3d9.dll.bak", b"genuine original");
        write(dir.path(), "d3d9.dll", b"translation layer build");
        let store = BackupStore::new(BackupStrategy::Suffix);

        let report = store.backup(dir.path(), &["d3d9.dll"]).unwrap();

        assert!(report.preserved.is_empty());
        assert!(!dir.path().join("d3d9.dll").exists());
        assert_eq!(
            fs::read(dir.path().join("d3d9.dll.bak")).unwrap(),
            b"genuine original"
        );
    }

    #[test]
    fn zero_preexisting_libraries_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(BackupStrategy::Suffix);
        let report = store.backup(dir.path(), &["d3d11.dll"]).unwrap();
        assert!(report.preserved.is_empty());
    }

    #[test]
    fn restore_round_trips_bytes_and_consumes_backup() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dxgi.dll", b"original dxgi");
        let store = BackupStore::new(BackupStrategy::Suffix);
        store.backup(dir.path(), &["dxgi.dll"]).unwrap();
        write(dir.path(), "dxgi.dll", b"patched dxgi");

        let report = store.restore(dir.path(), &["dxgi.dll", "d3d9.dll"]);

        assert_eq!(report.restored, vec!["dxgi.dll"]);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read(dir.path().join("dxgi.dll")).unwrap(), b"original dxgi");
        assert!(!dir.path().join("dxgi.dll.bak").exists());
    }

    #[test]
    fn subdir_strategy_round_trips_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d3d11.dll", b"original d3d11");
        let store = BackupStore::new(BackupStrategy::Subdir);

        store.backup(dir.path(), &["d3d11.dll"]).unwrap();
        assert!(dir.path().join("dxvk-backup").join("d3d11.dll").is_file());
        assert!(store.has_backup(dir.path(), &["d3d11.dll"]));

        write(dir.path(), "d3d11.dll", b"layer d3d11");
        let report = store.restore(dir.path(), &["d3d11.dll"]);

        assert_eq!(report.restored, vec!["d3d11.dll"]);
        assert_eq!(
            fs::read(dir.path().join("d3d11.dll")).unwrap(),
            b"original d3d11"
        );
        assert!(!dir.path().join("dxvk-backup").exists());
    }

    #[cfg(unix)]
    #[test]
    fn locked_library_surfaces_as_file_in_use() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dxgi.dll", b"vendor bytes");
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(dir.path().join("writable.tmp"), b"x").is_ok() {
            // Privileged runners bypass directory permissions; nothing to verify.
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let store = BackupStore::new(BackupStrategy::Suffix);
        let err = store.backup(dir.path(), &["dxgi.dll"]).unwrap_err();
        assert!(
            matches!(err, PatchError::FileInUse(ref path) if path.ends_with("dxgi.dll")),
            "expected FileInUse, got {err:?}"
        );

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn strategies_do_not_see_each_others_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d3d9.dll.bak", b"suffix artifact");
        let subdir_store = BackupStore::new(BackupStrategy::Subdir);
        assert!(!subdir_store.has_backup(dir.path(), &["d3d9.dll"]));
    }
}
