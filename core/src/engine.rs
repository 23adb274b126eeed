//! Orchestrates the swap: status check, removal of any existing patch,
//! backup, copy, status update. And the inverse.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::app::{TargetApplication, Variant};
use crate::backup::{clear_readonly, BackupStore, BackupStrategy};
use crate::cache;
use crate::error::{map_library_io_error, PatchError};
use crate::process::ProcessScanner;
use crate::resolver::{resolve_required_libraries, ALL_KNOWN_LIBRARIES};
use crate::sniffer::{LayerSniffer, MarkerSniffer};
use crate::status::{PatchStatus, StatusStore};

/// Which libraries an apply installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibraryPolicy {
    /// Only the set resolved from the detected API version.
    #[default]
    Precise,
    /// Every known library the release ships. For targets where the
    /// detected API version is not trusted.
    CopyAll,
}

/// What a successful apply/remove did, including the non-fatal warnings
/// the frontend should surface.
#[derive(Debug, Default)]
pub struct PatchOutcome {
    pub copied: Vec<String>,
    pub skipped: Vec<String>,
    pub restored: Vec<String>,
    pub deleted: Vec<String>,
    pub warnings: Vec<String>,
}

impl PatchOutcome {
    /// True when the operation had nothing to do (e.g. removing a patch
    /// that was never applied).
    pub fn is_noop(&self) -> bool {
        self.copied.is_empty() && self.restored.is_empty() && self.deleted.is_empty()
    }
}

/// Per-application patch/unpatch driver.
///
/// One logical operation per application at a time; callers serialize
/// apply/remove for the same target.
pub struct PatchEngine {
    cache_root: PathBuf,
    status: StatusStore,
    backups: BackupStore,
    sniffer: Box<dyn LayerSniffer>,
    policy: LibraryPolicy,
}

impl PatchEngine {
    pub fn new(cache_root: impl Into<PathBuf>, status_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            status: StatusStore::new(status_root),
            backups: BackupStore::new(BackupStrategy::default()),
            sniffer: Box::new(MarkerSniffer),
            policy: LibraryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LibraryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_backup_strategy(mut self, strategy: BackupStrategy) -> Self {
        self.backups = BackupStore::new(strategy);
        self
    }

    pub fn with_sniffer(mut self, sniffer: Box<dyn LayerSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn status(&self, app: &TargetApplication) -> PatchStatus {
        self.status.load(&app.app_id)
    }

    fn required_libraries(&self, app: &TargetApplication) -> Vec<&'static str> {
        match self.policy {
            LibraryPolicy::Precise => resolve_required_libraries(&app.api_version),
            LibraryPolicy::CopyAll => ALL_KNOWN_LIBRARIES.to_vec(),
        }
    }

    /// Installs `release` of `variant` into the application's directory.
    ///
    /// Preconditions are checked before anything is touched: architecture
    /// must be known, the target directory and the cached release must
    /// exist. An already-active patch is fully removed first so two
    /// variants never mix in one directory. Libraries the cache does not
    /// ship are skipped with a warning; a locked target library aborts
    /// with [`PatchError::FileInUse`] (files copied earlier in the same
    /// call stay in place, no rollback).
    pub fn apply(
        &self,
        app: &TargetApplication,
        variant: Variant,
        release: &str,
    ) -> Result<PatchOutcome, PatchError> {
        let arch = app
            .arch
            .ok_or_else(|| PatchError::UnknownArchitecture(app.name.clone()))?;
        let target_dir = match app.target_dir() {
            Some(dir) if dir.is_dir() => dir,
            Some(dir) => return Err(PatchError::TargetDirMissing(dir.to_path_buf())),
            None => return Err(PatchError::TargetDirMissing(app.exe_path.clone())),
        };

        let release_root = self.cache_root.join(variant.cache_dir_name()).join(release);
        let source_dir = cache::locate_library_dir(&release_root, release, arch.cache_folder())
            .ok_or_else(|| PatchError::CacheMissing {
                variant,
                release: release.to_string(),
            })?;

        let mut outcome = PatchOutcome::default();
        self.warn_if_running(app, &mut outcome);

        if self.status.load(&app.app_id).active {
            debug!(app = %app.name, "already patched, removing before re-apply");
            let removal = self.remove_inner(app, false)?;
            outcome.restored.extend(removal.restored);
            outcome.deleted.extend(removal.deleted);
            outcome.warnings.extend(removal.warnings);
        }

        let libraries = self.required_libraries(app);
        let report = self.backups.backup(target_dir, &libraries)?;
        // Backups can predate this call (e.g. a lost status document), so
        // the flag reflects what is on disk, not just what was moved now.
        let backed_up =
            !report.preserved.is_empty() || self.backups.has_backup(target_dir, &libraries);
        if !backed_up {
            outcome
                .warnings
                .push("no original libraries were present to back up".to_string());
        }

        for name in &libraries {
            let source = source_dir.join(name);
            if !source.is_file() {
                outcome.skipped.push((*name).to_string());
                continue;
            }
            copy_library(&source, &target_dir.join(name))?;
            outcome.copied.push((*name).to_string());
        }
        if !outcome.skipped.is_empty() {
            outcome.warnings.push(format!(
                "not shipped by {variant} {release}, skipped: {}",
                outcome.skipped.join(", ")
            ));
        }

        self.status.save(
            &app.app_id,
            &PatchStatus {
                active: true,
                variant: Some(variant),
                release: Some(release.to_string()),
                backed_up,
                applied_at: Some(unix_now()),
            },
        )?;
        info!(app = %app.name, %variant, release, copied = outcome.copied.len(), "patch applied");
        Ok(outcome)
    }

    /// Removes whatever is installed and restores the originals.
    ///
    /// Backed-up libraries are restored per name. A known library on disk
    /// without a backup is deleted only when the prior status said the
    /// application was patched, or when the sniffer positively identifies
    /// the file as the translation layer; anything ambiguous is kept.
    /// Always finishes by writing the unpatched status, so calling this on
    /// a never-patched application is a safe no-op.
    pub fn remove(&self, app: &TargetApplication) -> Result<PatchOutcome, PatchError> {
        self.remove_inner(app, true)
    }

    /// `advisory` suppresses the running-process warning when `apply`
    /// delegates here, so a re-apply does not report it twice.
    fn remove_inner(
        &self,
        app: &TargetApplication,
        advisory: bool,
    ) -> Result<PatchOutcome, PatchError> {
        let mut outcome = PatchOutcome::default();
        let previous = self.status.load(&app.app_id);

        let target_dir = app.target_dir().filter(|dir| dir.is_dir());
        if let Some(target_dir) = target_dir {
            if advisory {
                self.warn_if_running(app, &mut outcome);
            }
            // The previous apply may have run under a different policy or
            // API detection; consider every library we could have installed.
            let libraries = ALL_KNOWN_LIBRARIES;

            let report = self.backups.restore(target_dir, libraries);
            for name in &report.failed {
                outcome
                    .warnings
                    .push(format!("could not restore the original {name}"));
            }
            outcome.restored = report.restored;

            for name in libraries {
                if outcome.restored.iter().any(|r| r == name)
                    || report.failed.iter().any(|f| f == name)
                {
                    continue;
                }
                let path = target_dir.join(name);
                if !path.is_file() {
                    continue;
                }
                if previous.active || self.sniffer.looks_like_translation_layer(&path) {
                    match delete_library(&path) {
                        Ok(()) => outcome.deleted.push((*name).to_string()),
                        Err(err) => {
                            warn!(library = name, %err, "could not delete installed library");
                            outcome.warnings.push(format!("could not delete {name}: {err}"));
                        }
                    }
                }
            }
        } else {
            debug!(app = %app.name, "target directory missing, nothing to remove");
        }

        self.status.save(&app.app_id, &PatchStatus::default())?;
        if outcome.is_noop() {
            info!(app = %app.name, "nothing to remove");
        } else {
            info!(
                app = %app.name,
                restored = outcome.restored.len(),
                deleted = outcome.deleted.len(),
                "patch removed"
            );
        }
        Ok(outcome)
    }

    fn warn_if_running(&self, app: &TargetApplication, outcome: &mut PatchOutcome) {
        let Some(exe_name) = app.exe_name() else {
            return;
        };
        let mut scanner = ProcessScanner::new();
        for process in scanner.scan(exe_name, true) {
            outcome.warnings.push(format!(
                "{} appears to be running (pid {}); its libraries may be locked",
                process.name, process.pid
            ));
        }
    }
}

fn copy_library(source: &Path, dest: &Path) -> Result<(), PatchError> {
    if dest.exists() {
        clear_readonly(dest).map_err(|err| map_library_io_error(err, dest))?;
    }
    fs::copy(source, dest).map_err(|err| map_library_io_error(err, dest))?;
    debug!(dest = %dest.display(), "installed library");
    Ok(())
}

fn delete_library(path: &Path) -> std::io::Result<()> {
    clear_readonly(path)?;
    fs::remove_file(path)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
