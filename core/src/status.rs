//! Per-application patch state, persisted as one JSON document per app.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::Variant;
use crate::error::PatchError;

/// What is currently installed for one application. Overwritten wholesale
/// on every apply/remove, never mutated field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchStatus {
    pub active: bool,
    pub variant: Option<Variant>,
    pub release: Option<String>,
    pub backed_up: bool,
    /// Unix seconds of the last successful apply.
    pub applied_at: Option<u64>,
}

/// Loads and saves status documents under a fixed root, keyed by app id.
#[derive(Debug, Clone)]
pub struct StatusStore {
    root: PathBuf,
}

impl StatusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ids come from frontends and are not trusted as filenames; path
    /// separators are flattened so a document can never land outside the
    /// status root.
    pub fn document_path(&self, app_id: &str) -> PathBuf {
        let safe: String = app_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    /// Missing, unreadable or corrupt documents all read as "not patched".
    /// A crash mid-write must never wedge an application permanently.
    pub fn load(&self, app_id: &str) -> PatchStatus {
        let path = self.document_path(app_id);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return PatchStatus::default(),
            Err(err) => {
                warn!(app_id, %err, "could not read status document, assuming unpatched");
                return PatchStatus::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(status) => status,
            Err(err) => {
                warn!(app_id, %err, "corrupt status document, assuming unpatched");
                PatchStatus::default()
            }
        }
    }

    /// Whole-document replacement: write a temp file, then rename over the
    /// old document so readers never observe a half-written mix.
    pub fn save(&self, app_id: &str, status: &PatchStatus) -> Result<(), PatchError> {
        fs::create_dir_all(&self.root)?;
        let path = self.document_path(app_id);
        let data = serde_json::to_string_pretty(status).map_err(io::Error::other)?;
        let tmp = temp_sibling(&path);
        fs::write(&tmp, data)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    path.with_extension(format!("json.tmp.{}", std::process::id()))
}
