use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Binary width of the target executable, as detected by the game
/// discovery frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X64,
}

impl Arch {
    /// Directory segment used inside DXVK release archives.
    pub fn cache_folder(&self) -> &'static str {
        match self {
            Arch::X86 => "x32",
            Arch::X64 => "x64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86 => write!(f, "x86"),
            Arch::X64 => write!(f, "x64"),
        }
    }
}

/// Which translation-layer distribution to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Upstream DXVK releases.
    Standard,
    /// The async pipeline-compilation fork (gplasync).
    Async,
}

impl Variant {
    /// Name of the per-variant subdirectory under the release cache root.
    pub fn cache_dir_name(&self) -> &'static str {
        match self {
            Variant::Standard => "dxvk",
            Variant::Async => "dxvk-gplasync",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_dir_name())
    }
}

/// An installed game as reported by the discovery frontend.
///
/// The patch engine only reads these fields; detection of the executable,
/// its architecture and its graphics API happens upstream and is never
/// re-derived here.
#[derive(Debug, Clone)]
pub struct TargetApplication {
    /// Stable identifier, also the key for the status document.
    pub app_id: String,
    /// Display name.
    pub name: String,
    /// Installation root reported by the library scan.
    pub install_dir: PathBuf,
    /// Resolved primary executable. Libraries are swapped in its directory.
    pub exe_path: PathBuf,
    /// `None` when detection failed; patching then requires the user to
    /// pick one first.
    pub arch: Option<Arch>,
    /// Declared graphics-API description, possibly `"Unknown"`.
    pub api_version: String,
    /// Every API version string the scan turned up, newest first.
    pub detected_api_versions: Vec<String>,
}

impl TargetApplication {
    /// The directory libraries are copied into.
    pub fn target_dir(&self) -> Option<&Path> {
        self.exe_path.parent()
    }

    pub fn exe_name(&self) -> Option<&str> {
        self.exe_path.file_name().and_then(|n| n.to_str())
    }
}
