use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::app::Variant;

/// Failures a patch operation can surface to the frontend.
///
/// Every variant carries the actionable message shown to the user, so
/// frontends can render `{err}` directly.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("no architecture is known for {0}; select x86 or x64 first")]
    UnknownArchitecture(String),
    #[error("game directory {} does not exist", .0.display())]
    TargetDirMissing(PathBuf),
    #[error("no cached files for {variant} {release}; download this version first")]
    CacheMissing { variant: Variant, release: String },
    #[error("{} is locked by a running process; close the game first", .0.display())]
    FileInUse(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Classifies a copy/delete failure on a library that another process has
/// mapped. Windows reports ERROR_SHARING_VIOLATION (32); the generic
/// permission-denied kind covers the mapped-DLL case elsewhere.
pub(crate) fn map_library_io_error(err: io::Error, path: &std::path::Path) -> PatchError {
    let locked = matches!(err.raw_os_error(), Some(32))
        || err.kind() == io::ErrorKind::PermissionDenied;
    if locked {
        PatchError::FileInUse(path.to_path_buf())
    } else {
        PatchError::Io(err)
    }
}
