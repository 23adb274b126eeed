//! Core engine for swapping a game's DirectX runtime libraries with DXVK
//! builds from a local release cache, with backup and restore.
//!
//! Frontends (CLI, GUI, automation) construct a [`TargetApplication`] from
//! their own game discovery and drive a [`PatchEngine`].

mod app;
mod backup;
mod cache;
mod engine;
mod error;
mod process;
mod resolver;
mod sniffer;
mod status;

pub use app::{Arch, TargetApplication, Variant};
pub use backup::{BackupReport, BackupStore, BackupStrategy, RestoreReport};
pub use cache::locate_library_dir;
pub use engine::{LibraryPolicy, PatchEngine, PatchOutcome};
pub use error::PatchError;
pub use process::{ProcessScanner, RunningProcess};
pub use resolver::{resolve_required_libraries, ALL_KNOWN_LIBRARIES, DEFAULT_LIBRARIES};
pub use sniffer::{LayerSniffer, MarkerSniffer};
pub use status::{PatchStatus, StatusStore};
