use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use dxvk_swap_core::{
    resolve_required_libraries, Arch, BackupStrategy, LibraryPolicy, PatchEngine, PatchOutcome,
    TargetApplication, Variant,
};

#[derive(Parser, Debug)]
#[command(name = "dxvk-swap")]
#[command(version)]
/// Swap a game's DirectX runtime DLLs for DXVK builds from a local release
/// cache, with backup and restore.
///
/// IMPORTANT:
/// This tool does not download releases. Point --cache-root at a directory
/// your release fetcher populated as <cache>/<variant>/<version>/...
struct Args {
    /// Directory holding extracted DXVK releases
    #[arg(long, default_value = "cache")]
    cache_root: PathBuf,

    /// Directory holding per-game patch status documents
    #[arg(long, default_value = "status")]
    status_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install a DXVK release into the game's directory
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Release version to install, e.g. 2.3
        #[arg(short, long)]
        release: String,

        /// Distribution to install
        #[arg(long, value_enum, default_value = "standard")]
        variant: VariantArg,

        /// Copy every library the release ships instead of the resolved set
        #[arg(long)]
        copy_all: bool,

        /// Keep originals in a dxvk-backup subdirectory instead of .bak siblings
        #[arg(long)]
        backup_subdir: bool,
    },
    /// Remove the installed patch and restore the original libraries
    Remove {
        #[command(flatten)]
        target: TargetArgs,

        /// Look for originals in a dxvk-backup subdirectory instead of .bak siblings
        #[arg(long)]
        backup_subdir: bool,
    },
    /// Show the stored patch status for a game
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the library set a DirectX version description resolves to
    Resolve {
        /// API version description, e.g. "Direct3D 11"
        api: String,
    },
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Path to the game's primary executable
    #[arg(short, long)]
    exe: PathBuf,

    /// Executable architecture
    #[arg(long, value_enum)]
    arch: Option<ArchArg>,

    /// Detected DirectX version description
    #[arg(long, default_value = "Unknown")]
    api: String,

    /// Identifier for the status document (defaults to the executable stem)
    #[arg(long)]
    app_id: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchArg {
    X86,
    X64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Standard,
    Async,
}

impl From<ArchArg> for Arch {
    fn from(arch: ArchArg) -> Self {
        match arch {
            ArchArg::X86 => Arch::X86,
            ArchArg::X64 => Arch::X64,
        }
    }
}

impl From<VariantArg> for Variant {
    fn from(variant: VariantArg) -> Self {
        match variant {
            VariantArg::Standard => Variant::Standard,
            VariantArg::Async => Variant::Async,
        }
    }
}

impl TargetArgs {
    fn into_application(self) -> TargetApplication {
        let stem = self
            .exe
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        let install_dir = self
            .exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        TargetApplication {
            app_id: self.app_id.unwrap_or_else(|| stem.clone()),
            name: stem,
            install_dir,
            exe_path: self.exe,
            arch: self.arch.map(Arch::from),
            api_version: self.api.clone(),
            detected_api_versions: vec![self.api],
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let engine = PatchEngine::new(&args.cache_root, &args.status_root);
    match args.command {
        Command::Apply {
            target,
            release,
            variant,
            copy_all,
            backup_subdir,
        } => {
            let engine = engine
                .with_policy(if copy_all {
                    LibraryPolicy::CopyAll
                } else {
                    LibraryPolicy::Precise
                })
                .with_backup_strategy(backup_strategy(backup_subdir));
            let app = target.into_application();
            let outcome = engine.apply(&app, variant.into(), &release)?;
            print_warnings(&outcome);
            println!(
                "installed {} {} ({} libraries)",
                Variant::from(variant),
                release,
                outcome.copied.len()
            );
        }
        Command::Remove {
            target,
            backup_subdir,
        } => {
            let engine = engine.with_backup_strategy(backup_strategy(backup_subdir));
            let app = target.into_application();
            let outcome = engine.remove(&app)?;
            print_warnings(&outcome);
            if outcome.is_noop() {
                println!("nothing to remove");
            } else {
                println!(
                    "removed patch ({} restored, {} deleted)",
                    outcome.restored.len(),
                    outcome.deleted.len()
                );
            }
        }
        Command::Status { target } => {
            let app = target.into_application();
            let status = engine.status(&app);
            if status.active {
                println!(
                    "{}: patched with {} {}",
                    app.name,
                    status
                        .variant
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    status.release.as_deref().unwrap_or("?"),
                );
                println!("originals backed up: {}", status.backed_up);
            } else {
                println!("{}: not patched", app.name);
            }
        }
        Command::Resolve { api } => {
            for name in resolve_required_libraries(&api) {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn backup_strategy(subdir: bool) -> BackupStrategy {
    if subdir {
        BackupStrategy::Subdir
    } else {
        BackupStrategy::Suffix
    }
}

fn print_warnings(outcome: &PatchOutcome) {
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
}
