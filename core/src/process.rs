//! Best-effort detection of a running instance of the target game.
//!
//! Purely advisory: a hit produces a warning on the operation outcome, it
//! never blocks anything. The actual lock surfaces as `FileInUse` when a
//! copy or delete fails.

use sysinfo::System;

#[derive(Debug, Clone)]
pub struct RunningProcess {
    pub pid: u32,
    pub name: String,
}

/// Wraps a process-list snapshot. Callers pass an explicit `refresh` flag
/// to decide between reusing the previous snapshot and rescanning.
pub struct ProcessScanner {
    system: System,
    scanned: bool,
}

impl ProcessScanner {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            scanned: false,
        }
    }

    /// Returns every running process whose name matches `exe_name`
    /// (case-insensitive). The first call always refreshes.
    pub fn scan(&mut self, exe_name: &str, refresh: bool) -> Vec<RunningProcess> {
        if refresh || !self.scanned {
            self.system.refresh_processes();
            self.scanned = true;
        }
        self.system
            .processes()
            .iter()
            .filter(|(_, process)| process.name().eq_ignore_ascii_case(exe_name))
            .map(|(pid, process)| RunningProcess {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect()
    }
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}
