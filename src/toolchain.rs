//! Host tool discovery: PATH probing, compiler cache autodetection and
//! python interpreter selection.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Checks whether a named program exists somewhere in PATH.
pub fn have_prog(prog: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };

    for dir in std::env::split_paths(&paths) {
        let candidate = dir.join(prog);
        if is_executable(&candidate) || is_executable(&candidate.with_extension("exe")) {
            return true;
        }
    }
    false
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Compiler caches the configure step knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompilerCache {
    Ccache,
    Sccache,
}

impl CompilerCache {
    pub fn name(&self) -> &'static str {
        match self {
            CompilerCache::Ccache => "ccache",
            CompilerCache::Sccache => "sccache",
        }
    }

    /// Probes PATH for a cache worth enabling, preferring sccache.
    pub fn autodetect() -> Option<CompilerCache> {
        if have_prog("sccache") {
            Some(CompilerCache::Sccache)
        } else if have_prog("ccache") {
            Some(CompilerCache::Ccache)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CompilerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn python_interpreter(use_python3: bool) -> &'static str {
    if use_python3 { "python3" } else { "python" }
}

/// Default build parallelism: the CPU count, capped so giant CI hosts do
/// not oversubscribe the shared runners.
pub fn default_build_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(16))
        .unwrap_or(2)
}
