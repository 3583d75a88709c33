//! Execution of the resolved pipeline steps.

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// One step of the resolved pipeline.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Vec<String>,

    /// Directory to run in, when not the caller's
    pub cwd: Option<PathBuf>,

    /// File to redirect stdout into
    pub stdout_to: Option<PathBuf>,

    /// Keep going when this step fails; coverage capture is best-effort
    pub tolerate_failure: bool,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            stdout_to: None,
            tolerate_failure: false,
        }
    }

    pub fn in_dir(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn stdout_to(mut self, path: PathBuf) -> Self {
        self.stdout_to = Some(path);
        self
    }

    pub fn tolerating_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    /// Shell-style rendering for echoes and the dry-run listing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(cwd) = &self.cwd {
            out.push_str(&format!("cd {} && ", cwd.display()));
        }
        out.push_str(&self.args.join(" "));
        if let Some(path) = &self.stdout_to {
            out.push_str(&format!(" > {}", path.display()));
        }
        out
    }
}

/// A spawned command exiting non-zero. Carries the child's code so the
/// process can exit with it.
#[derive(Debug)]
pub struct CommandFailed {
    pub command: String,
    pub code: i32,
}

impl std::fmt::Display for CommandFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Command '{}' failed with error code {}",
            self.command, self.code
        )
    }
}

impl std::error::Error for CommandFailed {}

/// Runs every step in order, or just prints them under dry-run.
pub fn run_pipeline(invocations: &[Invocation], root_dir: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        for invocation in invocations {
            println!("$ {}", invocation.render());
        }
        return Ok(());
    }

    for invocation in invocations {
        run(invocation, root_dir)?;
    }
    Ok(())
}

/// Spawns one step. The library root and the python sources are exported
/// so freshly built artifacts resolve without an install step.
fn run(invocation: &Invocation, root_dir: &Path) -> Result<()> {
    println!("{} Running '{}' ...", "▶".cyan(), invocation.render());

    let root = std::path::absolute(root_dir)
        .with_context(|| format!("Failed to resolve root dir {}", root_dir.display()))?;

    let mut command = Command::new(&invocation.args[0]);
    command
        .args(&invocation.args[1..])
        .env("LD_LIBRARY_PATH", &root)
        .env("DYLD_LIBRARY_PATH", &root)
        .env("PYTHONPATH", root.join("src/python"));

    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }

    if let Some(path) = &invocation.stdout_to {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        command.stdout(Stdio::from(file));
    }

    let start = Instant::now();
    let status = command
        .status()
        .with_context(|| format!("Failed to spawn '{}'", invocation.args[0]))?;

    let elapsed = start.elapsed().as_secs();
    if elapsed > 10 {
        println!("  Ran for {} seconds", elapsed);
    }

    if !status.success() {
        let code = status.code().unwrap_or(1);
        if invocation.tolerate_failure {
            println!(
                "{} Command '{}' failed with error code {} (ignored)",
                "!".yellow(),
                invocation.render(),
                code
            );
            return Ok(());
        }
        return Err(CommandFailed {
            command: invocation.args.join(" "),
            code,
        }
        .into());
    }

    Ok(())
}
