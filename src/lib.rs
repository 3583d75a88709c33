//! # basalt-ci - CI build driver for the Basalt library
//!
//! basalt-ci turns a symbolic CI target name (`shared`, `valgrind`,
//! `cross-android-arm64`, ...) into a concrete build: the configure flags,
//! the artifact set, the cross toolchain, and the exact command sequence
//! that builds, tests and reports on the library.
//!
//! ## How a run flows
//!
//! - [`target`] validates the target name against the catalog
//! - [`plan`] resolves the build plan (flags, artifacts, toolchain) and
//!   the test plan (runner prefix, skip-list, debugger wrapping)
//! - [`pipeline`] lines up the process invocations around those plans
//! - [`exec`] runs them in order, or prints them under `--dry-run`
//!
//! Resolution is deterministic for fixed inputs apart from the scratch
//! install prefix, so CI logs stay diffable across runs.

/// Configuration file parsing (`ci.toml`).
pub mod config;

/// Process invocations and the sequential runner.
pub mod exec;

/// Build and test plan resolution.
pub mod plan;

/// Pipeline assembly around resolved plans.
pub mod pipeline;

/// The target catalog, OS and compiler types, resolution errors.
pub mod target;

/// Host tool probing: PATH scans, compiler caches, python.
pub mod toolchain;

/// Terminal UI utilities.
pub mod ui;
