mod artifacts;
mod build;
mod test;

pub use artifacts::{Artifact, select_artifacts};
pub use build::resolve_build_plan;
pub use test::{TEST_BINARY, resolve_test_plan};

use crate::target::{Cc, Os, Target};
use crate::toolchain::CompilerCache;
use serde::Serialize;
use std::path::PathBuf;

/// Everything the resolver needs to know about the machine it runs on.
///
/// All environment lookups happen before this is built, so resolution is a
/// pure function of the target and these fields.
#[derive(Debug, Clone)]
pub struct HostParams {
    /// Host OS name as given on the command line; validated during resolution
    pub os: String,

    /// CPU to configure for, when the caller pins one
    pub cpu: Option<String>,

    /// Compiler family
    pub cc: Cc,

    /// Compiler binary override; defaults from the family when unset
    pub cc_bin: Option<String>,

    /// Compiler cache to route compiles through
    pub compiler_cache: Option<CompilerCache>,

    /// PKCS#11 provider library for the online test suite
    pub pkcs11_lib: Option<PathBuf>,

    /// Wrap the test run in gdb for a backtrace on crash
    pub use_gdb: bool,

    /// Leave warnings as warnings instead of errors
    pub disable_werror: bool,

    /// Extra flags forwarded to the C++ compiler, one per element
    pub extra_cxxflags: Vec<String>,

    /// Test names to skip, seeded before any target-driven additions
    pub disabled_tests: Vec<String>,

    /// Root of the library checkout being built
    pub root_dir: PathBuf,

    /// Boost header directory for windows builds (BOOST_ROOT / BOOST_INCLUDEDIR)
    pub boost_includedir: Option<PathBuf>,

    /// Android NDK root (ANDROID_NDK), required for the android cross targets
    pub ndk: Option<PathBuf>,

    /// Android API level override (ANDROID_API_LEVEL)
    pub android_api_level: Option<u32>,
}

impl Default for HostParams {
    fn default() -> Self {
        HostParams {
            os: "linux".to_string(),
            cpu: None,
            cc: Cc::Gcc,
            cc_bin: None,
            compiler_cache: None,
            pkcs11_lib: None,
            use_gdb: false,
            disable_werror: false,
            extra_cxxflags: Vec::new(),
            disabled_tests: Vec::new(),
            root_dir: PathBuf::from("."),
            boost_includedir: None,
            ndk: None,
            android_api_level: None,
        }
    }
}

/// Resolved build plan: the exact configure invocation plus the facts the
/// later pipeline stages key off.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub target: Target,

    /// OS after target-driven remapping
    pub os: Os,

    /// CPU after cross/baremetal pinning
    pub cpu: Option<String>,

    /// Compiler binary after cross toolchain selection
    pub cc_bin: String,

    /// Configure flags, in emission order
    pub flags: Vec<String>,

    pub artifacts: Vec<Artifact>,

    /// Wrapper prepended to every make invocation (xcrun for iOS)
    pub make_prefix: Vec<String>,

    /// Fresh scratch directory the build installs into
    pub install_prefix: PathBuf,

    /// False for flavors whose output cannot run on the build host
    pub runs_tests: bool,
}

/// Resolved test plan. `command()` renders the final argv.
#[derive(Debug, Clone, Serialize)]
pub struct TestPlan {
    pub binary: PathBuf,

    /// Runner prefix: qemu, wine or valgrind with their arguments
    pub prefix: Vec<String>,

    pub skipped_tests: Vec<String>,
    pub single_threaded: bool,
    pub run_long_tests: bool,
    pub run_online_tests: bool,
    pub pkcs11_lib: Option<PathBuf>,
    pub wrap_gdb: bool,

    /// Non-fatal resolution notes, surfaced before the run
    pub warnings: Vec<String>,
}

impl TestPlan {
    /// Renders the full test argv. The gdb wrapper is applied after all
    /// options so the inner command line is complete, and the runner prefix
    /// always comes first.
    pub fn command(&self) -> Vec<String> {
        let mut cmd = vec![self.binary.display().to_string()];

        if self.single_threaded {
            cmd.push("--test-threads=1".to_string());
        }
        if self.run_online_tests {
            cmd.push("--run-online-tests".to_string());
        }
        if let Some(lib) = &self.pkcs11_lib {
            cmd.push(format!("--pkcs11-lib={}", lib.display()));
        }
        if self.run_long_tests {
            cmd.push("--run-long-tests".to_string());
        }
        if !self.skipped_tests.is_empty() {
            cmd.push(format!("--skip-tests={}", self.skipped_tests.join(",")));
        }

        let mut full = self.prefix.clone();
        if self.wrap_gdb {
            full.extend([
                "gdb".to_string(),
                cmd[0].clone(),
                "-ex".to_string(),
                format!("run {}", cmd[1..].join(" ")),
                "-ex".to_string(),
                "bt".to_string(),
                "-ex".to_string(),
                "quit".to_string(),
            ]);
        } else {
            full.extend(cmd);
        }
        full
    }
}
