use serde::{Deserialize, Serialize};

/// Symbolic CI targets accepted on the command line.
///
/// Each target names a build flavor, not a platform triple: the target picks
/// the configure flags, the artifact set and the test strategy, while the
/// host parameters fill in compiler and OS details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Amalgamation,
    Baremetal,
    Bsi,
    Coverage,
    CrossAndroidArm32,
    CrossAndroidArm64,
    CrossArm32,
    CrossArm64,
    CrossI386,
    CrossIosArm64,
    CrossMips64,
    CrossPpc32,
    CrossPpc64,
    CrossWin64,
    Docs,
    Emscripten,
    Fuzzers,
    Lint,
    Minimized,
    Nist,
    Sanitizer,
    Shared,
    Static,
    Valgrind,
}

impl Target {
    pub const ALL: [Target; 24] = [
        Target::Amalgamation,
        Target::Baremetal,
        Target::Bsi,
        Target::Coverage,
        Target::CrossAndroidArm32,
        Target::CrossAndroidArm64,
        Target::CrossArm32,
        Target::CrossArm64,
        Target::CrossI386,
        Target::CrossIosArm64,
        Target::CrossMips64,
        Target::CrossPpc32,
        Target::CrossPpc64,
        Target::CrossWin64,
        Target::Docs,
        Target::Emscripten,
        Target::Fuzzers,
        Target::Lint,
        Target::Minimized,
        Target::Nist,
        Target::Sanitizer,
        Target::Shared,
        Target::Static,
        Target::Valgrind,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Amalgamation => "amalgamation",
            Target::Baremetal => "baremetal",
            Target::Bsi => "bsi",
            Target::Coverage => "coverage",
            Target::CrossAndroidArm32 => "cross-android-arm32",
            Target::CrossAndroidArm64 => "cross-android-arm64",
            Target::CrossArm32 => "cross-arm32",
            Target::CrossArm64 => "cross-arm64",
            Target::CrossI386 => "cross-i386",
            Target::CrossIosArm64 => "cross-ios-arm64",
            Target::CrossMips64 => "cross-mips64",
            Target::CrossPpc32 => "cross-ppc32",
            Target::CrossPpc64 => "cross-ppc64",
            Target::CrossWin64 => "cross-win64",
            Target::Docs => "docs",
            Target::Emscripten => "emscripten",
            Target::Fuzzers => "fuzzers",
            Target::Lint => "lint",
            Target::Minimized => "minimized",
            Target::Nist => "nist",
            Target::Sanitizer => "sanitizer",
            Target::Shared => "shared",
            Target::Static => "static",
            Target::Valgrind => "valgrind",
        }
    }

    /// Cross targets go through sub-target resolution and pick up a
    /// cross compiler, an emulator prefix, or both.
    pub fn is_cross(&self) -> bool {
        self.name().starts_with("cross-")
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Target::Amalgamation => "Build from a single merged source file",
            Target::Baremetal => "Bare-metal ARM build with no operating system",
            Target::Bsi => "Build restricted to the BSI module policy",
            Target::Coverage => "Instrumented build with the full test and report suite",
            Target::CrossAndroidArm32 => "Android armv7 build via the NDK toolchain",
            Target::CrossAndroidArm64 => "Android aarch64 build via the NDK toolchain",
            Target::CrossArm32 => "32-bit ARM Linux cross build",
            Target::CrossArm64 => "AArch64 Linux cross build, tested under qemu",
            Target::CrossI386 => "32-bit x86 build on an x86-64 host",
            Target::CrossIosArm64 => "iOS ARM64 build via the Apple SDK",
            Target::CrossMips64 => "Big-endian MIPS64 cross build, tested under qemu",
            Target::CrossPpc32 => "32-bit PowerPC cross build, tested under qemu",
            Target::CrossPpc64 => "Little-endian POWER8 cross build, tested under qemu",
            Target::CrossWin64 => "MinGW 64-bit Windows cross build, tested under wine",
            Target::Docs => "Documentation build only",
            Target::Emscripten => "WebAssembly build via Emscripten",
            Target::Fuzzers => "Fuzzer harness build",
            Target::Lint => "Run pylint over the build and helper scripts",
            Target::Minimized => "Build with all but a minimal module set disabled",
            Target::Nist => "Build restricted to the NIST module policy",
            Target::Sanitizer => "Address/undefined sanitizer build",
            Target::Shared => "Default shared library build",
            Target::Static => "Static library build",
            Target::Valgrind => "Build and run the tests under valgrind",
        }
    }
}

impl std::str::FromStr for Target {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| ResolveError::UnknownTarget(s.to_string()))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Operating systems as seen by the native build's configure step.
///
/// Only the first four are valid host values; the rest are produced by
/// target-driven remapping during plan resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Osx,
    Windows,
    Freebsd,
    Ios,
    Mingw,
    Android,
    /// Bare-metal, no operating system at all.
    None,
    Emscripten,
}

impl Os {
    /// Parses a host OS name. Remapped-only values are rejected here;
    /// they can only be reached through a target remap.
    pub fn parse_host(s: &str) -> Result<Os, ResolveError> {
        match s {
            "linux" => Ok(Os::Linux),
            "osx" => Ok(Os::Osx),
            "windows" => Ok(Os::Windows),
            "freebsd" => Ok(Os::Freebsd),
            other => Err(ResolveError::UnknownOs(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Osx => "osx",
            Os::Windows => "windows",
            Os::Freebsd => "freebsd",
            Os::Ios => "ios",
            Os::Mingw => "mingw",
            Os::Android => "android",
            Os::None => "none",
            Os::Emscripten => "emscripten",
        }
    }

    /// Executables carry an `.exe` suffix on these.
    pub fn uses_exe_suffix(&self) -> bool {
        matches!(self, Os::Windows | Os::Mingw)
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiler families the configure step understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cc {
    Gcc,
    Clang,
    Msvc,
    Emcc,
}

impl Cc {
    pub fn name(&self) -> &'static str {
        match self {
            Cc::Gcc => "gcc",
            Cc::Clang => "clang",
            Cc::Msvc => "msvc",
            Cc::Emcc => "emcc",
        }
    }

    /// Default compiler binary when the caller does not pin one.
    pub fn default_bin(&self) -> &'static str {
        match self {
            Cc::Gcc => "g++",
            Cc::Clang => "clang++",
            Cc::Msvc => "cl",
            Cc::Emcc => "em++",
        }
    }
}

impl std::fmt::Display for Cc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type for plan resolution
#[derive(Debug)]
pub enum ResolveError {
    /// The target name is not in the catalog
    UnknownTarget(String),
    /// The host OS is not one the build supports
    UnknownOs(String),
    /// A cross target with no sub-target rule for the resolved OS
    UnknownCrossTarget { target: String, os: String },
    /// A required environment variable is absent
    MissingEnvironment(String),
    /// IO error while preparing the plan
    Io(std::io::Error),
}

impl ResolveError {
    /// Unknown targets get a distinct exit code so CI matrices can tell
    /// a typo from a real resolution failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::UnknownTarget(_) => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnknownTarget(name) => write!(f, "Unknown target '{}'", name),
            ResolveError::UnknownOs(name) => write!(f, "Unknown OS '{}'", name),
            ResolveError::UnknownCrossTarget { target, os } => {
                write!(f, "Unknown cross target '{}' for OS '{}'", target, os)
            }
            ResolveError::MissingEnvironment(var) => {
                write!(f, "Required environment variable {} is not set", var)
            }
            ResolveError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<std::io::Error> for ResolveError {
    fn from(e: std::io::Error) -> Self {
        ResolveError::Io(e)
    }
}
