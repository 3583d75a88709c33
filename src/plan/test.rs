use super::{BuildPlan, HostParams, TestPlan};
use crate::target::Target;
use std::path::Path;

/// Name of the test driver binary the build produces.
pub const TEST_BINARY: &str = "basalt-test";

/// Too slow under valgrind's instrumentation to be worth the signal.
const VALGRIND_SLOW_TESTS: [&str; 27] = [
    "cryptobox",
    "dh_invalid",
    "dh_kat",
    "dh_keygen",
    "dl_group_gen",
    "dlies",
    "dsa_param",
    "ecc_basemul",
    "ecdsa_verify_wycheproof",
    "mce_keygen",
    "passhash9",
    "rsa_encrypt",
    "rsa_pss",
    "rsa_pss_raw",
    "scrypt",
    "srp6_kat",
    "x509_path_bsi",
    "xmss_keygen",
    "xmss_sign",
    "pbkdf",
    "argon2",
    "bcrypt",
    "bcrypt_pbkdf",
    "compression",
    "ed25519_sign",
    "elgamal_keygen",
    "x509_path_rsa_pss",
];

/// Derives the test invocation for a resolved build, or None for flavors
/// whose output cannot run on the build host.
///
/// The skip-list accumulates in a fixed order: caller seeds first, then
/// target-driven additions, with the debugger skip appended last.
pub fn resolve_test_plan(target: Target, host: &HostParams, build: &BuildPlan) -> Option<TestPlan> {
    if !build.runs_tests {
        return None;
    }

    let mut binary = host.root_dir.join(TEST_BINARY);
    if build.os.uses_exe_suffix() {
        binary.set_extension("exe");
    }

    let mut skipped_tests = host.disabled_tests.clone();
    let mut single_threaded = false;
    let mut warnings = Vec::new();

    if target == Target::Valgrind {
        // valgrind serializes everything anyway
        single_threaded = true;
        skipped_tests.extend(VALGRIND_SLOW_TESTS.iter().map(|t| t.to_string()));
    }

    if target == Target::CrossWin64 {
        // compiles under mingw but fails when run under wine
        skipped_tests.push("certstor_system".to_string());
    }

    if target == Target::CrossMips64 {
        // no SIMD on MIPS, so the build has no such test to skip
        skipped_tests.retain(|t| t != "simd_32");
    }

    let run_online_tests = target == Target::Coverage;

    let mut pkcs11_lib = None;
    if run_online_tests {
        match &host.pkcs11_lib {
            Some(lib) if is_readable(lib) => pkcs11_lib = Some(lib.clone()),
            Some(lib) => warnings.push(format!(
                "PKCS#11 library {} is not readable, running without it",
                lib.display()
            )),
            None => {}
        }
    }

    let run_long_tests = matches!(target, Target::Coverage | Target::Sanitizer);

    if host.use_gdb {
        // spawns subprocesses of its own, which the debugger would follow
        skipped_tests.push("os_utils".to_string());
    }

    Some(TestPlan {
        binary,
        prefix: runner_prefix(target),
        skipped_tests,
        single_threaded,
        run_long_tests,
        run_online_tests,
        pkcs11_lib,
        wrap_gdb: host.use_gdb,
        warnings,
    })
}

/// Runner each target's test binary needs, if any. The arm32 cross builds
/// run natively on the AArch64 CI hosts and take no prefix.
fn runner_prefix(target: Target) -> Vec<String> {
    let prefix: &[&str] = match target {
        Target::Valgrind => &[
            "valgrind",
            "--error-exitcode=9",
            "-v",
            "--leak-check=full",
            "--show-reachable=yes",
        ],
        Target::CrossWin64 => &["wine"],
        Target::CrossArm64 => &["qemu-aarch64", "-L", "/usr/aarch64-linux-gnu/"],
        Target::CrossPpc32 => &["qemu-ppc", "-L", "/usr/powerpc-linux-gnu/"],
        Target::CrossPpc64 => &[
            "qemu-ppc64le",
            "-cpu",
            "POWER8",
            "-L",
            "/usr/powerpc64le-linux-gnu/",
        ],
        Target::CrossMips64 => &["qemu-mips64", "-L", "/usr/mips64-linux-gnuabi64/"],
        _ => &[],
    };
    prefix.iter().map(|s| s.to_string()).collect()
}

fn is_readable(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::resolve_build_plan;
    use std::path::PathBuf;

    fn resolve(target: Target, host: &HostParams) -> Option<TestPlan> {
        let build = resolve_build_plan(target, host).unwrap();
        let test = resolve_test_plan(target, host, &build);
        let _ = std::fs::remove_dir_all(&build.install_prefix);
        test
    }

    #[test]
    fn test_unhosted_flavors_run_no_tests() {
        assert!(resolve(Target::Docs, &HostParams::default()).is_none());
        assert!(resolve(Target::Baremetal, &HostParams::default()).is_none());
        assert!(resolve(Target::Emscripten, &HostParams::default()).is_none());

        let osx = HostParams {
            os: "osx".to_string(),
            ..Default::default()
        };
        assert!(resolve(Target::CrossIosArm64, &osx).is_none());

        let with_ndk = HostParams {
            ndk: Some(PathBuf::from("/opt/ndk")),
            ..Default::default()
        };
        assert!(resolve(Target::CrossAndroidArm64, &with_ndk).is_none());
    }

    #[test]
    fn test_valgrind_serializes_and_skips_slow_tests() {
        let plan = resolve(Target::Valgrind, &HostParams::default()).unwrap();
        assert!(plan.single_threaded);
        assert_eq!(plan.prefix[0], "valgrind");
        assert!(plan.prefix.contains(&"--error-exitcode=9".to_string()));
        for slow in VALGRIND_SLOW_TESTS {
            assert!(plan.skipped_tests.contains(&slow.to_string()), "{}", slow);
        }
    }

    #[test]
    fn test_caller_seeds_precede_target_additions() {
        let host = HostParams {
            disabled_tests: vec!["ffi".to_string()],
            ..Default::default()
        };
        let plan = resolve(Target::Valgrind, &host).unwrap();
        assert_eq!(plan.skipped_tests[0], "ffi");
        assert!(plan.skipped_tests.len() > VALGRIND_SLOW_TESTS.len());
    }

    #[test]
    fn test_win64_runs_under_wine() {
        let plan = resolve(Target::CrossWin64, &HostParams::default()).unwrap();
        assert_eq!(plan.prefix, vec!["wine"]);
        assert!(plan.binary.display().to_string().ends_with("basalt-test.exe"));
        assert!(plan.skipped_tests.contains(&"certstor_system".to_string()));
    }

    #[test]
    fn test_mips64_never_skips_the_simd_test() {
        // even a caller-seeded simd_32 is stripped: the build has no such test
        let host = HostParams {
            disabled_tests: vec!["simd_32".to_string(), "ffi".to_string()],
            ..Default::default()
        };
        let plan = resolve(Target::CrossMips64, &host).unwrap();
        assert!(!plan.skipped_tests.contains(&"simd_32".to_string()));
        assert!(plan.skipped_tests.contains(&"ffi".to_string()));

        let plan = resolve(Target::CrossMips64, &HostParams::default()).unwrap();
        assert!(!plan.skipped_tests.contains(&"simd_32".to_string()));
        assert_eq!(plan.prefix[0], "qemu-mips64");
    }

    #[test]
    fn test_qemu_prefixes_per_architecture() {
        let plan = resolve(Target::CrossArm64, &HostParams::default()).unwrap();
        assert_eq!(plan.prefix, vec!["qemu-aarch64", "-L", "/usr/aarch64-linux-gnu/"]);

        let plan = resolve(Target::CrossPpc64, &HostParams::default()).unwrap();
        assert_eq!(
            plan.prefix,
            vec!["qemu-ppc64le", "-cpu", "POWER8", "-L", "/usr/powerpc64le-linux-gnu/"]
        );

        // arm32 binaries run directly on the CI hosts
        let plan = resolve(Target::CrossArm32, &HostParams::default()).unwrap();
        assert!(plan.prefix.is_empty());
    }

    #[test]
    fn test_gdb_skips_os_utils_last() {
        let host = HostParams {
            use_gdb: true,
            ..Default::default()
        };
        let plan = resolve(Target::Valgrind, &host).unwrap();
        assert!(plan.wrap_gdb);
        assert_eq!(plan.skipped_tests.last().map(String::as_str), Some("os_utils"));

        let cmd = plan.command();
        assert_eq!(cmd[0], "valgrind");
        let gdb_at = cmd.iter().position(|a| a == "gdb").unwrap();
        assert!(cmd[gdb_at + 3].starts_with("run --test-threads=1"));
        assert!(cmd[gdb_at + 3].contains("os_utils"));
        assert_eq!(cmd.last().map(String::as_str), Some("quit"));
        assert!(plan.skipped_tests.contains(&"scrypt".to_string()));
    }

    #[test]
    fn test_long_and_online_test_selection() {
        let plan = resolve(Target::Coverage, &HostParams::default()).unwrap();
        assert!(plan.run_online_tests);
        assert!(plan.run_long_tests);

        let plan = resolve(Target::Sanitizer, &HostParams::default()).unwrap();
        assert!(!plan.run_online_tests);
        assert!(plan.run_long_tests);

        let plan = resolve(Target::Shared, &HostParams::default()).unwrap();
        assert!(!plan.run_online_tests);
        assert!(!plan.run_long_tests);
    }

    #[test]
    fn test_unreadable_pkcs11_library_degrades_to_a_warning() {
        let host = HostParams {
            pkcs11_lib: Some(PathBuf::from("/nonexistent/softhsm2.so")),
            ..Default::default()
        };
        let plan = resolve(Target::Coverage, &host).unwrap();
        assert!(plan.pkcs11_lib.is_none());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("softhsm2.so"));

        // a readable library is passed through
        let lib = tempfile::NamedTempFile::new().unwrap();
        let host = HostParams {
            pkcs11_lib: Some(lib.path().to_path_buf()),
            ..Default::default()
        };
        let plan = resolve(Target::Coverage, &host).unwrap();
        assert_eq!(plan.pkcs11_lib.as_deref(), Some(lib.path()));
        assert!(plan.warnings.is_empty());

        // outside of the online suite the library is ignored entirely
        let plan = resolve(Target::Shared, &host).unwrap();
        assert!(plan.pkcs11_lib.is_none());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_valgrind_command_rendering() {
        let plan = resolve(Target::Valgrind, &HostParams::default()).unwrap();
        let cmd = plan.command();
        assert_eq!(
            &cmd[..6],
            &[
                "valgrind",
                "--error-exitcode=9",
                "-v",
                "--leak-check=full",
                "--show-reachable=yes",
                "./basalt-test",
            ]
        );
        assert_eq!(cmd[6], "--test-threads=1");
        assert!(cmd[7].starts_with("--skip-tests="));
        assert!(cmd[7].contains("xmss_sign"));
    }
}
