use super::{BuildPlan, HostParams, select_artifacts};
use crate::target::{Cc, Os, ResolveError, Target};
use tempfile::Builder;

/// Resolves a target plus host parameters into the configure invocation.
///
/// Runs as an ordered pipeline over a draft: OS remapping, base flags,
/// target flags, cross toolchain selection, native integrations, and the
/// compiler binary last. Later stages may override earlier decisions, so
/// the flag list reads host-generic to target-specific.
pub fn resolve_build_plan(target: Target, host: &HostParams) -> Result<BuildPlan, ResolveError> {
    // 1. Validate the host OS, then remap it per target
    let host_os = Os::parse_host(&host.os)?;
    let os = remap_os(target, host_os, host.cc);

    let mut cc_bin = host
        .cc_bin
        .clone()
        .unwrap_or_else(|| host.cc.default_bin().to_string());
    let mut cpu = host.cpu.clone();
    let mut make_prefix: Vec<String> = Vec::new();
    let mut runs_tests = true;

    let artifacts = select_artifacts(target, os);

    // 2. Base flags
    let install_prefix = Builder::new().prefix("basalt-install-").tempdir()?.keep();

    let mut flags = vec![
        format!("--prefix={}", install_prefix.display()),
        format!("--cc={}", host.cc),
        format!("--os={}", os),
        format!(
            "--build-targets={}",
            artifacts
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(",")
        ),
    ];

    if let Some(cache) = host.compiler_cache {
        flags.push("--no-store-vc-rev".to_string());
        flags.push(format!("--compiler-cache={}", cache.name()));
    }

    if !host.disable_werror {
        flags.push("--werror-mode".to_string());
    }

    if let Some(host_cpu) = &host.cpu {
        flags.push(format!("--cpu={}", host_cpu));
    }

    for flag in &host.extra_cxxflags {
        flags.push(format!("--extra-cxxflags={}", flag));
    }

    // 3. Target flags
    if target == Target::Minimized {
        flags.push("--minimized-build".to_string());
        flags.push("--enable-modules=system_rng,sha2_32,sha2_64,aes".to_string());
    }

    if target == Target::Amalgamation {
        flags.push("--amalgamation".to_string());
    }

    if matches!(target, Target::Bsi | Target::Nist) {
        // tls is optional under these policies but keeps the verify tests runnable
        flags.push(format!("--module-policy={}", target));
        flags.push("--enable-modules=tls12".to_string());
    }

    if target == Target::Docs {
        flags.extend(["--with-doxygen", "--with-sphinx", "--with-rst2man"].map(String::from));
        runs_tests = false;
    }

    if target == Target::Coverage {
        flags.extend(["--with-coverage-info", "--with-debug-info", "--test-mode"].map(String::from));
    }

    if target == Target::Valgrind {
        flags.push("--with-valgrind".to_string());
    }

    if target == Target::Fuzzers {
        flags.push("--unsafe-fuzzer-mode".to_string());
    }

    if matches!(target, Target::Fuzzers | Target::Coverage) {
        flags.push("--build-fuzzers=test".to_string());
    }

    if matches!(target, Target::Fuzzers | Target::Sanitizer) {
        flags.push("--with-debug-asserts".to_string());

        if matches!(host.cc, Cc::Clang | Cc::Gcc) {
            flags.push("--enable-sanitizers=address,undefined".to_string());
        } else {
            flags.push("--with-sanitizers".to_string());
        }
    }

    if matches!(target, Target::Valgrind | Target::Sanitizer | Target::Fuzzers) {
        // the mlock pool trips leak checkers and sanitizer runs alike
        flags.push("--disable-modules=locking_allocator".to_string());
    }

    if target == Target::Baremetal {
        cc_bin = "arm-none-eabi-c++".to_string();
        cpu = Some("arm32".to_string());
        flags.extend(
            [
                "--cpu=arm32",
                "--disable-neon",
                "--without-stack-protector",
                "--ldflags=-specs=nosys.specs",
            ]
            .map(String::from),
        );
        runs_tests = false;
    }

    if target == Target::Emscripten {
        cpu = Some("wasm".to_string());
        flags.push("--cpu=wasm".to_string());
        // no way yet to run the wasm tests without a browser
        runs_tests = false;
    }

    if target.is_cross() {
        // 4. Cross toolchain selection, dispatched on the remapped OS first
        match os {
            Os::Ios => {
                make_prefix = vec![
                    "xcrun".to_string(),
                    "--sdk".to_string(),
                    "iphoneos".to_string(),
                ];
                runs_tests = false;

                if target == Target::CrossIosArm64 {
                    cpu = Some("arm64".to_string());
                    flags.push("--cpu=arm64".to_string());
                    flags.push("--cc-abi-flags=-arch arm64 -stdlib=libc++".to_string());
                } else {
                    return Err(unknown_cross(target, os));
                }
            }
            Os::Android => {
                let ndk = host
                    .ndk
                    .as_ref()
                    .ok_or_else(|| ResolveError::MissingEnvironment("ANDROID_NDK".to_string()))?;

                // Android 4.1 for the ARMv7 builds, Android 9 for AArch64
                let api = match host.android_api_level {
                    Some(api) if api > 0 => api,
                    _ => {
                        if target == Target::CrossAndroidArm32 {
                            16
                        } else {
                            28
                        }
                    }
                };

                let toolchain_dir = ndk.join("toolchains/llvm/prebuilt/linux-x86_64/bin");
                runs_tests = false;

                if target == Target::CrossAndroidArm32 {
                    cc_bin = toolchain_dir
                        .join(format!("armv7a-linux-androideabi{}-clang++", api))
                        .display()
                        .to_string();
                    cpu = Some("armv7".to_string());
                    flags.push("--cpu=armv7".to_string());
                    flags.push(format!(
                        "--ar-command={}",
                        toolchain_dir.join("arm-linux-androideabi-ar").display()
                    ));
                } else {
                    cc_bin = toolchain_dir
                        .join(format!("aarch64-linux-android{}-clang++", api))
                        .display()
                        .to_string();
                    cpu = Some("arm64".to_string());
                    flags.push("--cpu=arm64".to_string());
                    flags.push(format!(
                        "--ar-command={}",
                        toolchain_dir.join("aarch64-linux-android-ar").display()
                    ));
                }

                if api < 18 {
                    flags.push("--without-os-features=getauxval".to_string());
                }
                if api >= 28 {
                    flags.push("--with-os-features=getentropy".to_string());
                }
            }
            _ => match target {
                Target::CrossI386 => {
                    cpu = Some("x86_32".to_string());
                    flags.push("--cpu=x86_32".to_string());
                }
                Target::CrossWin64 => {
                    // the mingw toolchain lacks std threading primitives
                    cc_bin = "x86_64-w64-mingw32-g++".to_string();
                    cpu = Some("x86_64".to_string());
                    flags.extend(
                        [
                            "--cpu=x86_64",
                            "--cc-abi-flags=-static",
                            "--ar-command=x86_64-w64-mingw32-ar",
                            "--without-os-feature=threads",
                        ]
                        .map(String::from),
                    );
                }
                Target::CrossArm32 => {
                    cpu = Some("armv7".to_string());
                    flags.push("--cpu=armv7".to_string());
                    cc_bin = "arm-linux-gnueabihf-g++".to_string();
                }
                Target::CrossArm64 => {
                    cpu = Some("aarch64".to_string());
                    flags.push("--cpu=aarch64".to_string());
                    cc_bin = "aarch64-linux-gnu-g++".to_string();
                }
                Target::CrossPpc32 => {
                    cpu = Some("ppc32".to_string());
                    flags.push("--cpu=ppc32".to_string());
                    cc_bin = "powerpc-linux-gnu-g++".to_string();
                }
                Target::CrossPpc64 => {
                    cpu = Some("ppc64".to_string());
                    flags.push("--cpu=ppc64".to_string());
                    flags.push("--with-endian=little".to_string());
                    cc_bin = "powerpc64le-linux-gnu-g++".to_string();
                }
                Target::CrossMips64 => {
                    cpu = Some("mips64".to_string());
                    flags.push("--cpu=mips64".to_string());
                    flags.push("--with-endian=big".to_string());
                    cc_bin = "mips64-linux-gnuabi64-g++".to_string();
                }
                _ => return Err(unknown_cross(target, os)),
            },
        }
    } else {
        // 5. Native-only library integrations
        if matches!(os, Os::Osx | Os::Linux) {
            flags.extend(["--with-bzip2", "--with-sqlite", "--with-zlib"].map(String::from));
        }

        if matches!(os, Os::Osx | Os::Ios) {
            flags.push("--with-commoncrypto".to_string());
        }

        if target == Target::Coverage {
            flags.push("--with-boost".to_string());
        }

        if os == Os::Windows && matches!(target, Target::Shared | Target::Static) {
            // configure needs hand-holding to find boost headers on windows
            if let Some(dir) = &host.boost_includedir {
                flags.push("--with-external-includedir".to_string());
                flags.push(dir.display().to_string());
            }
        }

        if os == Os::Linux {
            flags.push("--with-lzma".to_string());
        }

        if target == Target::Coverage {
            flags.push("--with-tpm".to_string());
        }
    }

    // 6. The compiler binary goes last so cross overrides are reflected
    flags.push(format!("--cc-bin={}", cc_bin));

    Ok(BuildPlan {
        target,
        os,
        cpu,
        cc_bin,
        flags,
        artifacts,
        make_prefix,
        install_prefix,
        runs_tests,
    })
}

/// OS remapping. Cross targets are checked first: any cross build from an
/// osx host goes through the iOS SDK, the mingw and android targets carry
/// their OS in the name. A gcc toolchain on windows means mingw, and the
/// hostless targets override whatever the host said.
fn remap_os(target: Target, host_os: Os, cc: Cc) -> Os {
    let mut os = host_os;

    if target.is_cross() {
        if os == Os::Osx {
            os = Os::Ios;
        } else if target == Target::CrossWin64 {
            os = Os::Mingw;
        } else if matches!(target, Target::CrossAndroidArm32 | Target::CrossAndroidArm64) {
            os = Os::Android;
        }
    }

    if os == Os::Windows && cc == Cc::Gcc {
        os = Os::Mingw;
    }

    match target {
        Target::Baremetal => Os::None,
        Target::Emscripten => Os::Emscripten,
        _ => os,
    }
}

fn unknown_cross(target: Target, os: Os) -> ResolveError {
    ResolveError::UnknownCrossTarget {
        target: target.name().to_string(),
        os: os.name().to_string(),
    }
}
