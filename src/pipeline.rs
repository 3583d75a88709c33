//! Turns resolved plans into the ordered list of process invocations.

use crate::exec::Invocation;
use crate::plan::{BuildPlan, HostParams, TestPlan};
use crate::target::Target;
use crate::toolchain::{self, have_prog};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Knobs that shape the pipeline but not the build plan itself.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub root_dir: PathBuf,
    pub make_tool: String,
    pub build_jobs: usize,
    pub use_python3: bool,
}

/// Report tools probed once up front, so assembly stays a pure function
/// of its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTools {
    pub lcov: bool,
    pub gcov: bool,
    pub coverage: bool,
    pub codecov: bool,
}

impl HostTools {
    pub fn detect() -> Self {
        HostTools {
            lcov: have_prog("lcov"),
            gcov: have_prog("gcov"),
            coverage: have_prog("coverage"),
            codecov: have_prog("codecov"),
        }
    }
}

/// The lint target runs pylint over the library's build scripts instead of
/// compiling anything. Quietly does nothing when python3 or pylint are
/// opted out.
pub fn lint_pipeline(root_dir: &Path, use_python3: bool, use_pylint: bool) -> Vec<Invocation> {
    if !use_python3 || !use_pylint {
        return Vec::new();
    }

    let rcfile = root_dir.join("src/configs/pylint.rc");
    let mut args = vec![
        "python3".to_string(),
        "-m".to_string(),
        "pylint".to_string(),
        format!("--rcfile={}", rcfile.display()),
        "--reports=no".to_string(),
    ];

    for script in python_scripts(root_dir) {
        args.push(script.display().to_string());
    }

    vec![Invocation::new(args)]
}

/// Every python script the repo carries: the configure entry point, the
/// language binding, and the helpers under src/scripts.
fn python_scripts(root_dir: &Path) -> Vec<PathBuf> {
    let mut scripts = vec![
        root_dir.join("configure.py"),
        root_dir.join("src/python/basalt.py"),
    ];

    let mut helpers: Vec<PathBuf> = WalkDir::new(root_dir.join("src/scripts"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
        .map(|e| e.path().to_path_buf())
        .collect();
    helpers.sort();

    scripts.extend(helpers);
    scripts
}

/// Assembles the full build/test/report sequence for a non-lint target.
pub fn build_pipeline(
    target: Target,
    host: &HostParams,
    build: &BuildPlan,
    test: Option<&TestPlan>,
    opts: &PipelineOptions,
    tools: &HostTools,
) -> Result<Vec<Invocation>> {
    let root = &opts.root_dir;
    let py_interp = toolchain::python_interpreter(opts.use_python3);

    let mut cmds = Vec::new();

    // 1. Configure
    let mut configure = vec![
        py_interp.to_string(),
        root.join("configure.py").display().to_string(),
    ];
    configure.extend(build.flags.iter().cloned());
    cmds.push(Invocation::new(configure));

    // 2. The make command everything below shares
    let make_tool = if opts.make_tool.is_empty() {
        "make"
    } else {
        &opts.make_tool
    };

    let mut make_cmd = vec![make_tool.to_string()];
    if root != Path::new(".") {
        make_cmd.push("-C".to_string());
        make_cmd.push(root.display().to_string());
    }
    if opts.build_jobs > 1 && make_tool != "nmake" {
        make_cmd.push(format!("-j{}", opts.build_jobs));
    }
    make_cmd.push("-k".to_string());

    // 3. Build
    if target == Target::Docs {
        cmds.push(Invocation::new(
            make_cmd.iter().cloned().chain(["docs".to_string()]),
        ));
    } else {
        if let Some(cache) = host.compiler_cache {
            cmds.push(Invocation::new([cache.name(), "--show-stats"]));
        }

        let mut make_targets = vec!["libs".to_string(), "tests".to_string(), "cli".to_string()];
        if matches!(target, Target::Coverage | Target::Fuzzers) {
            make_targets.push("fuzzer_corpus_zip".to_string());
            make_targets.push("fuzzers".to_string());
        }
        if target == Target::Coverage {
            make_targets.push("bogo_shim".to_string());
        }

        let mut args = build.make_prefix.clone();
        args.extend(make_cmd.iter().cloned());
        args.extend(make_targets);
        cmds.push(Invocation::new(args));

        if let Some(cache) = host.compiler_cache {
            cmds.push(Invocation::new([cache.name(), "--show-stats"]));
        }
    }

    // 4. The test suite
    if let Some(test) = test {
        cmds.push(Invocation::new(test.command()));
    }

    // 5. TLS interop against the BoGo suite
    if target == Target::Coverage {
        let runner_dir = std::path::absolute(root.join("boringssl/ssl/test/runner"))
            .context("Failed to resolve the BoGo runner directory")?;
        let shim = std::path::absolute(root.join("basalt_bogo_shim"))
            .context("Failed to resolve the bogo shim path")?;
        let shim_config = std::path::absolute(root.join("src/bogo_shim/config.json"))
            .context("Failed to resolve the bogo shim config")?;

        cmds.push(
            Invocation::new([
                "go".to_string(),
                "test".to_string(),
                "-pipe".to_string(),
                "-num-workers".to_string(),
                (4 * toolchain::default_build_jobs()).to_string(),
                "-shim-path".to_string(),
                shim.display().to_string(),
                "-shim-config".to_string(),
                shim_config.display().to_string(),
            ])
            .in_dir(runner_dir),
        );
    }

    // 6. Fuzzer regression corpus
    if matches!(target, Target::Coverage | Target::Fuzzers) {
        cmds.push(Invocation::new([
            py_interp.to_string(),
            root.join("src/scripts/test_fuzzers.py").display().to_string(),
            root.join("fuzzer_corpus").display().to_string(),
            root.join("build/fuzzer").display().to_string(),
        ]));
    }

    // 7. CLI test scripts; no wine setup for these, so not on windows
    if matches!(target, Target::Shared | Target::Coverage) && host.os != "windows" {
        let cli_exe = root.join("basalt").display().to_string();

        let mut script_args = vec![format!("--threads={}", opts.build_jobs)];
        if target == Target::Coverage {
            script_args.push("--run-slow-tests".to_string());
        }

        for script in ["test_cli.py", "test_cli_crypt.py"] {
            let mut args = vec![
                py_interp.to_string(),
                root.join("src/scripts").join(script).display().to_string(),
            ];
            args.extend(script_args.iter().cloned());
            args.push(cli_exe.clone());
            cmds.push(Invocation::new(args));
        }
    }

    // 8. Python binding tests
    let python_tests = root.join("src/scripts/test_python.py").display().to_string();

    if matches!(target, Target::Shared | Target::Coverage) {
        if host.os == "windows" {
            // CI python on windows is a 32-bit binary, only test against x86
            if host.cpu.as_deref() == Some("x86") {
                cmds.push(Invocation::new([
                    py_interp.to_string(),
                    "-b".to_string(),
                    python_tests.clone(),
                ]));
            }
        } else if opts.use_python3 {
            cmds.push(Invocation::new([
                "python3".to_string(),
                "-b".to_string(),
                python_tests.clone(),
            ]));
        }
    }

    // 9. Install and verify what landed
    if matches!(target, Target::Shared | Target::Static | Target::Bsi | Target::Nist) {
        cmds.push(Invocation::new(
            make_cmd.iter().cloned().chain(["install".to_string()]),
        ));
        cmds.push(Invocation::new([
            py_interp.to_string(),
            root.join("src/scripts/check_install.py").display().to_string(),
            root.join("build/build_config.json").display().to_string(),
        ]));
    }

    // 10. Coverage capture and reporting
    if target == Target::Coverage {
        if !tools.lcov {
            bail!("lcov not found in PATH");
        }
        if !tools.gcov {
            bail!("gcov not found in PATH");
        }

        let cov_file = "coverage.info";
        let raw_cov_file = "coverage.info.raw";
        let root_str = root.display().to_string();

        cmds.push(
            Invocation::new([
                "lcov",
                "--capture",
                "--directory",
                root_str.as_str(),
                "--output-file",
                raw_cov_file,
            ])
            .tolerating_failure(),
        );
        cmds.push(
            Invocation::new([
                "lcov",
                "--remove",
                raw_cov_file,
                "/usr/*",
                "--output-file",
                cov_file,
            ])
            .tolerating_failure(),
        );
        cmds.push(Invocation::new(["lcov", "--list", cov_file]).tolerating_failure());

        if tools.coverage {
            cmds.push(Invocation::new([
                "coverage".to_string(),
                "run".to_string(),
                "--branch".to_string(),
                "--rcfile".to_string(),
                root.join("src/configs/coverage.rc").display().to_string(),
                python_tests,
            ]));
        }

        if tools.codecov {
            // codecov on PATH means a CI run, report to the service
            cmds.push(
                Invocation::new(["codecov"]).stdout_to(PathBuf::from("codecov_stdout.log")),
            );
        } else {
            cmds.push(Invocation::new([
                "genhtml",
                cov_file,
                "--output-directory",
                "lcov-out",
            ]));
        }
    }

    // 11. Leave the tree clean
    cmds.push(Invocation::new(
        make_cmd.iter().cloned().chain(["clean".to_string()]),
    ));
    cmds.push(Invocation::new(
        make_cmd.iter().cloned().chain(["distclean".to_string()]),
    ));

    Ok(cmds)
}
