//! # basalt-ci CLI entry point
//!
//! Parses host parameters, resolves the requested CI target into build and
//! test plans, and runs (or prints) the resulting command sequence.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::str::FromStr;

use basalt_ci::config;
use basalt_ci::exec::{self, CommandFailed};
use basalt_ci::pipeline::{self, HostTools, PipelineOptions};
use basalt_ci::plan::{HostParams, resolve_build_plan, resolve_test_plan};
use basalt_ci::target::{Cc, ResolveError, Target};
use basalt_ci::toolchain::{self, CompilerCache};
use basalt_ci::ui;

#[derive(Parser)]
#[command(name = "basalt-ci")]
#[command(about = "CI build driver for the Basalt library", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// CI target to build
    target: Option<String>,

    /// Target OS (linux, osx, windows, freebsd)
    #[arg(long, default_value_t = default_os())]
    os: String,

    /// Target CPU platform
    #[arg(long)]
    cpu: Option<String>,

    /// Target compiler family
    #[arg(long, value_enum, default_value_t = Cc::Gcc)]
    cc: Cc,

    /// Path to the compiler binary
    #[arg(long)]
    cc_bin: Option<String>,

    /// Directory of the library checkout to build
    #[arg(long, default_value = ".")]
    root_dir: PathBuf,

    /// Tool run to build the source
    #[arg(long, default_value = "make")]
    make_tool: String,

    /// Extra compiler flag, may be repeated
    #[arg(long)]
    extra_cxxflags: Vec<String>,

    /// Test name to skip, may be repeated
    #[arg(long)]
    disabled_tests: Vec<String>,

    /// Show the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Number of jobs to build with
    #[arg(long, default_value_t = toolchain::default_build_jobs())]
    build_jobs: usize,

    /// Compiler cache to use, autodetected when omitted
    #[arg(long, value_enum)]
    compiler_cache: Option<CompilerCache>,

    /// PKCS#11 provider library for the online tests [env: PKCS11_LIB]
    #[arg(long)]
    pkcs11_lib: Option<PathBuf>,

    /// Allow warnings to compile
    #[arg(long)]
    disable_werror: bool,

    /// Run the test suite under gdb and capture a backtrace
    #[arg(long)]
    run_under_gdb: bool,

    /// Force python3 on
    #[arg(long, overrides_with = "without_python3")]
    with_python3: bool,

    /// Force python3 off
    #[arg(long, overrides_with = "with_python3")]
    without_python3: bool,

    /// Skip pylint in the lint target
    #[arg(long)]
    without_pylint: bool,

    /// Print the resolved plans as JSON and exit
    #[arg(long)]
    dump_plan: bool,

    /// List the target catalog and exit
    #[arg(long)]
    list_targets: bool,

    /// Generate a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn default_os() -> String {
    match std::env::consts::OS {
        "macos" => "osx".to_string(),
        other => other.to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    if cli.list_targets {
        ui::print_target_catalog();
        return Ok(());
    }

    let Some(target_name) = cli.target.as_deref() else {
        eprintln!("Usage: basalt-ci [options] target");
        std::process::exit(1);
    };

    let target = match Target::from_str(target_name) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("{} {}", "x".red(), err);
            std::process::exit(err.exit_code());
        }
    };

    match run(target, &cli) {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(failed) = err.downcast_ref::<CommandFailed>() {
                eprintln!("{} {}", "x".red(), failed);
                std::process::exit(failed.code);
            }
            if let Some(resolve) = err.downcast_ref::<ResolveError>() {
                eprintln!("{} {}", "x".red(), resolve);
                std::process::exit(resolve.exit_code());
            }
            Err(err)
        }
    }
}

fn run(target: Target, cli: &Cli) -> Result<()> {
    println!(
        "{} Invoked as '{}'",
        "▸".cyan(),
        std::env::args().collect::<Vec<_>>().join(" ")
    );

    cli.root_dir
        .read_dir()
        .with_context(|| format!("Root dir {} not readable", cli.root_dir.display()))?;

    let config = config::load_config(&cli.root_dir)?;

    let use_python3 = if cli.with_python3 {
        true
    } else if cli.without_python3 {
        false
    } else {
        toolchain::have_prog("python3")
    };

    if target == Target::Lint {
        let cmds = pipeline::lint_pipeline(&cli.root_dir, use_python3, !cli.without_pylint);
        return exec::run_pipeline(&cmds, &cli.root_dir, cli.dry_run);
    }

    let compiler_cache = cli
        .compiler_cache
        .or(config.defaults.compiler_cache)
        .or_else(|| {
            let cache = CompilerCache::autodetect();
            if let Some(cache) = cache {
                println!("{} Found '{}' installed, will use it", "✓".green(), cache);
            }
            cache
        });

    let mut disabled_tests = config.tests.disabled.clone();
    disabled_tests.extend(cli.disabled_tests.iter().cloned());

    let host = HostParams {
        os: cli.os.clone(),
        cpu: cli.cpu.clone().or(config.defaults.cpu),
        cc: cli.cc,
        cc_bin: cli.cc_bin.clone().or(config.defaults.cc_bin),
        compiler_cache,
        pkcs11_lib: cli
            .pkcs11_lib
            .clone()
            .or_else(|| std::env::var_os("PKCS11_LIB").map(PathBuf::from))
            .or(config.defaults.pkcs11_lib),
        use_gdb: cli.run_under_gdb,
        disable_werror: cli.disable_werror,
        extra_cxxflags: cli.extra_cxxflags.clone(),
        disabled_tests,
        root_dir: cli.root_dir.clone(),
        boost_includedir: std::env::var_os("BOOST_ROOT")
            .or_else(|| std::env::var_os("BOOST_INCLUDEDIR"))
            .map(PathBuf::from),
        ndk: std::env::var_os("ANDROID_NDK").map(PathBuf::from),
        android_api_level: std::env::var("ANDROID_API_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok()),
    };

    let build = resolve_build_plan(target, &host)?;
    let test = resolve_test_plan(target, &host, &build);

    if cli.dump_plan {
        let dump = serde_json::json!({
            "build": build,
            "test": test,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    if let Some(test) = &test {
        for warning in &test.warnings {
            println!("{} {}", "!".yellow(), warning);
        }
    }

    let opts = PipelineOptions {
        root_dir: cli.root_dir.clone(),
        make_tool: cli.make_tool.clone(),
        build_jobs: cli.build_jobs,
        use_python3,
    };

    let tools = HostTools::detect();
    let cmds = pipeline::build_pipeline(target, &host, &build, test.as_ref(), &opts, &tools)?;
    exec::run_pipeline(&cmds, &cli.root_dir, cli.dry_run)
}
