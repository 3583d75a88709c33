use basalt_ci::plan::{HostParams, resolve_build_plan, resolve_test_plan, select_artifacts};
use basalt_ci::target::{Os, Target};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::PathBuf;

const CI_TOML: &str = r#"
[defaults]
cc_bin = "g++-13"
compiler_cache = "ccache"

[tests]
disabled = ["ffi", "certstor_system"]
"#;

fn bench_artifact_selection(c: &mut Criterion) {
    c.bench_function("select_artifacts_full_catalog", |b| {
        b.iter(|| {
            for target in Target::ALL {
                for os in [Os::Linux, Os::Osx, Os::Windows, Os::Freebsd] {
                    black_box(select_artifacts(black_box(target), black_box(os)));
                }
            }
        })
    });
}

fn bench_build_plan_resolution(c: &mut Criterion) {
    let host = HostParams {
        ndk: Some(PathBuf::from("/opt/ndk")),
        ..Default::default()
    };

    c.bench_function("resolve_build_plan_catalog", |b| {
        b.iter(|| {
            for target in Target::ALL {
                if target == Target::Lint || target == Target::CrossIosArm64 {
                    continue;
                }
                let plan = resolve_build_plan(black_box(target), black_box(&host)).unwrap();
                let _ = std::fs::remove_dir_all(&plan.install_prefix);
                black_box(plan);
            }
        })
    });
}

fn bench_test_plan_resolution(c: &mut Criterion) {
    let host = HostParams {
        disabled_tests: vec!["ffi".to_string()],
        use_gdb: true,
        ..Default::default()
    };
    let build = resolve_build_plan(Target::Valgrind, &host).unwrap();

    c.bench_function("resolve_test_plan_valgrind", |b| {
        b.iter(|| {
            let plan =
                resolve_test_plan(black_box(Target::Valgrind), black_box(&host), &build).unwrap();
            black_box(plan.command())
        })
    });

    let _ = std::fs::remove_dir_all(&build.install_prefix);
}

fn bench_config_parse(c: &mut Criterion) {
    c.bench_function("parse_ci_toml", |b| {
        b.iter(|| {
            let _: basalt_ci::config::CiConfig = toml::from_str(black_box(CI_TOML)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_artifact_selection,
    bench_build_plan_resolution,
    bench_test_plan_resolution,
    bench_config_parse
);
criterion_main!(benches);
