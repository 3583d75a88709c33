use crate::target::{Os, Target};
use serde::Serialize;

/// Artifacts the configure step can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Shared,
    Static,
    Cli,
    Tests,
    BogoShim,
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Shared => "shared",
            Artifact::Static => "static",
            Artifact::Cli => "cli",
            Artifact::Tests => "tests",
            Artifact::BogoShim => "bogo_shim",
        }
    }
}

/// Picks the artifact set for a target on the resolved OS.
///
/// The target decides the library flavor first; only when it has no opinion
/// does the OS. The CLI and the test suite are always built, since every
/// other pipeline stage depends on at least one of them.
pub fn select_artifacts(target: Target, os: Os) -> Vec<Artifact> {
    let mut artifacts = match target {
        Target::Shared | Target::Minimized | Target::Bsi | Target::Nist => {
            vec![Artifact::Shared]
        }
        Target::Static | Target::Fuzzers | Target::Baremetal | Target::Emscripten => {
            vec![Artifact::Static]
        }
        _ if os == Os::Windows => vec![Artifact::Shared],
        _ if matches!(os, Os::Ios | Os::Mingw) => vec![Artifact::Static],
        _ => vec![Artifact::Shared, Artifact::Static],
    };

    artifacts.push(Artifact::Cli);
    artifacts.push(Artifact::Tests);

    if target == Target::Coverage {
        artifacts.push(Artifact::BogoShim);
    }

    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_flavor_wins_over_os() {
        // A shared-only target stays shared-only even where the OS would
        // have picked static
        assert_eq!(
            select_artifacts(Target::Bsi, Os::Mingw),
            vec![Artifact::Shared, Artifact::Cli, Artifact::Tests]
        );
        assert_eq!(
            select_artifacts(Target::Static, Os::Linux),
            vec![Artifact::Static, Artifact::Cli, Artifact::Tests]
        );
    }

    #[test]
    fn test_os_picks_flavor_for_neutral_targets() {
        assert_eq!(
            select_artifacts(Target::Sanitizer, Os::Windows),
            vec![Artifact::Shared, Artifact::Cli, Artifact::Tests]
        );
        assert_eq!(
            select_artifacts(Target::CrossWin64, Os::Mingw),
            vec![Artifact::Static, Artifact::Cli, Artifact::Tests]
        );
        assert_eq!(
            select_artifacts(Target::CrossIosArm64, Os::Ios),
            vec![Artifact::Static, Artifact::Cli, Artifact::Tests]
        );
        assert_eq!(
            select_artifacts(Target::Amalgamation, Os::Linux),
            vec![Artifact::Shared, Artifact::Static, Artifact::Cli, Artifact::Tests]
        );
    }

    #[test]
    fn test_coverage_adds_the_interop_shim() {
        assert_eq!(
            select_artifacts(Target::Coverage, Os::Linux),
            vec![
                Artifact::Shared,
                Artifact::Static,
                Artifact::Cli,
                Artifact::Tests,
                Artifact::BogoShim
            ]
        );
    }

    #[test]
    fn test_cli_and_tests_are_always_present() {
        for target in Target::ALL {
            for os in [Os::Linux, Os::Osx, Os::Windows, Os::Freebsd, Os::Mingw] {
                let artifacts = select_artifacts(target, os);
                assert!(artifacts.contains(&Artifact::Cli), "{} on {}", target, os);
                assert!(artifacts.contains(&Artifact::Tests), "{} on {}", target, os);
            }
        }
    }
}
