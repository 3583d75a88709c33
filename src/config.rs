use crate::toolchain::CompilerCache;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional per-checkout defaults, read from ci.toml in the library root.
///
/// Everything here can also be given on the command line. The command line
/// wins for single values; disabled tests accumulate, config first.
#[derive(Deserialize, Debug, Default)]
pub struct CiConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub tests: TestsConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct Defaults {
    pub cc_bin: Option<String>,
    pub cpu: Option<String>,
    pub compiler_cache: Option<CompilerCache>,
    pub pkcs11_lib: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TestsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Loads ci.toml when present. Absence is not an error, a config-free
/// checkout just runs on command-line values.
pub fn load_config(root_dir: &Path) -> Result<CiConfig> {
    let path = root_dir.join("ci.toml");
    if !path.exists() {
        return Ok(CiConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
