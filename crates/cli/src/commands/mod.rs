//! CLI command implementations

pub mod check;
pub mod run;

use std::fs;
use std::path::Path;

use anyhow::Context;
use stallguard_recovery_core::RecoverySettings;

use crate::scenario::Scenario;

/// Read and parse a policy file; structural validation is left to the caller
pub(crate) fn load_policy(path: &Path) -> anyhow::Result<RecoverySettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy {}", path.display()))?;
    RecoverySettings::from_toml_str(&text)
        .with_context(|| format!("failed to parse policy {}", path.display()))
}

pub(crate) fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    Scenario::from_toml_str(&text)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}
