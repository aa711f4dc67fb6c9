//! Check command - validate a recovery policy

use std::path::Path;

use stallguard_recovery_core::RecoveryConfig;
use tracing::info;

use super::load_policy;

/// Execute check command
pub fn execute(policy: &Path) -> anyhow::Result<()> {
    let settings = load_policy(policy)?;
    let config = settings.validate()?;
    info!("Policy {} is valid", policy.display());

    print!("{}", render(&config));
    Ok(())
}

/// Step table for a validated policy
pub fn render(config: &RecoveryConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "enabled: {}\npoor signal threshold: {}\ncall guard: {:?}\n",
        config.is_enabled(),
        config.poor_signal_threshold().0,
        config.call_guard()
    ));
    out.push_str(&format!("{:<6}{:<24}{:>12}  {}\n", "step", "action", "delay", "skip"));
    for (i, step) in config.steps().iter().enumerate() {
        out.push_str(&format!(
            "{:<6}{:<24}{:>10}ms  {}\n",
            i + 1,
            step.action.to_string(),
            step.delay.as_millis(),
            if step.skip { "yes" } else { "no" }
        ));
    }
    out
}
