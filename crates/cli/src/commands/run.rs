//! Run command - play a scenario against a recovery policy

use std::path::Path;

use serde_json::json;
use tracing::{info, info_span, warn, Instrument};

use super::{load_policy, load_scenario};
use crate::cli::ReportFormat;
use crate::sim::{self, RunReport};

/// Execute run command
///
/// A policy that parses but fails validation still runs: the controller
/// starts unconfigured, which is what a device with a broken carrier table
/// would do.
pub async fn execute(policy: &Path, scenario: &Path, format: ReportFormat) -> anyhow::Result<()> {
    let settings = load_policy(policy)?;
    if let Err(e) = settings.validate() {
        warn!("Policy {} is invalid, running unconfigured: {}", policy.display(), e);
    }
    let scenario = load_scenario(scenario)?;

    info!(
        "Running {} scenario steps over {}ms",
        scenario.steps.len(),
        scenario.end().as_millis()
    );
    let report = sim::run(&settings, &scenario)
        .instrument(info_span!("scenario", steps = scenario.steps.len()))
        .await?;

    match format {
        ReportFormat::Text => print!("{}", render_text(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(&report))?),
    }
    Ok(())
}

fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    if report.dispatches.is_empty() {
        out.push_str("no recovery actions dispatched\n");
    }
    for (at, action) in &report.dispatches {
        out.push_str(&format!("{:>10}ms  {}\n", at.as_millis(), action));
    }
    for failure in &report.failures {
        out.push_str(&format!("failure: {}\n", failure));
    }
    out.push_str(&format!(
        "final: action={} validated={} timer_pending={} configured={}\n",
        report.snapshot.action,
        report.snapshot.validated,
        report.snapshot.timer_pending,
        report.snapshot.configured
    ));
    out
}

fn render_json(report: &RunReport) -> serde_json::Value {
    let dispatches: Vec<_> = report
        .dispatches
        .iter()
        .map(|(at, action)| json!({ "at_ms": at.as_millis() as u64, "action": action }))
        .collect();

    json!({
        "dispatches": dispatches,
        "failures": report.failures,
        "final": {
            "action": report.snapshot.action,
            "validated": report.snapshot.validated,
            "timer_pending": report.snapshot.timer_pending,
            "configured": report.snapshot.configured,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use stallguard_recovery_core::{ControllerSnapshot, RecoveryAction};

    fn report() -> RunReport {
        RunReport {
            dispatches: vec![
                (Duration::from_millis(0), RecoveryAction::ReestablishInternet),
                (Duration::from_millis(100), RecoveryAction::RadioPowerCycle),
            ],
            failures: vec![],
            snapshot: ControllerSnapshot {
                action: RecoveryAction::RadioPowerCycle,
                timer_pending: true,
                validated: false,
                episode_started: None,
                configured: true,
            },
        }
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&report());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "         0ms  reestablish-internet");
        assert_eq!(lines[1], "       100ms  radio-power-cycle");
        assert_eq!(
            lines[2],
            "final: action=radio-power-cycle validated=false timer_pending=true configured=true"
        );
    }

    #[test]
    fn test_json_report() {
        let value = render_json(&report());
        assert_eq!(value["dispatches"][1]["at_ms"], 100);
        assert_eq!(value["dispatches"][1]["action"], "radio-power-cycle");
        assert_eq!(value["final"]["timer_pending"], true);
    }
}
