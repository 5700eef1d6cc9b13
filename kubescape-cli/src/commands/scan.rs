//! `ksctl scan` / `ksctl scan-cluster` command handlers

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use kubescape_core::types::{ScanResult, ScanResults};

use crate::cli::{ScanArgs, ScanClusterArgs};
use crate::error::CliError;
use crate::output::Render;

use super::Context;

/// Execute the `scan` command.
pub async fn execute(args: ScanArgs, ctx: &Context) -> Result<(), CliError> {
    if !args.file.is_file() {
        return Err(CliError::Command(format!(
            "manifest not found: {}",
            args.file.display()
        )));
    }

    let (api, state) = ctx.ready_api(&args.install).await?;
    info!(file = %args.file.display(), "starting manifest scan");

    let results = api.scan_yaml(&ctx.ui, &args.file, &ctx.cancel).await?;
    let report = ScanReport::new(args.file.display().to_string(), &state.version, results);
    finish(ctx, &report, args.no_fail)
}

/// Execute the `scan-cluster` command.
pub async fn execute_cluster(args: ScanClusterArgs, ctx: &Context) -> Result<(), CliError> {
    let (api, state) = ctx.ready_api(&args.install).await?;
    info!(kubeconfig = ?args.kubeconfig, "starting cluster scan");

    let results = api
        .scan_cluster(&ctx.ui, args.kubeconfig.as_deref(), &ctx.cancel)
        .await?;
    let report = ScanReport::new("cluster".to_owned(), &state.version, results);
    finish(ctx, &report, args.no_fail)
}

fn finish(ctx: &Context, report: &ScanReport, no_fail: bool) -> Result<(), CliError> {
    ctx.writer.render(report)?;

    let failing: Vec<&str> = report
        .frameworks
        .iter()
        .filter(|f| f.failed_resources > 0)
        .map(|f| f.name.as_str())
        .collect();

    // Return error if controls failed (exit code 4)
    if !failing.is_empty() && !no_fail {
        return Err(CliError::Findings(failing.join(", ")));
    }
    Ok(())
}

/// Result of one scanner run.
#[derive(Serialize)]
pub struct ScanReport {
    pub target: String,
    pub scanner_version: String,
    pub frameworks: Vec<FrameworkSummary>,
    /// Scanner output as reported, for machine consumers
    pub results: ScanResults,
}

/// Per-framework aggregate.
#[derive(Serialize)]
pub struct FrameworkSummary {
    pub name: String,
    pub score: Option<f64>,
    pub total_resources: u64,
    pub failed_resources: u64,
    pub warning_resources: u64,
    pub passed_resources: u64,
    pub failed_controls: Vec<String>,
}

impl ScanReport {
    pub fn new(target: String, version: &str, results: ScanResults) -> Self {
        let frameworks = results.iter().map(FrameworkSummary::from).collect();
        Self {
            target,
            scanner_version: version.to_owned(),
            frameworks,
            results,
        }
    }
}

impl From<&ScanResult> for FrameworkSummary {
    fn from(result: &ScanResult) -> Self {
        Self {
            name: result.name.clone(),
            score: result.score,
            total_resources: result.total_resources.unwrap_or(0),
            failed_resources: result.failed_resources.unwrap_or(0),
            warning_resources: result.warning_resources.unwrap_or(0),
            passed_resources: result.passed_resources().unwrap_or(0),
            failed_controls: result.findings.iter().filter_map(failed_control).collect(),
        }
    }
}

/// `"C-0016 Allow privilege escalation"` for a control report with failed resources.
fn failed_control(report: &Value) -> Option<String> {
    let failed = report.get("failedResources").and_then(Value::as_u64)?;
    if failed == 0 {
        return None;
    }
    let id = report.get("controlID").and_then(Value::as_str).unwrap_or("?");
    match report.get("name").and_then(Value::as_str) {
        Some(name) => Some(format!("{id} {name}")),
        None => Some(id.to_owned()),
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Scan: {} (kubescape {})",
            self.target.bold(),
            self.scanner_version
        )?;
        writeln!(w)?;

        if self.frameworks.is_empty() {
            writeln!(w, "{}", "No frameworks were evaluated.".yellow())?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<20} {:>7} {:>7} {:>8} {:>7} {:>7}",
            "Framework", "Score", "Failed", "Warning", "Passed", "Total"
        )?;
        writeln!(w, "{}", "-".repeat(62))?;

        for f in &self.frameworks {
            let score = f
                .score
                .map(|s| format!("{s:.1}"))
                .unwrap_or_else(|| "-".to_owned());
            let failed = format!("{:>7}", f.failed_resources);
            let failed = if f.failed_resources > 0 {
                failed.red().bold()
            } else {
                failed.green()
            };
            writeln!(
                w,
                "{:<20} {:>7} {} {:>8} {:>7} {:>7}",
                f.name, score, failed, f.warning_resources, f.passed_resources, f.total_resources
            )?;
            for control in &f.failed_controls {
                writeln!(w, "  {} {}", "✗".red(), control)?;
            }
        }

        Ok(())
    }
}
