//! `analyze` command: one pipeline run, printed and optionally mailed.

use std::fmt::Write as _;

use genome_analysis::GenomeAnalyzer;
use genome_core::{AppConfig, Report};
use genome_dispatch::{mailer_from_config, ReportDispatcher};

/// Run the pipeline for `brand` and print the result.
///
/// # Errors
///
/// Returns an error when the brand is rejected, the provider refuses the
/// credentials, or an email was requested and delivery failed.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    analyzer: &GenomeAnalyzer,
    brand: &str,
    email: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let report = analyzer.analyze_for(brand, email).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(report.as_ref())?);
    } else {
        print!("{}", render_summary(&report));
    }

    let Some(email) = email else {
        return Ok(());
    };

    let dispatcher = ReportDispatcher::new(mailer_from_config(config)?);
    match dispatcher.dispatch(report, email).await {
        Ok(receipt) => {
            println!("report sent to {} ({})", receipt.destination, receipt.message_id);
            Ok(())
        }
        Err(failure) => {
            tracing::error!(report_id = %failure.report.id, error = %failure.error, "delivery failed");
            Err(failure.error.into())
        }
    }
}

/// One line per facet, with a completeness footer.
pub(crate) fn render_summary(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Marketing Genome Report: {} ({})",
        report.brand.display_name,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    for facet in &report.facets {
        match facet.failure() {
            None => {
                let _ = writeln!(out, "  \u{2713} {}", facet.kind.title());
            }
            Some(failure) => {
                let _ = writeln!(
                    out,
                    "  \u{2717} {} ({}: {})",
                    facet.kind.title(),
                    failure.kind,
                    failure.message
                );
            }
        }
    }

    let total = report.facets.len();
    let populated = report.populated_count();
    if report.is_complete() {
        let _ = writeln!(out, "complete: {populated}/{total} sections");
    } else {
        let _ = writeln!(out, "partial: {populated}/{total} sections");
    }
    out
}
