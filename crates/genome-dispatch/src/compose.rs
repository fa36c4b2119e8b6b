//! Plain-text rendering of reports and failure notices for email.

use genome_core::{FacetOutcome, Report};

const MAX_SUBJECT_BRAND_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub subject: String,
    pub text: String,
}

#[must_use]
pub fn report_email(report: &Report) -> Composed {
    let brand = subject_brand(&report.brand.display_name);
    let mut text = format!(
        "Your Marketing Genome Report for {} is ready.\n\nGenerated: {}\nReport ID: {}\n",
        report.brand.display_name,
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.id
    );
    if !report.is_complete() {
        text.push_str(&format!(
            "\nNote: {} of {} sections could not be generated and are marked below.\n",
            report.facets.len() - report.populated_count(),
            report.facets.len()
        ));
    }

    for facet in &report.facets {
        text.push_str(&format!("\n== {} ==\n", facet.kind.title()));
        match &facet.outcome {
            FacetOutcome::Populated { structured, .. } => {
                let body = serde_json::to_string_pretty(structured)
                    .unwrap_or_else(|_| structured.to_string());
                text.push_str(&body);
                text.push('\n');
            }
            FacetOutcome::Failed(failure) => {
                text.push_str(&format!("Not available ({}).\n", failure.kind));
            }
        }
    }

    Composed {
        subject: format!("Your Marketing Genome Report is Ready - {brand}"),
        text,
    }
}

#[must_use]
pub fn failure_notice(brand: &str, reason: &str) -> Composed {
    Composed {
        subject: "Issue Processing Your Marketing Genome Report".to_string(),
        text: format!(
            "We could not produce a Marketing Genome Report for {}.\n\nReason: {reason}\n\nPlease check the brand name, website or handle and try again.",
            subject_brand(brand)
        ),
    }
}

fn subject_brand(brand: &str) -> String {
    if brand.chars().count() > MAX_SUBJECT_BRAND_CHARS {
        let cut: String = brand.chars().take(MAX_SUBJECT_BRAND_CHARS).collect();
        format!("{cut}...")
    } else {
        brand.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use genome_core::{AnalysisFacet, BrandContext, FacetFailure, FacetKind, FailureKind};

    use super::*;

    #[test]
    fn partial_report_marks_missing_sections() {
        let facets = vec![
            AnalysisFacet::populated(
                FacetKind::BrandDna,
                "brand_dna",
                "{}".to_string(),
                serde_json::json!({"personality": {"tone": "bold"}}),
            ),
            AnalysisFacet::failed(
                FacetKind::CompetitorMap,
                "competitor_map",
                FacetFailure {
                    kind: FailureKind::Timeout,
                    message: "timed out".to_string(),
                    raw_response: None,
                },
            ),
        ];
        let report = Report::assemble(BrandContext::new("acme").unwrap(), facets, Utc::now());
        let email = report_email(&report);

        assert_eq!(email.subject, "Your Marketing Genome Report is Ready - acme");
        assert!(email.text.contains("3 of 4 sections could not be generated"));
        assert!(email.text.contains("\"tone\": \"bold\""));
        assert!(email.text.contains("Not available (timeout)"));
    }

    #[test]
    fn long_brand_is_truncated_in_subject() {
        let notice = failure_notice(&"x".repeat(80), "bad");
        assert!(notice.text.contains(&format!("{}...", "x".repeat(50))));
    }
}
