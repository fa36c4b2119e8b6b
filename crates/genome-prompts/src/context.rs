use std::collections::BTreeMap;

use genome_core::{BrandContext, BrandInputKind, FacetKind, Message, Role};
use serde_json::Value;

/// Names of the context fields templates read.
pub mod fields {
    pub const BRAND_NAME: &str = "brand_name";
    pub const BRAND_SOURCE: &str = "brand_source";
    pub const INDUSTRY: &str = "industry";
    pub const WEBSITE_CONTEXT: &str = "website_context";
    pub const BRAND_KNOWLEDGE: &str = "brand_knowledge";
    pub const STYLE_TONE: &str = "style_tone";
    pub const STYLE_VALUES: &str = "style_values";
    pub const REQUEST: &str = "request";
    pub const HISTORY: &str = "history";
    pub const PLATFORM: &str = "platform";
}

const WEBSITE_CONTENT_CHARS: usize = 500;

/// Named string values substituted into a template.
///
/// Ordered so that the same set of fields always renders the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFields(BTreeMap<String, String>);

impl ContextFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Value for `key` if present and non-blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Fields describing a brand: name, where the identifier came from,
    /// industry, website snapshot and anything learned from earlier reports.
    #[must_use]
    pub fn for_brand(brand: &BrandContext) -> Self {
        let mut out = Self::new()
            .with(fields::BRAND_NAME, brand.display_name.clone())
            .with(fields::BRAND_SOURCE, describe_source(brand));

        if let Some(industry) = &brand.metadata.industry {
            out.insert(fields::INDUSTRY, industry.clone());
        }
        if let Some(website) = brand.metadata.website.as_ref().filter(|w| !w.is_empty()) {
            let content: String = website
                .text_content
                .chars()
                .take(WEBSITE_CONTENT_CHARS)
                .collect();
            out.insert(
                fields::WEBSITE_CONTEXT,
                format!(
                    "Website: {}\nTitle: {}\nDescription: {}\nHeadlines: {}\nContent: {}",
                    website.url,
                    website.title,
                    website.description,
                    website.headlines.join(", "),
                    content
                ),
            );
        }
        if let Some(knowledge) = summarize_prior_analysis(&brand.metadata.prior_analysis) {
            out.insert(fields::BRAND_KNOWLEDGE, knowledge);
        }
        if let Some(dna) = brand.metadata.prior_analysis.get(&FacetKind::BrandDna) {
            if let Some(tone) = str_at(dna, &["personality", "tone"]) {
                out.insert(fields::STYLE_TONE, tone);
            }
            let values = strings_at(dna, &["personality", "values"]);
            if !values.is_empty() {
                out.insert(
                    fields::STYLE_VALUES,
                    values.into_iter().take(2).collect::<Vec<_>>().join(", "),
                );
            }
        }
        out
    }
}

fn describe_source(brand: &BrandContext) -> String {
    match brand.kind {
        BrandInputKind::Website => format!("website {}", brand.identifier),
        BrandInputKind::Social { platform } => {
            format!("{platform} account {}", brand.identifier)
        }
        BrandInputKind::Name => format!("brand name \"{}\"", brand.identifier),
    }
}

/// Render a window of conversation as plain `Role: text` lines.
#[must_use]
pub fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            match &m.image {
                Some(image) => format!("{speaker}: {} [image: {}]", m.content, image.url),
                None => format!("{speaker}: {}", m.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Condense structured facet results from an earlier report into the
/// "what you already know" block of the assistant persona.
#[must_use]
pub fn summarize_prior_analysis(prior: &BTreeMap<FacetKind, Value>) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(dna) = prior.get(&FacetKind::BrandDna) {
        push_line(&mut lines, "Tone", str_at(dna, &["personality", "tone"]));
        push_list(&mut lines, "Core Values", strings_at(dna, &["personality", "values"]));
        push_line(&mut lines, "Archetype", str_at(dna, &["personality", "archetype"]));
        push_line(
            &mut lines,
            "Market Position",
            str_at(dna, &["positioning", "market_position"]),
        );
        push_line(&mut lines, "Value Proposition", str_at(dna, &["positioning", "uvp"]));
        push_line(
            &mut lines,
            "Primary Demographics",
            str_at(dna, &["audience", "demographics"]),
        );
        push_line(
            &mut lines,
            "Psychographics",
            str_at(dna, &["audience", "psychographics"]),
        );
        push_list(&mut lines, "Pain Points", strings_at(dna, &["audience", "pain_points"]));
    }

    if let Some(competitors) = prior.get(&FacetKind::CompetitorMap) {
        let names: Vec<String> = competitors
            .get("competitors")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|c| c.get("name").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        push_list(&mut lines, "Main Competitors", names);
        push_list(
            &mut lines,
            "Unique Advantages",
            strings_at(competitors, &["competitive_advantages"]),
        );
    }

    if let Some(content) = prior.get(&FacetKind::ContentBlueprint) {
        let pillars: Vec<String> = content
            .get("content_pillars")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|p| {
                        p.as_str()
                            .or_else(|| p.get("name").and_then(Value::as_str))
                            .map(str::to_owned)
                    })
                    .collect()
            })
            .unwrap_or_default();
        push_list(&mut lines, "Content Pillars", pillars);
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn push_line(lines: &mut Vec<String>, label: &str, value: Option<String>) {
    if let Some(v) = value {
        lines.push(format!("- {label}: {v}"));
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, values: Vec<String>) {
    if !values.is_empty() {
        lines.push(format!("- {label}: {}", values.join(", ")));
    }
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    value_at(value, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn strings_at(value: &Value, path: &[&str]) -> Vec<String> {
    value_at(value, path)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
