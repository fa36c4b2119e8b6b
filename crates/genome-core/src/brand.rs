use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::report::{FacetKind, Report};

pub const MIN_IDENTIFIER_LEN: usize = 3;
pub const MAX_IDENTIFIER_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Twitter,
    Other,
}

impl std::fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocialPlatform::Instagram => write!(f, "instagram"),
            SocialPlatform::Twitter => write!(f, "twitter"),
            SocialPlatform::Other => write!(f, "social"),
        }
    }
}

/// What kind of reference the user handed us for a brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrandInputKind {
    Website,
    Social { platform: SocialPlatform },
    Name,
}

impl BrandInputKind {
    /// Classify a (trimmed) brand identifier.
    ///
    /// URLs and `www.` prefixes are websites, `@handles` are social accounts
    /// (platform guessed from the handle text), anything else is a name.
    #[must_use]
    pub fn detect(identifier: &str) -> Self {
        let lower = identifier.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
        {
            return BrandInputKind::Website;
        }

        if lower.starts_with('@') {
            let platform = if lower.contains("instagram") || lower.contains("insta") {
                SocialPlatform::Instagram
            } else if lower.contains("twitter") || lower.contains("x.com") {
                SocialPlatform::Twitter
            } else {
                SocialPlatform::Other
            };
            return BrandInputKind::Social { platform };
        }

        BrandInputKind::Name
    }
}

/// Metadata scraped from a brand's website during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteSnapshot {
    pub url: String,
    pub title: String,
    pub description: String,
    pub headlines: Vec<String>,
    pub text_content: String,
}

impl WebsiteSnapshot {
    /// True when the snapshot carries nothing worth sending to the provider.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.headlines.is_empty()
            && self.text_content.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandMetadata {
    pub industry: Option<String>,
    pub website: Option<WebsiteSnapshot>,
    /// Structured facet results carried over from an earlier report.
    #[serde(default)]
    pub prior_analysis: BTreeMap<FacetKind, serde_json::Value>,
}

/// A brand as the rest of the system sees it: the raw identifier, what kind
/// of identifier it is, a display name and whatever we have learned so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandContext {
    pub identifier: String,
    pub kind: BrandInputKind,
    pub display_name: String,
    #[serde(default)]
    pub metadata: BrandMetadata,
}

impl BrandContext {
    /// Build a context from a raw identifier without any network lookups.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the identifier is empty, too short, too
    /// long, or looks like a website but has no usable host.
    pub fn new(identifier: &str) -> Result<Self, ValidationError> {
        let identifier = validate_identifier(identifier)?;
        let kind = BrandInputKind::detect(identifier);

        let display_name = match kind {
            BrandInputKind::Website => website_host(identifier)
                .ok_or_else(|| ValidationError::InvalidWebsite(identifier.to_string()))?,
            BrandInputKind::Social { .. } => identifier.trim_start_matches('@').to_string(),
            BrandInputKind::Name => identifier.to_string(),
        };

        Ok(Self {
            identifier: identifier.to_string(),
            kind,
            display_name,
            metadata: BrandMetadata::default(),
        })
    }

    /// Lookup key used for caching reports per brand.
    #[must_use]
    pub fn key(&self) -> String {
        brand_key(&self.identifier)
    }

    /// Website URL to fetch during resolution, if one can be derived.
    ///
    /// Plain names are mapped to the most likely `.com` domain.
    #[must_use]
    pub fn website_url(&self) -> Option<String> {
        match self.kind {
            BrandInputKind::Website => match split_scheme(&self.identifier) {
                Some((scheme, rest)) => Some(format!("{}://{rest}", scheme.to_ascii_lowercase())),
                None => Some(format!("https://{}", self.identifier)),
            },
            BrandInputKind::Name => {
                let compact: String = self
                    .identifier
                    .to_lowercase()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect();
                if compact.is_empty() {
                    None
                } else {
                    Some(format!("https://www.{compact}.com"))
                }
            }
            BrandInputKind::Social { .. } => None,
        }
    }

    /// Fold the populated facets of a finished report into this context so
    /// later prompts can draw on them.
    pub fn absorb_report(&mut self, report: &Report) {
        for facet in &report.facets {
            if let Some(structured) = facet.structured() {
                self.metadata
                    .prior_analysis
                    .insert(facet.kind, structured.clone());
            }
        }
        if self.metadata.industry.is_none() {
            self.metadata.industry = report.brand.metadata.industry.clone();
        }
        if self.metadata.website.is_none() {
            self.metadata.website = report.brand.metadata.website.clone();
        }
    }

    #[must_use]
    pub fn has_prior_analysis(&self) -> bool {
        !self.metadata.prior_analysis.is_empty()
    }
}

/// Split `http://` or `https://` off the front of `url`, in any letter case.
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        .then_some((scheme, rest))
}

/// Normalise a raw identifier into the key reports are cached under.
#[must_use]
pub fn brand_key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Trim and length-check a brand identifier.
///
/// # Errors
///
/// Returns [`ValidationError`] for empty, too-short or too-long input.
pub fn validate_identifier(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    let len = trimmed.chars().count();
    if len < MIN_IDENTIFIER_LEN {
        return Err(ValidationError::IdentifierTooShort {
            min: MIN_IDENTIFIER_LEN,
        });
    }
    if len > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::IdentifierTooLong {
            max: MAX_IDENTIFIER_LEN,
        });
    }
    Ok(trimmed)
}

/// Host part of a website identifier with any `www.` prefix removed.
fn website_host(identifier: &str) -> Option<String> {
    let without_scheme = split_scheme(identifier).map_or(identifier, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
        .trim_start_matches("www.")
        .to_string();

    if host.is_empty() || !host.contains('.') || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(host)
}
