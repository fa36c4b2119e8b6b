//! Brand resolution: validate an identifier and, when possible, learn a
//! little about the brand from its website.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use std::time::Duration;

use genome_core::{BrandContext, BrandInputKind, ValidationError, WebsiteSnapshot};
use regex::Regex;
use reqwest::{redirect, Client};

use crate::error::FetchError;

const MAX_HEADLINES_PER_TAG: usize = 5;
const MAX_PARAGRAPHS: usize = 10;
const MAX_TEXT_CHARS: usize = 1000;
const MAX_DISPLAY_NAME_CHARS: usize = 80;
const MAX_REDIRECTS: usize = 5;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid h1 regex"));
static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").expect("valid h2 regex"));
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid paragraph regex"));
static META_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+name\s*=\s*["']description["'][^>]+content\s*=\s*["'](.*?)["'][^>]*>"#,
    )
    .expect("valid meta description regex")
});
static META_DESCRIPTION_SWAPPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+content\s*=\s*["'](.*?)["'][^>]+name\s*=\s*["']description["'][^>]*>"#,
    )
    .expect("valid meta description fallback regex")
});
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

/// Turns raw brand identifiers into [`BrandContext`]s.
pub struct BrandResolver {
    client: Option<Client>,
    allow_private_hosts: bool,
}

impl BrandResolver {
    /// A resolver that fetches website metadata with the given timeout.
    ///
    /// Loopback, private and link-local hosts are never fetched, including
    /// as redirect targets.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let policy = redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt.url().host_str().is_some_and(is_blocked_host) {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });
        Ok(Self {
            client: Some(build_client(timeout_secs, policy)?),
            allow_private_hosts: false,
        })
    }

    /// Like [`BrandResolver::new`] but also fetches private and loopback
    /// hosts. For intranet deployments and local test servers.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn allowing_private_hosts(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Some(build_client(
                timeout_secs,
                redirect::Policy::limited(MAX_REDIRECTS),
            )?),
            allow_private_hosts: true,
        })
    }

    /// A resolver that never touches the network.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            client: None,
            allow_private_hosts: false,
        }
    }

    /// Validate `identifier` and build its context.
    ///
    /// Website fetch failures are logged and otherwise ignored; only an
    /// invalid identifier is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the identifier is rejected.
    pub async fn resolve(&self, identifier: &str) -> Result<BrandContext, ValidationError> {
        let mut brand = BrandContext::new(identifier)?;
        tracing::debug!(brand = %brand.identifier, kind = ?brand.kind, "brand identifier detected");

        let (Some(client), Some(url)) = (&self.client, brand.website_url()) else {
            return Ok(brand);
        };

        match self.fetch(client, &url).await {
            Ok(snapshot) if !snapshot.is_empty() => {
                if brand.kind == BrandInputKind::Website {
                    if let Some(name) = display_name_from_title(&snapshot.title) {
                        brand.display_name = name;
                    }
                }
                tracing::info!(
                    brand = %brand.identifier,
                    url = %snapshot.url,
                    headlines = snapshot.headlines.len(),
                    "website snapshot collected"
                );
                brand.metadata.website = Some(snapshot);
            }
            Ok(_) => {
                tracing::debug!(brand = %brand.identifier, %url, "website had no usable content");
            }
            Err(e) => {
                tracing::warn!(brand = %brand.identifier, %url, error = %e, "website fetch failed; continuing without it");
            }
        }
        Ok(brand)
    }

    async fn fetch(&self, client: &Client, url: &str) -> Result<WebsiteSnapshot, FetchError> {
        if !self.allow_private_hosts {
            ensure_public_host(url).await?;
        }
        fetch_snapshot(client, url).await
    }
}

fn build_client(timeout_secs: u64, policy: redirect::Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .user_agent("Mozilla/5.0 (compatible; market-genome/0.1)")
        .redirect(policy)
        .build()
}

/// Host and port of an `http(s)://` URL. Brackets are kept off IPv6 hosts.
fn url_host(url: &str) -> Option<(&str, u16)> {
    let (scheme, rest) = url.split_once("://")?;
    let default_port = if scheme.eq_ignore_ascii_case("http") { 80 } else { 443 };
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    if let Some(v6) = host_port.strip_prefix('[') {
        let (host, after) = v6.split_once(']')?;
        let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
        return Some((host, port.unwrap_or(default_port)));
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => Some((host, port.parse().ok()?)),
        None => Some((host_port, default_port)),
    }
}

fn is_blocked_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
    if host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
    {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(is_blocked_ip)
}

fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_blocked_v4(v4),
            None => is_blocked_v6(v6),
        },
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Reject URLs whose host is, or resolves to, a non-public address.
async fn ensure_public_host(url: &str) -> Result<(), FetchError> {
    let blocked = |host: &str| FetchError::BlockedHost {
        host: host.to_string(),
    };
    let (host, port) = url_host(url).ok_or_else(|| blocked(url))?;
    if is_blocked_host(host) {
        return Err(blocked(host));
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    // Unresolvable names are left for the fetch to report.
    if let Ok(addrs) = tokio::net::lookup_host((host, port)).await {
        for addr in addrs {
            if is_blocked_ip(addr.ip()) {
                return Err(blocked(host));
            }
        }
    }
    Ok(())
}

/// GET `url` and extract a [`WebsiteSnapshot`] from the HTML.
///
/// # Errors
///
/// Returns [`FetchError`] on network failure or a non-2xx status.
pub async fn fetch_snapshot(client: &Client, url: &str) -> Result<WebsiteSnapshot, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let html = response.text().await?;
    Ok(extract_snapshot(url, &html))
}

/// Pull title, description, headlines and leading paragraph text out of
/// an HTML document.
#[must_use]
pub fn extract_snapshot(url: &str, html: &str) -> WebsiteSnapshot {
    let title = TITLE_RE
        .captures(html)
        .and_then(|cap| cap.get(1).map(|m| clean_text(m.as_str())))
        .unwrap_or_default();

    let description = META_DESCRIPTION_RE
        .captures(html)
        .or_else(|| META_DESCRIPTION_SWAPPED_RE.captures(html))
        .and_then(|cap| cap.get(1).map(|m| clean_text(m.as_str())))
        .unwrap_or_default();

    let mut headlines = Vec::new();
    for re in [&*H1_RE, &*H2_RE] {
        headlines.extend(
            re.captures_iter(html)
                .filter_map(|cap| cap.get(1).map(|m| clean_text(m.as_str())))
                .filter(|h| !h.is_empty())
                .take(MAX_HEADLINES_PER_TAG),
        );
    }

    let text: String = PARAGRAPH_RE
        .captures_iter(html)
        .take(MAX_PARAGRAPHS)
        .filter_map(|cap| cap.get(1).map(|m| clean_text(m.as_str())))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let text_content = text.chars().take(MAX_TEXT_CHARS).collect();

    WebsiteSnapshot {
        url: url.to_string(),
        title,
        description,
        headlines,
        text_content,
    }
}

fn clean_text(input: &str) -> String {
    let no_tags = TAGS_RE.replace_all(input, " ");
    no_tags
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First segment of a page title, e.g. `Acme | Rockets` -> `Acme`.
fn display_name_from_title(title: &str) -> Option<String> {
    let first = title
        .split(['|', '–', '—'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if first.is_empty() || first.chars().count() > MAX_DISPLAY_NAME_CHARS {
        None
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_host_handles_ports_userinfo_and_ipv6() {
        assert_eq!(url_host("https://acme.com/about"), Some(("acme.com", 443)));
        assert_eq!(url_host("http://acme.com:8080?q=1"), Some(("acme.com", 8080)));
        assert_eq!(url_host("https://user@10.0.0.1/"), Some(("10.0.0.1", 443)));
        assert_eq!(url_host("http://[::1]:3000/x"), Some(("::1", 3000)));
        assert_eq!(url_host("acme.com"), None);
    }

    #[test]
    fn non_public_hosts_are_blocked() {
        for host in [
            "localhost",
            "api.localhost",
            "printer.local",
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.9",
            "192.168.1.1",
            "169.254.169.254",
            "100.64.0.1",
            "0.0.0.0",
            "[::1]",
            "fd00::1",
            "fe80::1",
            "::ffff:127.0.0.1",
        ] {
            assert!(is_blocked_host(host), "{host} should be blocked");
        }
        for host in ["acme.com", "8.8.8.8", "100.128.0.1", "2606:4700::1111"] {
            assert!(!is_blocked_host(host), "{host} should be allowed");
        }
    }

    #[tokio::test]
    async fn private_literal_urls_are_refused_before_any_request() {
        let err = ensure_public_host("http://169.254.169.254/latest/meta-data")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::BlockedHost { host } if host == "169.254.169.254"));
        assert!(ensure_public_host("https://8.8.8.8/").await.is_ok());
    }

    const PAGE: &str = r#"<html><head>
        <title>Acme Rockets | Fly Further</title>
        <meta name="description" content="Rockets &amp; boosters for everyone">
        </head><body>
        <h1>Reach <em>orbit</em> today</h1>
        <h2>Reusable</h2><h2>Affordable</h2>
        <p>We build rockets.</p><p>   </p><p>Since 1949.</p>
        </body></html>"#;

    #[test]
    fn extract_snapshot_reads_core_fields() {
        let snap = extract_snapshot("https://www.acme.com", PAGE);
        assert_eq!(snap.title, "Acme Rockets | Fly Further");
        assert_eq!(snap.description, "Rockets & boosters for everyone");
        assert_eq!(
            snap.headlines,
            vec!["Reach orbit today", "Reusable", "Affordable"]
        );
        assert_eq!(snap.text_content, "We build rockets. Since 1949.");
    }

    #[test]
    fn extract_snapshot_handles_swapped_meta_attributes() {
        let html = r#"<meta content="Swapped order" name="description">"#;
        assert_eq!(extract_snapshot("u", html).description, "Swapped order");
    }

    #[test]
    fn headlines_are_capped_per_tag() {
        let html = "<h1>a</h1>".repeat(8) + &"<h2>b</h2>".repeat(8);
        let snap = extract_snapshot("u", &html);
        assert_eq!(snap.headlines.len(), 2 * MAX_HEADLINES_PER_TAG);
    }

    #[test]
    fn text_content_is_truncated() {
        let html = format!("<p>{}</p>", "x".repeat(5000));
        assert_eq!(
            extract_snapshot("u", &html).text_content.chars().count(),
            MAX_TEXT_CHARS
        );
    }

    #[test]
    fn display_name_uses_first_title_segment() {
        assert_eq!(
            display_name_from_title("Acme Rockets | Fly Further").as_deref(),
            Some("Acme Rockets")
        );
        assert_eq!(display_name_from_title("   "), None);
    }

    #[tokio::test]
    async fn offline_resolver_skips_network() {
        let brand = BrandResolver::offline().resolve("acme").await.unwrap();
        assert_eq!(brand.display_name, "acme");
        assert!(brand.metadata.website.is_none());
    }

    #[tokio::test]
    async fn resolve_rejects_short_identifiers() {
        let err = BrandResolver::offline().resolve("ab").await.unwrap_err();
        assert_eq!(err, ValidationError::IdentifierTooShort { min: 3 });
    }
}
