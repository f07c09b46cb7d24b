use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use regex::Regex;
use reqwest::Client;
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::Url;

use crate::config::{DnsConfig, FetchConfig};

pub const FEATURE_COUNT: usize = 30;

/// Marks a slot that is deliberately not computed because it depends on an
/// external data source (WHOIS, registrar DNS records, traffic ranking,
/// search index). Classifiers are trained against this exact value, so it
/// must never be reinterpreted as a real signal.
pub const UNEVALUATED: i8 = -2;

/// Column names in training order. The order is the contract: any classifier
/// fed with these vectors was trained against columns laid out exactly like
/// this.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "UsingIp",
    "longUrl",
    "shortUrl",
    "symbol",
    "redirecting",
    "prefixSuffix",
    "SubDomains",
    "HTTPS",
    "DomainRegLen",
    "Favicon",
    "NonStdPort",
    "HTTPSDomainURL",
    "RequestURL",
    "AnchorURL",
    "LinksInScriptTags",
    "ServerFormHandler",
    "InfoEmail",
    "AbnormalURL",
    "WebsiteForwarding",
    "StatusBarCust",
    "DisableRightClick",
    "UsingPopupWindow",
    "IframeRedirection",
    "AgeofDomain",
    "DNSRecording",
    "WebsiteTraffic",
    "PageRank",
    "GoogleIndex",
    "LinksPointingToPage",
    "StatsReport",
];

/// Hosts whose resolved address lands here are known phishing
/// infrastructure.
const BLOCKED_HOST_IPS: [&str; 2] = ["146.112.61.108", "213.174.157.151"];

/// Ordered vector of 30 signed features, each in {-2, -1, 0, 1}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    values: [i8; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [i8; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[i8; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<i8> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in FEATURE_NAMES.iter().zip(self.values.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// URL components derived once per request. `host` mirrors the authority
/// including an explicit non-default port.
#[derive(Debug, Clone)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
}

impl UrlParts {
    pub fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let mut host = parsed.host_str().unwrap_or("").to_string();
        if let Some(port) = parsed.port() {
            host = format!("{host}:{port}");
        }
        Some(Self {
            scheme: parsed.scheme().to_string(),
            host,
            path: parsed.path().to_string(),
            query: parsed.query().unwrap_or("").to_string(),
        })
    }

    /// Host with any port suffix and IPv6 brackets removed.
    pub fn bare_host(&self) -> &str {
        let host = match self.host.rsplit_once(':') {
            Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) => h,
            _ => self.host.as_str(),
        };
        host.trim_start_matches('[').trim_end_matches(']')
    }
}

/// Response body and redirect history for one scoring request. Owned by that
/// request alone; never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
    pub redirect_count: usize,
}

struct PageProbes {
    link_href: Regex,
    resource_src: Regex,
    anchor_href: Regex,
    script_src: Regex,
    form_action: Regex,
    right_click_block: Regex,
    iframe_markup: Regex,
    shortener: Regex,
}

impl PageProbes {
    fn new() -> Self {
        Self {
            link_href: Regex::new(r#"(?i)<link[^>]*\bhref\s*=\s*["']([^"']*)["']"#).unwrap(),
            resource_src: Regex::new(
                r#"(?i)<(?:img|audio|embed|iframe)[^>]*\bsrc\s*=\s*["']([^"']*)["']"#,
            )
            .unwrap(),
            anchor_href: Regex::new(r#"(?i)<a[^>]*\bhref\s*=\s*["']([^"']*)["']"#).unwrap(),
            script_src: Regex::new(r#"(?i)<script[^>]*\bsrc\s*=\s*["']([^"']*)["']"#).unwrap(),
            form_action: Regex::new(r#"(?i)<form[^>]*\baction\s*=\s*["']([^"']*)["']"#).unwrap(),
            right_click_block: Regex::new(r"event\.button ?== ?2").unwrap(),
            iframe_markup: Regex::new(r"<iframe>|<frameBorder>").unwrap(),
            shortener: Regex::new(r"bit\.ly|goo\.gl|tinyurl|ow\.ly|t\.co").unwrap(),
        }
    }
}

/// Extracts the fixed 30-feature vector for a URL: lexical structure from the
/// URL itself, page-derived signals from a best-effort fetch, and a
/// deny-list check on the resolved host address.
///
/// Extraction never fails. Any input that cannot be obtained degrades the
/// features depending on it to their documented fallback value.
pub struct UrlFeatureExtractor {
    client: Client,
    fetch: FetchConfig,
    dns: DnsConfig,
    probes: PageProbes,
}

impl Default for UrlFeatureExtractor {
    fn default() -> Self {
        Self::new(FetchConfig::default(), DnsConfig::default())
    }
}

impl UrlFeatureExtractor {
    pub fn new(fetch: FetchConfig, dns: DnsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_seconds))
            .user_agent(fetch.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build HTTP client, using defaults: {e}");
                Client::new()
            });
        Self {
            client,
            fetch,
            dns,
            probes: PageProbes::new(),
        }
    }

    /// Full extraction: parse, fetch the page, resolve the host, compute all
    /// 30 features.
    pub async fn extract(&self, url: &str) -> FeatureVector {
        let parts = UrlParts::parse(url);
        let page = self.fetch_page(url).await;
        let resolved_ip = match &parts {
            Some(parts) => self.resolve_host(parts.bare_host()).await,
            None => None,
        };
        self.extract_with_page(url, page.as_ref(), resolved_ip)
    }

    /// Pure computation from already-obtained inputs. Scoring the same URL
    /// against the same page and address is deterministic.
    pub fn extract_with_page(
        &self,
        url: &str,
        page: Option<&FetchedPage>,
        resolved_ip: Option<IpAddr>,
    ) -> FeatureVector {
        let parts = UrlParts::parse(url);
        if parts.is_none() {
            log::debug!("URL failed to parse, host features fall back to suspicious: {url}");
        }
        let parts = parts.as_ref();
        let values = [
            using_ip(parts),
            long_url(url),
            self.short_url(url),
            at_symbol(url),
            redirecting(url),
            prefix_suffix(parts),
            sub_domains(parts),
            https_scheme(parts),
            UNEVALUATED, // DomainRegLen: registration length needs WHOIS
            self.favicon(parts, url, page),
            non_std_port(parts),
            https_in_domain(parts),
            self.request_url(parts, url, page),
            self.anchor_url(parts, url, page),
            self.links_in_script_tags(parts, url, page),
            self.server_form_handler(parts, url, page),
            info_email(page),
            UNEVALUATED, // AbnormalURL: WHOIS identity comparison
            website_forwarding(page),
            status_bar_cust(page),
            self.disable_right_click(page),
            using_popup_window(page),
            self.iframe_redirection(page),
            UNEVALUATED, // AgeofDomain: WHOIS
            UNEVALUATED, // DNSRecording: registrar DNS records
            UNEVALUATED, // WebsiteTraffic: external ranking service
            UNEVALUATED, // PageRank: external ranking service
            UNEVALUATED, // GoogleIndex: search index lookup
            links_pointing_to_page(page),
            stats_report(resolved_ip),
        ];
        FeatureVector { values }
    }

    /// GET the URL following redirects manually so the chain length is
    /// observable. Non-2xx responses still count as fetched; only
    /// network-level failure yields `None`. One attempt, no retries.
    pub async fn fetch_page(&self, url: &str) -> Option<FetchedPage> {
        if !self.fetch.enabled {
            return None;
        }
        let mut current = url.to_string();
        let mut redirect_count = 0usize;
        loop {
            let response = match self.client.get(&current).send().await {
                Ok(response) => response,
                Err(e) => {
                    log::debug!("Page fetch failed for {current}: {e}");
                    return None;
                }
            };
            if response.status().is_redirection() && redirect_count < self.fetch.max_redirects {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok());
                if let Some(location) = location {
                    let next = if location.starts_with("http") {
                        Some(location.to_string())
                    } else {
                        Url::parse(&current)
                            .ok()
                            .and_then(|base| base.join(location).ok())
                            .map(|joined| joined.to_string())
                    };
                    if let Some(next) = next {
                        log::debug!("Following redirect {current} -> {next}");
                        current = next;
                        redirect_count += 1;
                        continue;
                    }
                }
            }
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::debug!("Failed to read page body for {current}: {e}");
                    return None;
                }
            };
            return Some(FetchedPage {
                final_url: current,
                body,
                redirect_count,
            });
        }
    }

    /// Resolve the host to one address. Literal IPs short-circuit the lookup.
    pub async fn resolve_host(&self, host: &str) -> Option<IpAddr> {
        if host.is_empty() {
            return None;
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }
        if !self.dns.enabled {
            return None;
        }
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                log::warn!("Failed to create DNS resolver for {host}: {e}");
                return None;
            }
        };
        let lookup_future = resolver.lookup_ip(host);
        let timeout = Duration::from_secs(self.dns.timeout_seconds);
        match tokio::time::timeout(timeout, lookup_future).await {
            Ok(Ok(response)) => response.iter().next(),
            Ok(Err(e)) => {
                log::debug!("DNS lookup failed for {host}: {e}");
                None
            }
            Err(_) => {
                log::debug!(
                    "DNS lookup timed out for {host} after {}s",
                    self.dns.timeout_seconds
                );
                None
            }
        }
    }

    fn short_url(&self, url: &str) -> i8 {
        if self.probes.shortener.is_match(url) {
            -1
        } else {
            1
        }
    }

    fn favicon(&self, parts: Option<&UrlParts>, url: &str, page: Option<&FetchedPage>) -> i8 {
        let (Some(parts), Some(page)) = (parts, page) else {
            return -1;
        };
        for cap in self.probes.link_href.captures_iter(&page.body) {
            if let Some(href) = cap.get(1).map(|m| m.as_str()) {
                if references_same_site(href, parts, url) {
                    return 1;
                }
            }
        }
        -1
    }

    fn request_url(&self, parts: Option<&UrlParts>, url: &str, page: Option<&FetchedPage>) -> i8 {
        let (Some(parts), Some(page)) = (parts, page) else {
            return -1;
        };
        let mut total = 0usize;
        let mut external = 0usize;
        for cap in self.probes.resource_src.captures_iter(&page.body) {
            let Some(src) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            total += 1;
            if !references_same_site(src, parts, url) && src.matches('.').count() != 1 {
                external += 1;
            }
        }
        let pct = percentage(external, total);
        if pct < 22.0 {
            1
        } else if pct < 61.0 {
            0
        } else {
            -1
        }
    }

    fn anchor_url(&self, parts: Option<&UrlParts>, url: &str, page: Option<&FetchedPage>) -> i8 {
        let (Some(parts), Some(page)) = (parts, page) else {
            return -1;
        };
        let mut total = 0usize;
        let mut unsafe_refs = 0usize;
        for cap in self.probes.anchor_href.captures_iter(&page.body) {
            let Some(href) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            total += 1;
            let lower = href.to_lowercase();
            if href.contains('#')
                || lower.contains("javascript")
                || lower.contains("mailto")
                || !references_same_site(href, parts, url)
            {
                unsafe_refs += 1;
            }
        }
        let pct = percentage(unsafe_refs, total);
        if pct < 31.0 {
            1
        } else if pct < 67.0 {
            0
        } else {
            -1
        }
    }

    fn links_in_script_tags(
        &self,
        parts: Option<&UrlParts>,
        url: &str,
        page: Option<&FetchedPage>,
    ) -> i8 {
        let (Some(parts), Some(page)) = (parts, page) else {
            return -1;
        };
        let mut total = 0usize;
        let mut external = 0usize;
        let references = self
            .probes
            .link_href
            .captures_iter(&page.body)
            .chain(self.probes.script_src.captures_iter(&page.body));
        for cap in references {
            let Some(target) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            total += 1;
            if !references_same_site(target, parts, url) && target.matches('.').count() != 1 {
                external += 1;
            }
        }
        let pct = percentage(external, total);
        if pct < 17.0 {
            1
        } else if pct < 81.0 {
            0
        } else {
            -1
        }
    }

    fn server_form_handler(
        &self,
        parts: Option<&UrlParts>,
        url: &str,
        page: Option<&FetchedPage>,
    ) -> i8 {
        let (Some(parts), Some(page)) = (parts, page) else {
            return -1;
        };
        let actions: Vec<&str> = self
            .probes
            .form_action
            .captures_iter(&page.body)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
            .collect();
        if actions.is_empty() {
            return 1;
        }
        if actions
            .iter()
            .any(|action| action.is_empty() || *action == "about:blank")
        {
            return -1;
        }
        if actions
            .iter()
            .any(|action| !references_same_site(action, parts, url))
        {
            return 0;
        }
        1
    }

    fn disable_right_click(&self, page: Option<&FetchedPage>) -> i8 {
        match page {
            Some(page) if self.probes.right_click_block.is_match(&page.body) => 1,
            _ => -1,
        }
    }

    fn iframe_redirection(&self, page: Option<&FetchedPage>) -> i8 {
        match page {
            Some(page) if self.probes.iframe_markup.is_match(&page.body) => 1,
            _ => -1,
        }
    }
}

fn references_same_site(target: &str, parts: &UrlParts, url: &str) -> bool {
    (!parts.host.is_empty() && target.contains(&parts.host)) || target.contains(url)
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn using_ip(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) if parts.bare_host().parse::<IpAddr>().is_ok() => -1,
        Some(_) => 1,
        None => -1,
    }
}

fn long_url(url: &str) -> i8 {
    match url.len() {
        0..=53 => 1,
        54..=75 => 0,
        _ => -1,
    }
}

fn at_symbol(url: &str) -> i8 {
    if url.contains('@') {
        -1
    } else {
        1
    }
}

// A `//` past the scheme separator signals redirection smuggled into the
// path.
fn redirecting(url: &str) -> i8 {
    match url.rfind("//") {
        Some(position) if position > 6 => -1,
        _ => 1,
    }
}

fn prefix_suffix(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) if parts.host.contains('-') => -1,
        Some(_) => 1,
        None => -1,
    }
}

fn sub_domains(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) => match parts.host.matches('.').count() {
            1 => 1,
            2 => 0,
            _ => -1,
        },
        None => -1,
    }
}

fn https_scheme(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) if parts.scheme == "https" => 1,
        _ => -1,
    }
}

fn non_std_port(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) if parts.host.contains(':') => -1,
        Some(_) => 1,
        None => -1,
    }
}

// "https" buried inside the authority is a spoofing pattern
// (e.g. https-paypal.example.com).
fn https_in_domain(parts: Option<&UrlParts>) -> i8 {
    match parts {
        Some(parts) if parts.host.contains("https") => -1,
        Some(_) => 1,
        None => -1,
    }
}

fn info_email(page: Option<&FetchedPage>) -> i8 {
    match page {
        Some(page) if page.body.contains("mailto") => -1,
        _ => 1,
    }
}

fn website_forwarding(page: Option<&FetchedPage>) -> i8 {
    match page {
        Some(page) if page.redirect_count <= 1 => 1,
        Some(page) if page.redirect_count <= 4 => 0,
        Some(_) => -1,
        None => -1,
    }
}

// Matched or not, a fetched page scores as tampering here; only a failed
// fetch reads as clean. Models are calibrated against this encoding, so the
// collapse is intentional.
fn status_bar_cust(page: Option<&FetchedPage>) -> i8 {
    match page {
        Some(_) => -1,
        None => 1,
    }
}

// Same collapsed encoding as status_bar_cust: any fetched page counts as
// popup-capable.
fn using_popup_window(page: Option<&FetchedPage>) -> i8 {
    match page {
        Some(_) => -1,
        None => 1,
    }
}

fn links_pointing_to_page(page: Option<&FetchedPage>) -> i8 {
    match page {
        Some(page) => match page.body.matches("<a href=").count() {
            0 => 1,
            1..=2 => 0,
            _ => -1,
        },
        None => -1,
    }
}

fn stats_report(resolved_ip: Option<IpAddr>) -> i8 {
    match resolved_ip {
        Some(ip) => {
            let ip = ip.to_string();
            if BLOCKED_HOST_IPS.contains(&ip.as_str()) {
                -1
            } else {
                1
            }
        }
        None => -1,
    }
}
