use regex::Regex;
use serde::Serialize;

use crate::analysis::{AnalysisResult, FeatureSet};
use crate::url_features::UrlParts;

/// Keywords that phishing URLs lean on to look like account workflows.
pub const SUSPICIOUS_URL_KEYWORDS: [&str; 7] = [
    "secure", "verify", "update", "confirm", "account", "login", "bank",
];

/// Cheap lexical profile of a URL. No network traffic involved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UrlLexicalFeatures {
    pub url_length: usize,
    pub domain_length: usize,
    pub path_length: usize,
    pub query_length: usize,
    pub has_ip: bool,
    pub has_port: bool,
    pub has_https: bool,
    pub has_www: bool,
    pub subdomain_count: i32,
    pub has_suspicious_keywords: bool,
    pub special_char_count: usize,
    pub digit_ratio: f64,
    pub vowel_ratio: f64,
}

/// Rule-based URL scorer used whenever no trained classifier is available.
/// Purely lexical, so it also serves URLs the extractor cannot reach.
pub struct HeuristicUrlScorer {
    ip_probe: Regex,
    special_chars: Regex,
}

impl Default for HeuristicUrlScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicUrlScorer {
    pub fn new() -> Self {
        Self {
            ip_probe: Regex::new(r"^\d+\.\d+\.\d+\.\d+").unwrap(),
            special_chars: Regex::new(r"[^a-zA-Z0-9.-]").unwrap(),
        }
    }

    pub fn extract_features(&self, url: &str) -> UrlLexicalFeatures {
        let parts = UrlParts::parse(url);
        let (scheme, host, path, query) = match &parts {
            Some(parts) => (
                parts.scheme.as_str(),
                parts.host.as_str(),
                parts.path.as_str(),
                parts.query.as_str(),
            ),
            None => ("", "", "", ""),
        };
        let lower = url.to_lowercase();
        UrlLexicalFeatures {
            url_length: url.chars().count(),
            domain_length: host.len(),
            path_length: path.len(),
            query_length: query.len(),
            has_ip: self.ip_probe.is_match(host),
            has_port: host.contains(':'),
            has_https: scheme == "https",
            has_www: host.to_lowercase().contains("www."),
            subdomain_count: host.split('.').count() as i32 - 2,
            has_suspicious_keywords: SUSPICIOUS_URL_KEYWORDS
                .iter()
                .any(|keyword| lower.contains(keyword)),
            special_char_count: self.special_chars.find_iter(url).count(),
            digit_ratio: char_ratio(url, |c| c.is_ascii_digit()),
            vowel_ratio: char_ratio(url, |c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')),
        }
    }

    /// Additive point rules over the lexical profile. Each triggered rule
    /// contributes one explanation; the sum is clamped to [0, 100].
    pub fn analyze(&self, url: &str) -> AnalysisResult {
        let features = self.extract_features(url);

        let mut risk_score = 0.0;
        let mut explanations = Vec::new();

        if features.url_length > 100 {
            risk_score += 20.0;
            explanations.push("URL is unusually long (suspicious)".to_string());
        }
        if features.has_ip {
            risk_score += 30.0;
            explanations.push("URL contains IP address instead of domain name".to_string());
        }
        if !features.has_https {
            risk_score += 15.0;
            explanations.push("URL does not use HTTPS encryption".to_string());
        }
        if features.has_suspicious_keywords {
            risk_score += 25.0;
            explanations.push("URL contains suspicious keywords".to_string());
        }
        if features.special_char_count > 5 {
            risk_score += 20.0;
            explanations.push("URL contains many special characters".to_string());
        }
        if features.subdomain_count > 3 {
            risk_score += 15.0;
            explanations.push("URL has many subdomains".to_string());
        }

        AnalysisResult::for_url(risk_score, explanations)
            .with_features(FeatureSet::Lexical(features))
    }
}

fn char_ratio(url: &str, pred: impl Fn(char) -> bool) -> f64 {
    let total = url.chars().count();
    if total == 0 {
        return 0.0;
    }
    url.chars().filter(|&c| pred(c)).count() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_profile() {
        let scorer = HeuristicUrlScorer::new();
        let features = scorer.extract_features("https://www.example.com/path?q=1");
        assert_eq!(features.domain_length, "www.example.com".len());
        assert!(features.has_https);
        assert!(features.has_www);
        assert!(!features.has_ip);
        assert_eq!(features.subdomain_count, 1);
        assert_eq!(features.path_length, "/path".len());
        assert_eq!(features.query_length, "q=1".len());
    }

    #[test]
    fn test_ip_host_example_scores_seventy() {
        let scorer = HeuristicUrlScorer::new();
        let result = scorer.analyze("http://192.168.1.1/login-verify");
        // IP host (+30), no HTTPS (+15), suspicious keyword (+25).
        assert_eq!(result.risk_score, 70.0);
        assert!(result.is_phishing);
        assert_eq!(result.explanations.len(), 3);
    }

    #[test]
    fn test_benign_url_scores_zero() {
        let scorer = HeuristicUrlScorer::new();
        let result = scorer.analyze("https://example.com/docs");
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.is_phishing);
        assert!(result.explanations.is_empty());
    }

    #[test]
    fn test_threshold_is_strict_at_fifty() {
        let scorer = HeuristicUrlScorer::new();
        // Long URL (+20) and IP host (+30), HTTPS present: exactly 50.
        let at_fifty = format!("https://192.168.1.1/{}", "a".repeat(100));
        let result = scorer.analyze(&at_fifty);
        assert_eq!(result.risk_score, 50.0);
        assert!(!result.is_phishing);

        // IP host (+30) plus keyword (+25): 55 crosses the line.
        let above = scorer.analyze("https://192.168.1.1/verify");
        assert_eq!(above.risk_score, 55.0);
        assert!(above.is_phishing);
    }

    #[test]
    fn test_score_is_monotone_in_triggered_rules() {
        let scorer = HeuristicUrlScorer::new();
        let base = scorer.analyze("https://example.org/page").risk_score;
        let keyword = scorer.analyze("https://example.org/login").risk_score;
        let keyword_http = scorer.analyze("http://example.org/login").risk_score;
        let keyword_http_ip = scorer.analyze("http://10.0.0.1/login").risk_score;
        assert!(base <= keyword);
        assert!(keyword <= keyword_http);
        assert!(keyword_http <= keyword_http_ip);
    }

    #[test]
    fn test_score_clamps_at_one_hundred() {
        let scorer = HeuristicUrlScorer::new();
        // Every rule fires: 20 + 30 + 15 + 25 + 20 + 15 = 125 before clamping.
        let url = format!(
            "http://192.168.1.1.evil.example.com/login/{}?a=!!!&b=!!!",
            "x".repeat(100)
        );
        let result = scorer.analyze(&url);
        assert_eq!(result.risk_score, 100.0);
        assert!(result.is_phishing);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.explanations.len(), 6);
    }

    #[test]
    fn test_result_carries_lexical_features() {
        let scorer = HeuristicUrlScorer::new();
        let result = scorer.analyze("http://192.168.1.1/login");
        match result.features {
            Some(FeatureSet::Lexical(ref features)) => assert!(features.has_ip),
            _ => panic!("expected lexical features"),
        }
    }
}
