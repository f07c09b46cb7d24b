use chrono::Utc;
use serde::Serialize;

use crate::url_features::FeatureVector;
use crate::url_heuristics::UrlLexicalFeatures;

/// URL analyses flag phishing above this score.
pub const URL_RISK_THRESHOLD: f64 = 50.0;
/// Email analyses flag earlier; lexical-only signals carry less weight.
pub const EMAIL_RISK_THRESHOLD: f64 = 40.0;
/// Averaged multi-input analyses use the URL cutoff.
pub const COMBINED_RISK_THRESHOLD: f64 = 50.0;

pub const ANALYSIS_TYPE_EMAIL: &str = "email_content";
pub const ANALYSIS_TYPE_URL: &str = "url_analysis";
pub const ANALYSIS_TYPE_COMBINED: &str = "combined";

pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

pub fn confidence_for(score: f64) -> f64 {
    (score / 10.0).min(1.0)
}

/// Outcome of scoring one URL or one email body.
///
/// Built once per request and never mutated afterwards; combined analyses
/// assemble a fresh composite instead of touching their children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub risk_score: f64,
    pub is_phishing: bool,
    pub confidence: f64,
    pub explanations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_pred: Option<i8>,
}

impl AnalysisResult {
    pub fn for_url(risk_score: f64, explanations: Vec<String>) -> Self {
        Self::scored(risk_score, URL_RISK_THRESHOLD, explanations)
    }

    pub fn for_email(risk_score: f64, explanations: Vec<String>) -> Self {
        Self::scored(risk_score, EMAIL_RISK_THRESHOLD, explanations)
    }

    fn scored(risk_score: f64, threshold: f64, explanations: Vec<String>) -> Self {
        let risk_score = clamp_score(risk_score);
        Self {
            risk_score,
            is_phishing: risk_score > threshold,
            confidence: confidence_for(risk_score),
            explanations,
            features: None,
            model_pred: None,
        }
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_model_pred(mut self, pred: i8) -> Self {
        self.model_pred = Some(pred);
        self
    }
}

/// Feature payload attached to URL results: the full training vector on the
/// model path, the cheap lexical profile on the heuristic path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureSet {
    Model(FeatureVector),
    Lexical(UrlLexicalFeatures),
}

/// Envelope added around any result before it leaves the engine.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse<T: Serialize> {
    #[serde(flatten)]
    pub result: T,
    pub timestamp: String,
    pub analysis_type: &'static str,
    pub model_version: String,
}

impl<T: Serialize> AnalysisResponse<T> {
    pub fn new(result: T, analysis_type: &'static str, model_version: &str) -> Self {
        Self {
            result,
            timestamp: Utc::now().to_rfc3339(),
            analysis_type,
            model_version: model_version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub models_loaded: ModelsLoaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsLoaded {
    pub url_model: bool,
}

impl HealthStatus {
    pub fn report(url_model: bool) -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            models_loaded: ModelsLoaded { url_model },
        }
    }
}

/// Static reference table describing the indicator categories, for display
/// alongside analysis output.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorGuidelines {
    pub email_indicators: EmailIndicators,
    pub url_indicators: UrlIndicators,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailIndicators {
    pub urgency: &'static str,
    pub financial: &'static str,
    pub grammar: &'static str,
    pub suspicious_phrases: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlIndicators {
    pub length: &'static str,
    pub ip_address: &'static str,
    pub https: &'static str,
    pub special_chars: &'static str,
}

pub fn indicator_guidelines() -> IndicatorGuidelines {
    IndicatorGuidelines {
        email_indicators: EmailIndicators {
            urgency: "Emails creating artificial urgency are often phishing attempts",
            financial: "Promises of money or financial gains are common phishing tactics",
            grammar: "Poor grammar and spelling can indicate phishing emails",
            suspicious_phrases: "Common phrases used in phishing attempts",
        },
        url_indicators: UrlIndicators {
            length: "Unusually long URLs may indicate phishing",
            ip_address: "URLs with IP addresses instead of domain names are suspicious",
            https: "Lack of HTTPS encryption is a security concern",
            special_chars: "Many special characters can indicate malicious URLs",
        },
    }
}
