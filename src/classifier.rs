use std::sync::Arc;

use anyhow::Result;

use crate::analysis::{AnalysisResult, FeatureSet};
use crate::url_features::{FeatureVector, UrlFeatureExtractor};

/// Capability surface of an externally trained URL classifier.
///
/// `predict` is mandatory; probability output and label enumeration are
/// optional capabilities a model may or may not expose. Labels follow the
/// training scheme: -1 phishing, 0 suspicious, 1 legitimate.
pub trait UrlClassifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<i8>;

    /// Per-class probabilities aligned with `classes`, when available.
    fn predict_proba(&self, _features: &FeatureVector) -> Option<Vec<f64>> {
        None
    }

    /// Label enumeration aligned with the `predict_proba` columns.
    fn classes(&self) -> Option<Vec<i8>> {
        None
    }
}

/// Wraps an optional injected classifier and converts its output into the
/// shared score space. Unavailability is a normal outcome, not an error:
/// the caller falls back to the lexical heuristics.
pub struct ModelEvaluator {
    classifier: Option<Arc<dyn UrlClassifier>>,
}

impl ModelEvaluator {
    pub fn new(classifier: Option<Arc<dyn UrlClassifier>>) -> Self {
        Self { classifier }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    /// Extract features and evaluate the classifier. `None` means the model
    /// path is unavailable (no classifier, or evaluation failed); hard
    /// failures never propagate to the caller.
    pub async fn analyze_url(
        &self,
        extractor: &UrlFeatureExtractor,
        url: &str,
    ) -> Option<AnalysisResult> {
        let classifier = self.classifier.as_ref()?;
        let features = extractor.extract(url).await;
        match evaluate(classifier.as_ref(), &features) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Model evaluation failed for {url}: {e}");
                None
            }
        }
    }
}

/// Convert one prediction over an extracted vector into an AnalysisResult.
pub fn evaluate(classifier: &dyn UrlClassifier, features: &FeatureVector) -> Result<AnalysisResult> {
    let pred = classifier.predict(features)?;

    let risk_score = match classifier.predict_proba(features) {
        Some(proba) if proba.len() >= 2 => phishing_probability(classifier, &proba) * 100.0,
        // Without probabilities, map the discrete label onto fixed severity
        // bands.
        _ => match pred {
            -1 => 90.0,
            0 => 60.0,
            _ => 10.0,
        },
    };

    Ok(AnalysisResult::for_url(risk_score, explain_features(features))
        .with_features(FeatureSet::Model(features.clone()))
        .with_model_pred(pred))
}

/// Locate the phishing class in the probability output: label -1 first, then
/// 0, then the maximum probability as a conservative proxy when the model
/// does not enumerate its labels.
fn phishing_probability(classifier: &dyn UrlClassifier, proba: &[f64]) -> f64 {
    if let Some(classes) = classifier.classes() {
        for label in [-1i8, 0] {
            if let Some(index) = classes.iter().position(|&class| class == label) {
                if let Some(&p) = proba.get(index) {
                    return p;
                }
            }
        }
    }
    proba.iter().copied().fold(0.0, f64::max)
}

/// Human-readable rationale derived from the feature vector itself, not from
/// the classifier internals. Only broadly interpretable signals are worth
/// surfacing to an end user.
pub fn explain_features(features: &FeatureVector) -> Vec<String> {
    let mut explanations = Vec::new();
    if features.get("UsingIp") == Some(-1) {
        explanations.push("URL uses an IP address instead of a domain".to_string());
    }
    if features.get("longUrl") == Some(-1) {
        explanations.push("URL is unusually long".to_string());
    }
    if features.get("prefixSuffix") == Some(-1) {
        explanations.push("URL contains prefix/suffix in domain (e.g., using -)".to_string());
    }
    if features.get("SubDomains").is_some_and(|v| v <= 0) {
        explanations.push("URL contains multiple subdomains".to_string());
    }
    if features.get("HTTPS") == Some(-1) {
        explanations.push("URL does not use HTTPS".to_string());
    }
    if features.get("NonStdPort") == Some(-1) {
        explanations.push("URL uses a non-standard port".to_string());
    }
    explanations
}
