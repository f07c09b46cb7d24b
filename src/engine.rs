use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::analysis::{
    clamp_score, AnalysisResponse, AnalysisResult, HealthStatus, COMBINED_RISK_THRESHOLD,
};
use crate::classifier::{ModelEvaluator, UrlClassifier};
use crate::config::AnalyzerConfig;
use crate::email_analyzer;
use crate::url_features::UrlFeatureExtractor;
use crate::url_heuristics::HeuristicUrlScorer;

/// One URL's slot inside a combined analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlAnalysis {
    pub url: String,
    pub analysis: AnalysisResult,
}

/// Composite verdict over one optional email body and any number of URLs.
/// Sub-results are embedded as-is; the overall score is their plain average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedAnalysis {
    pub email_analysis: Option<AnalysisResult>,
    pub url_analyses: Vec<UrlAnalysis>,
    pub combined_risk_score: f64,
    pub overall_prediction: String,
    pub explanations: Vec<String>,
}

/// The scoring engine. All collaborators are injected at construction:
/// configuration, the feature extractor it implies, and an optional trained
/// classifier. Holds no mutable state, so concurrent use needs no locking.
pub struct AnalysisEngine {
    config: AnalyzerConfig,
    extractor: UrlFeatureExtractor,
    heuristics: HeuristicUrlScorer,
    evaluator: ModelEvaluator,
}

impl AnalysisEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_classifier(config, None)
    }

    pub fn with_classifier(
        config: AnalyzerConfig,
        classifier: Option<Arc<dyn UrlClassifier>>,
    ) -> Self {
        let extractor = UrlFeatureExtractor::new(config.fetch.clone(), config.dns.clone());
        Self {
            extractor,
            heuristics: HeuristicUrlScorer::new(),
            evaluator: ModelEvaluator::new(classifier),
            config,
        }
    }

    /// Score a URL: model-backed when a classifier is loaded and evaluates
    /// cleanly, lexical heuristics otherwise.
    pub async fn analyze_url(&self, url: &str) -> AnalysisResult {
        match self.analyze_url_with_model(url).await {
            Some(result) => result,
            None => {
                log::debug!("Model path unavailable for {url}, using lexical heuristics");
                self.heuristics.analyze(url)
            }
        }
    }

    /// The model path alone. `None` means unavailable, never failure.
    pub async fn analyze_url_with_model(&self, url: &str) -> Option<AnalysisResult> {
        self.evaluator.analyze_url(&self.extractor, url).await
    }

    pub fn analyze_email(&self, email_text: &str) -> Result<AnalysisResult> {
        email_analyzer::analyze_email_content(email_text)
    }

    /// Score an email body and a list of URLs together. Every sub-analysis
    /// weighs equally in the average; explanations concatenate email-first,
    /// then URLs in input order.
    pub async fn analyze_combined(
        &self,
        email_text: Option<&str>,
        urls: &[String],
    ) -> Result<CombinedAnalysis> {
        let email_text = email_text.map(str::trim).filter(|text| !text.is_empty());
        if email_text.is_none() && urls.is_empty() {
            bail!("Either email text or URLs are required");
        }

        let mut total = 0.0;
        let mut count = 0usize;
        let mut explanations = Vec::new();

        let email_analysis = match email_text {
            Some(text) => {
                let analysis = self.analyze_email(text)?;
                total += analysis.risk_score;
                count += 1;
                explanations.extend(analysis.explanations.iter().cloned());
                Some(analysis)
            }
            None => None,
        };

        let mut url_analyses = Vec::with_capacity(urls.len());
        for url in urls {
            let analysis = self.analyze_url(url).await;
            total += analysis.risk_score;
            count += 1;
            explanations.extend(analysis.explanations.iter().cloned());
            url_analyses.push(UrlAnalysis {
                url: url.clone(),
                analysis,
            });
        }

        let combined_risk_score = clamp_score(total / count as f64);
        let overall_prediction = if combined_risk_score > COMBINED_RISK_THRESHOLD {
            "phishing"
        } else {
            "safe"
        };

        Ok(CombinedAnalysis {
            email_analysis,
            url_analyses,
            combined_risk_score,
            overall_prediction: overall_prediction.to_string(),
            explanations,
        })
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::report(self.evaluator.is_loaded())
    }

    pub fn model_version(&self) -> &str {
        &self.config.model_version
    }

    /// Wrap a result in the metadata envelope the serving layer emits.
    pub fn respond<T: Serialize>(
        &self,
        result: T,
        analysis_type: &'static str,
    ) -> AnalysisResponse<T> {
        AnalysisResponse::new(result, analysis_type, &self.config.model_version)
    }
}
