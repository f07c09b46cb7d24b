pub mod analysis;
pub mod classifier;
pub mod config;
pub mod email_analyzer;
pub mod engine;
pub mod url_features;
pub mod url_heuristics;

pub use analysis::{AnalysisResponse, AnalysisResult, HealthStatus};
pub use classifier::{ModelEvaluator, UrlClassifier};
pub use config::AnalyzerConfig;
pub use engine::{AnalysisEngine, CombinedAnalysis};
pub use url_features::{FeatureVector, UrlFeatureExtractor};
pub use url_heuristics::HeuristicUrlScorer;
