use anyhow::{bail, Result};

use crate::analysis::AnalysisResult;

pub const URGENCY_WORDS: [&str; 6] = [
    "urgent",
    "immediately",
    "asap",
    "expires",
    "limited time",
    "act now",
];

pub const FINANCIAL_TERMS: [&str; 6] = [
    "money",
    "cash",
    "dollars",
    "investment",
    "guaranteed",
    "profit",
];

pub const SUSPICIOUS_PHRASES: [&str; 7] = [
    "click here",
    "verify account",
    "update information",
    "confirm details",
    "suspended account",
    "security breach",
    "unusual activity",
];

pub const COMMON_MISSPELLINGS: [&str; 4] = ["recieve", "seperate", "definately", "occured"];

/// Score free-text email content with keyword-category heuristics.
///
/// Each category reports how many of its entries appear in the case-folded
/// text and contributes one aggregate explanation, not one per match. Empty
/// input is the caller's error; everything else scores.
pub fn analyze_email_content(email_text: &str) -> Result<AnalysisResult> {
    let text = email_text.trim().to_lowercase();
    if text.is_empty() {
        bail!("Email text is required");
    }

    let mut risk_score = 0.0;
    let mut explanations = Vec::new();

    let urgency_count = category_hits(&text, &URGENCY_WORDS);
    if urgency_count > 0 {
        risk_score += urgency_count as f64 * 10.0;
        explanations.push(format!("Contains {urgency_count} urgency indicators"));
    }

    let financial_count = category_hits(&text, &FINANCIAL_TERMS);
    if financial_count > 0 {
        risk_score += financial_count as f64 * 8.0;
        explanations.push(format!("Contains {financial_count} financial terms"));
    }

    let phrase_count = category_hits(&text, &SUSPICIOUS_PHRASES);
    if phrase_count > 0 {
        risk_score += phrase_count as f64 * 12.0;
        explanations.push(format!("Contains {phrase_count} suspicious phrases"));
    }

    let error_count = category_hits(&text, &COMMON_MISSPELLINGS);
    if error_count > 0 {
        risk_score += error_count as f64 * 5.0;
        explanations.push(format!("Contains {error_count} common spelling errors"));
    }

    Ok(AnalysisResult::for_email(risk_score, explanations))
}

fn category_hits(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| text.contains(*term)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_text_scores_zero() {
        let result = analyze_email_content("Meeting scheduled for tomorrow at 2 PM.").unwrap();
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.is_phishing);
        assert!(result.explanations.is_empty());
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(analyze_email_content("").is_err());
        assert!(analyze_email_content("   \n  ").is_err());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let result = analyze_email_content("URGENT: Verify Account NOW").unwrap();
        // urgency (10) + suspicious phrase (12).
        assert_eq!(result.risk_score, 22.0);
    }

    #[test]
    fn test_one_explanation_per_category() {
        let result = analyze_email_content(
            "urgent asap: send money and cash for guaranteed profit, click here",
        )
        .unwrap();
        // 2 urgency words, 4 financial terms, 1 phrase: three category lines.
        assert_eq!(result.explanations.len(), 3);
        assert_eq!(result.explanations[0], "Contains 2 urgency indicators");
        assert_eq!(result.explanations[1], "Contains 4 financial terms");
        assert_eq!(result.explanations[2], "Contains 1 suspicious phrases");
        assert_eq!(result.risk_score, 2.0 * 10.0 + 4.0 * 8.0 + 12.0);
    }

    #[test]
    fn test_threshold_is_strict_at_forty() {
        // Four urgency words land exactly on the threshold.
        let at_forty = analyze_email_content("urgent immediately asap expires").unwrap();
        assert_eq!(at_forty.risk_score, 40.0);
        assert!(!at_forty.is_phishing);

        // Three phrases and one misspelling: 41.
        let above = analyze_email_content(
            "click here to verify account and update information, you will recieve a reply",
        )
        .unwrap();
        assert_eq!(above.risk_score, 41.0);
        assert!(above.is_phishing);
    }

    #[test]
    fn test_score_clamps_at_one_hundred() {
        let everything = format!(
            "{} {} {} {}",
            URGENCY_WORDS.join(" "),
            FINANCIAL_TERMS.join(" "),
            SUSPICIOUS_PHRASES.join(" "),
            COMMON_MISSPELLINGS.join(" ")
        );
        let result = analyze_email_content(&everything).unwrap();
        assert_eq!(result.risk_score, 100.0);
        assert!(result.is_phishing);
        assert_eq!(result.confidence, 1.0);
    }
}
