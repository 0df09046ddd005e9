//! Offline lexicon classifier used when no LLM key is configured.

use async_trait::async_trait;
use replyguard_core::aspects::aspect_keywords;
use replyguard_core::{AnalysisResult, AspectResult, Classifier, ExternalError, Sentiment};

/// Scores at or beyond this magnitude leave neutral territory.
pub const SENTIMENT_THRESHOLD: f64 = 0.2;

/// Customer-feedback word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("recommend", 0.4),
    ("helpful", 0.4),
    ("friendly", 0.4),
    ("fast", 0.3),
    ("easy", 0.3),
    ("reliable", 0.4),
    ("happy", 0.4),
    ("satisfied", 0.4),
    ("thanks", 0.3),
    ("resolved", 0.4),
    ("worth", 0.3),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("worst", -0.6),
    ("hate", -0.6),
    ("broken", -0.5),
    ("broke", -0.4),
    ("useless", -0.6),
    ("rude", -0.5),
    ("slow", -0.3),
    ("late", -0.3),
    ("never", -0.3),
    ("refund", -0.3),
    ("scam", -0.7),
    ("disappointed", -0.5),
    ("disappointing", -0.5),
    ("frustrating", -0.5),
    ("overpriced", -0.4),
    ("ignored", -0.5),
    ("failed", -0.4),
    ("problem", -0.3),
    ("issue", -0.2),
    ("avoid", -0.5),
];

/// Sum the weights of lexicon words in `text`, clamped to `[-1.0, 1.0]`.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

fn label(score: f64) -> Sentiment {
    if score <= -SENTIMENT_THRESHOLD {
        Sentiment::Negative
    } else if score >= SENTIMENT_THRESHOLD {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

/// Split on sentence punctuation and newlines.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Classifier for LexiconClassifier {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, ExternalError> {
        if text.trim().is_empty() {
            return Ok(AnalysisResult::empty_text());
        }
        let score = lexicon_score(text);
        Ok(AnalysisResult::new(
            label(score),
            score.abs(),
            format!("lexicon score {score:.2}"),
        ))
    }

    /// Scores only the sentences that mention one of the aspect's keywords.
    async fn analyze_aspect(
        &self,
        text: &str,
        aspect: &str,
    ) -> Result<AspectResult, ExternalError> {
        let keywords = aspect_keywords(aspect);
        let relevant: Vec<&str> = sentences(text)
            .filter(|sentence| {
                let lower = sentence.to_lowercase();
                keywords.iter().any(|k| lower.contains(k))
            })
            .collect();

        if relevant.is_empty() {
            return Ok(AspectResult::new(
                aspect,
                Sentiment::Neutral,
                0.0,
                "aspect not mentioned",
            ));
        }

        let score = lexicon_score(&relevant.join(" "));
        Ok(AspectResult::new(
            aspect,
            label(score),
            score.abs(),
            format!("lexicon score {score:.2} over {} sentence(s)", relevant.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_scores_zero() {
        assert!(lexicon_score("").abs() < f64::EPSILON);
        assert!(lexicon_score("   ").abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_text_scores_zero() {
        assert!(lexicon_score("the quick brown fox").abs() < f64::EPSILON);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        let score = lexicon_score("terrible!");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn score_clamps_to_negative_one() {
        let score = lexicon_score("worst terrible awful scam useless rude");
        assert!((score + 1.0).abs() < f64::EPSILON, "got {score}");
    }

    #[test]
    fn thresholds_split_labels() {
        assert_eq!(label(-0.2), Sentiment::Negative);
        assert_eq!(label(-0.19), Sentiment::Neutral);
        assert_eq!(label(0.19), Sentiment::Neutral);
        assert_eq!(label(0.2), Sentiment::Positive);
    }

    #[tokio::test]
    async fn analyze_labels_complaint_negative() {
        let result = LexiconClassifier
            .analyze("Acme support was rude and my order arrived broken. Terrible.")
            .await
            .unwrap();
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!(result.confidence > 0.5);
    }

    #[tokio::test]
    async fn analyze_empty_text_is_neutral() {
        let result = LexiconClassifier.analyze("  ").await.unwrap();
        assert_eq!(result, AnalysisResult::empty_text());
    }

    #[tokio::test]
    async fn aspect_scoring_uses_matching_sentences_only() {
        let text = "Shipping was fast. Support was rude and useless.";
        let delivery = LexiconClassifier.analyze_aspect(text, "delivery").await.unwrap();
        let service = LexiconClassifier
            .analyze_aspect(text, "customer_service")
            .await
            .unwrap();
        assert_eq!(delivery.sentiment, Sentiment::Positive);
        assert_eq!(service.sentiment, Sentiment::Negative);

        let staff = LexiconClassifier.analyze_aspect(text, "staff").await.unwrap();
        assert_eq!(staff.sentiment, Sentiment::Neutral);
        assert_eq!(staff.explanation, "aspect not mentioned");
    }
}
