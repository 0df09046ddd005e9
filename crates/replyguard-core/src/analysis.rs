use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Business aspects the classifier can score individually.
pub const BUSINESS_ASPECTS: [&str; 10] = [
    "product_quality",
    "customer_service",
    "price_value",
    "user_experience",
    "reliability",
    "delivery",
    "website_app",
    "staff",
    "location",
    "policies",
];

/// Reply used when no draft can be produced for a negative item.
pub const FALLBACK_RESPONSE: &str = "I noticed your concerns and would like to help. \
Please contact our customer service team for assistance.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            _ => Err(CoreError::InvalidSentiment(s.to_string())),
        }
    }
}

/// Clamp a raw confidence into `[0, 1]`; non-finite values collapse to 0.
#[must_use]
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectResult {
    pub aspect: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
}

impl AspectResult {
    #[must_use]
    pub fn new(
        aspect: impl Into<String>,
        sentiment: Sentiment,
        confidence: f64,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            aspect: aspect.into(),
            sentiment,
            confidence: clamp_confidence(confidence),
            explanation: explanation.into(),
        }
    }
}

/// Classifier verdict for one item. Produced once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aspects: Vec<AspectResult>,
}

impl AnalysisResult {
    #[must_use]
    pub fn new(sentiment: Sentiment, confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            sentiment,
            confidence: clamp_confidence(confidence),
            explanation: explanation.into(),
            aspects: Vec::new(),
        }
    }

    /// Safe default used when classification fails.
    #[must_use]
    pub fn fallback(reason: impl std::fmt::Display) -> Self {
        Self::new(Sentiment::Neutral, 0.0, format!("Error: {reason}"))
    }

    #[must_use]
    pub fn empty_text() -> Self {
        Self::new(Sentiment::Neutral, 0.0, "Empty or invalid text")
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.sentiment == Sentiment::Negative
    }

    #[must_use]
    pub fn with_aspects(mut self, aspects: Vec<AspectResult>) -> Self {
        self.aspects = aspects;
        self
    }
}
