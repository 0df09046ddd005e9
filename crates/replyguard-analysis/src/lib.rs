//! Classifiers and response drafters.
//!
//! With an LLM key configured, [`OpenAiClient`] talks to any OpenAI-compatible
//! chat completions endpoint. Without one, the offline [`LexiconClassifier`]
//! and [`TemplateDrafter`] take over so monitoring still runs.

mod error;
mod lexicon;
mod openai;
mod prompts;
mod template;

use std::sync::Arc;

use replyguard_core::{AppConfig, Classifier, ResponseDrafter};

pub use error::AnalysisError;
pub use lexicon::{lexicon_score, LexiconClassifier, SENTIMENT_THRESHOLD};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use template::TemplateDrafter;

/// Classifier and drafter chosen from configuration.
pub struct AnalysisBackends {
    pub classifier: Arc<dyn Classifier>,
    pub drafter: Arc<dyn ResponseDrafter>,
    /// `"openai:<model>"` or `"lexicon"`, for startup logs and health output.
    pub description: String,
}

/// # Errors
///
/// Returns [`AnalysisError`] if an LLM key is configured but the client
/// cannot be built.
pub fn backends_from_config(config: &AppConfig) -> Result<AnalysisBackends, AnalysisError> {
    match OpenAiConfig::from_app_config(config) {
        Some(openai) => {
            let client = Arc::new(OpenAiClient::new(openai)?);
            let description = format!("openai:{}", client.model());
            Ok(AnalysisBackends {
                classifier: client.clone(),
                drafter: client,
                description,
            })
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; using lexicon classifier and template drafter");
            Ok(AnalysisBackends {
                classifier: Arc::new(LexiconClassifier),
                drafter: Arc::new(TemplateDrafter),
                description: "lexicon".to_string(),
            })
        }
    }
}
