use crate::error::SearchError;
use crate::models::ScoredPassage;
use crate::traits::TextCompleter;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TEMPLATE: &str =
    "Answer the question based only on the following context:\n{context}\n\nQuestion: {question}\n";

#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Limit for a single completion attempt.
    pub timeout: Duration,
    /// Total attempts, clamped to `1..=2`.
    pub max_attempts: u32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 1,
        }
    }
}

pub fn build_prompt(question: &str, passages: &[ScoredPassage]) -> String {
    let context = passages
        .iter()
        .map(|hit| hit.passage.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}

pub struct AnswerSynthesizer {
    completer: Arc<dyn TextCompleter>,
    options: SynthesisOptions,
}

impl AnswerSynthesizer {
    pub fn new(completer: Arc<dyn TextCompleter>, options: SynthesisOptions) -> Self {
        Self { completer, options }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        passages: &[ScoredPassage],
    ) -> Result<String, SearchError> {
        let prompt = build_prompt(question, passages);
        let attempts = self.options.max_attempts.clamp(1, 2);

        let mut attempt = 1;
        loop {
            let outcome = tokio::time::timeout(self.options.timeout, self.completer.complete(&prompt))
                .await
                .unwrap_or(Err(SearchError::SynthesisTimeout(self.options.timeout)));

            match outcome {
                Ok(answer) => return Ok(answer),
                Err(error) if attempt < attempts => {
                    warn!(attempt, error = %error, "completion failed, retrying once");
                    attempt += 1;
                }
                Err(error) => return Err(into_synthesis_error(error)),
            }
        }
    }
}

fn into_synthesis_error(error: SearchError) -> SearchError {
    match error {
        SearchError::Synthesis(_) | SearchError::SynthesisTimeout(_) => error,
        other => SearchError::Synthesis(other.to_string()),
    }
}
