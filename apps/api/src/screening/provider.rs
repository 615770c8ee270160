use async_trait::async_trait;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};
use crate::screening::prompts::{SCREENING_PROMPT_TEMPLATE, SCREENING_SYSTEM};
use crate::screening::{ScreeningRequest, ScreeningResult};

/// Resume text beyond this many characters is cut before prompting.
pub const MAX_RESUME_CHARS: usize = 10_000;

/// A backend able to score a resume against job requirements.
///
/// Carried by `ScreeningService` as `Arc<dyn ScreeningProvider>` so backends
/// can be swapped without touching the intake pipeline.
#[async_trait]
pub trait ScreeningProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, request: &ScreeningRequest<'_>)
        -> Result<ScreeningResult, LlmError>;
}

/// Screening over a chat-completion provider.
pub struct LlmScreeningProvider {
    client: LlmClient,
}

impl LlmScreeningProvider {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScreeningProvider for LlmScreeningProvider {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn evaluate(
        &self,
        request: &ScreeningRequest<'_>,
    ) -> Result<ScreeningResult, LlmError> {
        let system = format!("{SCREENING_SYSTEM}\n\n{JSON_ONLY_SYSTEM}");
        let prompt = build_prompt(request);

        let result: ScreeningResult = self.client.call_json(&system, &prompt).await?;
        result.validate().map_err(LlmError::Schema)?;
        Ok(result)
    }
}

/// Fills the screening template. The resume goes in last so text inside it
/// that looks like a placeholder is never substituted.
pub fn build_prompt(request: &ScreeningRequest<'_>) -> String {
    let nice_to_haves = request
        .nice_to_haves
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("None");

    SCREENING_PROMPT_TEMPLATE
        .replace("{job_title}", request.job_title)
        .replace("{must_haves}", request.must_haves)
        .replace("{nice_to_haves}", nice_to_haves)
        .replace("{resume_text}", truncate_chars(request.resume_text, MAX_RESUME_CHARS))
}

/// Returns at most `max` characters of `text`, never splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
