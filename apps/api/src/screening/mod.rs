// Automated resume screening.
// Extraction turns the upload into text, a provider scores it against the
// job's requirements, and the service owns the fallback policy between
// providers. Nothing in here is allowed to fail a submission.

pub mod extract;
pub mod prompts;
pub mod provider;
pub mod service;

use serde::{Deserialize, Serialize};

pub use provider::{LlmScreeningProvider, ScreeningProvider};
pub use service::ScreeningService;

/// Inputs for one screening call.
#[derive(Debug, Clone)]
pub struct ScreeningRequest<'a> {
    pub resume_text: &'a str,
    pub job_title: &'a str,
    pub must_haves: &'a str,
    pub nice_to_haves: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapStatus {
    Missing,
    Weak,
    Match,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GapItem {
    pub requirement: String,
    pub status: GapStatus,
    pub note: String,
}

/// Structured screening verdict. This is also the JSON payload stored on the
/// application, so the field names are part of the storage format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreeningResult {
    pub score: u32,
    pub match_count: u32,
    pub total_must_haves: u32,
    pub justification: String,
    pub gap_analysis: Vec<GapItem>,
}

impl ScreeningResult {
    /// Zero-score result recorded when no provider produced a usable answer.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            score: 0,
            match_count: 0,
            total_must_haves: 0,
            justification: format!("Error during AI evaluation: {reason}"),
            gap_analysis: Vec::new(),
        }
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.score > 100 {
            return Err(format!("score {} is outside 0-100", self.score));
        }
        if self.match_count > self.total_must_haves {
            return Err(format!(
                "match_count {} exceeds total_must_haves {}",
                self.match_count, self.total_must_haves
            ));
        }
        Ok(())
    }
}
