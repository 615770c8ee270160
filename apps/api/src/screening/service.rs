use std::sync::Arc;

use tracing::{info, warn};

use crate::llm_client::ProviderErrorKind;
use crate::screening::{ScreeningProvider, ScreeningRequest, ScreeningResult};

/// Screening with ordered fallback.
///
/// The secondary provider is tried only when the primary reports a capacity
/// or rate-limit failure. Every other outcome (success, any other error,
/// secondary failure, no secondary configured) is final. `evaluate` always
/// returns a well-formed result.
#[derive(Clone)]
pub struct ScreeningService {
    primary: Arc<dyn ScreeningProvider>,
    secondary: Option<Arc<dyn ScreeningProvider>>,
}

impl ScreeningService {
    pub fn new(
        primary: Arc<dyn ScreeningProvider>,
        secondary: Option<Arc<dyn ScreeningProvider>>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub async fn evaluate(&self, request: &ScreeningRequest<'_>) -> ScreeningResult {
        let primary_err = match self.primary.evaluate(request).await {
            Ok(result) => {
                info!(
                    provider = self.primary.name(),
                    score = result.score,
                    "Screening completed"
                );
                return result;
            }
            Err(e) => e,
        };

        let kind = primary_err.kind();
        warn!(
            provider = self.primary.name(),
            ?kind,
            "Primary screening provider failed: {primary_err}"
        );

        if kind == ProviderErrorKind::Other {
            return ScreeningResult::failed(primary_err);
        }

        let Some(secondary) = &self.secondary else {
            return ScreeningResult::failed(primary_err);
        };

        info!(
            provider = secondary.name(),
            "Falling back to secondary screening provider"
        );
        match secondary.evaluate(request).await {
            Ok(result) => {
                info!(
                    provider = secondary.name(),
                    score = result.score,
                    "Screening completed via fallback"
                );
                result
            }
            Err(secondary_err) => {
                warn!(
                    provider = secondary.name(),
                    "Secondary screening provider failed: {secondary_err}"
                );
                ScreeningResult::failed(format!(
                    "{primary_err}; fallback {} failed: {secondary_err}",
                    secondary.name()
                ))
            }
        }
    }
}
