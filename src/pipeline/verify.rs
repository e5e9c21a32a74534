//! Conversational-tone review pass.
//!
//! One gateway call with the fixed review instruction. The model either
//! returns the draft untouched or a rewritten variant; callers cannot tell
//! which, and do not need to. Fail-open: any gateway error or blank review
//! output keeps the draft, because this pass must never block the pipeline.

use crate::gateway::{Backend, ModelGateway};
use crate::pipeline::prompts;

pub async fn verify(
    gateway: &dyn ModelGateway,
    backend: Backend,
    draft: &str,
    user_input: &str,
) -> String {
    let prompt = prompts::review(draft, user_input);
    match gateway.complete(backend, &prompt).await {
        Ok(reviewed) if !reviewed.trim().is_empty() => reviewed.trim().to_string(),
        Ok(_) => draft.to_string(),
        Err(e) => {
            tracing::warn!(backend = backend.label(), "tone review skipped: {e}");
            draft.to_string()
        }
    }
}
