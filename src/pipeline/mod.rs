//! The response synthesis pipeline.
//!
//! One parameterized state machine replaces what would otherwise be a
//! near-duplicate code path per strategy: a strategy-specific generation
//! stage (one backend, or a two-backend fan-out plus merge) followed by a
//! shared polish tail of humanize → tone review → humanize. Exactly one
//! [`Outcome`] comes out per request.
//!
//! Failure policy: gateway failures are terminal only at the generation and
//! merge stages. Humanizer and review failures always recover by falling
//! back to their input. Nothing is retried.

pub mod humanize;
pub mod prompts;
pub mod verify;

use std::sync::Arc;

use futures_util::future;

use crate::gateway::{Backend, ModelGateway};
use humanize::{humanize_or_keep, Humanizer};

/// User-selected pipeline shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Single(Backend),
    Composite,
}

/// The backend used for composite merges and as the startup default.
pub const PRIMARY_BACKEND: Backend = Backend::Gemini;

/// Fixed order in which composite sub-responses enter the merge context,
/// regardless of which call settles first.
const COMPOSITE_SOURCES: [Backend; 2] = [Backend::OpenRouter, Backend::DeepSeek];

impl Strategy {
    /// Name persisted in the mode store.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Single(Backend::Gemini) => "gemini",
            Strategy::Single(Backend::OpenRouter) => "openrouter",
            Strategy::Single(Backend::DeepSeek) => "deepseek",
            Strategy::Composite => "refined",
        }
    }

    pub fn parse(name: &str) -> Option<Strategy> {
        match name {
            "gemini" => Some(Strategy::Single(Backend::Gemini)),
            "openrouter" => Some(Strategy::Single(Backend::OpenRouter)),
            "deepseek" => Some(Strategy::Single(Backend::DeepSeek)),
            "refined" => Some(Strategy::Composite),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Single(backend) => backend.label(),
            Strategy::Composite => "Refined (blend)",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Single(PRIMARY_BACKEND)
    }
}

/// One incoming message's worth of work. Consumed whole by
/// [`Pipeline::respond`]; nothing is retained afterwards.
pub struct PipelineRequest {
    pub text: String,
    pub strategy: Strategy,
}

/// Terminal result of a pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    /// The backend answered, but with nothing usable.
    Empty,
    /// No usable output was obtainable. Carries the user-visible message.
    Failure(String),
}

/// Shown when the selected backend fails outright.
pub const FAILURE_MESSAGE: &str =
    "Sorry, I couldn't put an answer together. Please try again in a bit.";

/// Shown when neither composite source produced anything.
pub const NO_SOURCES_MESSAGE: &str =
    "None of the models returned an answer. Please try again later.";

/// Shown when the composite merge call itself fails. Fail-closed: no
/// fallback to a raw sub-response.
pub const MERGE_FAILURE_MESSAGE: &str =
    "Something went wrong while putting the final reply together.";

/// Shown when an image arrives under a strategy that cannot see images.
pub const IMAGE_UNSUPPORTED_MESSAGE: &str =
    "Image understanding only works with the Gemini model. Switch to Gemini and send it again.";

pub struct Pipeline {
    gateway: Arc<dyn ModelGateway>,
    humanizer: Arc<dyn Humanizer>,
}

impl Pipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>, humanizer: Arc<dyn Humanizer>) -> Self {
        Self { gateway, humanizer }
    }

    /// Drive a text request to its terminal outcome.
    pub async fn respond(&self, request: PipelineRequest) -> Outcome {
        tracing::debug!(strategy = request.strategy.label(), "pipeline start");
        match request.strategy {
            Strategy::Single(backend) => self.single(backend, &request.text).await,
            Strategy::Composite => self.composite(&request.text).await,
        }
    }

    /// Reduced pipeline for images: one vision call, then the same polish
    /// tail as the text path. Non-vision strategies are rejected before any
    /// network call happens.
    pub async fn respond_to_image(
        &self,
        image: &[u8],
        mime_type: &str,
        caption: &str,
        strategy: Strategy,
    ) -> Outcome {
        let backend = match strategy {
            Strategy::Single(backend) if backend.supports_vision() => backend,
            _ => return Outcome::Failure(IMAGE_UNSUPPORTED_MESSAGE.to_string()),
        };

        let prompt = prompts::vision(caption);
        let draft = match self
            .gateway
            .complete_vision(backend, image, mime_type, &prompt)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = backend.label(), "vision call failed: {e}");
                return Outcome::Failure(FAILURE_MESSAGE.to_string());
            }
        };
        if draft.trim().is_empty() {
            return Outcome::Empty;
        }

        Outcome::Success(self.polish(draft.trim(), caption, backend).await)
    }

    async fn single(&self, backend: Backend, input: &str) -> Outcome {
        let prompt = prompts::draft(backend, input);
        let draft = match self.gateway.complete(backend, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = backend.label(), "generation failed: {e}");
                return Outcome::Failure(FAILURE_MESSAGE.to_string());
            }
        };
        // Blank output short-circuits: polishing nothing is pointless.
        if draft.trim().is_empty() {
            return Outcome::Empty;
        }

        Outcome::Success(self.polish(draft.trim(), input, backend).await)
    }

    async fn composite(&self, input: &str) -> Outcome {
        let [first, second] = COMPOSITE_SOURCES;
        // Independent concurrent calls; a join, not a race. Both must settle
        // before the merge context is built.
        let (first_result, second_result) = future::join(
            self.gateway.complete(first, &prompts::draft(first, input)),
            self.gateway.complete(second, &prompts::draft(second, input)),
        )
        .await;

        let mut sources: Vec<(&'static str, String)> = Vec::new();
        for (backend, result) in [(first, first_result), (second, second_result)] {
            match result {
                Ok(text) if !text.trim().is_empty() => {
                    sources.push((backend.label(), text.trim().to_string()));
                }
                Ok(_) => {
                    tracing::debug!(backend = backend.label(), "composite source was blank");
                }
                Err(e) => {
                    tracing::warn!(backend = backend.label(), "composite source failed: {e}");
                }
            }
        }

        if sources.is_empty() {
            return Outcome::Failure(NO_SOURCES_MESSAGE.to_string());
        }

        let merge_prompt = prompts::merge(input, &sources);
        let merged = match self.gateway.complete(PRIMARY_BACKEND, &merge_prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("merge call failed: {e}");
                return Outcome::Failure(MERGE_FAILURE_MESSAGE.to_string());
            }
        };
        if merged.trim().is_empty() {
            return Outcome::Failure(MERGE_FAILURE_MESSAGE.to_string());
        }

        Outcome::Success(self.polish(merged.trim(), input, PRIMARY_BACKEND).await)
    }

    /// Shared tail: humanize → tone review → humanize. Every stage here
    /// recovers by keeping its input, so this always yields usable text.
    async fn polish(&self, draft: &str, user_input: &str, review_backend: Backend) -> String {
        let softened = humanize_or_keep(self.humanizer.as_ref(), draft);
        let reviewed =
            verify::verify(self.gateway.as_ref(), review_backend, &softened, user_input).await;
        humanize_or_keep(self.humanizer.as_ref(), &reviewed)
    }
}
