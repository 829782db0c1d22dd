//! Grounded answer generation with per-backend fallback.
//!
//! Generation moves through a small state machine:
//!
//! ```text
//! no passages ───► NoContext       (canned answer)
//! passages ──────┬─► Succeeded
//!                ├─► FailedFallback  (local chain exhausted)
//!                └─► FailedTerminal  (remote misconfigured or failed)
//! ```
//!
//! Every path ends in a [`GenerationOutcome`], never an error. Degraded
//! paths are visible through the `model_used` tag of the final answer.

use crate::llm::client::{LLMClient, Provider};
use crate::rag::embeddings::with_timeout;
use crate::rag::retriever::{preview, ContextPassage, RetrievedContext};
use crate::types::{
    AnswerResult, AppError, ModelChoice, SourceDoc, MODEL_TAG_ERROR, MODEL_TAG_FALLBACK,
    MODEL_TAG_NO_CONTEXT, NO_CONTEXT_ANSWER,
};
use crate::utils::toml_config::AskConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Instruction sent ahead of every grounded prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based ONLY on the provided documents. \
If the answer is not in the documents, say \"I cannot find this information in the provided documents.\" \
Be direct and concise.";

/// Placed between context passages.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_FALLBACK_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    NoContext,
    Succeeded,
    FailedFallback,
    FailedTerminal,
}

/// Final result of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Retrieval found nothing; no backend was called.
    NoContext,
    /// A backend answered.
    Succeeded {
        answer: String,
        model_tag: String,
        sources: Vec<SourceDoc>,
    },
    /// Every local model failed; the answer is an excerpt of the best source.
    Degraded {
        answer: String,
        sources: Vec<SourceDoc>,
        failures: Vec<String>,
    },
    /// The remote backend is unusable. `message` explains why.
    Terminal { message: String },
}

impl GenerationOutcome {
    pub fn state(&self) -> GenerationState {
        match self {
            GenerationOutcome::NoContext => GenerationState::NoContext,
            GenerationOutcome::Succeeded { .. } => GenerationState::Succeeded,
            GenerationOutcome::Degraded { .. } => GenerationState::FailedFallback,
            GenerationOutcome::Terminal { .. } => GenerationState::FailedTerminal,
        }
    }
}

impl From<GenerationOutcome> for AnswerResult {
    fn from(outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::NoContext => AnswerResult {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                model_used: MODEL_TAG_NO_CONTEXT.to_string(),
            },
            GenerationOutcome::Succeeded {
                answer,
                model_tag,
                sources,
            } => AnswerResult {
                answer,
                sources,
                model_used: model_tag,
            },
            GenerationOutcome::Degraded {
                answer, sources, ..
            } => AnswerResult {
                answer,
                sources,
                model_used: MODEL_TAG_FALLBACK.to_string(),
            },
            GenerationOutcome::Terminal { message } => AnswerResult {
                answer: message,
                sources: Vec::new(),
                model_used: MODEL_TAG_ERROR.to_string(),
            },
        }
    }
}

/// The alternate, remote backend.
pub enum RemoteBackend {
    Configured(Arc<dyn LLMClient>),
    /// No usable credentials; holds the message returned to the caller.
    Unconfigured(String),
}

impl RemoteBackend {
    pub fn is_configured(&self) -> bool {
        matches!(self, RemoteBackend::Configured(_))
    }
}

/// Build the user prompt: labelled context passages followed by the question.
pub fn build_prompt(passages: &[ContextPassage], question: &str) -> String {
    let context = passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[Document {}: {}]\n{}", i + 1, p.filename, p.text.trim()))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "Context from documents:\n{}\n\nQuestion: {}\n\n\
         Answer the question using ONLY the information from the documents above. \
         If the answer is not in the documents, say \"{}\" Be direct and concise.",
        context,
        question.trim(),
        NO_CONTEXT_ANSWER
    )
}

fn failure_detail(err: &AppError) -> String {
    match err {
        AppError::LLM(msg) | AppError::ProviderUnavailable(msg) => msg.clone(),
        other => other.to_string(),
    }
}

pub struct AnswerGenerator {
    local: Vec<Arc<dyn LLMClient>>,
    remote: RemoteBackend,
    local_timeout: Duration,
    remote_timeout: Duration,
    fallback_excerpt_chars: usize,
}

impl AnswerGenerator {
    /// `local` is tried in order, smallest model first.
    pub fn new(local: Vec<Arc<dyn LLMClient>>, remote: RemoteBackend) -> Self {
        Self {
            local,
            remote,
            local_timeout: DEFAULT_CALL_TIMEOUT,
            remote_timeout: DEFAULT_CALL_TIMEOUT,
            fallback_excerpt_chars: DEFAULT_FALLBACK_EXCERPT_CHARS,
        }
    }

    pub fn with_timeouts(mut self, local: Duration, remote: Duration) -> Self {
        self.local_timeout = local;
        self.remote_timeout = remote;
        self
    }

    pub fn with_fallback_excerpt_chars(mut self, chars: usize) -> Self {
        self.fallback_excerpt_chars = chars;
        self
    }

    /// Build the Ollama chain and the OpenAI backend from configuration.
    pub fn from_config(config: &AskConfig) -> Self {
        let base_url = config.ollama.generation_url();
        let local = config
            .ollama
            .models
            .iter()
            .filter_map(|model| {
                let provider = Provider::Ollama {
                    base_url: base_url.clone(),
                    model: model.clone(),
                    temperature: config.ollama.temperature,
                };
                match provider.create_client() {
                    Ok(client) => Some(client),
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            model = provider.model(),
                            error = %e,
                            "Skipping local model"
                        );
                        None
                    }
                }
            })
            .collect();

        let remote = match config.openai_api_key() {
            Ok(api_key) => {
                let provider = Provider::OpenAI {
                    api_key,
                    api_base: config.openai.api_base.clone(),
                    model: config.openai.model.clone(),
                    max_tokens: config.openai.max_tokens,
                    temperature: config.openai.temperature,
                };
                match provider.create_client() {
                    Ok(client) => RemoteBackend::Configured(client),
                    Err(e) => RemoteBackend::Unconfigured(format!("OpenAI API error: {}", e)),
                }
            }
            Err(_) => RemoteBackend::Unconfigured(format!(
                "OpenAI API key not configured. Please set a valid {} environment variable.",
                config.openai.api_key_env
            )),
        };

        Self::new(local, remote)
            .with_timeouts(
                Duration::from_secs(config.ollama.timeout_secs),
                Duration::from_secs(config.openai.timeout_secs),
            )
            .with_fallback_excerpt_chars(config.rag.fallback_excerpt_chars)
    }

    /// Answer `question` from `context` with the chosen backend.
    pub async fn generate(
        &self,
        question: &str,
        context: RetrievedContext,
        model: ModelChoice,
    ) -> GenerationOutcome {
        if context.is_empty() {
            return GenerationOutcome::NoContext;
        }

        let prompt = build_prompt(&context.passages, question);
        match model {
            ModelChoice::Local => self.generate_local(&prompt, context).await,
            ModelChoice::Remote => self.generate_remote(&prompt, context).await,
        }
    }

    async fn generate_local(&self, prompt: &str, context: RetrievedContext) -> GenerationOutcome {
        let mut failures = Vec::new();

        for client in &self.local {
            let model = client.model_name();
            let started = Instant::now();
            let attempt = with_timeout(
                self.local_timeout,
                &format!("ollama model '{}'", model),
                client.generate_with_system(SYSTEM_PROMPT, prompt),
            )
            .await;

            match attempt {
                Ok(answer) if !answer.trim().is_empty() => {
                    info!(
                        model,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Local model answered"
                    );
                    return GenerationOutcome::Succeeded {
                        answer,
                        model_tag: format!("ollama-{}", model),
                        sources: context.sources,
                    };
                }
                Ok(_) => {
                    warn!(model, "Local model returned an empty answer, trying next");
                    failures.push(format!("{}: empty answer", model));
                }
                Err(e) => {
                    warn!(model, error = %e, "Local model failed, trying next");
                    failures.push(format!("{}: {}", model, failure_detail(&e)));
                }
            }
        }

        warn!(
            attempts = failures.len(),
            "All local models failed, answering with an excerpt"
        );
        let answer = self.fallback_answer(&context.passages);
        GenerationOutcome::Degraded {
            answer,
            sources: context.sources,
            failures,
        }
    }

    async fn generate_remote(&self, prompt: &str, context: RetrievedContext) -> GenerationOutcome {
        let client = match &self.remote {
            RemoteBackend::Configured(client) => client,
            RemoteBackend::Unconfigured(reason) => {
                warn!("Remote model requested but not configured");
                return GenerationOutcome::Terminal {
                    message: reason.clone(),
                };
            }
        };

        let model = client.model_name();
        let started = Instant::now();
        let attempt = with_timeout(
            self.remote_timeout,
            &format!("openai model '{}'", model),
            client.generate_with_system(SYSTEM_PROMPT, prompt),
        )
        .await;

        match attempt {
            Ok(answer) => {
                info!(
                    model,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Remote model answered"
                );
                GenerationOutcome::Succeeded {
                    answer,
                    model_tag: format!("openai-{}", model),
                    sources: context.sources,
                }
            }
            Err(e) => {
                warn!(model, error = %e, "Remote model failed");
                GenerationOutcome::Terminal {
                    message: format!("OpenAI API error: {}", failure_detail(&e)),
                }
            }
        }
    }

    fn fallback_answer(&self, passages: &[ContextPassage]) -> String {
        match passages.first() {
            Some(best) => format!(
                "The language model is currently unavailable. Most relevant excerpt from {}:\n\n{}",
                best.filename,
                preview(best.text.trim(), self.fallback_excerpt_chars)
            ),
            None => NO_CONTEXT_ANSWER.to_string(),
        }
    }
}
