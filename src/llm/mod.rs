//! LLM Provider Clients and Abstractions
//!
//! Answer generation is written against the [`LLMClient`] trait; concrete
//! clients come from [`Provider::create_client`].
//!
//! # Supported Providers
//!
//! - `ollama` (Cargo feature, on by default) - local Ollama server
//! - `openai` (Cargo feature, on by default) - OpenAI-compatible chat completions via `async-openai`
//!
//! # Example
//!
//! ```ignore
//! use askmydocs::llm::Provider;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2:1b".to_string(),
//!     temperature: 0.0,
//! }
//! .create_client()?;
//!
//! let answer = client.generate_with_system("Be brief.", "What is RAG?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
