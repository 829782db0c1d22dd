use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    models::ModelOptions,
    Ollama,
};

/// Build an Ollama handle from an `http(s)://host[:port]` URL.
///
/// The port defaults to 11434 when the URL does not name one.
pub fn connect(base_url: &str) -> Result<Ollama> {
    let mut url = reqwest::Url::parse(base_url.trim())
        .map_err(|e| AppError::Configuration(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Configuration(format!(
            "Ollama URL '{}' must use http or https",
            base_url
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Configuration(format!("Ollama URL '{}' has no host", base_url)));
    }
    if url.port().is_none() {
        url.set_port(Some(11434))
            .map_err(|_| AppError::Configuration(format!("Ollama URL '{}' cannot take a port", base_url)))?;
    }

    Ok(Ollama::from_url(url))
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: connect(base_url)?,
            model,
            temperature,
        })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage::system(system.to_string()));
        }
        messages.push(ChatMessage::user(prompt.to_string()));

        let request = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(self.temperature));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
