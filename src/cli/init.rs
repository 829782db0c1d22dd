//! Init command implementation
//!
//! Writes a default `askmydocs.toml`, an `.env.example` and the data
//! directories the configuration points at.

use super::output::Output;
use crate::utils::toml_config::{AskConfig, EmbeddingBackendKind, PLACEHOLDER_API_KEY};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (askmydocs.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Embedding backend name (local or remote)
    pub backend: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.header("Initializing AskMyDocs");

    let base_path = &config.path;
    let config_path = base_path.join("askmydocs.toml");
    if config_path.exists() && !config.force {
        output.warning("askmydocs.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let Some(backend) = EmbeddingBackendKind::from_provider_name(&config.backend) else {
        let message = format!(
            "Unknown backend '{}', expected 'local' or 'remote'",
            config.backend
        );
        output.error(&message);
        return InitResult::Error(message);
    };

    let mut ask_config = AskConfig::default();
    ask_config.embedding.backend = backend;

    for dir in [&ask_config.storage.vector_path, &ask_config.storage.documents_dir] {
        let dir_path = base_path.join(dir);
        let display = dir.display().to_string();
        if dir_path.exists() {
            output.skipped(&display, "already exists");
            continue;
        }
        if let Err(e) = fs::create_dir_all(&dir_path) {
            output.error(&format!("Failed to create {}: {}", display, e));
            return InitResult::Error(e.to_string());
        }
        output.created("directory", &display);
    }

    let toml_content = match generate_config_toml(&ask_config) {
        Ok(content) => content,
        Err(e) => {
            output.error(&e);
            return InitResult::Error(e);
        }
    };
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create askmydocs.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "askmydocs.toml");

    let env_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    output.complete("AskMyDocs initialized");
    if backend == EmbeddingBackendKind::Local {
        output.hint("Pull the models before ingesting:");
        output.command(&format!("ollama pull {}", ask_config.embedding.ollama_model));
        for model in &ask_config.ollama.models {
            output.command(&format!("ollama pull {}", model));
        }
    } else {
        output.hint("Set OPENAI_API_KEY in .env before ingesting");
    }
    output.command("askmydocs ingest path/to/notes.txt");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_config_toml(config: &AskConfig) -> Result<String, String> {
    let body = config.to_toml_string().map_err(|e| e.to_string())?;
    Ok(format!(
        "# AskMyDocs configuration\n\
         # Generated by: askmydocs init\n\
         #\n\
         # Secrets are read from the environment variable named by\n\
         # openai.api_key_env, never from this file.\n\n{}",
        body
    ))
}

fn generate_env_example() -> String {
    format!(
        "# Copy to .env and fill in\n\
         OPENAI_API_KEY={}\n\
         # LLM_PROVIDER=ollama\n\
         # OLLAMA_HOST=http://localhost\n\
         # OLLAMA_PORT=11434\n\
         # OLLAMA_MODEL=nomic-embed-text\n\
         # RUST_LOG=askmydocs=debug\n",
        PLACEHOLDER_API_KEY
    )
}
