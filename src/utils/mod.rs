/// TOML configuration (`askmydocs.toml`) with environment overrides.
pub mod toml_config;
