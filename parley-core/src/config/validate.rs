//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.llm.api_key.trim().is_empty() {
        errors.push("llm.api_key is required (set LLM_API_KEY)".to_string());
    }
    if config.llm.base_url.trim().is_empty() {
        errors.push("llm.base_url must not be empty".to_string());
    }
    if config.llm.model.trim().is_empty() {
        errors.push("llm.model must not be empty".to_string());
    }
    if config.llm.max_tokens == 0 {
        errors.push("llm.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        errors.push("llm.temperature must be in [0.0, 2.0]".to_string());
    }

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push("auth.jwt_secret is required (set JWT_SECRET)".to_string());
    }

    if config.prompt.prompt.trim().is_empty() {
        errors.push("prompt.prompt must not be empty".to_string());
    }

    if config.sessions.idle_ttl > 0 && config.sessions.reap_interval == 0 {
        errors.push("sessions.reap_interval must be > 0 when sessions.idle_ttl is set".to_string());
    }

    let format = config.logging.format.to_lowercase();
    if format != "text" && format != "json" {
        errors.push(format!(
            "logging.format must be text or json, got {}",
            config.logging.format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
