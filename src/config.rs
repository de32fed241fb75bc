use crate::schema::SchemaRegistry;
use secrecy::SecretString;
use std::env;

/// Default OpenAI-compatible endpoint (Gemini).
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Completion collaborator settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    /// Upper bound on a single generation round trip.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// `sqlite://path` or a bare filesystem path.
    pub database_url: String,
    pub llm: LlmConfig,
    /// Schema version enforced on every generation. Fixed for the process lifetime.
    pub schema_version: u32,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `LLM_API_KEY` is required; `GEMINI_API_KEY` is accepted as a fallback.
    /// The result is validated before it is returned.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .map_err(|_| anyhow::anyhow!("LLM_API_KEY (or GEMINI_API_KEY) must be set"))?;

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://toolsmith.db".to_string()),
            llm: LlmConfig {
                base_url: env::var("LLM_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
                api_key: SecretString::from(api_key),
                timeout_secs: env::var("GENERATION_TIMEOUT")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            },
            schema_version: env::var("SCHEMA_VERSION")
                .unwrap_or_else(|_| SchemaRegistry::LATEST.to_string())
                .parse()?,
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        SchemaRegistry::specification_for(self.schema_version)?;

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("GENERATION_TIMEOUT must be at least 1 second");
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL cannot be empty");
        }
        Ok(())
    }
}

/// Split a comma separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
