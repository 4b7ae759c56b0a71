use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Required variables fail startup with a descriptive error.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Comma-separated provider names, highest priority first.
    pub provider_priority: Vec<String>,
    pub worker_concurrency: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            provider_priority: parse_priority(
                &std::env::var("AI_PROVIDER_PRIORITY")
                    .unwrap_or_else(|_| "anthropic,openai,gemini".to_string()),
            ),
            worker_concurrency: std::env::var("WORKER_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .context("WORKER_CONCURRENCY must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        if config.anthropic_api_key.is_none()
            && config.openai_api_key.is_none()
            && config.gemini_api_key.is_none()
        {
            bail!(
                "No AI provider configured. Set at least one of \
                ANTHROPIC_API_KEY, OPENAI_API_KEY, GEMINI_API_KEY"
            );
        }

        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_priority(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority_splits_and_normalizes() {
        let priority = parse_priority("Anthropic, openai ,GEMINI");
        assert_eq!(priority, vec!["anthropic", "openai", "gemini"]);
    }

    #[test]
    fn test_parse_priority_skips_empty_segments() {
        let priority = parse_priority("openai,,anthropic,");
        assert_eq!(priority, vec!["openai", "anthropic"]);
    }
}
