use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub google_ai: GoogleAiConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

#[derive(Clone, Deserialize)]
pub struct GoogleAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub timeout_secs: u64,
}

// Keep the credential out of startup logs
impl std::fmt::Debug for GoogleAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GoogleAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for GoogleAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GOOGLE_AI_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub ai_enhancement: bool,
    pub embed_batch_size: usize,
    pub embed_batch_delay_ms: u64,
    /// When set, batch pacing uses a token bucket instead of the fixed delay.
    pub embed_rate_per_second: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ai_enhancement: true,
            embed_batch_size: 10,
            embed_batch_delay_ms: 100,
            embed_rate_per_second: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_defaults = GoogleAiConfig::default();
        let search_defaults = SearchConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&get, "PORT", 3000)?,
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                cors_allowed_origins: get("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| {
                        "http://localhost:8080,https://choricana.vercel.app".to_string()
                    })
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: get("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", 1)?,
                run_migrations: parse_or(&get, "RUN_MIGRATIONS", false)?,
            },
            google_ai: GoogleAiConfig {
                api_key: get("GOOGLE_AI_API_KEY").map(|k| k.trim().to_string()),
                base_url: get("GOOGLE_AI_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(google_defaults.base_url),
                embedding_model: get("GOOGLE_AI_EMBEDDING_MODEL")
                    .unwrap_or(google_defaults.embedding_model),
                generation_model: get("GOOGLE_AI_GENERATION_MODEL")
                    .unwrap_or(google_defaults.generation_model),
                timeout_secs: parse_or(&get, "GOOGLE_AI_TIMEOUT_SECS", google_defaults.timeout_secs)?,
            },
            search: SearchConfig {
                ai_enhancement: parse_or(&get, "SEARCH_AI_ENHANCEMENT", search_defaults.ai_enhancement)?,
                embed_batch_size: parse_or(&get, "EMBED_BATCH_SIZE", search_defaults.embed_batch_size)?,
                embed_batch_delay_ms: parse_or(
                    &get,
                    "EMBED_BATCH_DELAY_MS",
                    search_defaults.embed_batch_delay_ms,
                )?,
                embed_rate_per_second: get("EMBED_RATE_PER_SECOND")
                    .map(|v| {
                        v.trim()
                            .parse()
                            .with_context(|| format!("EMBED_RATE_PER_SECOND has an invalid value: {}", v))
                    })
                    .transpose()?,
            },
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
