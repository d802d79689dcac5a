// ABOUTME: Environment-driven server configuration with typed enums and validation
// ABOUTME: Loads HTTP, database, upstream OpenAI, chat defaults, CORS, and auth settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Environment-based configuration
//!
//! All runtime configuration enters through [`ServerConfig::from_env`] and is
//! passed explicitly into the components that need it. There is no global
//! configuration state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Standard operational logging
    #[default]
    Info,
    /// Verbose diagnostics
    Debug,
    /// Full tracing output
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Environment type for logging and behavioral defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite {
        /// Path to the database file
        path: PathBuf,
    },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from a `sqlite:` URL or bare file path
    pub fn parse_url(s: &str) -> Result<Self> {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Ok(Self::Memory)
        } else {
            Ok(Self::SQLite {
                path: PathBuf::from(path_str),
            })
        }
    }

    /// Convert to connection string
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/switchboard.db"),
        }
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Complete server configuration, assembled from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Upstream OpenAI-compatible API configuration
    pub openai: OpenAiConfig,
    /// Chat relay defaults
    pub chat: ChatDefaults,
    /// CORS settings
    pub cors: CorsConfig,
    /// Inbound authentication settings
    pub auth: AuthConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite path or `sqlite::memory:`)
    pub url: DatabaseUrl,
}

/// Upstream OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL, without a trailing `/chat/completions`
    pub base_url: String,
    /// Bearer token; requests go out unauthenticated when unset
    pub api_key: Option<String>,
    /// Model requested when the caller does not name one
    pub default_model: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds; bounds streaming responses too
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            api_key: None,
            default_model: "gpt-4o-mini".to_owned(),
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

/// Defaults applied to chat requests that omit tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDefaults {
    /// System message injected ahead of thread-associated prompts
    pub system_prompt: String,
    /// Sampling temperature when the caller omits one (0.0-2.0)
    pub temperature: f32,
    /// Generation cap when the caller omits one
    pub max_tokens: u32,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_owned(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any
    pub allowed_origins: Vec<String>,
}

/// Inbound authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Expected `x-api-key` header value; the API is open when unset
    pub api_key: Option<String>,
}

/// Default browser dev-server origins accepted when `CORS_ORIGINS` is unset
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:4200,http://localhost:4201,http://localhost:8089";

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when a variable fails to parse or validation rejects
    /// the assembled configuration
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let config = Self {
            http_port: env_var_or("HTTP_PORT", "8080")?
                .parse()
                .context("Invalid HTTP_PORT value")?,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")?),
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )?),

            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_var_or("DATABASE_URL", "sqlite:data/switchboard.db")?)?,
            },

            openai: OpenAiConfig {
                base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com/v1")?,
                api_key: env::var("OPENAI_API_KEY").ok(),
                default_model: env_var_or("OPENAI_MODEL", "gpt-4o-mini")?,
                connect_timeout_secs: env_var_or("OPENAI_CONNECT_TIMEOUT_SECS", "10")?
                    .parse()
                    .context("Invalid OPENAI_CONNECT_TIMEOUT_SECS value")?,
                request_timeout_secs: env_var_or("OPENAI_REQUEST_TIMEOUT_SECS", "300")?
                    .parse()
                    .context("Invalid OPENAI_REQUEST_TIMEOUT_SECS value")?,
            },

            chat: ChatDefaults {
                system_prompt: env_var_or("CHAT_SYSTEM_PROMPT", "You are a helpful assistant.")?,
                temperature: env_var_or("CHAT_DEFAULT_TEMPERATURE", "0.7")?
                    .parse()
                    .context("Invalid CHAT_DEFAULT_TEMPERATURE value")?,
                max_tokens: env_var_or("CHAT_DEFAULT_MAX_TOKENS", "1000")?
                    .parse()
                    .context("Invalid CHAT_DEFAULT_MAX_TOKENS value")?,
            },

            cors: CorsConfig {
                allowed_origins: parse_origins(&env_var_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)?),
            },

            auth: AuthConfig {
                api_key: env::var("INBOUND_API_KEY").ok(),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when a value is outside its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(anyhow::anyhow!("HTTP_PORT must be non-zero"));
        }

        if !self.openai.base_url.starts_with("http://") && !self.openai.base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "OPENAI_BASE_URL must start with http:// or https://"
            ));
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(anyhow::anyhow!(
                "CHAT_DEFAULT_TEMPERATURE must be between 0.0 and 2.0"
            ));
        }

        if self.chat.max_tokens == 0 {
            return Err(anyhow::anyhow!("CHAT_DEFAULT_MAX_TOKENS must be greater than 0"));
        }

        if self.openai.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; upstream requests will be unauthenticated");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    pub fn summary(&self) -> String {
        format!(
            "Switchboard Configuration:\n\
             - HTTP Port: {}\n\
             - Log Level: {}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - OpenAI Base URL: {}\n\
             - OpenAI API Key: {}\n\
             - Default Model: {}\n\
             - CORS Origins: {}\n\
             - Inbound API Key: {}",
            self.http_port,
            self.log_level,
            self.environment,
            if self.database.url.is_memory() {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            self.openai.base_url,
            if self.openai.api_key.is_some() {
                "Configured"
            } else {
                "Not set"
            },
            self.openai.default_model,
            self.cors.allowed_origins.join(", "),
            if self.auth.api_key.is_some() {
                "Required"
            } else {
                "Open"
            },
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
