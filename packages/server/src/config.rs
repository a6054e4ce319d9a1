use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the durable image storage API
    pub storage_api_url: String,
    /// Bearer token for the storage API, if it requires one
    pub storage_api_key: Option<String>,
    /// Extra hostnames exempted from URL screening (fixture servers)
    pub allowed_hosts: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            storage_api_url: env::var("STORAGE_API_URL")
                .context("STORAGE_API_URL must be set")?,
            storage_api_key: env::var("STORAGE_API_KEY").ok(),
            allowed_hosts: env::var("ALLOWED_HOSTS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
