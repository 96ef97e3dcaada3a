//! Environment driven configuration.
//!
//! Values are read from the process environment after loading an optional `.env` file.

use anyhow::Context;
use std::env;
use std::str::FromStr;

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173,http://localhost:9002";
const DEFAULT_IDENTITY_API_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SUGGESTION_QUEUE_SIZE: usize = 10;

fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn database_url() -> anyhow::Result<String> {
    load_dotenv();
    env::var("DATABASE_URL").context("DATABASE_URL must be set")
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen_address: String,
    pub allowed_origins: Vec<String>,
}

impl ServerSettings {
    pub fn from_env() -> ServerSettings {
        load_dotenv();
        ServerSettings {
            listen_address: var_or("LISTEN_ADDRESS", DEFAULT_LISTEN_ADDRESS),
            allowed_origins: var_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl IdentitySettings {
    pub fn from_env() -> IdentitySettings {
        load_dotenv();
        IdentitySettings {
            api_url: var_or("IDENTITY_API_URL", DEFAULT_IDENTITY_API_URL),
            api_key: optional_var("IDENTITY_API_KEY"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub queue_size: usize,
}

impl LlmSettings {
    pub fn from_env() -> LlmSettings {
        load_dotenv();
        LlmSettings {
            api_url: var_or("LLM_API_URL", DEFAULT_LLM_API_URL),
            api_key: optional_var("LLM_API_KEY"),
            model: var_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            queue_size: env::var("SUGGESTION_QUEUE_SIZE")
                .ok()
                .and_then(|s| usize::from_str(&s).ok())
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_SUGGESTION_QUEUE_SIZE),
        }
    }
}
