// src/config.rs
use serde::Deserialize;
use std::time::Duration;

use crate::supabase_client::{SupabaseConfig, DEFAULT_REQUEST_TIMEOUT_SECS};

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_label_cache_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    // Backend
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // Server
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,

    #[serde(default = "default_label_cache_secs")]
    pub label_cache_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<AppConfig>()
    }

    pub fn supabase(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.supabase_url.clone(),
            service_role_key: self.supabase_service_role_key.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// HTTPS only when both files are configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.cert_path.as_deref(), self.key_path.as_deref()) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => Some((cert, key)),
            _ => None,
        }
    }

    pub fn label_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.label_cache_secs)
    }
}
