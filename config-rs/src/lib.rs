//! config-rs/lib.rs
//! Static process configuration for the AI gateway
//! Everything here is read once at startup and never mutated afterwards

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://host.docker.internal:11434";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "AI_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    parse_env_or(&var_name, default_port)
}

/// Create a SocketAddr for binding a service
///
/// `{SERVICE}_SERVICE_ADDR` wins over `{SERVICE}_SERVICE_PORT`, and accepts
/// either `host:port` or `http://host:port`.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let trimmed = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);
        match trimmed.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn env_string_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value {:?} in {}, using default {}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Model identifiers bound to the cheap and smart tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTiers {
    pub cheap: String,
    pub smart: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            cheap: DEFAULT_MODEL.to_string(),
            smart: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Gateway configuration
///
/// Reads:
/// - OLLAMA_BASE_URL: backend base URL
/// - MODEL_CHEAP / MODEL_SMART: tier model identifiers
/// - LLM_PROVIDER: provider label reported in responses and metrics
/// - LLM_TIMEOUT_SECS: per-attempt completion timeout
/// - LLM_MAX_RETRIES: extra attempts after the first one (default 0)
/// - AI_GATEWAY_SERVICE_ADDR / AI_GATEWAY_SERVICE_PORT: HTTP bind address
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub models: ModelTiers,
    pub provider: String,
    pub completion_timeout: Duration,
    pub max_retries: u32,
    pub bind_addr: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            models: ModelTiers::default(),
            provider: DEFAULT_PROVIDER.to_string(),
            completion_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_GATEWAY_PORT)),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let base_url = env_string_or("OLLAMA_BASE_URL", DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            base_url,
            models: ModelTiers {
                cheap: env_string_or("MODEL_CHEAP", DEFAULT_MODEL),
                smart: env_string_or("MODEL_SMART", DEFAULT_MODEL),
            },
            provider: env_string_or("LLM_PROVIDER", DEFAULT_PROVIDER),
            completion_timeout: Duration::from_secs(parse_env_or(
                "LLM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            max_retries: parse_env_or("LLM_MAX_RETRIES", 0u32),
            bind_addr: get_bind_address("AI_GATEWAY", DEFAULT_GATEWAY_PORT),
        }
    }

    /// Chat endpoint on the configured backend
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}
