//! Test Fixtures Module
//!
//! - Server configuration without touching the environment
//! - An RSA key pair for signing Vonage application tokens

// Not every test binary uses every fixture
#![allow(dead_code)]

use callbridge_gateway::config::{ApiKeySet, NccoSettings, OpenAISettings, VonageSettings};
use callbridge_gateway::core::relay::RelayConfig;
use callbridge_gateway::core::tools::WeatherConfig;
use callbridge_gateway::ServerConfig;
use zeroize::Zeroizing;

pub const VONAGE_PRIVATE_KEY: &str = include_str!("vonage_test_key.pem");
pub const VONAGE_PUBLIC_KEY: &str = include_str!("vonage_test_key.pub.pem");

pub const CONNECT_API_KEY: &str = "connect-key-1";
pub const PUBLIC_HOST: &str = "bridge.example.com";

/// Configuration with a fake OpenAI key and no Vonage application.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        server_url: PUBLIC_HOST.to_string(),
        openai: OpenAISettings {
            api_key: Zeroizing::new("sk-test".to_string()),
            model: "gpt-4o-realtime-preview".to_string(),
            url: "ws://127.0.0.1:9/v1/realtime".to_string(),
            voice: "alloy".to_string(),
            temperature: 0.8,
            instructions: "You are a test assistant.".to_string(),
        },
        vonage: VonageSettings {
            api_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        },
        connect_api_keys: ApiKeySet::default(),
        weather: WeatherConfig::default(),
        relay: RelayConfig::default(),
        ncco: NccoSettings::default(),
    }
}

/// [`test_config`] with a Vonage application pointed at `api_url`.
pub fn vonage_config(api_url: &str) -> ServerConfig {
    let mut config = test_config();
    config.vonage = VonageSettings {
        application_id: Some("app-0001".to_string()),
        private_key: Some(Zeroizing::new(VONAGE_PRIVATE_KEY.to_string())),
        outbound_from: Some("81312345678".to_string()),
        api_url: api_url.to_string(),
    };
    config.connect_api_keys = ApiKeySet::new([CONNECT_API_KEY]);
    config
}
