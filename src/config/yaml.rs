use serde::Deserialize;
use std::path::Path;

use super::ConfigError;
use crate::core::audio::ResampleAlgorithm;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_url: "bridge.example.com"
///
/// openai:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview"
///   voice: "alloy"
///   temperature: 0.8
///   system_message_path: "system-message.txt"
///
/// vonage:
///   application_id: "aaaaaaaa-bbbb-cccc-dddd-0123456789ab"
///   private_key_path: "private.key"
///   outbound_from: "81312345678"
///
/// connect:
///   api_keys: ["key-1", "key-2"]
///
/// weather:
///   api_key: "..."
///   country: "JP"
///   lang: "ja"
///
/// relay:
///   resample_algorithm: "decimate"
///   delivery_policy: "buffered"
///   delivery_interval_ms: 1000
///   send_greeting: true
///   truncate_min_ms: 500
///   truncate_max_ms: 5000
///
/// ncco:
///   talk_text: "Connecting you now."
///   language: "en-US"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub vonage: Option<VonageYaml>,
    pub connect: Option<ConnectYaml>,
    pub weather: Option<WeatherYaml>,
    pub relay: Option<RelayYaml>,
    pub ncco: Option<NccoYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Public host used in NCCO and callback URLs
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub url: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub system_message_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VonageYaml {
    pub application_id: Option<String>,
    /// Inline PEM, takes precedence over `private_key_path`
    pub private_key: Option<String>,
    pub private_key_path: Option<String>,
    pub outbound_from: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConnectYaml {
    pub api_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WeatherYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub country: Option<String>,
    pub lang: Option<String>,
}

/// Relay policy knobs from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub resample_algorithm: Option<ResampleAlgorithm>,
    /// `immediate` or `buffered`
    pub delivery_policy: Option<String>,
    pub delivery_interval_ms: Option<u64>,
    pub frame_duration_ms: Option<u32>,
    pub session_update_delay_ms: Option<u64>,
    pub greeting_delay_ms: Option<u64>,
    pub send_greeting: Option<bool>,
    pub truncate_min_ms: Option<u64>,
    pub truncate_max_ms: Option<u64>,
    pub truncate_fallback_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NccoYaml {
    pub talk_text: Option<String>,
    pub language: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Ok(serde_yaml::from_str(&contents)?)
    }
}
