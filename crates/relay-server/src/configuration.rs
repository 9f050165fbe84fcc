use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use relay::errors::EngineResult;
use relay::ollama::{OllamaConfig, OLLAMA_HOST, OLLAMA_MAX_ROUNDS, OLLAMA_MODEL};
use relay::tool::{NoTools, ToolSet};
use relay::weather::WeatherTools;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                env_var: to_env_var("server.host"),
                reason: e.to_string(),
            })
    }
}

/// Which tools the engine offers the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolsSetting {
    None,
    #[default]
    Weather,
}

#[derive(Debug, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_engine_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    #[serde(default)]
    pub tools: ToolsSetting,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: default_engine_host(),
            model: default_model(),
            system_prompt: None,
            temperature: None,
            max_rounds: default_max_rounds(),
            tools: ToolsSetting::default(),
        }
    }
}

impl EngineSettings {
    pub fn tool_set(&self) -> EngineResult<Arc<dyn ToolSet>> {
        let tools: Arc<dyn ToolSet> = match self.tools {
            ToolsSetting::None => Arc::new(NoTools),
            ToolsSetting::Weather => Arc::new(WeatherTools::new()?),
        };
        Ok(tools)
    }

    pub fn into_config(self) -> OllamaConfig {
        OllamaConfig {
            host: self.host,
            model: self.model,
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_rounds: self.max_rounds,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Optional relay.toml in the working directory
            .add_source(File::with_name("relay").required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.stream_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                env_var: to_env_var("server.stream_buffer"),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                env_var: to_env_var("engine.max_rounds"),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_stream_buffer() -> usize {
    1
}

fn default_engine_host() -> String {
    OLLAMA_HOST.to_string()
}

fn default_model() -> String {
    OLLAMA_MODEL.to_string()
}

fn default_max_rounds() -> usize {
    OLLAMA_MAX_ROUNDS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("RELAY_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.stream_buffer, 1);
        assert_eq!(settings.engine.tools, ToolsSetting::Weather);

        let engine = settings.engine.into_config();
        assert_eq!(engine.host, "http://localhost:11434");
        assert_eq!(engine.model, "llama3.1:8b");
        assert_eq!(engine.system_prompt, None);
        assert_eq!(engine.temperature, None);
        assert_eq!(engine.max_rounds, 8);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("RELAY_SERVER__PORT", "9090");
        env::set_var("RELAY_SERVER__STREAM_BUFFER", "4");
        env::set_var("RELAY_ENGINE__HOST", "http://gpu-box:11434");
        env::set_var("RELAY_ENGINE__MODEL", "qwen2.5");
        env::set_var("RELAY_ENGINE__TEMPERATURE", "0.7");
        env::set_var("RELAY_ENGINE__MAX_ROUNDS", "3");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.stream_buffer, 4);
        assert_eq!(settings.engine.host, "http://gpu-box:11434");
        assert_eq!(settings.engine.model, "qwen2.5");
        assert_eq!(settings.engine.temperature, Some(0.7));
        assert_eq!(settings.engine.max_rounds, 3);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_tools_selection() {
        clean_env();
        env::set_var("RELAY_ENGINE__TOOLS", "none");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.engine.tools, ToolsSetting::None);
        assert!(settings.engine.tool_set().unwrap().tools().is_empty());

        env::set_var("RELAY_ENGINE__TOOLS", "weather");
        let settings = Settings::new().unwrap();
        assert_eq!(settings.engine.tools, ToolsSetting::Weather);
        let names: Vec<String> = settings
            .engine
            .tool_set()
            .unwrap()
            .tools()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, vec!["current_weather", "how_are_you"]);

        env::set_var("RELAY_ENGINE__TOOLS", "stocks");
        assert!(matches!(Settings::new(), Err(ConfigError::Other(_))));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_zero_stream_buffer_rejected() {
        clean_env();
        env::set_var("RELAY_SERVER__STREAM_BUFFER", "0");

        match Settings::new() {
            Err(ConfigError::InvalidValue { env_var, .. }) => {
                assert_eq!(env_var, "RELAY_SERVER__STREAM_BUFFER");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            stream_buffer: 1,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_bad_host_rejected() {
        let server_settings = ServerSettings {
            host: "not a host".to_string(),
            ..ServerSettings::default()
        };
        assert!(matches!(
            server_settings.socket_addr(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
