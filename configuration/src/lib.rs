use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use chat_protocol::{ModelCatalog, KEY_LENGTH, MAX_CATALOG_SIZE};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "DNS_CHAT";

const DEFAULT_MODELS: [&str; 4] = ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("models must list between 1 and {max} identifiers, got {got}")]
    CatalogSize { got: usize, max: usize },
    #[error("model identifier at index {0} is empty")]
    EmptyModel(usize),
    #[error("auth.api_key must be exactly {expected} characters, got {got}")]
    ApiKeyLength { got: usize, expected: usize },
    #[error("backend.timeout_secs must be at least 1")]
    ZeroTimeout,
}

/// Reads the configuration from defaults, the optional TOML file and the
/// process environment.
pub fn get_config(config_path: Option<&Path>) -> Result<ChatConfiguration, ConfigurationError> {
    get_config_from(config_path, std::env::vars().collect())
}

/// Like [`get_config`] with `vars` standing in for the environment.
pub fn get_config_from(
    config_path: Option<&Path>,
    vars: HashMap<String, String>,
) -> Result<ChatConfiguration, ConfigurationError> {
    let mut builder = defaults(config::Config::builder())?;

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(vars.clone())),
    );

    let models = vars
        .get(&format!("{}_MODELS", ENV_PREFIX))
        .map(|list| list.split(',').map(|m| m.trim().to_string()).collect::<Vec<_>>());

    // flat names used by older deployments, highest precedence
    builder = builder
        .set_override_option("models", models)?
        .set_override_option("server.port", vars.get("PORT").cloned())?
        .set_override_option("server.ip_address", vars.get("HOST").cloned())?
        .set_override_option("response.default_txt", vars.get("DEFAULT_TXT").cloned())?
        .set_override_option("response.ttl", vars.get("TTL").cloned())?
        .set_override_option("logging.enabled", vars.get("ENABLE_LOGGING").cloned())?
        .set_override_option("auth.api_key", vars.get("API_KEY").cloned())?
        .set_override_option("backend.api_key", vars.get("OPENAI_API_KEY").cloned())?;

    let configuration: ChatConfiguration = builder.build()?.try_deserialize()?;
    configuration.check()?;

    Ok(configuration)
}

fn defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("server.ip_address", "0.0.0.0")?
        .set_default("server.port", 53)?
        .set_default("server.tcp", true)?
        .set_default("response.default_txt", "DNS chat server")?
        .set_default("response.ttl", 0)?
        .set_default("logging.enabled", true)?
        .set_default("backend.base_url", completion::DEFAULT_BASE_URL)?
        .set_default("backend.timeout_secs", completion::DEFAULT_TIMEOUT.as_secs())?
        .set_default("models", DEFAULT_MODELS.to_vec())
}

#[derive(Debug, Deserialize)]
pub struct ChatConfiguration {
    pub server: ServerConfiguration,
    pub response: ResponseConfiguration,
    pub logging: LoggingConfiguration,
    #[serde(default)]
    pub auth: AuthConfiguration,
    pub backend: BackendConfiguration,
    pub models: Vec<String>,
}

impl ChatConfiguration {
    fn check(&self) -> Result<(), ConfigurationError> {
        if self.models.is_empty() || self.models.len() > MAX_CATALOG_SIZE {
            return Err(ConfigurationError::CatalogSize {
                got: self.models.len(),
                max: MAX_CATALOG_SIZE,
            });
        }
        if let Some(index) = self.models.iter().position(|m| m.trim().is_empty()) {
            return Err(ConfigurationError::EmptyModel(index));
        }
        // a key of any other length can never match the fixed-width field
        if let Some(key) = self.auth.api_key() {
            let got = key.chars().count();
            if got != KEY_LENGTH {
                return Err(ConfigurationError::ApiKeyLength {
                    got,
                    expected: KEY_LENGTH,
                });
            }
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigurationError::ZeroTimeout);
        }

        Ok(())
    }

    pub fn catalog(&self) -> ModelCatalog {
        self.models.iter().map(|m| m.trim()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfiguration {
    ip_address: IpAddr,
    port: u16,
    pub tcp: bool,
}

impl ServerConfiguration {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.ip_address, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseConfiguration {
    pub default_txt: String,
    pub ttl: u32,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfiguration {
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfiguration {
    api_key: Option<String>,
}

impl AuthConfiguration {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendConfiguration {
    api_key: Option<String>,
    pub base_url: String,
    timeout_secs: u64,
}

impl BackendConfiguration {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let c = get_config_from(None, HashMap::new()).unwrap();

        assert_eq!(c.server.bind_address(), "0.0.0.0:53".parse().unwrap());
        assert!(c.server.tcp);
        assert_eq!(c.response.ttl, 0);
        assert_eq!(c.response.default_txt, "DNS chat server");
        assert!(c.logging.enabled);
        assert_eq!(c.auth.api_key(), None);
        assert_eq!(c.backend.api_key(), None);
        assert_eq!(c.backend.base_url, completion::DEFAULT_BASE_URL);
        assert_eq!(c.backend.timeout(), completion::DEFAULT_TIMEOUT);
        assert_eq!(c.catalog().len(), 4);
    }

    #[test]
    fn flat_variables_override() {
        let c = get_config_from(
            None,
            vars(&[
                ("PORT", "5353"),
                ("HOST", "127.0.0.1"),
                ("DEFAULT_TXT", "hello"),
                ("TTL", "300"),
                ("ENABLE_LOGGING", "false"),
                ("API_KEY", "my-api-key"),
                ("OPENAI_API_KEY", "sk-123"),
            ]),
        )
        .unwrap();

        assert_eq!(c.server.bind_address(), "127.0.0.1:5353".parse().unwrap());
        assert_eq!(c.response.default_txt, "hello");
        assert_eq!(c.response.ttl, 300);
        assert!(!c.logging.enabled);
        assert_eq!(c.auth.api_key(), Some("my-api-key"));
        assert_eq!(c.backend.api_key(), Some("sk-123"));
    }

    #[test]
    fn prefixed_variables_and_model_list() {
        let c = get_config_from(
            None,
            vars(&[
                ("DNS_CHAT_SERVER__PORT", "5300"),
                ("DNS_CHAT_BACKEND__TIMEOUT_SECS", "2"),
                ("DNS_CHAT_AUTH__API_KEY", "0123456789"),
                ("DNS_CHAT_MODELS", "gpt-4o, gpt-4o-mini"),
            ]),
        )
        .unwrap();

        assert_eq!(c.server.bind_address().port(), 5300);
        assert_eq!(c.backend.timeout(), Duration::from_secs(2));
        assert_eq!(c.auth.api_key(), Some("0123456789"));
        assert_eq!(c.catalog().listing(), "Available models: 0:gpt-4o | 1:gpt-4o-mini");
    }

    #[test]
    fn empty_credentials_count_as_missing() {
        let c = get_config_from(None, vars(&[("API_KEY", ""), ("OPENAI_API_KEY", "")])).unwrap();
        assert_eq!(c.auth.api_key(), None);
        assert_eq!(c.backend.api_key(), None);
    }

    #[test]
    fn catalog_must_fit_a_single_digit() {
        let eleven = (0..11).map(|i| format!("m{}", i)).collect::<Vec<_>>().join(",");
        let err = get_config_from(None, vars(&[("DNS_CHAT_MODELS", &eleven)])).unwrap_err();
        assert!(matches!(err, ConfigurationError::CatalogSize { got: 11, max: 10 }));

        let err = get_config_from(None, vars(&[("DNS_CHAT_MODELS", "a,,b")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyModel(1)));
    }

    #[test]
    fn server_key_must_fill_the_key_field() {
        let err = get_config_from(None, vars(&[("API_KEY", "short")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::ApiKeyLength { got: 5, expected: 10 }));

        let err = get_config_from(None, vars(&[("DNS_CHAT_AUTH__API_KEY", "my-api-key-2")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::ApiKeyLength { got: 12, expected: 10 }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = get_config_from(None, vars(&[("DNS_CHAT_BACKEND__TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::ZeroTimeout));
        assert_eq!(err.to_string(), "backend.timeout_secs must be at least 1");
    }

    #[test]
    fn toml_file_is_read() {
        let path = std::env::temp_dir().join(format!("dns_chat_config_test_{}.toml", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
models = ["llama3"]

[server]
ip_address = "::1"
port = 5454
tcp = false

[response]
ttl = 60
"#
        )
        .unwrap();
        drop(f);

        let c = get_config_from(Some(&path), vars(&[("TTL", "5")])).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(c.server.bind_address(), "[::1]:5454".parse().unwrap());
        assert!(!c.server.tcp);
        assert_eq!(c.response.ttl, 5);
        assert_eq!(c.response.default_txt, "DNS chat server");
        assert_eq!(c.catalog().identifier_at(0), Ok("llama3"));
    }

    #[test]
    fn missing_file_is_fine() {
        let c = get_config_from(Some(Path::new("/nonexistent/dns_chat.toml")), HashMap::new()).unwrap();
        assert_eq!(c.server.bind_address().port(), 53);
    }
}
